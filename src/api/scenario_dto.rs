pub mod request_dto;
pub mod resource_dto;
pub mod specification_dto;

use serde::Deserialize;

use crate::api::scenario_dto::request_dto::{IntervalDto, ReservationRequestDto, ReservationRequestSetDto};
use crate::api::scenario_dto::resource_dto::{ResourceDto, ValueProviderDto};
use crate::config::SchedulerConfig;

/// Root of a scenario file: the resources to allocate from and the requests to allocate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDto {
    #[serde(default)]
    pub config: SchedulerConfig,

    /// Scheduling interval, overridable from the command line.
    pub interval: Option<IntervalDto>,

    #[serde(default)]
    pub resources: Vec<ResourceDto>,

    #[serde(default)]
    pub value_providers: Vec<ValueProviderDto>,

    #[serde(default)]
    pub reservation_requests: Vec<ReservationRequestDto>,

    #[serde(default)]
    pub reservation_request_sets: Vec<ReservationRequestSetDto>,
}
