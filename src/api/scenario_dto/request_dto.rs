use serde::Deserialize;

use crate::api::scenario_dto::specification_dto::SpecificationDto;
use crate::domain::request::reservation_request::{ReservationRequestPurpose, ReservationRequestReusement};

fn default_purpose() -> ReservationRequestPurpose {
    ReservationRequestPurpose::Science
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IntervalDto {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequestDto {
    pub id: String,
    pub slot: IntervalDto,
    pub specification: SpecificationDto,
    #[serde(default = "default_purpose")]
    pub purpose: ReservationRequestPurpose,
    #[serde(default)]
    pub priority: i32,
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    pub description: Option<String>,
    #[serde(default)]
    pub reusement: ReservationRequestReusement,
    pub reused_allocation: Option<String>,
    #[serde(default)]
    pub reused_allocation_mandatory: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum SetSlotDto {
    Absolute { start: i64, end: i64 },
    Periodic { start: i64, period: i64, duration: i64, end: Option<i64> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequestSetDto {
    pub id: String,
    pub slots: Vec<SetSlotDto>,
    pub specification: SpecificationDto,
    #[serde(default = "default_purpose")]
    pub purpose: ReservationRequestPurpose,
    #[serde(default)]
    pub priority: i32,
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    pub description: Option<String>,
}
