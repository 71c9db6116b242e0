#![allow(dead_code)]

use std::collections::BTreeSet;

use serde_json::Value;

use shongo_scheduler::api::scenario_dto::ScenarioDto;
use shongo_scheduler::config::SchedulerConfig;
use shongo_scheduler::domain::cache::cache::Cache;
use shongo_scheduler::domain::request::reservation_request::{AllocationState, ReservationRequest};
use shongo_scheduler::domain::reservation::reservation::{Reservation, ReservationKind};
use shongo_scheduler::domain::reservation::reservation_store::ReservationId;
use shongo_scheduler::domain::resource::capability::{Capability, CapabilityKind};
use shongo_scheduler::domain::resource::resource::{DeviceInfo, Resource};
use shongo_scheduler::domain::scheduler::notification::{CollectingNotificationExecutor, Notification};
use shongo_scheduler::domain::scheduler::persistence::Persistence;
use shongo_scheduler::domain::scheduler::preprocessor::PreprocessorResult;
use shongo_scheduler::domain::scheduler::scheduler::SchedulerResult;
use shongo_scheduler::domain::technology::Technology;
use shongo_scheduler::domain::utils::id::{CapabilityId, ReservationRequestId, ResourceId};
use shongo_scheduler::domain::utils::interval::Interval;
use shongo_scheduler::loader::scenario_loader::Scenario;
use shongo_scheduler::{logger, run_scenario};

pub const MINUTE: i64 = 60_000;
pub const HOUR: i64 = 60 * MINUTE;
pub const DAY: i64 = 24 * HOUR;

pub fn init() {
    logger::init();
}

pub fn interval(start: i64, end: i64) -> Interval {
    Interval::new(start, end).expect("Test interval must be valid.")
}

pub fn technologies(technologies: &[Technology]) -> BTreeSet<Technology> {
    technologies.iter().copied().collect()
}

/// Device with a room provider capability `{id}-room`.
pub fn mcu(id: &str, device_technologies: &[Technology], license_count: u32) -> (Resource, Vec<Capability>) {
    let mut resource = Resource::new(id);
    resource.device = Some(DeviceInfo { technologies: technologies(device_technologies), address: None, preferred_technology: None });
    let capability = Capability::new(
        format!("{}-room", id).as_str(),
        ResourceId::new(id),
        CapabilityKind::RoomProvider { license_count, max_licences_per_room: 0 },
    );
    (resource, vec![capability])
}

/// Persists a room reservation of `license_count` licences directly into the cache.
pub fn book_room(cache: &mut Cache, resource: &str, start: i64, end: i64, license_count: u32) -> ReservationId {
    let kind = ReservationKind::Room { resource: ResourceId::new(resource), capability: CapabilityId::new(format!("{}-room", resource)), license_count };
    let id = cache.add_reservation(Reservation::new(interval(start, end), kind));
    cache.persist_reservation(id).expect("Room reservation must be persisted.");
    id
}

/// Builds a scenario from its JSON form.
pub fn load(json: Value) -> Scenario {
    init();
    let dto: ScenarioDto = serde_json::from_value(json).expect("Scenario JSON must deserialize.");
    Scenario::from_dto(dto).expect("Scenario must be valid.")
}

pub struct RunResult {
    pub preprocessor: PreprocessorResult,
    pub scheduler: SchedulerResult,
    pub notifications: Vec<Notification>,
}

pub fn run(scenario: &mut Scenario) -> RunResult {
    let mut executor = CollectingNotificationExecutor::default();
    let (preprocessor, scheduler) = run_scenario(scenario, &mut executor).expect("Scheduler run must not fail.");
    RunResult { preprocessor, scheduler, notifications: executor.notifications }
}

/// Runs the scheduler for a different interval than the scenario's one.
pub fn run_in(scenario: &mut Scenario, start: i64, end: i64) -> RunResult {
    scenario.interval = interval(start, end);
    run(scenario)
}

pub fn request<'a>(scenario: &'a Scenario, id: &str) -> &'a ReservationRequest {
    scenario.persistence.reservation_request(&ReservationRequestId::new(id)).expect("Reservation request must exist.")
}

pub fn assert_allocated(scenario: &Scenario, id: &str) {
    let reservation_request = request(scenario, id);
    assert_eq!(
        reservation_request.allocation_state,
        AllocationState::Allocated,
        "Reservation request '{}' should be allocated, report:\n{}",
        id,
        reservation_request.allocation_report.as_deref().unwrap_or_default()
    );
}

pub fn assert_failed(scenario: &Scenario, id: &str) {
    assert_eq!(request(scenario, id).allocation_state, AllocationState::AllocationFailed, "Reservation request '{}' should fail.", id);
}

/// Latest top reservation of the request.
pub fn reservation<'a>(scenario: &'a Scenario, id: &str) -> &'a Reservation {
    let reservation = *request(scenario, id).allocation.reservations.last().expect("Reservation request must have a reservation.");
    scenario.cache.get_reservation(reservation).expect("Reservation must be in the cache.")
}

/// Follows reuse pointers and returns the reservation holding the allocation.
pub fn target<'a>(scenario: &'a Scenario, id: ReservationId) -> &'a Reservation {
    let target = scenario.cache.reservations().get_target(id);
    scenario.cache.get_reservation(target).expect("Target reservation must exist.")
}

pub fn default_config() -> SchedulerConfig {
    SchedulerConfig::default()
}
