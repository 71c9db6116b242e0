pub mod alias_set_task;
pub mod alias_task;
pub mod compartment_task;
pub mod endpoint_task;
pub mod recording_service_task;
pub mod reservation_task;
pub mod resource_task;
pub mod room_task;
pub mod value_task;

use crate::config::MINUTE_IN_MS;
use crate::domain::request::specification::Specification;
use crate::domain::scheduler::task::alias_set_task::AliasSetReservationTask;
use crate::domain::scheduler::task::alias_task::AliasReservationTask;
use crate::domain::scheduler::task::compartment_task::CompartmentReservationTask;
use crate::domain::scheduler::task::endpoint_task::EndpointReservationTask;
use crate::domain::scheduler::task::reservation_task::ReservationTask;
use crate::domain::scheduler::task::resource_task::ResourceReservationTask;
use crate::domain::scheduler::task::room_task::RoomReservationTask;
use crate::domain::scheduler::task::value_task::ValueReservationTask;
use crate::domain::utils::interval::Interval;

/// Slot in which `specification` is actually allocated. Rooms are extended by their
/// setup and teardown minutes.
pub fn get_allocation_slot(specification: &Specification, slot: Interval) -> Interval {
    match specification {
        Specification::Room(room) => slot.extend(room.slot_minutes_before * MINUTE_IN_MS, room.slot_minutes_after * MINUTE_IN_MS),
        _ => slot,
    }
}

/// Creates the task allocating `specification` in `slot`.
pub fn create_reservation_task(specification: &Specification, slot: Interval) -> Box<dyn ReservationTask> {
    match specification {
        Specification::Resource { resource } => Box::new(ResourceReservationTask::new(slot, resource.clone())),
        Specification::Room(room) => Box::new(RoomReservationTask::from_specification(get_allocation_slot(specification, slot), room)),
        Specification::Alias(alias) => Box::new(AliasReservationTask::from_specification(slot, alias)),
        Specification::AliasSet(alias_set) => Box::new(AliasSetReservationTask::new(slot, alias_set.clone())),
        Specification::Compartment(compartment) => Box::new(CompartmentReservationTask::new(slot, compartment.clone())),
        Specification::Value { value_provider, value } => Box::new(ValueReservationTask::new(slot, value_provider.clone(), value.clone())),
        Specification::ExistingEndpoint { resource } => Box::new(EndpointReservationTask::existing(slot, resource.clone())),
        Specification::LookupEndpoint { technologies } => Box::new(EndpointReservationTask::lookup(slot, technologies.clone())),
    }
}
