use crate::domain::reservation::available_reservation::AvailableReservationType;
use crate::domain::reservation::reservation::{ObjectKey, Reservation, ReservationKind};
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::resource::capability::CapabilityType;
use crate::domain::scheduler::context::SchedulerContext;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::reservation_task::{ReservationTask, TaskBase};
use crate::domain::utils::id::ResourceId;
use crate::domain::utils::interval::Interval;

/// Allocates a whole resource (and its parent resources which are not yet allocated).
#[derive(Debug)]
pub struct ResourceReservationTask {
    base: TaskBase,
    resource: ResourceId,

    /// Fail with `ResourceNotEndpoint` unless the resource is a terminal.
    endpoint_required: bool,
}

impl ResourceReservationTask {
    pub fn new(slot: Interval, resource: ResourceId) -> ResourceReservationTask {
        ResourceReservationTask { base: TaskBase::new(slot), resource, endpoint_required: false }
    }

    /// Task allocating a terminal which takes part in a compartment.
    pub fn new_endpoint(slot: Interval, resource: ResourceId) -> ResourceReservationTask {
        ResourceReservationTask { base: TaskBase::new(slot), resource, endpoint_required: true }
    }
}

impl ReservationTask for ResourceReservationTask {
    fn get_base(&self) -> &TaskBase {
        &self.base
    }

    fn get_base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn create_main_report(&self, _context: &SchedulerContext<'_>) -> Option<SchedulerReport> {
        Some(SchedulerReport::new(ReportKind::AllocatingResource { resource: self.resource.clone() }))
    }

    fn allocate_reservation(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError> {
        let slot = self.base.slot;
        self.base.check_maximum_duration(context)?;

        let (is_terminal, parent, room_provider) = {
            let resources = context.get_cache().get_resources();
            let resource = resources.resource(&self.resource)?;
            (
                resources.resource_capability(&resource.id, CapabilityType::Terminal).is_some(),
                resource.parent.clone(),
                resources.resource_capability(&resource.id, CapabilityType::RoomProvider).map(|capability| capability.id.clone()),
            )
        };
        if self.endpoint_required && !is_terminal {
            return Err(SchedulerError::new(ReportKind::ResourceNotEndpoint { resource: self.resource.clone() }));
        }
        if context.get_state().contains_referenced_resource(&self.resource) {
            return Err(SchedulerError::new(ReportKind::ResourceMultipleRequested { resource: self.resource.clone() }));
        }

        context.check_resource_available_by_parent(&self.resource, &slot, &mut self.base)?;

        // Reuse an allocation of the resource offered by a reused reservation request.
        let available_reservations = context.get_available_reservations(&ObjectKey::Resource(self.resource.clone()), &slot);
        if let Some(available) = available_reservations
            .into_iter()
            .find(|available| available.is_type(AvailableReservationType::Reusable) && available.original_slot.contains(&slot))
        {
            context.remove_available_reservation(available.original)?;
            context.get_state_mut().add_referenced_resource(self.resource.clone())?;
            let reservation_request = context.get_reservation_request_of(available.original).map(|reservation_request| reservation_request.id.clone());
            self.base.add_report(SchedulerReport::new(ReportKind::ReservationReusing { reservation_request }));
            let existing = Reservation::new(slot, ReservationKind::Existing { reused: available.original });
            return Ok(context.create_reservation(existing));
        }

        // Rooms hosted by the device collide with allocating the whole device.
        if let Some(room_provider) = room_provider {
            let rooms = context.list_reservations(&ObjectKey::RoomProvider(room_provider), &slot);
            context.detect_collisions(&mut self.base, &self.resource, &rooms)?;
        }

        context.get_state_mut().add_referenced_resource(self.resource.clone())?;

        if let Some(parent) = parent {
            if !context.get_state().contains_referenced_resource(&parent) {
                let mut parent_task = ResourceReservationTask::new(slot, parent);
                self.base.add_child_task(context, &mut parent_task)?;
            }
        }

        let kind = if is_terminal {
            ReservationKind::Endpoint { resource: self.resource.clone() }
        } else {
            ReservationKind::Resource { resource: self.resource.clone() }
        };
        log::debug!("Allocated resource '{}' for {}.", self.resource, slot);
        Ok(context.create_reservation(Reservation::new(slot, kind)))
    }
}
