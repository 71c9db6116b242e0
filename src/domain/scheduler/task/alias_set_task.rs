use std::collections::BTreeSet;

use crate::domain::request::specification::AliasSetSpecification;
use crate::domain::reservation::executable::{Executable, ExecutableKind, RoomEndpoint};
use crate::domain::reservation::reservation::{Reservation, ReservationKind};
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::resource::capability::CapabilityType;
use crate::domain::scheduler::context::SchedulerContext;
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::alias_task::AliasReservationTask;
use crate::domain::scheduler::task::reservation_task::{ReservationTask, TaskBase};
use crate::domain::technology::Alias;
use crate::domain::utils::id::ResourceId;
use crate::domain::utils::interval::Interval;

/// Allocates several aliases at once. The result is a plain reservation whose children
/// are the alias reservations.
#[derive(Debug)]
pub struct AliasSetReservationTask {
    base: TaskBase,
    specification: AliasSetSpecification,
}

impl AliasSetReservationTask {
    pub fn new(slot: Interval, specification: AliasSetSpecification) -> AliasSetReservationTask {
        AliasSetReservationTask { base: TaskBase::new(slot), specification }
    }

    /// Room executable holding aliases which were all allocated in one room provider.
    fn create_shared_executable(&self, context: &SchedulerContext<'_>, resource: &ResourceId, aliases: Vec<Alias>) -> Option<Executable> {
        let capability = context.get_cache().get_resources().resource_capability(resource, CapabilityType::RoomProvider)?;
        let technologies: BTreeSet<_> = aliases.iter().map(|alias| alias.technology).collect();
        let room = RoomEndpoint {
            resource: resource.clone(),
            capability: capability.id.clone(),
            technologies,
            license_count: 0,
            aliases,
            reused_room: None,
            migrate_from: None,
        };
        Some(Executable::new(self.base.slot, ExecutableKind::RoomEndpoint(room)))
    }
}

impl ReservationTask for AliasSetReservationTask {
    fn get_base(&self) -> &TaskBase {
        &self.base
    }

    fn get_base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn allocate_reservation(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError> {
        let slot = self.base.slot;
        let mut resources = BTreeSet::new();
        let mut aliases = Vec::new();
        for alias_specification in self.specification.aliases.clone() {
            let mut alias_task = AliasReservationTask::from_specification(slot, &alias_specification);
            let alias_reservation = self.base.add_child_task(context, &mut alias_task)?;
            let target = context.get_reservation(context.get_target(alias_reservation))?;
            if let Some(resource) = target.get_allocated_resource() {
                resources.insert(resource.clone());
            }
            aliases.extend(target.get_aliases().iter().cloned());
        }

        let mut reservation = Reservation::new(slot, ReservationKind::Plain);
        if self.specification.shared_executable && context.is_executable_allowed() && resources.len() == 1 {
            if let Some(resource) = resources.iter().next() {
                reservation.executable = self.create_shared_executable(context, resource, aliases);
            }
        }
        Ok(context.create_reservation(reservation))
    }
}
