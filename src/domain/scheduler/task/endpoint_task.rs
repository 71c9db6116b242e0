use std::collections::BTreeSet;

use crate::domain::reservation::executable::{Endpoint, EndpointKind};
use crate::domain::reservation::reservation::ReservationKind;
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::resource::capability::{CapabilityKind, CapabilityType};
use crate::domain::scheduler::context::SchedulerContext;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::reservation_task::{ReservationTask, TaskBase};
use crate::domain::scheduler::task::resource_task::ResourceReservationTask;
use crate::domain::technology::{CallInitiation, Technology};
use crate::domain::utils::id::ResourceId;
use crate::domain::utils::interval::Interval;
use crate::error::Error;

#[derive(Debug, Clone)]
enum EndpointTarget {
    Existing(ResourceId),
    Lookup(BTreeSet<Technology>),
}

/// Allocates a managed terminal, either a given one or any available one supporting
/// the requested technologies.
#[derive(Debug)]
pub struct EndpointReservationTask {
    base: TaskBase,
    target: EndpointTarget,
}

impl EndpointReservationTask {
    pub fn existing(slot: Interval, resource: ResourceId) -> EndpointReservationTask {
        EndpointReservationTask { base: TaskBase::new(slot), target: EndpointTarget::Existing(resource) }
    }

    pub fn lookup(slot: Interval, technologies: BTreeSet<Technology>) -> EndpointReservationTask {
        EndpointReservationTask { base: TaskBase::new(slot), target: EndpointTarget::Lookup(technologies) }
    }

    /// Terminals supporting all of `technologies`, in declaration order of resources.
    fn find_terminals(context: &SchedulerContext<'_>, technologies: &BTreeSet<Technology>) -> Vec<ResourceId> {
        let resources = context.get_cache().get_resources();
        resources
            .capabilities_of_type(CapabilityType::Terminal)
            .into_iter()
            .filter_map(|capability| resources.get(&capability.resource))
            .filter(|resource| technologies.is_subset(&resource.get_technologies()))
            .map(|resource| resource.id.clone())
            .collect()
    }

    fn perform_resource_task(&mut self, context: &mut SchedulerContext<'_>, resource: ResourceId) -> Result<ReservationId, SchedulerError> {
        let mut resource_task = ResourceReservationTask::new_endpoint(self.base.slot, resource);
        let reservation = resource_task.perform(context)?;
        self.base.add_reports(resource_task.get_base_mut().take_reports());
        Ok(reservation)
    }
}

impl ReservationTask for EndpointReservationTask {
    fn get_base(&self) -> &TaskBase {
        &self.base
    }

    fn get_base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn allocate_reservation(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError> {
        let technologies = match &self.target {
            EndpointTarget::Existing(resource) => return self.perform_resource_task(context, resource.clone()),
            EndpointTarget::Lookup(technologies) => technologies.clone(),
        };

        self.base.begin_report(SchedulerReport::new(ReportKind::FindingAvailableResource));
        for resource in Self::find_terminals(context, &technologies) {
            let savepoint = context.create_savepoint();
            match self.perform_resource_task(context, resource.clone()) {
                Ok(reservation) => {
                    context.destroy(savepoint);
                    self.base.end_report();
                    return Ok(reservation);
                }
                Err(error) => {
                    log::debug!("Terminal '{}' cannot be allocated, trying next one.", resource);
                    context.revert(savepoint)?;
                    self.base.add_error_report(&error);
                }
            }
        }
        self.base.end_report();
        Err(SchedulerError::new(ReportKind::EndpointNotFound { technologies }))
    }
}

/// Builds the compartment endpoint for an allocated terminal reservation.
pub fn create_resource_endpoint(context: &SchedulerContext<'_>, reservation: ReservationId, call_initiation: Option<CallInitiation>) -> crate::error::Result<Endpoint> {
    let target = context.get_reservation(context.get_target(reservation))?;
    let resource = match &target.kind {
        ReservationKind::Endpoint { resource } | ReservationKind::Resource { resource } => resource,
        _ => return Err(Error::InvalidState("Endpoint reservation was expected.".to_string())),
    };
    let resources = context.get_cache().get_resources();
    let resource = resources.resource(resource)?;
    let (aliases, standalone) = match resources.resource_capability(&resource.id, CapabilityType::Terminal).map(|capability| &capability.kind) {
        Some(CapabilityKind::Terminal { aliases, standalone }) => (aliases.clone(), *standalone),
        _ => (Vec::new(), false),
    };
    Ok(Endpoint {
        kind: EndpointKind::Resource(resource.id.clone()),
        technologies: resource.get_technologies(),
        count: 1,
        standalone,
        aliases,
        assigned_aliases: Vec::new(),
        call_initiation,
        address: resource.device.as_ref().and_then(|device| device.address.clone()),
        preferred_technology: resource.get_preferred_technology(),
    })
}
