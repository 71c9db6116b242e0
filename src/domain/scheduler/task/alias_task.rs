use std::collections::BTreeSet;

use crate::domain::request::specification::AliasSpecification;
use crate::domain::reservation::available_reservation::{AvailableReservation, AvailableReservationType};
use crate::domain::reservation::reservation::{ObjectKey, Reservation, ReservationKind};
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::resource::capability::{AliasTemplate, Capability, CapabilityType};
use crate::domain::scheduler::context::SchedulerContext;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::reservation_task::{ReservationTask, TaskBase};
use crate::domain::scheduler::task::value_task::ValueReservationTask;
use crate::domain::technology::{AliasType, Technology};
use crate::domain::utils::id::ResourceId;
use crate::domain::utils::interval::Interval;

/// Extracts the value part of a full alias value by matching it against the templates.
/// Values which match no template are returned unchanged.
pub fn parse_alias_value(templates: &[AliasTemplate], requested_value: &str) -> String {
    for template in templates.iter().filter(|template| template.has_value_placeholder()) {
        let (start, end) = match (template.value.find('{'), template.value.find('}')) {
            (Some(start), Some(end)) if start < end => (start, end),
            _ => continue,
        };
        let prefix = &template.value[..start];
        let suffix = &template.value[end + 1..];
        if requested_value.len() > prefix.len() + suffix.len() && requested_value.starts_with(prefix) && requested_value.ends_with(suffix) {
            return requested_value[prefix.len()..requested_value.len() - suffix.len()].to_string();
        }
    }
    requested_value.to_string()
}

/// Alias provider considered by the [`AliasReservationTask`].
struct AliasProvider {
    capability: Capability,
    requested_value: Option<String>,
    available_reservations: Vec<AvailableReservation>,
}

/// Allocates aliases from one of the matching alias providers.
#[derive(Debug)]
pub struct AliasReservationTask {
    base: TaskBase,
    technologies: BTreeSet<Technology>,
    alias_types: BTreeSet<AliasType>,
    requested_value: Option<String>,

    /// Device for which the aliases are allocated.
    target_resource: Option<ResourceId>,

    /// Resource whose alias providers must be used.
    resource: Option<ResourceId>,
}

impl AliasReservationTask {
    pub fn new(slot: Interval) -> AliasReservationTask {
        AliasReservationTask {
            base: TaskBase::new(slot),
            technologies: BTreeSet::new(),
            alias_types: BTreeSet::new(),
            requested_value: None,
            target_resource: None,
            resource: None,
        }
    }

    pub fn from_specification(slot: Interval, specification: &AliasSpecification) -> AliasReservationTask {
        let mut task = AliasReservationTask::new(slot);
        task.technologies = specification.technologies.clone();
        task.alias_types = specification.alias_types.clone();
        task.requested_value = specification.value.clone();
        task.resource = specification.resource.clone();
        task
    }

    pub fn add_technology(&mut self, technology: Technology) {
        self.technologies.insert(technology);
    }

    pub fn set_technologies(&mut self, technologies: BTreeSet<Technology>) {
        self.technologies = technologies;
    }

    pub fn has_restrictions(&self) -> bool {
        !self.technologies.is_empty() || !self.alias_types.is_empty()
    }

    pub fn set_target_resource(&mut self, target_resource: Option<ResourceId>) {
        self.target_resource = target_resource;
    }

    fn provides_technology(&self, capability: &Capability) -> bool {
        self.technologies.is_empty() || capability.get_alias_templates().iter().any(|template| self.technologies.contains(&template.technology))
    }

    fn provides_alias_type(&self, capability: &Capability) -> bool {
        self.alias_types.is_empty() || capability.get_alias_templates().iter().any(|template| self.alias_types.contains(&template.alias_type))
    }

    fn get_capabilities(&self, context: &SchedulerContext<'_>) -> Vec<Capability> {
        let cache = context.get_cache();
        match &self.resource {
            Some(resource) => cache
                .get_resources()
                .resource_capability(resource, CapabilityType::AliasProvider)
                .into_iter()
                .cloned()
                .collect(),
            None => cache.get_alias_providers().into_iter().cloned().collect(),
        }
    }

    fn get_alias_value(context: &SchedulerContext<'_>, alias_reservation: ReservationId) -> Option<String> {
        let reservation = context.get_reservation(context.get_target(alias_reservation)).ok()?;
        match &reservation.kind {
            ReservationKind::Alias { value_reservation, .. } => {
                let value_reservation = context.get_reservation(context.get_target(*value_reservation)).ok()?;
                value_reservation.get_value().map(str::to_string)
            }
            _ => None,
        }
    }

    fn find_alias_providers(&mut self, context: &mut SchedulerContext<'_>) -> Result<Vec<AliasProvider>, SchedulerError> {
        let slot = self.base.slot;
        let mut alias_providers = Vec::new();
        for capability in self.get_capabilities(context) {
            if capability.is_restricted_to_resource() {
                if let Some(target_resource) = &self.target_resource {
                    if capability.resource != *target_resource {
                        continue;
                    }
                }
            }
            if !self.provides_technology(&capability) || !self.provides_alias_type(&capability) {
                continue;
            }

            let requested_value = self.requested_value.as_ref().map(|value| parse_alias_value(capability.get_alias_templates(), value));
            let mut available_reservations = context.get_available_reservations(&ObjectKey::AliasProvider(capability.id.clone()), &slot);
            available_reservations.sort_by_key(|available| !available.original_slot.contains(&slot));

            self.base.add_report(SchedulerReport::new(ReportKind::Resource { resource: capability.resource.clone() }));
            alias_providers.push(AliasProvider { capability, requested_value, available_reservations });
        }
        if alias_providers.is_empty() {
            return Err(SchedulerError::new(ReportKind::ResourceNotFound));
        }
        Ok(alias_providers)
    }

    /// Reuses an available alias reservation of the provider, if there is a matching one.
    fn reuse_alias(&mut self, context: &mut SchedulerContext<'_>, alias_provider: &AliasProvider) -> Result<Option<ReservationId>, SchedulerError> {
        let slot = self.base.slot;
        for available in &alias_provider.available_reservations {
            if !available.is_type(AvailableReservationType::Reusable) || !available.original_slot.contains(&slot) {
                continue;
            }
            if let Some(requested_value) = &alias_provider.requested_value {
                if Self::get_alias_value(context, available.original).as_ref() != Some(requested_value) {
                    continue;
                }
            }
            context.remove_available_reservation(available.original)?;
            let reservation_request = context.get_reservation_request_of(available.original).map(|reservation_request| reservation_request.id.clone());
            self.base.add_report(SchedulerReport::new(ReportKind::ReservationReusing { reservation_request }));
            let existing = Reservation::new(slot, ReservationKind::Existing { reused: available.original });
            return Ok(Some(context.create_reservation(existing)));
        }
        Ok(None)
    }

    fn allocate_alias(&mut self, context: &mut SchedulerContext<'_>, alias_provider: &AliasProvider) -> Result<ReservationId, SchedulerError> {
        let slot = self.base.slot;
        let capability = &alias_provider.capability;
        let value_provider = match capability.get_value_provider() {
            Some(value_provider) => value_provider.clone(),
            None => return Err(SchedulerError::new(ReportKind::ValueNotAvailable)),
        };

        let mut value_task = ValueReservationTask::new(slot, value_provider, alias_provider.requested_value.clone());
        let value_reservation = self.base.add_child_task(context, &mut value_task)?;
        let value = context.get_reservation(context.get_target(value_reservation))?.get_value().unwrap_or_default().to_string();

        let aliases = capability.get_alias_templates().iter().map(|template| template.evaluate(&value)).collect();
        let reservation = Reservation::new(
            slot,
            ReservationKind::Alias { resource: capability.resource.clone(), capability: capability.id.clone(), value_reservation, aliases },
        );
        Ok(context.create_reservation(reservation))
    }
}

impl ReservationTask for AliasReservationTask {
    fn get_base(&self) -> &TaskBase {
        &self.base
    }

    fn get_base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn create_main_report(&self, _context: &SchedulerContext<'_>) -> Option<SchedulerReport> {
        Some(SchedulerReport::new(ReportKind::AllocatingAlias {
            technologies: self.technologies.clone(),
            alias_types: self.alias_types.clone(),
            value: self.requested_value.clone(),
        }))
    }

    fn allocate_reservation(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError> {
        let slot = self.base.slot;

        self.base.begin_report(SchedulerReport::new(ReportKind::FindingAvailableResource));
        let mut alias_providers = self.find_alias_providers(context)?;
        self.base.end_report();

        // Providers usable for any device are preferred when no device is given.
        self.base.add_report(SchedulerReport::new(ReportKind::SortingResources));
        if self.target_resource.is_none() {
            alias_providers.sort_by_key(|alias_provider| alias_provider.capability.is_restricted_to_resource());
        }

        for alias_provider in &alias_providers {
            self.base.begin_report(SchedulerReport::new(ReportKind::AllocatingResource { resource: alias_provider.capability.resource.clone() }));

            if let Some(reservation) = self.reuse_alias(context, alias_provider)? {
                self.base.end_report();
                return Ok(reservation);
            }

            if let Err(error) = context.check_capability_available(&alias_provider.capability, &slot, &mut self.base) {
                self.base.end_report_error(&error);
                continue;
            }

            let savepoint = context.create_savepoint();
            let child_count = self.base.child_reservations.len();
            match self.allocate_alias(context, alias_provider) {
                Ok(reservation) => {
                    context.destroy(savepoint);
                    self.base.end_report();
                    return Ok(reservation);
                }
                Err(error) => {
                    log::debug!("Alias provider '{}' failed, reverting.", alias_provider.capability.id);
                    context.revert(savepoint)?;
                    self.base.truncate_child_reservations(child_count);
                    self.base.end_report_error(&error);
                }
            }
        }
        Err(SchedulerError::current())
    }
}
