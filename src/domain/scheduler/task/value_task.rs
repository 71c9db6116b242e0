use std::collections::BTreeSet;

use crate::domain::reservation::available_reservation::{AvailableReservation, AvailableReservationType};
use crate::domain::reservation::reservation::{ObjectKey, Reservation, ReservationKind};
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::scheduler::context::SchedulerContext;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::reservation_task::{ReservationTask, TaskBase};
use crate::domain::utils::id::ValueProviderId;
use crate::domain::utils::interval::Interval;
use crate::domain::value::value_provider::ValueError;

/// Allocates a single value from a value provider.
///
/// Filtered providers pass the requested value through their filter and allocate it in
/// the value space of their target provider.
#[derive(Debug)]
pub struct ValueReservationTask {
    base: TaskBase,
    value_provider: ValueProviderId,
    requested_value: Option<String>,
}

impl ValueReservationTask {
    pub fn new(slot: Interval, value_provider: ValueProviderId, requested_value: Option<String>) -> ValueReservationTask {
        ValueReservationTask { base: TaskBase::new(slot), value_provider, requested_value }
    }

    fn sort_available_reservations(&self, available_reservations: &mut [AvailableReservation]) {
        let slot = self.base.slot;
        // Reservations covering the whole slot first, then reallocatable ones.
        available_reservations.sort_by_key(|available| {
            (!available.original_slot.contains(&slot), !available.is_type(AvailableReservationType::Reallocatable))
        });
    }

    fn get_used_values(&self, context: &SchedulerContext<'_>, value_provider: &ValueProviderId) -> BTreeSet<String> {
        let reservations = context.list_reservations(&ObjectKey::ValueProvider(value_provider.clone()), &self.base.slot);
        reservations
            .into_iter()
            .filter_map(|reservation| context.get_cache().reservations().get(reservation))
            .filter_map(|reservation| reservation.get_value().map(str::to_string))
            .collect()
    }
}

impl ReservationTask for ValueReservationTask {
    fn get_base(&self) -> &TaskBase {
        &self.base
    }

    fn get_base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn create_main_report(&self, context: &SchedulerContext<'_>) -> Option<SchedulerReport> {
        let cache = context.get_cache();
        let resource = cache
            .get_target_value_provider(&self.value_provider)
            .and_then(|value_provider| cache.get_capability(&value_provider.capability))
            .map(|capability| capability.resource.clone())
            .ok()?;
        Some(SchedulerReport::new(ReportKind::AllocatingValue { resource }))
    }

    fn allocate_reservation(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError> {
        let slot = self.base.slot;
        let value_provider = context.get_cache().get_value_provider(&self.value_provider)?.clone();
        let target_value_provider = context.get_cache().get_target_value_provider(&self.value_provider)?.clone();

        let capability = context.get_cache().get_capability(&value_provider.capability)?.clone();
        context.check_capability_available(&capability, &slot, &mut self.base)?;
        if target_value_provider.id != value_provider.id {
            let capability = context.get_cache().get_capability(&target_value_provider.capability)?.clone();
            context.check_capability_available(&capability, &slot, &mut self.base)?;
        }

        let requested_value = self.requested_value.as_ref().map(|value| value_provider.filter_value(value));
        let used_values = self.get_used_values(context, &target_value_provider.id);

        let mut available_reservations = context.get_available_reservations(&ObjectKey::ValueProvider(target_value_provider.id.clone()), &slot);
        self.sort_available_reservations(&mut available_reservations);

        let mut value = None;
        for available in available_reservations {
            let available_value = match context.get_reservation(available.target)?.get_value() {
                Some(available_value) => available_value.to_string(),
                None => continue,
            };
            if requested_value.as_ref().is_some_and(|requested_value| *requested_value != available_value) {
                continue;
            }
            match available.available_type {
                AvailableReservationType::Reusable => {
                    if !available.original_slot.contains(&slot) {
                        continue;
                    }
                    context.remove_available_reservation(available.original)?;
                    let reservation_request = context.get_reservation_request_of(available.original).map(|reservation_request| reservation_request.id.clone());
                    self.base.add_report(SchedulerReport::new(ReportKind::ReservationReusing { reservation_request }));
                    let existing = Reservation::new(slot, ReservationKind::Existing { reused: available.original });
                    return Ok(context.create_reservation(existing));
                }
                AvailableReservationType::Reallocatable => {
                    // The old value stays with the request when it is still free.
                    if used_values.contains(&available_value) {
                        continue;
                    }
                    value = Some(available_value);
                    break;
                }
            }
        }

        let value = match value {
            Some(value) => value,
            None => {
                let generated = match &requested_value {
                    Some(requested_value) => target_value_provider.generate_requested_value(&used_values, requested_value),
                    None => target_value_provider.generate_value(&used_values),
                };
                match generated {
                    Ok(value) => value,
                    Err(ValueError::InvalidValue(_)) => {
                        let value = self.requested_value.clone().unwrap_or_default();
                        return Err(SchedulerError::new(ReportKind::ValueInvalid { value }));
                    }
                    Err(ValueError::ValueAlreadyAllocated(value)) => {
                        return Err(SchedulerError::new(ReportKind::ValueAlreadyAllocated { value, interval: slot }));
                    }
                    Err(ValueError::NoAvailableValue) => return Err(SchedulerError::new(ReportKind::ValueNotAvailable)),
                }
            }
        };

        log::debug!("Allocated value '{}' from value provider '{}' for {}.", value, target_value_provider.id, slot);
        let resource = context.get_cache().get_capability(&target_value_provider.capability)?.resource.clone();
        let requested_value = if value_provider.is_filtered() { self.requested_value.clone() } else { None };
        let reservation = Reservation::new(
            slot,
            ReservationKind::Value { resource, value_provider: target_value_provider.id.clone(), value, requested_value },
        );
        Ok(context.create_reservation(reservation))
    }
}
