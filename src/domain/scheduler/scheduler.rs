use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};

use crate::config::SchedulerConfig;
use crate::domain::cache::cache::Cache;
use crate::domain::request::reservation_request::{AllocationState, ReservationRequest, ReservationRequestState};
use crate::domain::reservation::available_reservation::AvailableReservationType;
use crate::domain::reservation::reservation::ReservationKind;
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::scheduler::context::{SchedulerContext, SchedulerContextResult};
use crate::domain::scheduler::notification::{Notification, NotificationExecutor};
use crate::domain::scheduler::persistence::Persistence;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::{create_reservation_task, get_allocation_slot};
use crate::domain::utils::id::ReservationRequestId;
use crate::domain::utils::interval::Interval;
use crate::error::{Error, Result};

/// Counters of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerResult {
    /// Reservation requests whose allocation failed.
    pub failed: usize,

    /// Reservation requests which were allocated.
    pub allocated: usize,

    /// Top reservations which were deleted.
    pub deleted: usize,
}

impl SchedulerResult {
    pub fn is_empty(&self) -> bool {
        self.failed == 0 && self.allocated == 0 && self.deleted == 0
    }
}

/// Allocation of a single reservation request which is applied once its pass finishes.
#[derive(Debug)]
struct AllocatedRequest {
    reservation_request: ReservationRequestId,

    /// New top reservation.
    reservation: ReservationId,

    /// Reservations of the allocation after the pass, including kept history.
    allocation: Vec<ReservationId>,

    /// History reservations whose slot end must be moved to the given time.
    shortened: Vec<(ReservationId, i64)>,

    reports: Vec<SchedulerReport>,
}

/// Everything a successful pass allocated.
#[derive(Debug, Default)]
struct SchedulingPass {
    allocated: Vec<AllocatedRequest>,

    /// Requests which lost their reservations to the pass and must be allocated again.
    forced: Vec<ReservationRequestId>,
}

/// Allocates reservation requests into reservations.
///
/// A run first deletes reservations of deleted reservation requests and then allocates
/// every active request which is not allocated and whose slot intersects the interval.
/// Each request is allocated in its own [`SchedulerContext`]; a failure only marks that
/// request as failed.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Scheduler {
        Scheduler { config }
    }

    pub fn get_config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn run(&self, interval: &Interval, cache: &mut Cache, persistence: &mut dyn Persistence, notification_executor: &mut dyn NotificationExecutor) -> Result<SchedulerResult> {
        log::debug!("Running scheduler for interval {}...", interval);
        let mut result = SchedulerResult::default();
        let minimum_date_time = interval.start;

        self.delete_reservation_requests(cache, persistence, notification_executor, &mut result)?;

        let mut reservation_requests: Vec<&ReservationRequest> = persistence
            .list_reservation_requests()
            .into_iter()
            .filter(|reservation_request| reservation_request.is_complete_and_not_allocated() && reservation_request.slot.overlaps(interval))
            .collect();
        reservation_requests.sort_by(|first, second| compare_reservation_requests(first, second));
        let mut queue: VecDeque<ReservationRequestId> = reservation_requests.into_iter().map(|reservation_request| reservation_request.id.clone()).collect();

        while let Some(id) = queue.pop_front() {
            let reservation_request = match persistence.get_reservation_request(&id) {
                Some(reservation_request) if reservation_request.is_complete_and_not_allocated() => reservation_request.clone(),
                _ => continue,
            };
            log::info!("Allocating reservation request '{}'...", id);

            let mut context = SchedulerContext::new(cache, &*persistence, &self.config, minimum_date_time);
            match self.allocate_pass(&mut context, &reservation_request) {
                Ok(pass) => {
                    let allocated: Vec<ReservationId> = pass.allocated.iter().map(|allocated| allocated.reservation).collect();
                    let context_result = context.finish(&allocated);
                    self.apply_pass(cache, persistence, notification_executor, pass, context_result, &mut queue, &mut result)?;
                    result.allocated += 1;
                }
                Err(error) => {
                    context.discard();
                    result.failed += 1;
                    let report = self.render_error(&error);
                    log::warn!("Allocation of reservation request '{}' failed:\n{}", id, report);
                    let reservation_request = persistence.reservation_request_mut(&id)?;
                    reservation_request.allocation_state = AllocationState::AllocationFailed;
                    reservation_request.allocation_report = Some(report.clone());
                    if self.config.notifications_enabled {
                        notification_executor.execute_notification(&Notification::AllocationFailed { reservation_request: id, report });
                    }
                }
            }
        }

        if !result.is_empty() {
            log::info!("Scheduling done (failed: {}, allocated: {}, deleted: {}).", result.failed, result.allocated, result.deleted);
        }
        Ok(result)
    }

    /// Allocates the request and then the requests whose reallocation it caused.
    fn allocate_pass(&self, context: &mut SchedulerContext<'_>, reservation_request: &ReservationRequest) -> std::result::Result<SchedulingPass, SchedulerError> {
        let mut pass = SchedulingPass::default();
        pass.allocated.push(self.allocate_reservation_request(context, reservation_request)?);

        context.get_state_mut().enable_notifications(false);
        let mut index = 0;
        while index < context.get_state().get_try_reallocation().len() {
            let id = context.get_state().get_try_reallocation()[index].clone();
            index += 1;
            let reservation_request_to_reallocate = match context.get_persistence().get_reservation_request(&id) {
                Some(reservation_request) if reservation_request.is_active() => reservation_request,
                _ => continue,
            };
            log::debug!("Reallocating reservation request '{}'...", id);
            match self.allocate_reservation_request(context, reservation_request_to_reallocate) {
                Ok(allocated) => pass.allocated.push(allocated),
                Err(error) => {
                    let mut report = SchedulerReport::new(ReportKind::ReallocatingReservationRequest { reservation_request: id });
                    if let Some(child) = error.report {
                        report.add_child(child);
                    }
                    return Err(SchedulerError::from_report(report));
                }
            }
        }
        context.get_state_mut().enable_notifications(true);

        for id in context.get_state().get_force_reallocation().to_vec() {
            let persistence = context.get_persistence();
            if let Some(reservation_request) = persistence.get_reservation_request(&id) {
                for reservation in &reservation_request.allocation.reservations {
                    context.get_state_mut().add_reservation_to_delete(*reservation);
                }
                pass.forced.push(id);
            }
        }
        Ok(pass)
    }

    fn allocate_reservation_request(&self, context: &mut SchedulerContext<'_>, reservation_request: &ReservationRequest) -> std::result::Result<AllocatedRequest, SchedulerError> {
        let minimum_date_time = context.get_minimum_date_time();
        context.get_state_mut().clear_referenced_resources()?;
        context.set_reservation_request(reservation_request);

        let mut slot = reservation_request.slot;
        if slot.is_before(minimum_date_time) {
            return Err(Error::InvalidState("Requested slot can't entirely belong to history.".to_string()).into());
        }
        if slot.contains_time(minimum_date_time) {
            slot = slot.with_start(minimum_date_time);
        }

        // Active usages of the allocation postpone the slot start, future ones are reallocated.
        let mut slot_start = slot.start;
        let persistence = context.get_persistence();
        for usage in persistence.list_reusing_reservation_requests(&reservation_request.id) {
            let usage = match persistence.get_reservation_request(&usage) {
                Some(usage) if !usage.allocation.is_empty() && usage.slot.overlaps(&slot) => usage,
                _ => continue,
            };
            if usage.slot.start < slot_start && slot_start < usage.slot.end {
                slot_start = usage.slot.end;
            } else {
                context.get_state_mut().try_reservation_request_reallocation(usage.id.clone());
            }
        }
        let slot = slot.with_start(slot_start);
        if slot.is_empty() {
            return Err(Error::InvalidState("Requested slot is occupied by active usages of the allocation.".to_string()).into());
        }

        let specification = &reservation_request.specification;
        let allocation_slot = get_allocation_slot(specification, slot);
        for allocated in &reservation_request.allocation.reservations {
            if context.get_reservation(*allocated)?.slot.overlaps(&allocation_slot) {
                context.add_available_reservation(*allocated, AvailableReservationType::Reallocatable)?;
            }
        }

        let reusable = match &reservation_request.reused_allocation {
            Some(reused) => Some((reused, context.set_reusable_allocation(reused, &slot)?)),
            None => None,
        };

        let mut task = create_reservation_task(specification, slot);
        let reservation = task.perform(context)?;

        if let Some((reused, reusable)) = reusable {
            if reservation_request.reused_allocation_mandatory && !Self::is_reused(context, reusable)? {
                return Err(SchedulerError::new(ReportKind::ReservationWithoutMandatoryUsage { reservation_request: reused.clone() }));
            }
        }

        {
            let created = context.get_created_reservation_mut(reservation)?;
            created.allocation = Some(reservation_request.id.clone());
            created.user_id = Some(reservation_request.user_id.clone());
        }
        let new_slot = context.get_reservation(reservation)?.slot;

        let mut previous: Option<(ReservationId, Interval)> = None;
        let mut allocation = Vec::new();
        let mut shortened = Vec::new();
        for old in &reservation_request.allocation.reservations {
            let (old_slot, is_history) = {
                let old_reservation = context.get_reservation(*old)?;
                (old_reservation.slot, old_reservation.slot.start < minimum_date_time || old_reservation.is_executable_started())
            };
            let replace_previous = match previous {
                None => true,
                Some((_, previous_slot)) => old_slot.end > previous_slot.end || new_slot.overlaps(&old_slot),
            };
            if replace_previous {
                previous = Some((*old, old_slot));
            }
            if is_history {
                if old_slot.end > allocation_slot.start {
                    shortened.push((*old, allocation_slot.start.max(old_slot.start)));
                }
                allocation.push(*old);
            } else {
                context.get_state_mut().add_reservation_to_delete(*old);
            }
        }
        allocation.push(reservation);

        if let Some((previous, _)) = previous {
            if context.get_reservation(previous)?.get_type() == context.get_reservation(reservation)?.get_type() {
                task.migrate_reservation(context, previous, reservation)?;
            }
        }

        let notification = match previous {
            Some(_) => Notification::ReservationModified { reservation_request: reservation_request.id.clone(), slot: new_slot },
            None => Notification::ReservationNew { reservation_request: reservation_request.id.clone(), slot: new_slot },
        };
        context.add_notification(notification)?;

        log::debug!("Reservation request '{}' allocated in {}.", reservation_request.id, new_slot);
        Ok(AllocatedRequest {
            reservation_request: reservation_request.id.clone(),
            reservation,
            allocation,
            shortened,
            reports: task.get_base_mut().take_reports(),
        })
    }

    /// Whether the allocated reservations reuse `reusable` or extend its room.
    fn is_reused(context: &SchedulerContext<'_>, reusable: ReservationId) -> Result<bool> {
        let reusable_executable = context.get_reservation(reusable)?.executable.as_ref().map(|executable| executable.id.clone());
        for allocated in context.get_state().get_allocated_reservations() {
            let reservation = context.get_reservation(allocated)?;
            if let ReservationKind::Existing { reused } = reservation.kind {
                if reused == reusable {
                    return Ok(true);
                }
            }
            let reused_room = reservation.executable.as_ref().and_then(|executable| executable.get_room_endpoint()).and_then(|room| room.reused_room.as_ref());
            if reused_room.is_some() && reused_room == reusable_executable.as_ref() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_pass(
        &self,
        cache: &mut Cache,
        persistence: &mut dyn Persistence,
        notification_executor: &mut dyn NotificationExecutor,
        pass: SchedulingPass,
        context_result: SchedulerContextResult,
        queue: &mut VecDeque<ReservationRequestId>,
        result: &mut SchedulerResult,
    ) -> Result<()> {
        for reservation in &context_result.reservations_to_delete {
            if !cache.reservations().contains(*reservation) {
                continue;
            }
            cache.remove_reservation(*reservation);
            result.deleted += 1;
        }

        for allocated in pass.allocated {
            for (reservation, end) in &allocated.shortened {
                if let Some(reservation) = cache.reservations_mut().get_mut(*reservation) {
                    reservation.slot = reservation.slot.with_end(*end);
                }
            }
            cache.persist_reservation(allocated.reservation)?;

            let mut allocation: Vec<ReservationId> = allocated.allocation.into_iter().filter(|reservation| cache.reservations().contains(*reservation)).collect();
            allocation.sort_by_key(|reservation| cache.reservations().get(*reservation).map(|reservation| reservation.slot.start));

            let report = self.render_reports(&allocated.reports);
            let reservation_request = persistence.reservation_request_mut(&allocated.reservation_request)?;
            reservation_request.allocation.reservations = allocation;
            reservation_request.allocation_state = AllocationState::Allocated;
            reservation_request.allocation_report = report;
        }

        for id in pass.forced {
            log::info!("Reservation request '{}' will be reallocated.", id);
            let reservation_request = persistence.reservation_request_mut(&id)?;
            reservation_request.allocation.reservations.retain(|reservation| cache.reservations().contains(*reservation));
            reservation_request.clear_state();
            queue.push_back(id);
        }

        if self.config.notifications_enabled {
            for notification in &context_result.notifications {
                notification_executor.execute_notification(notification);
            }
        }
        Ok(())
    }

    /// Removes reservations of deleted reservation requests together with the requests.
    fn delete_reservation_requests(&self, cache: &mut Cache, persistence: &mut dyn Persistence, notification_executor: &mut dyn NotificationExecutor, result: &mut SchedulerResult) -> Result<()> {
        let mut deleted: Vec<ReservationRequestId> = persistence
            .list_reservation_requests()
            .into_iter()
            .filter(|reservation_request| !reservation_request.is_active())
            .map(|reservation_request| reservation_request.id.clone())
            .collect();

        // Allocations reused by other deleted requests go last.
        let mut referenced = BTreeSet::new();
        for id in &deleted {
            referenced.extend(Self::get_referenced_reservation_requests(cache, persistence.reservation_request(id)?));
        }
        deleted.sort_by_key(|id| referenced.contains(id));

        for id in deleted {
            let reservations = persistence.reservation_request(&id)?.allocation.reservations.clone();
            for reservation in reservations {
                let slot = match cache.reservations().get(reservation) {
                    Some(reservation) => reservation.slot,
                    None => continue,
                };
                cache.remove_reservation(reservation);
                result.deleted += 1;
                if self.config.notifications_enabled {
                    notification_executor.execute_notification(&Notification::ReservationDeleted { reservation_request: Some(id.clone()), slot });
                }
            }
            persistence.remove_reservation_request(&id);
            log::info!("Reservation request '{}' deleted.", id);
        }

        let sets: Vec<_> = persistence
            .list_reservation_request_sets()
            .into_iter()
            .filter(|reservation_request_set| reservation_request_set.state == ReservationRequestState::Deleted)
            .filter(|reservation_request_set| reservation_request_set.children.iter().all(|child| persistence.get_reservation_request(child).is_none()))
            .map(|reservation_request_set| reservation_request_set.id.clone())
            .collect();
        for id in sets {
            persistence.remove_reservation_request_set(&id);
            log::info!("Reservation request set '{}' deleted.", id);
        }
        Ok(())
    }

    /// Requests whose allocations are reused by the allocation of `reservation_request`.
    fn get_referenced_reservation_requests(cache: &Cache, reservation_request: &ReservationRequest) -> Vec<ReservationRequestId> {
        let reservations = cache.reservations();
        let mut referenced = Vec::new();
        for top in &reservation_request.allocation.reservations {
            for id in reservations.get_set_of_all(*top) {
                if let Some(ReservationKind::Existing { reused }) = reservations.get(id).map(|reservation| &reservation.kind) {
                    let owner = reservations.get(reservations.get_top(*reused)).and_then(|reservation| reservation.allocation.clone());
                    referenced.extend(owner);
                }
            }
        }
        referenced
    }

    fn render_reports(&self, reports: &[SchedulerReport]) -> Option<String> {
        let messages: Vec<String> = reports
            .iter()
            .map(|report| report.get_message(self.config.report_verbosity))
            .filter(|message| !message.is_empty())
            .collect();
        if messages.is_empty() { None } else { Some(messages.join("\n")) }
    }

    fn render_error(&self, error: &SchedulerError) -> String {
        match error.get_report() {
            Some(report) => report.get_message(self.config.report_verbosity),
            None => error.to_string(),
        }
    }
}

/// Order in which reservation requests are allocated: maintenance first, then by
/// priority (greater first), then by creation.
pub fn compare_reservation_requests(first: &ReservationRequest, second: &ReservationRequest) -> Ordering {
    first
        .purpose
        .priority_compare(&second.purpose)
        .then_with(|| second.priority.cmp(&first.priority))
        .then_with(|| first.created_at.cmp(&second.created_at))
        .then_with(|| first.id.cmp(&second.id))
}
