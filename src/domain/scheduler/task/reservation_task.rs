use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::scheduler::context::SchedulerContext;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::utils::interval::Interval;

/// State shared by every [`ReservationTask`]: the slot, allocated child reservations and
/// the report tree which is being built.
#[derive(Debug, Clone)]
pub struct TaskBase {
    /// The **time slot** which is allocated by the task.
    pub slot: Interval,

    /// Reservations allocated by child tasks, attached under the task's reservation
    /// once it is created.
    pub child_reservations: Vec<ReservationId>,

    /// Finished top-level reports.
    reports: Vec<SchedulerReport>,

    /// Stack of reports which are still open. New reports go under the top one.
    active_reports: Vec<SchedulerReport>,
}

impl TaskBase {
    pub fn new(slot: Interval) -> TaskBase {
        TaskBase { slot, child_reservations: Vec::new(), reports: Vec::new(), active_reports: Vec::new() }
    }

    pub fn add_report(&mut self, report: SchedulerReport) {
        match self.active_reports.last_mut() {
            Some(active) => active.add_child(report),
            None => self.reports.push(report),
        }
    }

    pub fn add_reports(&mut self, reports: Vec<SchedulerReport>) {
        for report in reports {
            self.add_report(report);
        }
    }

    /// Adds the report explaining a failure (if the error carries one).
    pub fn add_error_report(&mut self, error: &SchedulerError) {
        if let Some(report) = error.get_report() {
            self.add_report(report.clone());
        }
    }

    pub fn begin_report(&mut self, report: SchedulerReport) {
        self.active_reports.push(report);
    }

    pub fn end_report(&mut self) {
        if let Some(report) = self.active_reports.pop() {
            self.add_report(report);
        }
    }

    /// Closes the current report with the failure which ended it.
    pub fn end_report_error(&mut self, error: &SchedulerError) {
        self.add_error_report(error);
        self.end_report();
    }

    pub fn get_reports(&self) -> &[SchedulerReport] {
        &self.reports
    }

    pub fn take_reports(&mut self) -> Vec<SchedulerReport> {
        std::mem::take(&mut self.reports)
    }

    fn active_depth(&self) -> usize {
        self.active_reports.len()
    }

    fn close_reports(&mut self, depth: usize) {
        while self.active_reports.len() > depth {
            self.end_report();
        }
    }

    /// Forgets child reservations allocated by an attempt which was reverted.
    pub fn truncate_child_reservations(&mut self, len: usize) {
        self.child_reservations.truncate(len);
    }

    /// Rejects slots longer than the configured maximum duration.
    pub fn check_maximum_duration(&self, context: &SchedulerContext<'_>) -> Result<(), SchedulerError> {
        if !context.is_maximum_future_and_duration_restricted() {
            return Ok(());
        }
        if let Some(max_duration) = context.get_config().maximum_duration_ms {
            if self.slot.is_longer_than(max_duration) {
                return Err(SchedulerError::new(ReportKind::MaximumDurationExceeded { duration: self.slot.duration(), max_duration }));
            }
        }
        Ok(())
    }

    /// Performs `child` and takes over its reports and its reservation.
    ///
    /// # Errors
    /// The child's failure is returned untouched; the caller decides whether the report
    /// is kept (see [`TaskBase::add_error_report`]) or left to `perform`.
    pub fn add_child_task(&mut self, context: &mut SchedulerContext<'_>, child: &mut dyn ReservationTask) -> Result<ReservationId, SchedulerError> {
        let reservation = child.perform(context)?;
        let reports = child.get_base_mut().take_reports();
        self.add_reports(reports);
        self.child_reservations.push(reservation);
        Ok(reservation)
    }
}

/// Task which resolves a specification into a [`Reservation`](crate::domain::reservation::reservation::Reservation)
/// tree for its slot.
pub trait ReservationTask {
    fn get_base(&self) -> &TaskBase;

    fn get_base_mut(&mut self) -> &mut TaskBase;

    fn get_slot(&self) -> Interval {
        self.get_base().slot
    }

    /// Report which wraps everything the task reports.
    fn create_main_report(&self, _context: &SchedulerContext<'_>) -> Option<SchedulerReport> {
        None
    }

    /// Allocates the reservation. Child reservations collected in
    /// [`TaskBase::child_reservations`] are attached by [`ReservationTask::perform`].
    fn allocate_reservation(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError>;

    fn validate_reservation(&mut self, _context: &mut SchedulerContext<'_>, _reservation: ReservationId) -> Result<(), SchedulerError> {
        Ok(())
    }

    /// Links the `new` reservation to the `old` one of the same reservation request which it
    /// replaces.
    fn migrate_reservation(&mut self, _context: &mut SchedulerContext<'_>, _old: ReservationId, _new: ReservationId) -> Result<(), SchedulerError> {
        Ok(())
    }

    /// Runs the task.
    ///
    /// On success the allocated reservation gets its children and is registered as
    /// allocated in the context. On failure the returned error carries the main report of
    /// the task with everything reported under it.
    fn perform(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError> {
        let depth = self.get_base().active_depth();
        let main_report = self.create_main_report(context);
        let has_main_report = main_report.is_some();
        if let Some(main_report) = main_report {
            self.get_base_mut().begin_report(main_report);
        }

        let result = self.allocate_reservation(context).and_then(|reservation| {
            self.validate_reservation(context, reservation)?;
            Ok(reservation)
        });

        match result {
            Ok(reservation) => {
                self.get_base_mut().close_reports(depth);
                let children = self.get_base().child_reservations.clone();
                for child in children {
                    context.add_child_reservation(reservation, child)?;
                }
                context.add_allocated_reservation(reservation)?;
                Ok(reservation)
            }
            Err(error) => {
                let base = self.get_base_mut();
                base.add_error_report(&error);
                if has_main_report {
                    base.close_reports(depth + 1);
                    return match base.active_reports.pop() {
                        Some(main_report) => Err(SchedulerError::from_report(main_report)),
                        None => Err(error),
                    };
                }
                base.close_reports(depth);
                match base.reports.pop() {
                    Some(report) => Err(SchedulerError::from_report(report)),
                    None => Err(error),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_stack() {
        let mut base = TaskBase::new(Interval::new(0, 10).unwrap());
        base.begin_report(SchedulerReport::new(ReportKind::FindingAvailableResource));
        base.add_report(SchedulerReport::new(ReportKind::ResourceNotFound));
        base.end_report();
        base.add_report(SchedulerReport::new(ReportKind::SortingResources));

        let reports = base.take_reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].children.len(), 1, "Report added while another is open must become its child.");
        assert!(base.get_reports().is_empty());
    }
}
