use thiserror::Error;

use crate::domain::scheduler::report::{MessageType, ReportKind, SchedulerReport};
use crate::error::Error;

/// Failure of an allocation, explained by a report tree.
///
/// An error created by [`SchedulerError::current`] carries no report yet; the task which
/// is being performed attaches its own report tree before the error leaves it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.report))]
pub struct SchedulerError {
    pub report: Option<SchedulerReport>,
}

fn render(report: &Option<SchedulerReport>) -> String {
    match report {
        Some(report) => report.get_message(MessageType::User),
        None => "Allocation failed.".to_string(),
    }
}

impl SchedulerError {
    pub fn new(kind: ReportKind) -> SchedulerError {
        SchedulerError { report: Some(SchedulerReport::new(kind)) }
    }

    pub fn from_report(report: SchedulerReport) -> SchedulerError {
        SchedulerError { report: Some(report) }
    }

    /// Failure explained by the report the current task is working on.
    pub fn current() -> SchedulerError {
        SchedulerError { report: None }
    }

    pub fn get_report(&self) -> Option<&SchedulerReport> {
        self.report.as_ref()
    }
}

impl From<ReportKind> for SchedulerError {
    fn from(kind: ReportKind) -> Self {
        SchedulerError::new(kind)
    }
}

impl From<Error> for SchedulerError {
    fn from(error: Error) -> Self {
        SchedulerError::new(ReportKind::Internal { message: error.to_string() })
    }
}
