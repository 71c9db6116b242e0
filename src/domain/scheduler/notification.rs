use std::fmt;

use crate::domain::utils::id::{ExecutableId, ReservationRequestId, ResourceId};
use crate::domain::utils::interval::Interval;

/// Event produced by a scheduling pass which should be announced to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ReservationNew { reservation_request: ReservationRequestId, slot: Interval },
    ReservationModified { reservation_request: ReservationRequestId, slot: Interval },
    ReservationDeleted { reservation_request: Option<ReservationRequestId>, slot: Interval },
    RoomCreated { resource: ResourceId, executable: ExecutableId, slot: Interval },
    AllocationFailed { reservation_request: ReservationRequestId, report: String },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::ReservationNew { reservation_request, slot } => write!(f, "New reservation for '{}' in {}.", reservation_request, slot),
            Notification::ReservationModified { reservation_request, slot } => write!(f, "Modified reservation for '{}' in {}.", reservation_request, slot),
            Notification::ReservationDeleted { reservation_request: Some(reservation_request), slot } => {
                write!(f, "Deleted reservation for '{}' in {}.", reservation_request, slot)
            }
            Notification::ReservationDeleted { reservation_request: None, slot } => write!(f, "Deleted reservation in {}.", slot),
            Notification::RoomCreated { resource, executable, slot } => write!(f, "Room {} created in '{}' for {}.", executable, resource, slot),
            Notification::AllocationFailed { reservation_request, report } => write!(f, "Allocation of '{}' failed:\n{}", reservation_request, report),
        }
    }
}

/// Receives notifications collected by finished scheduling passes.
pub trait NotificationExecutor {
    fn execute_notification(&mut self, notification: &Notification);
}

/// Writes every notification into the log.
#[derive(Debug, Default)]
pub struct LoggingNotificationExecutor;

impl NotificationExecutor for LoggingNotificationExecutor {
    fn execute_notification(&mut self, notification: &Notification) {
        log::info!("Notification: {}", notification);
    }
}

/// Keeps every notification, used by callers which inspect them afterwards.
#[derive(Debug, Default)]
pub struct CollectingNotificationExecutor {
    pub notifications: Vec<Notification>,
}

impl NotificationExecutor for CollectingNotificationExecutor {
    fn execute_notification(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }
}
