use serde::Deserialize;
use std::cmp::Ordering;

use crate::domain::request::specification::Specification;
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::utils::id::{ReservationRequestId, ReservationRequestSetId, UserId};
use crate::domain::utils::interval::{INFINITE_END, Interval};
use crate::error::{Error, Result};

/// Why a reservation request is made. The purpose decides which restrictions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationRequestPurpose {
    Science,
    Education,
    /// Resource owner books the resource for themselves.
    Owner,
    /// Resource owner blocks the resource for maintenance.
    Maintenance,
}

impl ReservationRequestPurpose {
    /// Owner-only purposes may allocate just the resources owned by the requesting user.
    pub fn is_by_owner(&self) -> bool {
        matches!(self, ReservationRequestPurpose::Owner | ReservationRequestPurpose::Maintenance)
    }

    /// Whether executables (rooms, compartments) are created for the allocation.
    pub fn is_executable_allowed(&self) -> bool {
        !self.is_by_owner()
    }

    /// Order in which purposes are scheduled when requests have the same priority.
    pub fn priority_compare(&self, other: &ReservationRequestPurpose) -> Ordering {
        self.get_scheduling_rank().cmp(&other.get_scheduling_rank())
    }

    fn get_scheduling_rank(&self) -> u8 {
        match self {
            ReservationRequestPurpose::Maintenance => 0,
            ReservationRequestPurpose::Owner => 1,
            ReservationRequestPurpose::Science | ReservationRequestPurpose::Education => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationState {
    NotAllocated,
    Allocated,
    AllocationFailed,
}

/// Whether other reservation requests may reuse the allocation of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationRequestReusement {
    #[default]
    None,
    /// Any reservation request may reuse the allocation.
    Arbitrary,
    /// Only requests of the same owner may reuse the allocation.
    Owned,
}

impl ReservationRequestReusement {
    /// Whether `user` may reuse an allocation owned by `owner`.
    pub fn allows(&self, owner: &UserId, user: &UserId) -> bool {
        match self {
            ReservationRequestReusement::None => false,
            ReservationRequestReusement::Arbitrary => true,
            ReservationRequestReusement::Owned => owner == user,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationRequestState {
    Active,
    /// Request was deleted, its reservations are removed by the next scheduler pass.
    Deleted,
}

/// Reservations allocated for one reservation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// Top reservations of the allocation, ordered by slot start.
    pub reservations: Vec<ReservationId>,
}

impl Allocation {
    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}

/// Demand for the allocation of a [`Specification`] in a single time slot.
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    /// **Unique identifier** of the reservation request.
    pub id: ReservationRequestId,

    /// The **requested time slot**.
    pub slot: Interval,

    pub specification: Specification,

    pub purpose: ReservationRequestPurpose,

    /// Requests with greater priority may cause reallocation of requests with lower priority.
    pub priority: i32,

    /// The **user** who created the request.
    pub user_id: UserId,

    /// Creation time (ms), used for ordering requests of the same priority.
    pub created_at: i64,

    pub description: Option<String>,

    pub state: ReservationRequestState,

    pub allocation_state: AllocationState,

    /// Rendered scheduler report of the last allocation attempt.
    pub allocation_report: Option<String>,

    pub allocation: Allocation,

    /// Whether other requests may reuse [`ReservationRequest::allocation`].
    pub reusement: ReservationRequestReusement,

    /// Allocation of another request which is reused by this request.
    pub reused_allocation: Option<ReservationRequestId>,

    /// Fail the allocation when nothing from `reused_allocation` was actually reused.
    pub reused_allocation_mandatory: bool,

    /// Set from which the request was created by the preprocessor.
    pub parent_set: Option<ReservationRequestSetId>,
}

impl ReservationRequest {
    pub fn new(id: impl Into<ReservationRequestId>, slot: Interval, specification: Specification) -> ReservationRequest {
        ReservationRequest {
            id: id.into(),
            slot,
            specification,
            purpose: ReservationRequestPurpose::Science,
            priority: 0,
            user_id: UserId::new("0"),
            created_at: 0,
            description: None,
            state: ReservationRequestState::Active,
            allocation_state: AllocationState::NotAllocated,
            allocation_report: None,
            allocation: Allocation::default(),
            reusement: ReservationRequestReusement::None,
            reused_allocation: None,
            reused_allocation_mandatory: false,
            parent_set: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ReservationRequestState::Active
    }

    /// Requests which must be processed by the next scheduler pass.
    pub fn is_complete_and_not_allocated(&self) -> bool {
        self.is_active() && self.allocation_state == AllocationState::NotAllocated
    }

    /// Marks the request for reallocation by the next scheduler pass.
    pub fn clear_state(&mut self) {
        self.allocation_state = AllocationState::NotAllocated;
        self.allocation_report = None;
    }
}

/// Slot of a [`ReservationRequestSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetSlot {
    Absolute(Interval),
    /// Slot repeated every `period` ms starting at `start` until `end` (inclusive).
    Periodic { start: i64, period: i64, duration: i64, end: Option<i64> },
}

impl SetSlot {
    /// Enumerates the slots which intersect `interval`.
    pub fn enumerate(&self, interval: &Interval) -> Result<Vec<Interval>> {
        match self {
            SetSlot::Absolute(slot) => Ok(if slot.overlaps(interval) || interval.contains(slot) { vec![*slot] } else { Vec::new() }),
            SetSlot::Periodic { start, period, duration, end } => {
                if *period <= 0 || *duration < 0 {
                    return Err(Error::ModelConstructionError(format!("Invalid periodic slot (period {} ms, duration {} ms).", period, duration)));
                }
                if end.is_none() && interval.end == INFINITE_END {
                    return Err(Error::ModelConstructionError("Periodic slot without an end cannot be enumerated in an unbounded interval.".to_string()));
                }
                let mut slots = Vec::new();
                let mut occurrence = *start;
                // Skip whole periods before the interval.
                if occurrence.saturating_add(*duration) <= interval.start {
                    let skipped = (interval.start - occurrence - duration) / period;
                    occurrence += skipped * period;
                }
                while occurrence < interval.end {
                    if let Some(end) = end {
                        if occurrence > *end {
                            break;
                        }
                    }
                    let slot = Interval::new(occurrence, occurrence.saturating_add(*duration))?;
                    if slot.overlaps(interval) {
                        slots.push(slot);
                    }
                    occurrence = occurrence.saturating_add(*period);
                }
                Ok(slots)
            }
        }
    }
}

/// Reservation request for several slots which the preprocessor expands into
/// child [`ReservationRequest`]s.
#[derive(Debug, Clone)]
pub struct ReservationRequestSet {
    /// **Unique identifier** of the set.
    pub id: ReservationRequestSetId,

    pub slots: Vec<SetSlot>,

    pub specification: Specification,

    pub purpose: ReservationRequestPurpose,

    pub priority: i32,

    pub user_id: UserId,

    pub created_at: i64,

    pub description: Option<String>,

    pub state: ReservationRequestState,

    /// Child reservation requests created by the preprocessor.
    pub children: Vec<ReservationRequestId>,
}

impl ReservationRequestSet {
    pub fn new(id: impl Into<ReservationRequestSetId>, slots: Vec<SetSlot>, specification: Specification) -> ReservationRequestSet {
        ReservationRequestSet {
            id: id.into(),
            slots,
            specification,
            purpose: ReservationRequestPurpose::Science,
            priority: 0,
            user_id: UserId::new("0"),
            created_at: 0,
            description: None,
            state: ReservationRequestState::Active,
            children: Vec::new(),
        }
    }

    /// Every slot of the set intersecting `interval`, ordered by start.
    pub fn enumerate_slots(&self, interval: &Interval) -> Result<Vec<Interval>> {
        let mut slots = Vec::new();
        for slot in &self.slots {
            slots.extend(slot.enumerate(interval)?);
        }
        slots.sort_by_key(|slot| (slot.start, slot.end));
        slots.dedup();
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3_600_000;
    const DAY: i64 = 24 * HOUR;

    #[test]
    fn test_periodic_slot_enumeration() {
        let slot = SetSlot::Periodic { start: 0, period: DAY, duration: 2 * HOUR, end: Some(3 * DAY) };
        let slots = slot.enumerate(&Interval::new(DAY + HOUR, 10 * DAY).unwrap()).unwrap();
        let starts: Vec<i64> = slots.iter().map(|slot| slot.start).collect();
        assert_eq!(starts, vec![DAY, 2 * DAY, 3 * DAY], "Occurrences overlapping the interval up to the end date are expected.");
    }

    #[test]
    fn test_invalid_periodic_slot() {
        let slot = SetSlot::Periodic { start: 0, period: 0, duration: HOUR, end: None };
        assert!(slot.enumerate(&Interval::new(0, DAY).unwrap()).is_err());
    }

    #[test]
    fn test_purpose_order() {
        assert_eq!(ReservationRequestPurpose::Maintenance.priority_compare(&ReservationRequestPurpose::Science), Ordering::Less);
        assert!(ReservationRequestPurpose::Owner.is_by_owner());
        assert!(ReservationRequestPurpose::Education.is_executable_allowed());
    }
}
