use crate::config::SchedulerConfig;
use crate::domain::request::reservation_request::{ReservationRequest, ReservationRequestSet, ReservationRequestState};
use crate::domain::scheduler::persistence::Persistence;
use crate::domain::utils::id::ReservationRequestId;
use crate::domain::utils::interval::Interval;
use crate::error::Result;

/// Counters of one preprocessor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessorResult {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl PreprocessorResult {
    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.modified == 0 && self.deleted == 0
    }
}

/// Expands reservation request sets into child reservation requests, one per slot.
///
/// Existing children are matched to enumerated slots by their start (within the configured
/// tolerance) and updated in place, so that a set which did not change keeps its allocated
/// children.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: SchedulerConfig,
}

impl Preprocessor {
    pub fn new(config: SchedulerConfig) -> Preprocessor {
        Preprocessor { config }
    }

    pub fn run(&self, interval: &Interval, persistence: &mut dyn Persistence) -> Result<PreprocessorResult> {
        log::debug!("Running preprocessor for interval {}...", interval);
        let mut result = PreprocessorResult::default();

        let reservation_request_sets: Vec<ReservationRequestSet> = persistence
            .list_reservation_request_sets()
            .into_iter()
            .filter(|reservation_request_set| reservation_request_set.state == ReservationRequestState::Active)
            .cloned()
            .collect();
        for reservation_request_set in reservation_request_sets {
            self.process_reservation_request_set(&reservation_request_set, interval, persistence, &mut result)?;
        }

        if !result.is_empty() {
            log::info!("Pre-processing done (created: {}, modified: {}, deleted: {}).", result.created, result.modified, result.deleted);
        }
        Ok(result)
    }

    fn process_reservation_request_set(&self, reservation_request_set: &ReservationRequestSet, interval: &Interval, persistence: &mut dyn Persistence, result: &mut PreprocessorResult) -> Result<()> {
        log::debug!("Pre-processing reservation request set '{}'...", reservation_request_set.id);
        let tolerance = self.config.preprocessor_slot_tolerance_ms;

        // Children of the set in the interval as (id, slot start).
        let mut children: Vec<(ReservationRequestId, i64)> = reservation_request_set
            .children
            .iter()
            .filter_map(|child| persistence.get_reservation_request(child))
            .filter(|child| child.is_active() && child.slot.overlaps(interval))
            .map(|child| (child.id.clone(), child.slot.start))
            .collect();
        let mut created_children = Vec::new();

        for slot in reservation_request_set.enumerate_slots(interval)? {
            let mut best: Option<(usize, i64)> = None;
            for (index, (_, start)) in children.iter().enumerate() {
                let distance = (slot.start - start).abs();
                if distance < tolerance && best.is_none_or(|(_, best_distance)| distance < best_distance) {
                    best = Some((index, distance));
                }
            }

            match best {
                Some((index, _)) => {
                    let (id, _) = children.remove(index);
                    let child = persistence.reservation_request_mut(&id)?;
                    if Self::synchronize(child, reservation_request_set, slot) {
                        child.clear_state();
                        result.modified += 1;
                        log::debug!("Child reservation request '{}' modified.", id);
                    }
                }
                None => {
                    let id = ReservationRequestId::new(format!("{}:{}", reservation_request_set.id, slot.start));
                    let mut child = ReservationRequest::new(id.clone(), slot, reservation_request_set.specification.clone());
                    Self::synchronize(&mut child, reservation_request_set, slot);
                    child.created_at = reservation_request_set.created_at;
                    child.parent_set = Some(reservation_request_set.id.clone());
                    persistence.add_reservation_request(child)?;
                    created_children.push(id.clone());
                    result.created += 1;
                    log::debug!("Child reservation request '{}' created.", id);
                }
            }
        }

        // Children without a slot are deleted, their reservations go with the next scheduler run.
        let deleted_children: Vec<ReservationRequestId> = children.into_iter().map(|(id, _)| id).collect();
        for id in &deleted_children {
            persistence.reservation_request_mut(id)?.state = ReservationRequestState::Deleted;
            result.deleted += 1;
            log::debug!("Child reservation request '{}' deleted.", id);
        }

        if let Some(stored) = persistence.get_reservation_request_set_mut(&reservation_request_set.id) {
            stored.children.retain(|child| !deleted_children.contains(child));
            stored.children.extend(created_children);
        }
        Ok(())
    }

    /// Copies the attributes of the set into the child. Returns whether anything changed.
    fn synchronize(child: &mut ReservationRequest, reservation_request_set: &ReservationRequestSet, slot: Interval) -> bool {
        let modified = child.slot != slot
            || child.specification != reservation_request_set.specification
            || child.purpose != reservation_request_set.purpose
            || child.priority != reservation_request_set.priority
            || child.user_id != reservation_request_set.user_id
            || child.description != reservation_request_set.description;
        child.slot = slot;
        child.specification = reservation_request_set.specification.clone();
        child.purpose = reservation_request_set.purpose;
        child.priority = reservation_request_set.priority;
        child.user_id = reservation_request_set.user_id.clone();
        child.description = reservation_request_set.description.clone();
        modified
    }
}
