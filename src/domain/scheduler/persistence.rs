use std::collections::BTreeMap;

use crate::domain::request::reservation_request::{ReservationRequest, ReservationRequestSet, ReservationRequestState};
use crate::domain::utils::id::{ReservationRequestId, ReservationRequestSetId};
use crate::error::{Error, Result};

/// Storage of reservation requests consumed by the preprocessor and the scheduler.
///
/// Resources and reservations live in the [`Cache`](crate::domain::cache::cache::Cache);
/// the persistence only holds what users submit.
pub trait Persistence {
    fn get_reservation_request(&self, id: &ReservationRequestId) -> Option<&ReservationRequest>;

    fn get_reservation_request_mut(&mut self, id: &ReservationRequestId) -> Option<&mut ReservationRequest>;

    /// Every stored reservation request, ordered by identifier.
    fn list_reservation_requests(&self) -> Vec<&ReservationRequest>;

    fn add_reservation_request(&mut self, reservation_request: ReservationRequest) -> Result<()>;

    /// Removes the request for good (after its reservations were deleted).
    fn remove_reservation_request(&mut self, id: &ReservationRequestId) -> Option<ReservationRequest>;

    fn get_reservation_request_set(&self, id: &ReservationRequestSetId) -> Option<&ReservationRequestSet>;

    fn get_reservation_request_set_mut(&mut self, id: &ReservationRequestSetId) -> Option<&mut ReservationRequestSet>;

    fn list_reservation_request_sets(&self) -> Vec<&ReservationRequestSet>;

    fn add_reservation_request_set(&mut self, reservation_request_set: ReservationRequestSet) -> Result<()>;

    fn remove_reservation_request_set(&mut self, id: &ReservationRequestSetId) -> Option<ReservationRequestSet>;

    fn reservation_request(&self, id: &ReservationRequestId) -> Result<&ReservationRequest> {
        self.get_reservation_request(id).ok_or_else(|| Error::not_found("ReservationRequest", id))
    }

    fn reservation_request_mut(&mut self, id: &ReservationRequestId) -> Result<&mut ReservationRequest> {
        self.get_reservation_request_mut(id).ok_or_else(|| Error::not_found("ReservationRequest", id))
    }

    /// Active requests which reuse the allocation of `id`.
    fn list_reusing_reservation_requests(&self, id: &ReservationRequestId) -> Vec<ReservationRequestId> {
        self.list_reservation_requests()
            .into_iter()
            .filter(|reservation_request| reservation_request.is_active() && reservation_request.reused_allocation.as_ref() == Some(id))
            .map(|reservation_request| reservation_request.id.clone())
            .collect()
    }

    /// Marks the request as deleted. Its reservations are removed by the next scheduler
    /// pass.
    ///
    /// # Errors
    /// [`Error::NotDeletable`] when another active request reuses its allocation.
    fn delete_reservation_request(&mut self, id: &ReservationRequestId) -> Result<()> {
        let reusing = self.list_reusing_reservation_requests(id);
        if let Some(reusing) = reusing.first() {
            return Err(Error::NotDeletable { id: id.to_string(), reason: format!("its allocation is reused by reservation request '{}'", reusing) });
        }
        self.reservation_request_mut(id)?.state = ReservationRequestState::Deleted;
        log::info!("Reservation request '{}' marked as deleted.", id);
        Ok(())
    }

    /// Marks the set and all of its children as deleted.
    fn delete_reservation_request_set(&mut self, id: &ReservationRequestSetId) -> Result<()> {
        let children = match self.get_reservation_request_set(id) {
            Some(reservation_request_set) => reservation_request_set.children.clone(),
            None => return Err(Error::not_found("ReservationRequestSet", id)),
        };
        for child in &children {
            let reusing = self.list_reusing_reservation_requests(child);
            if let Some(reusing) = reusing.iter().find(|reusing| !children.contains(*reusing)) {
                return Err(Error::NotDeletable { id: id.to_string(), reason: format!("its allocation is reused by reservation request '{}'", reusing) });
            }
        }
        for child in &children {
            if let Some(reservation_request) = self.get_reservation_request_mut(child) {
                reservation_request.state = ReservationRequestState::Deleted;
            }
        }
        if let Some(reservation_request_set) = self.get_reservation_request_set_mut(id) {
            reservation_request_set.state = ReservationRequestState::Deleted;
        }
        Ok(())
    }
}

/// [`Persistence`] keeping everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    reservation_requests: BTreeMap<ReservationRequestId, ReservationRequest>,
    reservation_request_sets: BTreeMap<ReservationRequestSetId, ReservationRequestSet>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn get_reservation_request(&self, id: &ReservationRequestId) -> Option<&ReservationRequest> {
        self.reservation_requests.get(id)
    }

    fn get_reservation_request_mut(&mut self, id: &ReservationRequestId) -> Option<&mut ReservationRequest> {
        self.reservation_requests.get_mut(id)
    }

    fn list_reservation_requests(&self) -> Vec<&ReservationRequest> {
        self.reservation_requests.values().collect()
    }

    fn add_reservation_request(&mut self, reservation_request: ReservationRequest) -> Result<()> {
        if self.reservation_requests.contains_key(&reservation_request.id) {
            return Err(Error::ModelConstructionError(format!("Reservation request '{}' is defined multiple times.", reservation_request.id)));
        }
        self.reservation_requests.insert(reservation_request.id.clone(), reservation_request);
        Ok(())
    }

    fn remove_reservation_request(&mut self, id: &ReservationRequestId) -> Option<ReservationRequest> {
        self.reservation_requests.remove(id)
    }

    fn get_reservation_request_set(&self, id: &ReservationRequestSetId) -> Option<&ReservationRequestSet> {
        self.reservation_request_sets.get(id)
    }

    fn get_reservation_request_set_mut(&mut self, id: &ReservationRequestSetId) -> Option<&mut ReservationRequestSet> {
        self.reservation_request_sets.get_mut(id)
    }

    fn list_reservation_request_sets(&self) -> Vec<&ReservationRequestSet> {
        self.reservation_request_sets.values().collect()
    }

    fn add_reservation_request_set(&mut self, reservation_request_set: ReservationRequestSet) -> Result<()> {
        if self.reservation_request_sets.contains_key(&reservation_request_set.id) {
            return Err(Error::ModelConstructionError(format!("Reservation request set '{}' is defined multiple times.", reservation_request_set.id)));
        }
        self.reservation_request_sets.insert(reservation_request_set.id.clone(), reservation_request_set);
        Ok(())
    }

    fn remove_reservation_request_set(&mut self, id: &ReservationRequestSetId) -> Option<ReservationRequestSet> {
        self.reservation_request_sets.remove(id)
    }
}
