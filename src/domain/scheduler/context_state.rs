use std::collections::{BTreeMap, BTreeSet};

use crate::domain::cache::reservation_transaction::ReservationTransaction;
use crate::domain::reservation::available_reservation::AvailableReservation;
use crate::domain::reservation::reservation::ObjectKey;
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::scheduler::notification::Notification;
use crate::domain::utils::id::{ReservationRequestId, ResourceId};
use crate::domain::utils::interval::Interval;
use crate::error::{Error, Result};

/// Handle of a savepoint created by [`SchedulerContextState::create_savepoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Savepoint {
    id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Added,
    Removed,
}

#[derive(Debug, Clone)]
enum StateObject {
    Notification(Notification),
    ReferencedResource(ResourceId),
    AllocatedReservation { reservation: ReservationId, keys: Vec<ObjectKey>, slot: Interval },
    AvailableReservation { available: AvailableReservation, keys: Vec<ObjectKey> },
}

impl StateObject {
    fn is_same(&self, other: &StateObject) -> bool {
        match (self, other) {
            (StateObject::Notification(first), StateObject::Notification(second)) => first == second,
            (StateObject::ReferencedResource(first), StateObject::ReferencedResource(second)) => first == second,
            (StateObject::AllocatedReservation { reservation: first, .. }, StateObject::AllocatedReservation { reservation: second, .. }) => first == second,
            (StateObject::AvailableReservation { available: first, .. }, StateObject::AvailableReservation { available: second, .. }) => {
                first.original == second.original
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Delta {
    object: StateObject,
    change: Change,
}

/// Set-valued state of one scheduling pass with nested savepoints.
///
/// Every membership change made while a savepoint is active is appended to an arena of
/// deltas. A savepoint remembers where its deltas start, so reverting it replays the
/// tail of the arena backwards. Destroying a savepoint keeps its deltas, which then
/// belong to the enclosing savepoint.
#[derive(Debug, Default)]
pub struct SchedulerContextState {
    referenced_resources: BTreeSet<ResourceId>,
    allocated_reservations: BTreeMap<ReservationId, (Vec<ObjectKey>, Interval)>,
    available_reservations: BTreeMap<ReservationId, (AvailableReservation, Vec<ObjectKey>)>,
    transaction: ReservationTransaction,

    notifications_disabled: bool,
    notifications: Vec<Notification>,

    reservations_to_delete: Vec<ReservationId>,
    force_reallocation: Vec<ReservationRequestId>,
    try_reallocation: Vec<ReservationRequestId>,

    deltas: Vec<Delta>,
    savepoints: Vec<(Savepoint, usize)>,
    next_savepoint_id: u64,
    reverting: bool,
}

impl SchedulerContextState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_savepoint(&mut self) -> Savepoint {
        self.next_savepoint_id += 1;
        let savepoint = Savepoint { id: self.next_savepoint_id };
        self.savepoints.push((savepoint, self.deltas.len()));
        savepoint
    }

    pub fn get_current_savepoint(&self) -> Option<Savepoint> {
        self.savepoints.last().map(|(savepoint, _)| *savepoint)
    }

    /// Undoes every change made since `savepoint` was created and drops the savepoint
    /// together with all savepoints created after it.
    pub fn revert(&mut self, savepoint: Savepoint) -> Result<()> {
        let position = self
            .savepoints
            .iter()
            .position(|(existing, _)| *existing == savepoint)
            .ok_or_else(|| Error::InvalidState(format!("Savepoint {} is not active.", savepoint.id)))?;
        let start = self.savepoints[position].1;
        self.savepoints.truncate(position);

        self.reverting = true;
        let deltas: Vec<Delta> = self.deltas.drain(start..).collect();
        for delta in deltas.into_iter().rev() {
            match delta.change {
                Change::Added => self.apply_remove(&delta.object),
                Change::Removed => self.apply_add(&delta.object),
            }
        }
        self.reverting = false;
        Ok(())
    }

    /// Drops `savepoint` (and savepoints created after it) while keeping its changes.
    /// Destroying a savepoint which was already reverted has no effect.
    pub fn destroy(&mut self, savepoint: Savepoint) {
        if let Some(position) = self.savepoints.iter().position(|(existing, _)| *existing == savepoint) {
            self.savepoints.truncate(position);
            if self.savepoints.is_empty() {
                self.deltas.clear();
            }
        }
    }

    fn on_change(&mut self, object: StateObject, change: Change) -> Result<()> {
        if self.reverting {
            return Ok(());
        }
        let start = match self.savepoints.last() {
            Some((_, start)) => *start,
            None => return Ok(()),
        };
        if let Some(offset) = self.deltas[start..].iter().position(|delta| delta.object.is_same(&object)) {
            if self.deltas[start + offset].change == change {
                return Err(Error::InvalidState("Cannot record the same change twice.".to_string()));
            }
            self.deltas.remove(start + offset);
            return Ok(());
        }
        self.deltas.push(Delta { object, change });
        Ok(())
    }

    fn apply_add(&mut self, object: &StateObject) {
        match object {
            StateObject::Notification(notification) => self.notifications.push(notification.clone()),
            StateObject::ReferencedResource(resource) => {
                self.referenced_resources.insert(resource.clone());
            }
            StateObject::AllocatedReservation { reservation, keys, slot } => {
                self.allocated_reservations.insert(*reservation, (keys.clone(), *slot));
                self.transaction.add_allocated(keys, *reservation, *slot);
            }
            StateObject::AvailableReservation { available, keys } => {
                self.available_reservations.insert(available.original, (*available, keys.clone()));
                self.transaction.add_available(keys, *available);
            }
        }
    }

    fn apply_remove(&mut self, object: &StateObject) {
        match object {
            StateObject::Notification(notification) => {
                if let Some(position) = self.notifications.iter().rposition(|existing| existing == notification) {
                    self.notifications.remove(position);
                }
            }
            StateObject::ReferencedResource(resource) => {
                self.referenced_resources.remove(resource);
            }
            StateObject::AllocatedReservation { reservation, keys, .. } => {
                self.allocated_reservations.remove(reservation);
                self.transaction.remove_allocated(keys, *reservation);
            }
            StateObject::AvailableReservation { available, keys } => {
                self.available_reservations.remove(&available.original);
                self.transaction.remove_available(keys, available);
            }
        }
    }

    pub fn get_referenced_resources(&self) -> &BTreeSet<ResourceId> {
        &self.referenced_resources
    }

    pub fn contains_referenced_resource(&self, resource: &ResourceId) -> bool {
        self.referenced_resources.contains(resource)
    }

    pub fn add_referenced_resource(&mut self, resource: ResourceId) -> Result<()> {
        if !self.referenced_resources.insert(resource.clone()) {
            return Ok(());
        }
        self.on_change(StateObject::ReferencedResource(resource), Change::Added)
    }

    pub fn remove_referenced_resource(&mut self, resource: &ResourceId) -> Result<()> {
        if !self.referenced_resources.remove(resource) {
            return Ok(());
        }
        self.on_change(StateObject::ReferencedResource(resource.clone()), Change::Removed)
    }

    /// Forgets resources referenced by a previously allocated reservation request.
    pub fn clear_referenced_resources(&mut self) -> Result<()> {
        for resource in self.referenced_resources.clone() {
            self.remove_referenced_resource(&resource)?;
        }
        Ok(())
    }

    pub fn get_allocated_reservations(&self) -> BTreeSet<ReservationId> {
        self.allocated_reservations.keys().copied().collect()
    }

    pub fn contains_allocated_reservation(&self, reservation: ReservationId) -> bool {
        self.allocated_reservations.contains_key(&reservation)
    }

    pub fn add_allocated_reservation(&mut self, reservation: ReservationId, keys: Vec<ObjectKey>, slot: Interval) -> Result<()> {
        if self.allocated_reservations.contains_key(&reservation) {
            return Ok(());
        }
        let object = StateObject::AllocatedReservation { reservation, keys, slot };
        self.apply_add(&object);
        self.on_change(object, Change::Added)
    }

    pub fn remove_allocated_reservation(&mut self, reservation: ReservationId) -> Result<()> {
        let (keys, slot) = match self.allocated_reservations.get(&reservation) {
            Some((keys, slot)) => (keys.clone(), *slot),
            None => return Ok(()),
        };
        let object = StateObject::AllocatedReservation { reservation, keys, slot };
        self.apply_remove(&object);
        self.on_change(object, Change::Removed)
    }

    pub fn get_available_reservations(&self) -> Vec<AvailableReservation> {
        self.available_reservations.values().map(|(available, _)| *available).collect()
    }

    /// Available reservation offered for the given original reservation.
    pub fn get_available_reservation(&self, original: ReservationId) -> Option<AvailableReservation> {
        self.available_reservations.get(&original).map(|(available, _)| *available)
    }

    /// Returns `false` when a reservation with the same original is already available.
    pub fn add_available_reservation(&mut self, available: AvailableReservation, keys: Vec<ObjectKey>) -> Result<bool> {
        if self.available_reservations.contains_key(&available.original) {
            return Ok(false);
        }
        let object = StateObject::AvailableReservation { available, keys };
        self.apply_add(&object);
        self.on_change(object, Change::Added)?;
        Ok(true)
    }

    /// Returns `false` when the reservation was not available.
    pub fn remove_available_reservation(&mut self, original: ReservationId) -> Result<bool> {
        let (available, keys) = match self.available_reservations.get(&original) {
            Some((available, keys)) => (*available, keys.clone()),
            None => return Ok(false),
        };
        let object = StateObject::AvailableReservation { available, keys };
        self.apply_remove(&object);
        self.on_change(object, Change::Removed)?;
        Ok(true)
    }

    pub fn get_transaction(&self) -> &ReservationTransaction {
        &self.transaction
    }

    pub fn enable_notifications(&mut self, enabled: bool) {
        self.notifications_disabled = !enabled;
    }

    pub fn add_notification(&mut self, notification: Notification) -> Result<()> {
        if self.notifications_disabled {
            return Ok(());
        }
        self.notifications.push(notification.clone());
        self.on_change(StateObject::Notification(notification), Change::Added)
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn add_reservation_to_delete(&mut self, reservation: ReservationId) {
        if !self.reservations_to_delete.contains(&reservation) {
            self.reservations_to_delete.push(reservation);
        }
    }

    pub fn get_reservations_to_delete(&self) -> &[ReservationId] {
        &self.reservations_to_delete
    }

    pub fn force_reservation_request_reallocation(&mut self, reservation_request: ReservationRequestId) {
        if !self.force_reallocation.contains(&reservation_request) {
            self.force_reallocation.push(reservation_request);
        }
    }

    pub fn try_reservation_request_reallocation(&mut self, reservation_request: ReservationRequestId) {
        if !self.try_reallocation.contains(&reservation_request) {
            self.try_reallocation.push(reservation_request);
        }
    }

    pub fn get_force_reallocation(&self) -> &[ReservationRequestId] {
        &self.force_reallocation
    }

    pub fn get_try_reallocation(&self) -> &[ReservationRequestId] {
        &self.try_reallocation
    }
}
