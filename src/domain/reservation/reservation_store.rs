use slotmap::{SlotMap, new_key_type};
use std::collections::BTreeSet;

use crate::domain::reservation::reservation::{Reservation, ReservationKind};
use crate::error::{Error, Result};

new_key_type! {
    pub struct ReservationId;
}

/// Storage of every reservation known to the scheduler, persisted or being allocated.
#[derive(Debug, Default)]
pub struct ReservationStore {
    slots: SlotMap<ReservationId, Reservation>,
}

impl ReservationStore {
    pub fn new() -> Self {
        Self { slots: SlotMap::with_key() }
    }

    /// Adds Reservation to ReservationStore.
    ///
    /// # Returns
    /// Returns the ReservationId (internal Key for ReservationStore).
    pub fn add(&mut self, reservation: Reservation) -> ReservationId {
        return self.slots.insert(reservation);
    }

    pub fn get(&self, id: ReservationId) -> Option<&Reservation> {
        self.slots.get(id)
    }

    pub fn get_mut(&mut self, id: ReservationId) -> Option<&mut Reservation> {
        self.slots.get_mut(id)
    }

    /// Like [`ReservationStore::get`] but fails with a typed error for unknown ids.
    pub fn reservation(&self, id: ReservationId) -> Result<&Reservation> {
        self.slots.get(id).ok_or_else(|| Error::not_found("Reservation", format!("{:?}", id)))
    }

    pub fn reservation_mut(&mut self, id: ReservationId) -> Result<&mut Reservation> {
        self.slots.get_mut(id).ok_or_else(|| Error::not_found("Reservation", format!("{:?}", id)))
    }

    pub fn contains(&self, id: ReservationId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn remove(&mut self, id: ReservationId) -> Option<Reservation> {
        self.slots.remove(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ReservationId> + '_ {
        self.slots.keys()
    }

    /// Follows reuse pointers of existing reservations to the reservation which
    /// actually holds the allocation.
    pub fn get_target(&self, id: ReservationId) -> ReservationId {
        let mut current = id;
        let mut visited = BTreeSet::new();
        while let Some(Reservation { kind: ReservationKind::Existing { reused }, .. }) = self.slots.get(current) {
            if !visited.insert(current) {
                break;
            }
            current = *reused;
        }
        current
    }

    /// Walks parent links up to the top reservation of the tree.
    pub fn get_top(&self, id: ReservationId) -> ReservationId {
        let mut current = id;
        while let Some(parent) = self.slots.get(current).and_then(|reservation| reservation.parent) {
            current = parent;
        }
        current
    }

    /// Returns the reservation and all of its descendants, parents first.
    pub fn get_set_of_all(&self, id: ReservationId) -> Vec<ReservationId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(reservation) = self.slots.get(current) {
                result.push(current);
                stack.extend(reservation.children.iter().rev().copied());
            }
        }
        result
    }

    /// Links `child` under `parent`, detaching it from a previous parent.
    pub fn add_child(&mut self, parent: ReservationId, child: ReservationId) -> Result<()> {
        if parent == child {
            return Err(Error::InvalidState("Reservation cannot be its own child.".to_string()));
        }
        let previous_parent = self.reservation(child)?.parent;
        if previous_parent == Some(parent) {
            return Ok(());
        }
        if let Some(previous_parent) = previous_parent {
            if let Some(previous) = self.slots.get_mut(previous_parent) {
                previous.children.retain(|existing| *existing != child);
            }
        }
        self.reservation_mut(child)?.parent = Some(parent);
        self.reservation_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Removes the reservation together with its whole subtree.
    pub fn remove_tree(&mut self, id: ReservationId) -> Vec<Reservation> {
        let ids = self.get_set_of_all(id);
        if let Some(parent) = self.slots.get(id).and_then(|reservation| reservation.parent) {
            if let Some(parent) = self.slots.get_mut(parent) {
                parent.children.retain(|child| *child != id);
            }
        }
        ids.into_iter().filter_map(|id| self.slots.remove(id)).collect()
    }
}
