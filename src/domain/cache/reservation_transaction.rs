use std::collections::BTreeMap;

use crate::domain::reservation::available_reservation::AvailableReservation;
use crate::domain::reservation::reservation::ObjectKey;
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::utils::interval::Interval;

/// Changes of the allocation state made by the current scheduling pass which are not
/// yet visible in the cache.
///
/// Reservations allocated by the pass must be considered as taken, and reservations
/// offered as available must be considered as free, whenever the cache is asked for
/// the reservations of an object.
#[derive(Debug, Default, Clone)]
pub struct ReservationTransaction {
    allocated: BTreeMap<ObjectKey, BTreeMap<ReservationId, Interval>>,
    available: BTreeMap<ObjectKey, Vec<AvailableReservation>>,
}

impl ReservationTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_allocated(&mut self, keys: &[ObjectKey], reservation: ReservationId, slot: Interval) {
        for key in keys {
            self.allocated.entry(key.clone()).or_default().insert(reservation, slot);
        }
    }

    pub fn remove_allocated(&mut self, keys: &[ObjectKey], reservation: ReservationId) {
        for key in keys {
            if let Some(reservations) = self.allocated.get_mut(key) {
                reservations.remove(&reservation);
                if reservations.is_empty() {
                    self.allocated.remove(key);
                }
            }
        }
    }

    pub fn add_available(&mut self, keys: &[ObjectKey], available: AvailableReservation) {
        for key in keys {
            let entries = self.available.entry(key.clone()).or_default();
            if !entries.contains(&available) {
                entries.push(available);
            }
        }
    }

    pub fn remove_available(&mut self, keys: &[ObjectKey], available: &AvailableReservation) {
        for key in keys {
            if let Some(entries) = self.available.get_mut(key) {
                entries.retain(|entry| entry != available);
                if entries.is_empty() {
                    self.available.remove(key);
                }
            }
        }
    }

    /// Available reservations of the object whose original slot overlaps `slot`.
    pub fn get_available(&self, key: &ObjectKey, slot: &Interval) -> Vec<AvailableReservation> {
        match self.available.get(key) {
            Some(entries) => entries.iter().filter(|entry| entry.original_slot.overlaps(slot)).copied().collect(),
            None => Vec::new(),
        }
    }

    /// Updates reservations of an object listed from the cache with the changes of the
    /// transaction: available reservations are removed and reservations allocated in
    /// `slot` are added.
    pub fn apply(&self, key: &ObjectKey, slot: &Interval, reservations: &mut Vec<ReservationId>) {
        if let Some(entries) = self.available.get(key) {
            reservations.retain(|reservation| !entries.iter().any(|entry| entry.target == *reservation || entry.original == *reservation));
        }
        if let Some(allocated) = self.allocated.get(key) {
            for (reservation, reservation_slot) in allocated {
                if reservation_slot.overlaps(slot) && !reservations.contains(reservation) {
                    reservations.push(*reservation);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty() && self.available.is_empty()
    }
}
