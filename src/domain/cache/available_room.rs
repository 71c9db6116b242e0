use crate::domain::reservation::reservation::Reservation;
use crate::domain::utils::id::{CapabilityId, ResourceId};
use crate::domain::utils::interval::Interval;

/// Licence availability of one room provider in a time slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableRoom {
    pub resource: ResourceId,
    pub capability: CapabilityId,
    pub maximum_license_count: u32,
    pub available_license_count: u32,
}

impl AvailableRoom {
    pub fn get_used_license_count(&self) -> u32 {
        self.maximum_license_count - self.available_license_count
    }

    /// Ratio of used licences, `1.0` for a provider without licences.
    pub fn get_fullness_ratio(&self) -> f64 {
        if self.maximum_license_count == 0 {
            return 1.0;
        }
        self.get_used_license_count() as f64 / self.maximum_license_count as f64
    }
}

/// Peak number of licences used at the same time within `slot`.
///
/// Reservation boundaries are clipped to the slot; a reservation ending exactly when
/// another one starts is not counted twice.
pub fn compute_peak_license_usage<'a>(reservations: impl IntoIterator<Item = &'a Reservation>, slot: &Interval) -> u32 {
    let mut events: Vec<(i64, i64)> = Vec::new();
    for reservation in reservations {
        let license_count = reservation.get_license_count() as i64;
        if license_count == 0 {
            continue;
        }
        if let Some(intersection) = reservation.slot.intersection(slot) {
            if intersection.is_empty() {
                continue;
            }
            events.push((intersection.start, license_count));
            events.push((intersection.end, -license_count));
        }
    }
    // Ends before starts at the same instant.
    events.sort_by_key(|(time, change)| (*time, *change));

    let mut current: i64 = 0;
    let mut peak: i64 = 0;
    for (_, change) in events {
        current += change;
        peak = peak.max(current);
    }
    peak.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::reservation::ReservationKind;

    fn room(start: i64, end: i64, license_count: u32) -> Reservation {
        Reservation::new(
            Interval::new(start, end).unwrap(),
            ReservationKind::Room { resource: ResourceId::new("mcu"), capability: CapabilityId::new("mcu-room"), license_count },
        )
    }

    #[test]
    fn test_peak_usage_of_touching_reservations() {
        let reservations = vec![room(0, 10, 5), room(10, 20, 7)];
        assert_eq!(compute_peak_license_usage(&reservations, &Interval::new(0, 20).unwrap()), 7);
    }

    #[test]
    fn test_peak_usage_of_overlapping_reservations() {
        let reservations = vec![room(0, 10, 5), room(5, 20, 7), room(15, 30, 1)];
        assert_eq!(compute_peak_license_usage(&reservations, &Interval::new(0, 30).unwrap()), 12);
        assert_eq!(compute_peak_license_usage(&reservations, &Interval::new(12, 30).unwrap()), 8);
        assert_eq!(compute_peak_license_usage(&reservations, &Interval::new(30, 40).unwrap()), 0);
    }
}
