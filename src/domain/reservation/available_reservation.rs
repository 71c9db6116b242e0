use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::utils::interval::Interval;

/// How an [`AvailableReservation`] may be used by the current scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvailableReservationType {
    /// Allocation of another reservation request which the current request may reuse.
    Reusable,
    /// Old allocation of the current reservation request which may be reallocated.
    Reallocatable,
}

/// Existing reservation offered to the current scheduling pass.
///
/// `original` is the reservation which was offered (possibly an existing reservation)
/// and `target` is the reservation holding the allocation (`original` with reuse
/// pointers resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailableReservation {
    pub original: ReservationId,
    pub target: ReservationId,
    pub available_type: AvailableReservationType,

    /// Slot of the original reservation.
    pub original_slot: Interval,
}

impl AvailableReservation {
    pub fn is_type(&self, available_type: AvailableReservationType) -> bool {
        self.available_type == available_type
    }
}
