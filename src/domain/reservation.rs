pub mod available_reservation;
pub mod executable;
pub mod reservation;
pub mod reservation_store;
