pub mod available_room;
pub mod cache;
pub mod reservation_transaction;
