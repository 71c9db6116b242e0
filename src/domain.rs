pub mod cache;
pub mod request;
pub mod reservation;
pub mod resource;
pub mod scheduler;
pub mod technology;
pub mod utils;
pub mod value;
