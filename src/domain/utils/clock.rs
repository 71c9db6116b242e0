use std::fmt::Debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time for the drivers.
pub trait SystemClock: Debug {
    fn get_current_time_in_ms(&self) -> i64;
}

#[derive(Debug, Clone, Default)]
pub struct WallClock;

impl SystemClock for WallClock {
    fn get_current_time_in_ms(&self) -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_millis() as i64
    }
}
