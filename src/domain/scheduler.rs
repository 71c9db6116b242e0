pub mod context;
pub mod context_state;
pub mod notification;
pub mod persistence;
pub mod preprocessor;
pub mod report;
pub mod scheduler;
pub mod scheduler_error;
pub mod task;
