use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse scenario JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to build internal domain model: {0}")]
    ModelConstructionError(String),

    #[error("{kind} '{id}' was not found.")]
    EntityNotFound { kind: &'static str, id: String },

    #[error("Reservation request '{id}' cannot be deleted: {reason}")]
    NotDeletable { id: String, reason: String },

    #[error("Interval start {start} is after its end {end}.")]
    InvalidInterval { start: i64, end: i64 },

    #[error("Pattern is invalid: {0}")]
    InvalidPattern(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid scheduler state: {0}")]
    InvalidState(String),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Error::EntityNotFound { kind, id: id.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
