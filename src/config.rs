use serde::Deserialize;

use crate::domain::scheduler::report::MessageType;

pub const HOUR_IN_MS: i64 = 60 * 60 * 1000;
pub const MINUTE_IN_MS: i64 = 60 * 1000;

/// Settings shared by the preprocessor, the scheduler and every scheduler context.
///
/// The value is created once (usually from the `config` section of a scenario file) and
/// passed by reference into the drivers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    /// The **name of the local domain**, used when formatting identifiers in reports.
    pub domain_name: String,

    /// Maximum duration of an allocated slot. `None` disables the check.
    pub maximum_duration_ms: Option<i64>,

    /// Whether notifications collected by scheduler contexts are passed to the executor.
    pub notifications_enabled: bool,

    /// Verbosity used when rendering reports for the command line.
    pub report_verbosity: MessageType,

    /// Window in which an existing child reservation request is matched to a set slot.
    pub preprocessor_slot_tolerance_ms: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            domain_name: "shongo".to_string(),
            maximum_duration_ms: None,
            notifications_enabled: true,
            report_verbosity: MessageType::DomainAdmin,
            preprocessor_slot_tolerance_ms: 24 * HOUR_IN_MS,
        }
    }
}

impl SchedulerConfig {
    pub fn format_id(&self, kind: &str, id: &str) -> String {
        format!("{}:{}:{}", self.domain_name, kind, id)
    }
}
