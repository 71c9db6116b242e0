use serde::Deserialize;
use std::collections::BTreeSet;

use crate::domain::technology::{Alias, AliasType, CallInitiation, Technology};

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasSpecificationDto {
    #[serde(default)]
    pub technologies: BTreeSet<Technology>,
    #[serde(default)]
    pub alias_types: BTreeSet<AliasType>,
    pub value: Option<String>,
    pub resource: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingServiceDto {
    #[serde(default)]
    pub enabled: bool,
    pub resource: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ParticipantDto {
    External {
        #[serde(default)]
        technologies: BTreeSet<Technology>,
        #[serde(default = "default_count")]
        count: u32,
        #[serde(default)]
        aliases: Vec<Alias>,
        call_initiation: Option<CallInitiation>,
    },
    Existing {
        resource: String,
        call_initiation: Option<CallInitiation>,
    },
    Lookup {
        technologies: BTreeSet<Technology>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum SpecificationDto {
    Resource {
        resource: String,
    },
    Room {
        participant_count: u32,
        #[serde(default)]
        technologies: BTreeSet<Technology>,
        resource: Option<String>,
        #[serde(default)]
        aliases: Vec<AliasSpecificationDto>,
        #[serde(default)]
        slot_minutes_before: i64,
        #[serde(default)]
        slot_minutes_after: i64,
        recording: Option<RecordingServiceDto>,
    },
    Alias(AliasSpecificationDto),
    AliasSet {
        aliases: Vec<AliasSpecificationDto>,
        #[serde(default)]
        shared_executable: bool,
    },
    Compartment {
        participants: Vec<ParticipantDto>,
        call_initiation: Option<CallInitiation>,
    },
    Value {
        value_provider: String,
        value: Option<String>,
    },
    ExistingEndpoint {
        resource: String,
    },
    LookupEndpoint {
        technologies: BTreeSet<Technology>,
    },
}
