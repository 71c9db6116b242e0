use serde::Deserialize;
use std::collections::BTreeSet;

use crate::domain::technology::{Alias, AliasType, Technology};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDto {
    pub id: String,
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub allocatable: bool,
    pub parent: Option<String>,
    pub maximum_future: Option<i64>,
    #[serde(default)]
    pub owners: Vec<String>,
    pub device: Option<DeviceDto>,
    #[serde(default)]
    pub capabilities: Vec<CapabilityDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    #[serde(default)]
    pub technologies: BTreeSet<Technology>,
    pub address: Option<String>,
    pub preferred_technology: Option<Technology>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDto {
    pub id: String,
    pub maximum_future: Option<i64>,
    #[serde(flatten)]
    pub kind: CapabilityKindDto,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum CapabilityKindDto {
    RoomProvider {
        license_count: u32,
        #[serde(default)]
        max_licences_per_room: u32,
    },
    AliasProvider {
        value_provider: String,
        aliases: Vec<AliasTemplateDto>,
        #[serde(default)]
        restricted_to_resource: bool,
    },
    ValueProvider {
        value_provider: String,
    },
    Terminal {
        #[serde(default)]
        aliases: Vec<Alias>,
        #[serde(default)]
        standalone: bool,
    },
    Recording {
        license_count: Option<u32>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasTemplateDto {
    pub alias_type: AliasType,
    /// Defaults to the technology of the alias type.
    pub technology: Option<Technology>,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueProviderDto {
    pub id: String,
    pub capability: String,
    #[serde(flatten)]
    pub kind: ValueProviderKindDto,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ValueProviderKindDto {
    Pattern {
        patterns: Vec<String>,
        #[serde(default)]
        allow_any_requested_value: bool,
    },
    Filtered {
        filter: ValueFilterDto,
        target: String,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueFilterDto {
    ConvertToUrl,
}
