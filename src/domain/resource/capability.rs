use crate::domain::technology::{Alias, AliasType, Technology};
use crate::domain::utils::id::{CapabilityId, ResourceId, ValueProviderId};

/// Alias produced by an alias provider. `value` may contain a `{value}` placeholder which is
/// replaced by the value allocated from the provider's value provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTemplate {
    pub technology: Technology,
    pub alias_type: AliasType,
    pub value: String,
}

impl AliasTemplate {
    pub fn new(alias_type: AliasType, value: impl Into<String>) -> AliasTemplate {
        AliasTemplate { technology: alias_type.get_technology(), alias_type, value: value.into() }
    }

    pub fn has_value_placeholder(&self) -> bool {
        self.value.contains('{') && self.value.contains('}')
    }

    /// Builds the alias by substituting the `{...}` placeholder with `value`.
    pub fn evaluate(&self, value: &str) -> Alias {
        let mut alias = Alias::new(self.alias_type, self.value.clone());
        alias.technology = self.technology;
        if let (Some(start), Some(end)) = (self.value.find('{'), self.value.find('}')) {
            if start < end {
                alias.value = format!("{}{}{}", &self.value[..start], value, &self.value[end + 1..]);
            }
        }
        alias
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityKind {
    /// Device can host virtual rooms, limited by a licence count.
    RoomProvider {
        license_count: u32,
        /// Maximum licences for a single room, `0` for unlimited.
        max_licences_per_room: u32,
    },
    /// Resource assigns aliases whose values come from a value provider.
    AliasProvider {
        value_provider: ValueProviderId,
        aliases: Vec<AliasTemplate>,
        /// Aliases are usable only for the resource owning the capability.
        restricted_to_resource: bool,
    },
    /// Resource exposes a value provider which other resources may use.
    ValueProvider { value_provider: ValueProviderId },
    /// Device is an endpoint (terminal).
    Terminal {
        aliases: Vec<Alias>,
        /// Standalone terminals can call each other without a room.
        standalone: bool,
    },
    /// Device can record rooms. Without a licence count every room of the device is
    /// always recordable.
    Recording { license_count: Option<u32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityType {
    RoomProvider,
    AliasProvider,
    ValueProvider,
    Terminal,
    Recording,
}

#[derive(Debug, Clone)]
pub struct Capability {
    /// **Unique identifier** of the capability.
    pub id: CapabilityId,

    /// The **resource** declaring the capability.
    pub resource: ResourceId,

    /// Capability specific maximum future (ms), checked in addition to the resource's one.
    pub maximum_future: Option<i64>,

    pub kind: CapabilityKind,
}

impl Capability {
    pub fn new(id: impl Into<CapabilityId>, resource: ResourceId, kind: CapabilityKind) -> Capability {
        Capability { id: id.into(), resource, maximum_future: None, kind }
    }

    pub fn get_type(&self) -> CapabilityType {
        match self.kind {
            CapabilityKind::RoomProvider { .. } => CapabilityType::RoomProvider,
            CapabilityKind::AliasProvider { .. } => CapabilityType::AliasProvider,
            CapabilityKind::ValueProvider { .. } => CapabilityType::ValueProvider,
            CapabilityKind::Terminal { .. } => CapabilityType::Terminal,
            CapabilityKind::Recording { .. } => CapabilityType::Recording,
        }
    }

    pub fn get_license_count(&self) -> u32 {
        match self.kind {
            CapabilityKind::RoomProvider { license_count, .. } => license_count,
            CapabilityKind::Recording { license_count: Some(license_count) } => license_count,
            _ => 0,
        }
    }

    /// Whether the capability records without licence limits.
    pub fn is_unlimited_recording(&self) -> bool {
        matches!(self.kind, CapabilityKind::Recording { license_count: None })
    }

    pub fn get_value_provider(&self) -> Option<&ValueProviderId> {
        match &self.kind {
            CapabilityKind::AliasProvider { value_provider, .. } | CapabilityKind::ValueProvider { value_provider } => Some(value_provider),
            _ => None,
        }
    }

    pub fn is_restricted_to_resource(&self) -> bool {
        matches!(self.kind, CapabilityKind::AliasProvider { restricted_to_resource: true, .. })
    }

    pub fn get_alias_templates(&self) -> &[AliasTemplate] {
        match &self.kind {
            CapabilityKind::AliasProvider { aliases, .. } => aliases,
            _ => &[],
        }
    }
}
