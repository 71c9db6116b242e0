use std::collections::BTreeSet;

use crate::domain::technology::{Alias, AliasType, CallInitiation, Technology};
use crate::domain::utils::id::{ResourceId, ValueProviderId};

/// Request for aliases of given technologies/types, optionally with a requested value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSpecification {
    pub technologies: BTreeSet<Technology>,
    pub alias_types: BTreeSet<AliasType>,

    /// Requested value (e.g. a room name or a full alias value).
    pub value: Option<String>,

    /// Alias provider resource which must be used.
    pub resource: Option<ResourceId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSetSpecification {
    pub aliases: Vec<AliasSpecification>,

    /// All aliases are allocated for one device, so they share one executable.
    pub shared_executable: bool,
}

/// Recording service requested for a room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingServiceSpecification {
    /// Recording starts together with the room.
    pub enabled: bool,

    /// Recording device which must be used.
    pub resource: Option<ResourceId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSpecification {
    pub participant_count: u32,

    /// Technologies the room must support. Empty means all of the device.
    pub technologies: BTreeSet<Technology>,

    /// Room provider device which must be used.
    pub resource: Option<ResourceId>,

    /// Aliases to allocate for the room.
    pub aliases: Vec<AliasSpecification>,

    pub slot_minutes_before: i64,
    pub slot_minutes_after: i64,

    pub recording: Option<RecordingServiceSpecification>,
}

/// Endpoint which is not managed by the system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalEndpoint {
    pub technologies: BTreeSet<Technology>,
    pub count: u32,
    pub aliases: Vec<Alias>,
    pub call_initiation: Option<CallInitiation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    /// External endpoint(s) identified by technologies (and optionally aliases).
    External(ExternalEndpoint),
    /// Managed terminal given by its resource.
    Existing { resource: ResourceId, call_initiation: Option<CallInitiation> },
    /// Any available managed terminal supporting the technologies.
    Lookup { technologies: BTreeSet<Technology> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompartmentSpecification {
    pub participants: Vec<Participant>,

    /// Default call initiation for connections between rooms and terminals.
    pub call_initiation: Option<CallInitiation>,
}

/// Declarative description of what a reservation request needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specification {
    /// Whole resource.
    Resource { resource: ResourceId },
    Room(RoomSpecification),
    Alias(AliasSpecification),
    AliasSet(AliasSetSpecification),
    Compartment(CompartmentSpecification),
    /// Value from a value provider, optionally a requested one.
    Value { value_provider: ValueProviderId, value: Option<String> },
    /// Managed terminal given by its resource.
    ExistingEndpoint { resource: ResourceId },
    /// Any available managed terminal supporting the technologies.
    LookupEndpoint { technologies: BTreeSet<Technology> },
}

impl Specification {
    pub fn get_name(&self) -> &'static str {
        match self {
            Specification::Resource { .. } => "resource",
            Specification::Room(_) => "room",
            Specification::Alias(_) => "alias",
            Specification::AliasSet(_) => "alias set",
            Specification::Compartment(_) => "compartment",
            Specification::Value { .. } => "value",
            Specification::ExistingEndpoint { .. } => "existing endpoint",
            Specification::LookupEndpoint { .. } => "lookup endpoint",
        }
    }
}
