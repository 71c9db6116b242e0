use std::collections::BTreeSet;
use std::fmt;

use crate::domain::technology::{Alias, CallInitiation, Technology};
use crate::domain::utils::id::{CapabilityId, ExecutableId, ResourceId};
use crate::domain::utils::interval::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutableState {
    NotStarted,
    Started,
    /// Started executable whose configuration was changed by a reallocation.
    Modified,
    Stopped,
}

impl ExecutableState {
    pub fn is_started(&self) -> bool {
        matches!(self, ExecutableState::Started | ExecutableState::Modified)
    }
}

/// Virtual room hosted by a room provider device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEndpoint {
    pub resource: ResourceId,
    pub capability: CapabilityId,
    pub technologies: BTreeSet<Technology>,
    pub license_count: u32,

    /// Aliases assigned to the room by alias reservations.
    pub aliases: Vec<Alias>,

    /// Room of another reservation request whose capacity is extended by this room.
    pub reused_room: Option<ExecutableId>,

    /// Started room which should be migrated into this one.
    pub migrate_from: Option<ExecutableId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointKind {
    /// Endpoint which is not managed by the system (e.g. a participant's own terminal).
    External,
    /// Managed terminal device.
    Resource(ResourceId),
    /// Virtual room allocated for the compartment.
    Room { resource: ResourceId, executable: ExecutableId },
}

/// Participant of a compartment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub kind: EndpointKind,

    pub technologies: BTreeSet<Technology>,

    /// Number of physical endpoints the entry stands for (external endpoints may be several).
    pub count: u32,

    /// Standalone endpoints can call each other without a room.
    pub standalone: bool,

    /// Aliases the endpoint is reachable by on its own.
    pub aliases: Vec<Alias>,

    /// Aliases allocated for the endpoint within the compartment.
    pub assigned_aliases: Vec<Alias>,

    pub call_initiation: Option<CallInitiation>,

    /// Network address of a device, used when it is dialed directly.
    pub address: Option<String>,

    /// Technology preferred by the device when several can be used.
    pub preferred_technology: Option<Technology>,
}

impl Endpoint {
    pub fn is_room(&self) -> bool {
        matches!(self.kind, EndpointKind::Room { .. })
    }

    pub fn get_resource(&self) -> Option<&ResourceId> {
        match &self.kind {
            EndpointKind::External => None,
            EndpointKind::Resource(resource) | EndpointKind::Room { resource, .. } => Some(resource),
        }
    }

    /// Every alias by which the endpoint can be called.
    pub fn get_aliases(&self) -> impl Iterator<Item = &Alias> {
        self.aliases.iter().chain(self.assigned_aliases.iter())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EndpointKind::External => write!(f, "external endpoint ({} x {})", self.count, Technology::format_set(&self.technologies)),
            EndpointKind::Resource(resource) => write!(f, "endpoint '{}'", resource),
            EndpointKind::Room { resource, .. } => write!(f, "virtual room in '{}'", resource),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionKind {
    /// `endpoint_from` dials an alias of `endpoint_to`.
    ByAlias(Alias),
    /// `endpoint_from` dials the network address of `endpoint_to`.
    ByAddress(String),
}

/// Call which must be established between two endpoints of a compartment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Index into [`Compartment::endpoints`] of the dialing endpoint.
    pub endpoint_from: usize,
    /// Index into [`Compartment::endpoints`] of the called endpoint.
    pub endpoint_to: usize,
    pub technology: Technology,
    pub kind: ConnectionKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compartment {
    pub endpoints: Vec<Endpoint>,
    pub connections: Vec<Connection>,
}

impl Compartment {
    pub fn get_total_endpoint_count(&self) -> u32 {
        self.endpoints.iter().map(|endpoint| endpoint.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableKind {
    RoomEndpoint(RoomEndpoint),
    Compartment(Compartment),
}

/// Object which is executed by devices when its slot starts (a room, a set of calls).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    /// **Unique identifier** of the executable.
    pub id: ExecutableId,

    pub slot: Interval,

    pub state: ExecutableState,

    pub kind: ExecutableKind,
}

impl Executable {
    pub fn new(slot: Interval, kind: ExecutableKind) -> Executable {
        Executable { id: ExecutableId::generate(), slot, state: ExecutableState::NotStarted, kind }
    }

    pub fn get_room_endpoint(&self) -> Option<&RoomEndpoint> {
        match &self.kind {
            ExecutableKind::RoomEndpoint(room) => Some(room),
            ExecutableKind::Compartment(_) => None,
        }
    }

    pub fn get_room_endpoint_mut(&mut self) -> Option<&mut RoomEndpoint> {
        match &mut self.kind {
            ExecutableKind::RoomEndpoint(room) => Some(room),
            ExecutableKind::Compartment(_) => None,
        }
    }

    pub fn get_compartment(&self) -> Option<&Compartment> {
        match &self.kind {
            ExecutableKind::Compartment(compartment) => Some(compartment),
            ExecutableKind::RoomEndpoint(_) => None,
        }
    }
}
