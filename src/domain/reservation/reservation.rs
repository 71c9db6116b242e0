use std::fmt;

use crate::domain::reservation::executable::Executable;
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::technology::Alias;
use crate::domain::utils::id::{CapabilityId, ExecutableId, ReservationRequestId, ResourceId, UserId, ValueProviderId};
use crate::domain::utils::interval::Interval;

/// Key of an object which can be allocated in a time slot.
///
/// Reservations are indexed under the object they allocate, so that "which reservations
/// of X overlap slot I" can be answered for resources, capabilities and value providers
/// alike. Existing reservations are indexed under the reservation they reuse.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKey {
    Resource(ResourceId),
    RoomProvider(CapabilityId),
    AliasProvider(CapabilityId),
    ValueProvider(ValueProviderId),
    Recording(CapabilityId),
    Reservation(ReservationId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationKind {
    /// Reservation which only groups child reservations (alias sets, compartments).
    Plain,

    /// Whole resource allocated exclusively.
    Resource { resource: ResourceId },

    /// Terminal allocated as an endpoint of a compartment.
    Endpoint { resource: ResourceId },

    /// Licences of a room provider.
    Room { resource: ResourceId, capability: CapabilityId, license_count: u32 },

    /// Aliases of an alias provider, backed by a value reservation (a child).
    Alias { resource: ResourceId, capability: CapabilityId, value_reservation: ReservationId, aliases: Vec<Alias> },

    /// Single value of a value provider. `requested_value` holds the original value
    /// for filtered providers.
    Value { resource: ResourceId, value_provider: ValueProviderId, value: String, requested_value: Option<String> },

    /// One recorder licence of a recording capability serving an executable.
    RecordingService { resource: ResourceId, capability: CapabilityId, executable: ExecutableId, enabled: bool },

    /// Reuse pointer to a reservation allocated for another reservation request.
    Existing { reused: ReservationId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationType {
    Plain,
    Resource,
    Endpoint,
    Room,
    Alias,
    Value,
    RecordingService,
    Existing,
}

impl fmt::Display for ReservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReservationType::Plain => "reservation",
            ReservationType::Resource => "resource reservation",
            ReservationType::Endpoint => "endpoint reservation",
            ReservationType::Room => "room reservation",
            ReservationType::Alias => "alias reservation",
            ReservationType::Value => "value reservation",
            ReservationType::RecordingService => "recording service reservation",
            ReservationType::Existing => "existing reservation",
        };
        write!(f, "{}", name)
    }
}

/// Allocation of some object for a time slot.
#[derive(Debug, Clone)]
pub struct Reservation {
    /// The **time slot** for which the object is allocated.
    pub slot: Interval,

    pub kind: ReservationKind,

    /// The **parent** reservation (set for child reservations only).
    pub parent: Option<ReservationId>,

    pub children: Vec<ReservationId>,

    /// Reservation request whose allocation owns the reservation. Only top reservations
    /// have it set.
    pub allocation: Option<ReservationRequestId>,

    /// Executable created for the reservation (room endpoint, compartment, ...).
    pub executable: Option<Executable>,

    /// User who caused the allocation.
    pub user_id: Option<UserId>,
}

impl Reservation {
    pub fn new(slot: Interval, kind: ReservationKind) -> Reservation {
        Reservation { slot, kind, parent: None, children: Vec::new(), allocation: None, executable: None, user_id: None }
    }

    pub fn get_type(&self) -> ReservationType {
        match self.kind {
            ReservationKind::Plain => ReservationType::Plain,
            ReservationKind::Resource { .. } => ReservationType::Resource,
            ReservationKind::Endpoint { .. } => ReservationType::Endpoint,
            ReservationKind::Room { .. } => ReservationType::Room,
            ReservationKind::Alias { .. } => ReservationType::Alias,
            ReservationKind::Value { .. } => ReservationType::Value,
            ReservationKind::RecordingService { .. } => ReservationType::RecordingService,
            ReservationKind::Existing { .. } => ReservationType::Existing,
        }
    }

    /// Keys of the objects the reservation allocates. A room reservation allocates
    /// licences of its capability, not the whole device, and therefore has no
    /// resource key.
    pub fn get_object_keys(&self) -> Vec<ObjectKey> {
        match &self.kind {
            ReservationKind::Plain => Vec::new(),
            ReservationKind::Resource { resource } | ReservationKind::Endpoint { resource } => vec![ObjectKey::Resource(resource.clone())],
            ReservationKind::Room { capability, .. } => vec![ObjectKey::RoomProvider(capability.clone())],
            ReservationKind::Alias { capability, .. } => vec![ObjectKey::AliasProvider(capability.clone())],
            ReservationKind::Value { value_provider, .. } => vec![ObjectKey::ValueProvider(value_provider.clone())],
            ReservationKind::RecordingService { capability, .. } => vec![ObjectKey::Recording(capability.clone())],
            ReservationKind::Existing { reused } => vec![ObjectKey::Reservation(*reused)],
        }
    }

    /// Resource which is (partially) allocated by the reservation.
    pub fn get_allocated_resource(&self) -> Option<&ResourceId> {
        match &self.kind {
            ReservationKind::Resource { resource }
            | ReservationKind::Endpoint { resource }
            | ReservationKind::Room { resource, .. }
            | ReservationKind::Alias { resource, .. }
            | ReservationKind::Value { resource, .. }
            | ReservationKind::RecordingService { resource, .. } => Some(resource),
            ReservationKind::Plain | ReservationKind::Existing { .. } => None,
        }
    }

    pub fn get_license_count(&self) -> u32 {
        match self.kind {
            ReservationKind::Room { license_count, .. } => license_count,
            ReservationKind::RecordingService { .. } => 1,
            _ => 0,
        }
    }

    pub fn get_value(&self) -> Option<&str> {
        match &self.kind {
            ReservationKind::Value { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn get_aliases(&self) -> &[Alias] {
        match &self.kind {
            ReservationKind::Alias { aliases, .. } => aliases,
            _ => &[],
        }
    }

    /// Whether the executable of the reservation has already been started.
    pub fn is_executable_started(&self) -> bool {
        self.executable.as_ref().is_some_and(|executable| executable.state.is_started())
    }
}
