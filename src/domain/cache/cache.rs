use std::collections::{BTreeMap, BTreeSet};

use crate::domain::cache::available_room::{AvailableRoom, compute_peak_license_usage};
use crate::domain::reservation::reservation::{ObjectKey, Reservation};
use crate::domain::reservation::reservation_store::{ReservationId, ReservationStore};
use crate::domain::resource::capability::{Capability, CapabilityType};
use crate::domain::resource::resource::Resource;
use crate::domain::resource::resource_store::ResourceStore;
use crate::domain::technology::Technology;
use crate::domain::utils::id::{CapabilityId, ResourceId, ValueProviderId};
use crate::domain::utils::interval::Interval;
use crate::domain::value::value_provider::{ValueProvider, ValueProviderKind};
use crate::error::{Error, Result};

/// In-memory state of everything the scheduler allocates from.
///
/// The cache holds resources with their capabilities, value providers, and all
/// reservations. Persisted reservations are indexed by the objects they allocate.
/// Reservations created by a running scheduling pass live in the same store but stay
/// out of the index until they are persisted.
#[derive(Debug, Default)]
pub struct Cache {
    resources: ResourceStore,
    value_providers: BTreeMap<ValueProviderId, ValueProvider>,
    reservations: ReservationStore,
    reservations_by_object: BTreeMap<ObjectKey, BTreeSet<ReservationId>>,
    persisted: BTreeSet<ReservationId>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&mut self, resource: Resource, capabilities: Vec<Capability>) -> Result<()> {
        log::debug!("Adding resource '{}' with {} capabilities to the cache.", resource.id, capabilities.len());
        self.resources.add(resource, capabilities)
    }

    pub fn add_value_provider(&mut self, value_provider: ValueProvider) -> Result<()> {
        if self.value_providers.contains_key(&value_provider.id) {
            return Err(Error::ModelConstructionError(format!("Value provider '{}' is defined twice.", value_provider.id)));
        }
        self.resources.capability(&value_provider.capability)?;
        self.value_providers.insert(value_provider.id.clone(), value_provider);
        Ok(())
    }

    pub fn get_resources(&self) -> &ResourceStore {
        &self.resources
    }

    pub fn get_resource(&self, id: &ResourceId) -> Result<&Resource> {
        self.resources.resource(id)
    }

    pub fn get_capability(&self, id: &CapabilityId) -> Result<&Capability> {
        self.resources.capability(id)
    }

    pub fn get_room_providers(&self) -> Vec<&Capability> {
        self.resources.capabilities_of_type(CapabilityType::RoomProvider)
    }

    pub fn get_alias_providers(&self) -> Vec<&Capability> {
        self.resources.capabilities_of_type(CapabilityType::AliasProvider)
    }

    pub fn get_value_provider(&self, id: &ValueProviderId) -> Result<&ValueProvider> {
        self.value_providers.get(id).ok_or_else(|| Error::not_found("ValueProvider", id))
    }

    /// Resolves chains of filtered value providers to the provider whose value space
    /// is actually allocated.
    pub fn get_target_value_provider(&self, id: &ValueProviderId) -> Result<&ValueProvider> {
        let mut visited = BTreeSet::new();
        let mut value_provider = self.get_value_provider(id)?;
        while let ValueProviderKind::Filtered { target, .. } = &value_provider.kind {
            if !visited.insert(value_provider.id.clone()) {
                return Err(Error::InvalidState(format!("Value provider '{}' filters itself.", id)));
            }
            value_provider = self.get_value_provider(target)?;
        }
        Ok(value_provider)
    }

    pub fn reservations(&self) -> &ReservationStore {
        &self.reservations
    }

    pub fn reservations_mut(&mut self) -> &mut ReservationStore {
        &mut self.reservations
    }

    pub fn get_reservation(&self, id: ReservationId) -> Result<&Reservation> {
        self.reservations.reservation(id)
    }

    /// Stores a new reservation. It is not taken into account by allocation queries
    /// until [`Cache::persist_reservation`] is called.
    pub fn add_reservation(&mut self, reservation: Reservation) -> ReservationId {
        self.reservations.add(reservation)
    }

    /// Indexes the reservation with its whole subtree.
    pub fn persist_reservation(&mut self, id: ReservationId) -> Result<()> {
        self.reservations.reservation(id)?;
        for reservation_id in self.reservations.get_set_of_all(id) {
            if !self.persisted.insert(reservation_id) {
                continue;
            }
            let keys = self.reservations.reservation(reservation_id)?.get_object_keys();
            for key in keys {
                self.reservations_by_object.entry(key).or_default().insert(reservation_id);
            }
        }
        Ok(())
    }

    /// Removes the reservation together with its subtree from the cache.
    pub fn remove_reservation(&mut self, id: ReservationId) -> Vec<Reservation> {
        for reservation_id in self.reservations.get_set_of_all(id) {
            if !self.persisted.remove(&reservation_id) {
                continue;
            }
            let keys = match self.reservations.get(reservation_id) {
                Some(reservation) => reservation.get_object_keys(),
                None => continue,
            };
            for key in keys {
                if let Some(ids) = self.reservations_by_object.get_mut(&key) {
                    ids.remove(&reservation_id);
                    if ids.is_empty() {
                        self.reservations_by_object.remove(&key);
                    }
                }
            }
        }
        self.reservations.remove_tree(id)
    }

    /// Persisted reservations of the object whose slot overlaps `slot`.
    pub fn list_reservations(&self, key: &ObjectKey, slot: &Interval) -> Vec<ReservationId> {
        match self.reservations_by_object.get(key) {
            Some(ids) => ids
                .iter()
                .copied()
                .filter(|id| self.reservations.get(*id).is_some_and(|reservation| reservation.slot.overlaps(slot)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Availability of a room provider given the reservations which use it.
    pub fn compute_available_room(&self, capability: &Capability, reservations: &[ReservationId], slot: &Interval, resource_available: bool) -> AvailableRoom {
        let maximum_license_count = capability.get_license_count();
        let used_license_count = if resource_available {
            compute_peak_license_usage(reservations.iter().filter_map(|id| self.reservations.get(*id)), slot)
        } else {
            maximum_license_count
        };
        AvailableRoom {
            resource: capability.resource.clone(),
            capability: capability.id.clone(),
            maximum_license_count,
            available_license_count: maximum_license_count.saturating_sub(used_license_count),
        }
    }

    /// Room providers supporting all `technologies` with at least `license_count` free
    /// licences in the whole `slot`, considering only persisted reservations.
    pub fn find_available_rooms(&self, slot: &Interval, technologies: &BTreeSet<Technology>, license_count: u32) -> Vec<AvailableRoom> {
        let mut available_rooms = Vec::new();
        for capability in self.get_room_providers() {
            let resource = match self.resources.get(&capability.resource) {
                Some(resource) => resource,
                None => continue,
            };
            if !technologies.is_subset(&resource.get_technologies()) {
                continue;
            }
            let reservations = self.list_reservations(&ObjectKey::RoomProvider(capability.id.clone()), slot);
            let available_room = self.compute_available_room(capability, &reservations, slot, resource.allocatable);
            if available_room.available_license_count >= license_count {
                available_rooms.push(available_room);
            }
        }
        available_rooms
    }
}
