use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::resource::capability::{Capability, CapabilityType};
use crate::domain::resource::resource::Resource;
use crate::domain::utils::id::{CapabilityId, ResourceId};
use crate::error::{Error, Result};

/// Index of all resources and capabilities known to the scheduler.
///
/// Resources form a tree through their optional parent; the store keeps the reverse
/// (parent to children) index so that dependent resources can be checked together.
#[derive(Debug, Default)]
pub struct ResourceStore {
    resources: BTreeMap<ResourceId, Resource>,

    capabilities: BTreeMap<CapabilityId, Capability>,

    /// Capabilities grouped by type, in insertion order of their resources.
    capabilities_by_type: HashMap<CapabilityType, Vec<CapabilityId>>,

    /// Index lookup of child resources by parent resource.
    children: HashMap<ResourceId, BTreeSet<ResourceId>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        ResourceStore::default()
    }

    /// Adds a resource together with its capabilities.
    ///
    /// The capability list of the resource is replaced by the identifiers of `capabilities`.
    pub fn add(&mut self, mut resource: Resource, capabilities: Vec<Capability>) -> Result<()> {
        if self.resources.contains_key(&resource.id) {
            return Err(Error::ModelConstructionError(format!("Resource '{}' is defined multiple times.", resource.id)));
        }

        resource.capabilities.clear();
        for mut capability in capabilities {
            if self.capabilities.contains_key(&capability.id) {
                return Err(Error::ModelConstructionError(format!("Capability '{}' is defined multiple times.", capability.id)));
            }
            capability.resource = resource.id.clone();
            resource.capabilities.push(capability.id.clone());
            self.capabilities_by_type.entry(capability.get_type()).or_default().push(capability.id.clone());
            self.capabilities.insert(capability.id.clone(), capability);
        }

        if let Some(parent) = &resource.parent {
            self.children.entry(parent.clone()).or_default().insert(resource.id.clone());
        }

        log::debug!("Resource '{}' added with {} capabilities.", resource.id, resource.capabilities.len());
        self.resources.insert(resource.id.clone(), resource);
        Ok(())
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn get_capability(&self, id: &CapabilityId) -> Option<&Capability> {
        self.capabilities.get(id)
    }

    pub fn resource(&self, id: &ResourceId) -> Result<&Resource> {
        self.resources.get(id).ok_or_else(|| Error::not_found("Resource", id))
    }

    pub fn capability(&self, id: &CapabilityId) -> Result<&Capability> {
        self.capabilities.get(id).ok_or_else(|| Error::not_found("Capability", id))
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn capabilities_of_type(&self, capability_type: CapabilityType) -> Vec<&Capability> {
        match self.capabilities_by_type.get(&capability_type) {
            Some(ids) => ids.iter().filter_map(|id| self.capabilities.get(id)).collect(),
            None => Vec::new(),
        }
    }

    /// First capability of the given type declared by the resource.
    pub fn resource_capability(&self, resource: &ResourceId, capability_type: CapabilityType) -> Option<&Capability> {
        let resource = self.resources.get(resource)?;
        resource.capabilities.iter().filter_map(|id| self.capabilities.get(id)).find(|capability| capability.get_type() == capability_type)
    }

    pub fn children(&self, id: &ResourceId) -> Vec<ResourceId> {
        match self.children.get(id) {
            Some(children) => children.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Walks the parent chain up to the root resource.
    pub fn top_parent(&self, id: &ResourceId) -> ResourceId {
        let mut current = id.clone();
        let mut visited = BTreeSet::new();
        while let Some(parent) = self.resources.get(&current).and_then(|resource| resource.parent.clone()) {
            if !visited.insert(current.clone()) {
                log::warn!("Resource parent cycle detected at '{}'.", current);
                break;
            }
            current = parent;
        }
        current
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
