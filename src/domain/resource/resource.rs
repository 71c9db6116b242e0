use std::collections::BTreeSet;

use crate::domain::technology::Technology;
use crate::domain::utils::id::{CapabilityId, ResourceId, UserId};

/// Device part of a resource (an MCU, a terminal, a recording server).
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// The **technologies** the device speaks.
    pub technologies: BTreeSet<Technology>,

    /// Network address by which the device is reachable, if known.
    pub address: Option<String>,

    /// Technology used when a connection could be made in several common technologies.
    pub preferred_technology: Option<Technology>,
}

/// Administrator-managed entity which can be allocated by the scheduler.
#[derive(Debug, Clone)]
pub struct Resource {
    /// **Unique identifier** of the resource.
    pub id: ResourceId,

    /// Human readable name.
    pub name: String,

    /// Disabled resources are never allocated.
    pub allocatable: bool,

    /// Parent resource which must be allocated together with this one.
    pub parent: Option<ResourceId>,

    /// Maximum distance into the future (ms, relative to the scheduling minimum date/time)
    /// for which the resource may be allocated.
    pub maximum_future: Option<i64>,

    /// The **owners** of the resource.
    pub owners: BTreeSet<UserId>,

    /// Present when the resource is a device.
    pub device: Option<DeviceInfo>,

    /// Capabilities declared by the resource, in declaration order.
    pub capabilities: Vec<CapabilityId>,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>) -> Resource {
        let id = id.into();
        Resource {
            name: id.to_string(),
            id,
            allocatable: true,
            parent: None,
            maximum_future: None,
            owners: BTreeSet::new(),
            device: None,
            capabilities: Vec::new(),
        }
    }

    pub fn get_technologies(&self) -> BTreeSet<Technology> {
        match &self.device {
            Some(device) => device.technologies.clone(),
            None => BTreeSet::new(),
        }
    }

    pub fn get_preferred_technology(&self) -> Option<Technology> {
        self.device.as_ref().and_then(|device| device.preferred_technology)
    }

    /// Latest date/time the resource can be allocated to, given the scheduling reference time.
    pub fn get_maximum_date_time(&self, reference_time: i64) -> Option<i64> {
        self.maximum_future.map(|future| reference_time.saturating_add(future))
    }
}
