use std::collections::BTreeSet;

use crate::config::SchedulerConfig;
use crate::domain::cache::available_room::{AvailableRoom, compute_peak_license_usage};
use crate::domain::cache::cache::Cache;
use crate::domain::request::reservation_request::{ReservationRequest, ReservationRequestPurpose};
use crate::domain::reservation::available_reservation::{AvailableReservation, AvailableReservationType};
use crate::domain::reservation::reservation::{ObjectKey, Reservation};
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::resource::capability::Capability;
use crate::domain::resource::resource::Resource;
use crate::domain::scheduler::context_state::{Savepoint, SchedulerContextState};
use crate::domain::scheduler::notification::Notification;
use crate::domain::scheduler::persistence::Persistence;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::reservation_task::TaskBase;
use crate::domain::utils::id::{CapabilityId, ReservationRequestId, ResourceId, UserId};
use crate::domain::utils::interval::Interval;
use crate::error::{Error, Result};

/// User which may allocate every resource regardless of ownership.
pub const ROOT_USER_ID: &str = "0";

/// What a finished scheduling pass leaves behind for the driver.
#[derive(Debug, Default)]
pub struct SchedulerContextResult {
    pub notifications: Vec<Notification>,

    /// Persisted reservations which must be deleted.
    pub reservations_to_delete: Vec<ReservationId>,

    /// Reservation requests which lost their reservations and must be allocated again.
    pub force_reallocation: Vec<ReservationRequestId>,
}

/// Scheduling pass over the [`Cache`].
///
/// The context keeps the transactional [`SchedulerContextState`] of the pass together with
/// the attributes of the reservation request which is being allocated. Reservations
/// created by tasks are stored in the cache right away but they are not persisted; the
/// driver either keeps them by [`SchedulerContext::finish`] or drops them by
/// [`SchedulerContext::discard`].
pub struct SchedulerContext<'a> {
    cache: &'a mut Cache,

    persistence: &'a dyn Persistence,

    config: &'a SchedulerConfig,

    /// Nothing is allocated before this date/time (ms).
    minimum_date_time: i64,

    reservation_request: Option<ReservationRequestId>,

    purpose: Option<ReservationRequestPurpose>,

    priority: i32,

    user_id: Option<UserId>,

    state: SchedulerContextState,

    /// Reservations created by this pass, kept in the cache until the pass finishes.
    created_reservations: BTreeSet<ReservationId>,
}

impl<'a> SchedulerContext<'a> {
    pub fn new(cache: &'a mut Cache, persistence: &'a dyn Persistence, config: &'a SchedulerConfig, minimum_date_time: i64) -> SchedulerContext<'a> {
        SchedulerContext {
            cache,
            persistence,
            config,
            minimum_date_time,
            reservation_request: None,
            purpose: None,
            priority: 0,
            user_id: None,
            state: SchedulerContextState::new(),
            created_reservations: BTreeSet::new(),
        }
    }

    /// Takes over the attributes of the reservation request which is going to be allocated.
    pub fn set_reservation_request(&mut self, reservation_request: &ReservationRequest) {
        self.reservation_request = Some(reservation_request.id.clone());
        self.purpose = Some(reservation_request.purpose);
        self.priority = reservation_request.priority;
        self.user_id = Some(reservation_request.user_id.clone());
    }

    pub fn get_reservation_request(&self) -> Option<&ReservationRequestId> {
        self.reservation_request.as_ref()
    }

    pub fn get_cache(&self) -> &Cache {
        self.cache
    }

    pub fn get_persistence(&self) -> &'a dyn Persistence {
        self.persistence
    }

    pub fn get_config(&self) -> &'a SchedulerConfig {
        self.config
    }

    pub fn get_minimum_date_time(&self) -> i64 {
        self.minimum_date_time
    }

    pub fn get_state(&self) -> &SchedulerContextState {
        &self.state
    }

    pub fn get_state_mut(&mut self) -> &mut SchedulerContextState {
        &mut self.state
    }

    pub fn is_executable_allowed(&self) -> bool {
        self.purpose.is_none_or(|purpose| purpose.is_executable_allowed())
    }

    /// Only resources owned by the requesting user may be allocated.
    pub fn is_owner_restricted(&self) -> bool {
        self.purpose.is_some_and(|purpose| purpose.is_by_owner()) || self.priority > 0
    }

    pub fn is_maintenance(&self) -> bool {
        self.purpose == Some(ReservationRequestPurpose::Maintenance)
    }

    pub fn is_maximum_future_and_duration_restricted(&self) -> bool {
        self.purpose.is_some_and(|purpose| !purpose.is_by_owner())
    }

    fn is_administrator(&self) -> bool {
        self.user_id.as_ref().is_some_and(|user_id| user_id.as_str() == ROOT_USER_ID)
    }

    pub fn create_savepoint(&mut self) -> Savepoint {
        self.state.create_savepoint()
    }

    pub fn revert(&mut self, savepoint: Savepoint) -> Result<()> {
        log::trace!("Reverting scheduler context savepoint {:?}.", savepoint);
        self.state.revert(savepoint)
    }

    pub fn destroy(&mut self, savepoint: Savepoint) {
        self.state.destroy(savepoint);
    }

    pub fn get_current_savepoint(&self) -> Option<Savepoint> {
        self.state.get_current_savepoint()
    }

    pub fn get_reservation(&self, id: ReservationId) -> Result<&Reservation> {
        self.cache.get_reservation(id)
    }

    /// Mutable access to a reservation created by this pass. Persisted reservations are
    /// changed by the driver only.
    pub fn get_created_reservation_mut(&mut self, id: ReservationId) -> Result<&mut Reservation> {
        if !self.created_reservations.contains(&id) {
            return Err(Error::InvalidState("Only reservations created by the current pass can be modified.".to_string()));
        }
        self.cache.reservations_mut().reservation_mut(id)
    }

    pub fn is_created_reservation(&self, id: ReservationId) -> bool {
        self.created_reservations.contains(&id)
    }

    /// Reservation actually holding the allocation of `id`.
    pub fn get_target(&self, id: ReservationId) -> ReservationId {
        self.cache.reservations().get_target(id)
    }

    pub fn create_reservation(&mut self, reservation: Reservation) -> ReservationId {
        let id = self.cache.add_reservation(reservation);
        self.created_reservations.insert(id);
        id
    }

    pub fn add_child_reservation(&mut self, parent: ReservationId, child: ReservationId) -> Result<()> {
        self.cache.reservations_mut().add_child(parent, child)
    }

    pub fn add_notification(&mut self, notification: Notification) -> Result<()> {
        self.state.add_notification(notification)
    }

    pub fn add_allocated_reservation(&mut self, id: ReservationId) -> Result<()> {
        let reservation = self.cache.get_reservation(id)?;
        let keys = reservation.get_object_keys();
        let slot = reservation.slot;
        self.state.add_allocated_reservation(id, keys, slot)
    }

    pub fn remove_allocated_reservation(&mut self, id: ReservationId) -> Result<()> {
        self.state.remove_allocated_reservation(id)
    }

    /// Offers the reservation with its whole subtree to the current pass.
    pub fn add_available_reservation(&mut self, original: ReservationId, available_type: AvailableReservationType) -> Result<()> {
        let reservations = self.cache.reservations();
        let mut entries = Vec::new();
        for id in reservations.get_set_of_all(original) {
            let reservation = reservations.reservation(id)?;
            let target = reservations.get_target(id);
            let mut keys = reservation.get_object_keys();
            if target != id {
                for key in reservations.reservation(target)?.get_object_keys() {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
            entries.push((AvailableReservation { original: id, target, available_type, original_slot: reservation.slot }, keys));
        }
        for (available, keys) in entries {
            if let Some(existing) = self.state.get_available_reservation(available.original) {
                if existing.available_type != available_type {
                    return Err(Error::InvalidState(format!("Reservation is already available as {:?}.", existing.available_type)));
                }
                continue;
            }
            self.state.add_available_reservation(available, keys)?;
        }
        Ok(())
    }

    /// Withdraws an available reservation. Its descendants are withdrawn as well and so are
    /// its ancestors unless it is reallocatable.
    pub fn remove_available_reservation(&mut self, original: ReservationId) -> Result<()> {
        self.remove_available_reservation_recursive(original, true, true)
    }

    fn remove_available_reservation_recursive(&mut self, original: ReservationId, remove_parent: bool, remove_children: bool) -> Result<()> {
        let available = match self.state.get_available_reservation(original) {
            Some(available) => available,
            None => return Ok(()),
        };
        self.state.remove_available_reservation(original)?;

        let (parent, children) = {
            let reservation = self.cache.get_reservation(original)?;
            (reservation.parent, reservation.children.clone())
        };
        if remove_parent && !available.is_type(AvailableReservationType::Reallocatable) {
            if let Some(parent) = parent {
                self.remove_available_reservation_recursive(parent, true, false)?;
            }
        }
        if remove_children {
            for child in children {
                self.remove_available_reservation_recursive(child, false, true)?;
            }
        }
        Ok(())
    }

    /// Available reservations of the object whose original slot overlaps `slot`.
    pub fn get_available_reservations(&self, key: &ObjectKey, slot: &Interval) -> Vec<AvailableReservation> {
        self.state.get_transaction().get_available(key, slot)
    }

    /// Reusable available reservations whose target holds a room of `resource`.
    pub fn get_available_room_endpoints(&self, resource: &ResourceId) -> Vec<AvailableReservation> {
        self.state
            .get_available_reservations()
            .into_iter()
            .filter(|available| available.is_type(AvailableReservationType::Reusable))
            .filter(|available| {
                self.cache
                    .reservations()
                    .get(available.target)
                    .and_then(|reservation| reservation.executable.as_ref())
                    .and_then(|executable| executable.get_room_endpoint())
                    .is_some_and(|room| &room.resource == resource)
            })
            .collect()
    }

    /// Reservations of the object in `slot` as seen by the current pass.
    pub fn list_reservations(&self, key: &ObjectKey, slot: &Interval) -> Vec<ReservationId> {
        let mut reservations = self.cache.list_reservations(key, slot);
        self.state.get_transaction().apply(key, slot, &mut reservations);
        reservations
    }

    /// Reservation request which owns the tree the reservation belongs to.
    pub fn get_reservation_request_of(&self, reservation: ReservationId) -> Option<&'a ReservationRequest> {
        let persistence = self.persistence;
        let top = self.cache.reservations().get_top(reservation);
        let allocation = self.cache.reservations().get(top)?.allocation.clone()?;
        persistence.get_reservation_request(&allocation)
    }

    /// Whether the current request has a greater priority than the owners of every
    /// given reservation.
    pub fn has_higher_priority(&self, reservations: &[ReservationId]) -> bool {
        for reservation in reservations {
            match self.get_reservation_request_of(*reservation) {
                Some(reservation_request) if self.priority > reservation_request.priority => {}
                _ => return false,
            }
        }
        true
    }

    /// Decides what happens when the requested object is already allocated by
    /// `colliding` reservations.
    ///
    /// Reservations of requests with lower priority are scheduled for forced reallocation,
    /// a maintenance request schedules every colliding request for reallocation attempt;
    /// otherwise the collision fails the allocation.
    pub fn detect_collisions(&mut self, task: &mut TaskBase, resource: &ResourceId, colliding: &[ReservationId]) -> std::result::Result<(), SchedulerError> {
        let first = match colliding.first() {
            Some(first) => *first,
            None => return Ok(()),
        };

        if self.has_higher_priority(colliding) {
            let mut reservation_requests = Vec::new();
            for reservation in colliding {
                if let Some(reservation_request) = self.get_reservation_request_of(*reservation) {
                    self.state.force_reservation_request_reallocation(reservation_request.id.clone());
                    if !reservation_requests.contains(&reservation_request.id) {
                        reservation_requests.push(reservation_request.id.clone());
                    }
                }
            }
            log::debug!("Colliding reservation requests {:?} will be reallocated.", reservation_requests);
            task.add_report(SchedulerReport::new(ReportKind::ReallocatingReservationRequests { reservation_requests }));
            return Ok(());
        }

        if self.is_maintenance() {
            let mut reservations = Vec::new();
            for reservation in colliding {
                let slot = self.cache.get_reservation(*reservation)?.slot;
                if let Some(reservation_request) = self.get_reservation_request_of(*reservation) {
                    self.state.try_reservation_request_reallocation(reservation_request.id.clone());
                    reservations.push((reservation_request.id.clone(), slot));
                }
            }
            task.add_report(SchedulerReport::new(ReportKind::CollidingReservations { reservations }));
            return Ok(());
        }

        let interval = self.cache.get_reservation(first)?.slot;
        let under_maintenance = self
            .get_reservation_request_of(first)
            .is_some_and(|reservation_request| reservation_request.purpose == ReservationRequestPurpose::Maintenance);
        if under_maintenance {
            return Err(SchedulerError::new(ReportKind::ResourceUnderMaintenance { interval }));
        }
        Err(SchedulerError::new(ReportKind::ResourceAlreadyAllocated { resource: resource.clone(), interval }))
    }

    fn check_resource_available_without_future(&mut self, resource: &Resource, slot: &Interval, task: &mut TaskBase) -> std::result::Result<(), SchedulerError> {
        if !resource.allocatable {
            return Err(SchedulerError::new(ReportKind::ResourceNotAllocatable { resource: resource.id.clone() }));
        }

        if self.is_owner_restricted() && !self.is_administrator() {
            let is_owner = self.user_id.as_ref().is_some_and(|user_id| resource.owners.contains(user_id));
            if !is_owner {
                return Err(SchedulerError::new(ReportKind::UserNotOwner));
            }
        }

        let reservations = self.list_reservations(&ObjectKey::Resource(resource.id.clone()), slot);
        self.detect_collisions(task, &resource.id, &reservations)
    }

    fn check_maximum_future(&self, resource: &ResourceId, maximum_future: Option<i64>, slot: &Interval) -> std::result::Result<(), SchedulerError> {
        if !self.is_maximum_future_and_duration_restricted() {
            return Ok(());
        }
        if let Some(maximum_future) = maximum_future {
            let max_date_time = self.minimum_date_time.saturating_add(maximum_future);
            if slot.end > max_date_time {
                return Err(SchedulerError::new(ReportKind::ResourceNotAvailable { resource: resource.clone(), max_date_time }));
            }
        }
        Ok(())
    }

    /// Checks that the whole resource can be allocated in `slot`.
    pub fn check_resource_available(&mut self, resource: &ResourceId, slot: &Interval, task: &mut TaskBase) -> std::result::Result<(), SchedulerError> {
        let resource = self.cache.get_resource(resource)?.clone();
        self.check_resource_available_without_future(&resource, slot, task)?;
        self.check_maximum_future(&resource.id, resource.maximum_future, slot)
    }

    /// Checks that the capability's resource can be used in `slot`. Room providers stay
    /// available even when all of their licences are used.
    pub fn check_capability_available(&mut self, capability: &Capability, slot: &Interval, task: &mut TaskBase) -> std::result::Result<(), SchedulerError> {
        let resource = self.cache.get_resource(&capability.resource)?.clone();
        self.check_resource_available_without_future(&resource, slot, task)?;
        self.check_maximum_future(&resource.id, resource.maximum_future, slot)?;
        self.check_maximum_future(&resource.id, capability.maximum_future, slot)
    }

    /// Checks the resource together with the whole tree of resources it depends on.
    pub fn check_resource_available_by_parent(&mut self, resource: &ResourceId, slot: &Interval, task: &mut TaskBase) -> std::result::Result<(), SchedulerError> {
        self.check_resource_available(resource, slot, task)?;
        let top_parent = self.cache.get_resources().top_parent(resource);
        self.check_resource_and_children_available(&top_parent, slot, resource, task)
    }

    fn check_resource_and_children_available(&mut self, resource: &ResourceId, slot: &Interval, skipped: &ResourceId, task: &mut TaskBase) -> std::result::Result<(), SchedulerError> {
        if resource == skipped || self.state.contains_referenced_resource(resource) {
            return Ok(());
        }
        self.check_resource_available(resource, slot, task)?;
        for child in self.cache.get_resources().children(resource) {
            self.check_resource_and_children_available(&child, slot, skipped, task)?;
        }
        Ok(())
    }

    /// Availability check without side effects, used to rate room providers.
    fn is_resource_available(&self, resource: &Resource, slot: &Interval) -> bool {
        if !resource.allocatable {
            return false;
        }
        if self.is_maximum_future_and_duration_restricted() {
            if let Some(max_date_time) = resource.get_maximum_date_time(self.minimum_date_time) {
                if slot.end > max_date_time {
                    return false;
                }
            }
        }
        self.list_reservations(&ObjectKey::Resource(resource.id.clone()), slot).is_empty()
    }

    /// Licence availability of a room provider in `slot`, including the allocations of
    /// the current pass.
    pub fn get_available_room(&self, capability: &CapabilityId, slot: &Interval) -> Result<AvailableRoom> {
        let capability = self.cache.get_capability(capability)?;
        let resource = self.cache.get_resource(&capability.resource)?;
        let maximum_license_count = capability.get_license_count();
        let used_license_count = if self.is_resource_available(resource, slot) {
            let reservations = self.list_reservations(&ObjectKey::RoomProvider(capability.id.clone()), slot);
            compute_peak_license_usage(reservations.iter().filter_map(|id| self.cache.reservations().get(*id)), slot)
        } else {
            maximum_license_count
        };
        Ok(AvailableRoom {
            resource: resource.id.clone(),
            capability: capability.id.clone(),
            maximum_license_count,
            available_license_count: maximum_license_count.saturating_sub(used_license_count),
        })
    }

    /// Offers the reservation of another request's allocation which covers `slot` for reuse.
    ///
    /// # Errors
    /// `ReservationRequestInvalidSlot` when no reservation of the allocation covers the slot,
    /// `ReservationAlreadyUsed` when the reservation is already reused in the slot.
    pub fn set_reusable_allocation(&mut self, reused: &ReservationRequestId, slot: &Interval) -> std::result::Result<ReservationId, SchedulerError> {
        let persistence = self.persistence;
        let reused_request = persistence.reservation_request(reused)?;

        let mut reusable = None;
        let mut last_interval = reused_request.slot;
        for reservation in &reused_request.allocation.reservations {
            last_interval = self.cache.get_reservation(*reservation)?.slot;
            if last_interval.contains(slot) {
                reusable = Some(*reservation);
                break;
            }
        }
        let reusable = match reusable {
            Some(reusable) => reusable,
            None => {
                return Err(SchedulerError::new(ReportKind::ReservationRequestInvalidSlot { interval: last_interval, reservation_request: reused.clone() }));
            }
        };

        let usages = self.list_reservations(&ObjectKey::Reservation(reusable), slot);
        if let Some(usage) = usages.first() {
            let usage_interval = self.cache.get_reservation(*usage)?.slot;
            let usage_reservation_request = match self.get_reservation_request_of(*usage) {
                Some(reservation_request) => reservation_request.id.clone(),
                None => self.reservation_request.clone().unwrap_or_else(|| reused.clone()),
            };
            return Err(SchedulerError::new(ReportKind::ReservationAlreadyUsed {
                reservation_request: reused.clone(),
                usage_reservation_request,
                usage_interval,
            }));
        }

        self.add_available_reservation(reusable, AvailableReservationType::Reusable)?;
        Ok(reusable)
    }

    /// Ends the pass. Created reservations which are not part of any `allocated` tree are
    /// dropped from the cache.
    pub fn finish(mut self, allocated: &[ReservationId]) -> SchedulerContextResult {
        let mut kept = BTreeSet::new();
        for reservation in allocated {
            kept.extend(self.cache.reservations().get_set_of_all(*reservation));
        }
        let unused: Vec<ReservationId> = self.created_reservations.iter().copied().filter(|id| !kept.contains(id)).collect();
        for id in unused {
            if self.cache.reservations().contains(id) {
                self.cache.reservations_mut().remove_tree(id);
            }
        }

        SchedulerContextResult {
            notifications: self.state.take_notifications(),
            reservations_to_delete: self.state.get_reservations_to_delete().to_vec(),
            force_reallocation: self.state.get_force_reallocation().to_vec(),
        }
    }

    /// Drops the pass together with every reservation it created.
    pub fn discard(self) {
        for id in &self.created_reservations {
            if self.cache.reservations().contains(*id) {
                self.cache.reservations_mut().remove_tree(*id);
            }
        }
    }
}
