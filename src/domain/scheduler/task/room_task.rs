use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::domain::cache::available_room::AvailableRoom;
use crate::domain::request::specification::{AliasSpecification, RecordingServiceSpecification, RoomSpecification};
use crate::domain::reservation::available_reservation::AvailableReservation;
use crate::domain::reservation::executable::{Executable, ExecutableKind, RoomEndpoint};
use crate::domain::reservation::reservation::{Reservation, ReservationKind};
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::resource::capability::{Capability, CapabilityKind, CapabilityType};
use crate::domain::scheduler::context::SchedulerContext;
use crate::domain::scheduler::notification::Notification;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::alias_task::AliasReservationTask;
use crate::domain::scheduler::task::recording_service_task::RecordingServiceReservationTask;
use crate::domain::scheduler::task::reservation_task::{ReservationTask, TaskBase};
use crate::domain::technology::{Alias, Technology};
use crate::domain::utils::id::{ExecutableId, ResourceId};
use crate::domain::utils::interval::Interval;

/// One way of allocating the room: a room provider together with the technologies the
/// room will support.
#[derive(Debug, Clone)]
struct RoomProviderVariant {
    capability: Capability,
    technologies: BTreeSet<Technology>,
    available_room: AvailableRoom,

    /// Reusable rooms hosted by the provider.
    available_endpoints: Vec<AvailableReservation>,
}

/// Room which is being reused, with what is left to allocate.
struct ReusedRoom {
    available: AvailableReservation,
    executable: ExecutableId,
    license_count: u32,
    technologies: BTreeSet<Technology>,
}

/// Allocates a virtual room in one of the room providers.
///
/// Candidate providers are rated by their current load and tried one by one, each attempt
/// being isolated by a savepoint.
#[derive(Debug)]
pub struct RoomReservationTask {
    base: TaskBase,
    participant_count: u32,

    /// Technology sets of which the room must support at least one. Empty means the
    /// technologies of the device.
    technology_variants: Vec<BTreeSet<Technology>>,

    /// Room provider device which must be used.
    resource: Option<ResourceId>,

    alias_specifications: Vec<AliasSpecification>,

    recording: Option<RecordingServiceSpecification>,
}

impl RoomReservationTask {
    pub fn new(slot: Interval, participant_count: u32) -> RoomReservationTask {
        RoomReservationTask { base: TaskBase::new(slot), participant_count, technology_variants: Vec::new(), resource: None, alias_specifications: Vec::new(), recording: None }
    }

    pub fn from_specification(slot: Interval, specification: &RoomSpecification) -> RoomReservationTask {
        let mut task = RoomReservationTask::new(slot, specification.participant_count);
        if !specification.technologies.is_empty() {
            task.add_technology_variant(specification.technologies.clone());
        }
        task.resource = specification.resource.clone();
        task.alias_specifications = specification.aliases.clone();
        task.recording = specification.recording.clone();
        task
    }

    pub fn add_technology_variant(&mut self, technologies: BTreeSet<Technology>) {
        if !technologies.is_empty() && !self.technology_variants.contains(&technologies) {
            self.technology_variants.push(technologies);
        }
    }

    fn get_room_capabilities(&self, context: &SchedulerContext<'_>) -> Vec<Capability> {
        let cache = context.get_cache();
        match &self.resource {
            Some(resource) => cache
                .get_room_providers()
                .into_iter()
                .filter(|capability| capability.resource == *resource)
                .cloned()
                .collect(),
            None => cache.get_room_providers().into_iter().cloned().collect(),
        }
    }

    fn get_room_endpoint(context: &SchedulerContext<'_>, reservation: ReservationId) -> Option<RoomEndpoint> {
        context
            .get_cache()
            .reservations()
            .get(context.get_target(reservation))
            .and_then(|reservation| reservation.executable.as_ref())
            .and_then(|executable| executable.get_room_endpoint())
            .cloned()
    }

    fn get_executable_id(context: &SchedulerContext<'_>, reservation: ReservationId) -> Option<ExecutableId> {
        context
            .get_cache()
            .reservations()
            .get(context.get_target(reservation))
            .and_then(|reservation| reservation.executable.as_ref())
            .map(|executable| executable.id.clone())
    }

    fn find_variants(&mut self, context: &mut SchedulerContext<'_>) -> Result<Vec<RoomProviderVariant>, SchedulerError> {
        let slot = self.base.slot;
        let mut variants = Vec::new();
        for capability in self.get_room_capabilities(context) {
            if let Err(error) = context.check_capability_available(&capability, &slot, &mut self.base) {
                self.base.add_error_report(&error);
                continue;
            }

            let device_technologies = context.get_cache().get_resource(&capability.resource)?.get_technologies();
            let technology_variants = if self.technology_variants.is_empty() { vec![device_technologies.clone()] } else { self.technology_variants.clone() };
            let technology_variants: Vec<BTreeSet<Technology>> =
                technology_variants.into_iter().filter(|technologies| !technologies.is_empty() && technologies.is_subset(&device_technologies)).collect();
            if technology_variants.is_empty() {
                continue;
            }

            let available_room = context.get_available_room(&capability.id, &slot)?;
            let available_endpoints = context.get_available_room_endpoints(&capability.resource);
            if available_endpoints.is_empty() && available_room.available_license_count < self.participant_count {
                self.base.add_report(SchedulerReport::new(ReportKind::ResourceRoomCapacityExceeded {
                    resource: capability.resource.clone(),
                    available_license_count: available_room.available_license_count,
                    max_license_count: available_room.maximum_license_count,
                }));
                continue;
            }
            if let CapabilityKind::RoomProvider { max_licences_per_room, .. } = capability.kind {
                if max_licences_per_room > 0 && self.participant_count > max_licences_per_room {
                    self.base.add_report(SchedulerReport::new(ReportKind::ResourceSingleRoomLimitExceeded { max_licences_per_room }));
                    continue;
                }
            }

            self.base.add_report(SchedulerReport::new(ReportKind::Resource { resource: capability.resource.clone() }));
            for technologies in technology_variants {
                variants.push(RoomProviderVariant {
                    capability: capability.clone(),
                    technologies,
                    available_room: available_room.clone(),
                    available_endpoints: available_endpoints.clone(),
                });
            }
        }
        if variants.is_empty() {
            return Err(SchedulerError::new(ReportKind::ResourceNotFound));
        }
        Ok(variants)
    }

    fn compare_variants(first: &RoomProviderVariant, second: &RoomProviderVariant) -> Ordering {
        // Providers with reusable rooms first.
        let first_reusable = !first.available_endpoints.is_empty();
        let second_reusable = !second.available_endpoints.is_empty();
        second_reusable
            .cmp(&first_reusable)
            // More used providers first, keeping the emptier ones for large rooms.
            .then_with(|| second.available_room.get_fullness_ratio().total_cmp(&first.available_room.get_fullness_ratio()))
            .then_with(|| second.available_room.maximum_license_count.cmp(&first.available_room.maximum_license_count))
            .then_with(|| first.technologies.len().cmp(&second.technologies.len()))
    }

    /// Finds a reusable room of the variant covering the slot and supporting its technologies.
    fn find_reused_room(&self, context: &SchedulerContext<'_>, variant: &RoomProviderVariant) -> Option<ReusedRoom> {
        let slot = self.base.slot;
        let mut candidates: Vec<ReusedRoom> = variant
            .available_endpoints
            .iter()
            .filter(|available| available.original_slot.contains(&slot))
            .filter_map(|available| {
                let room = Self::get_room_endpoint(context, available.original)?;
                let executable = Self::get_executable_id(context, available.original)?;
                Some(ReusedRoom { available: *available, executable, license_count: room.license_count, technologies: room.technologies })
            })
            .filter(|reused_room| variant.technologies.is_subset(&reused_room.technologies))
            .collect();
        // Rooms which alone satisfy the participant count first, then the biggest ones.
        let participant_count = self.participant_count;
        candidates.sort_by_key(|reused_room| (reused_room.license_count < participant_count, std::cmp::Reverse(reused_room.license_count)));
        candidates.into_iter().next()
    }

    fn allocate_aliases(&mut self, context: &mut SchedulerContext<'_>, variant: &RoomProviderVariant) -> Result<Vec<Alias>, SchedulerError> {
        let slot = self.base.slot;
        let mut aliases = Vec::new();
        for alias_specification in self.alias_specifications.clone() {
            let mut alias_task = AliasReservationTask::from_specification(slot, &alias_specification);
            alias_task.set_target_resource(Some(variant.capability.resource.clone()));
            if !alias_task.has_restrictions() {
                alias_task.set_technologies(variant.technologies.clone());
            }
            let alias_reservation = self.base.add_child_task(context, &mut alias_task)?;
            let target = context.get_reservation(context.get_target(alias_reservation))?;
            for alias in target.get_aliases() {
                if alias.technology == Technology::All || variant.technologies.contains(&alias.technology) {
                    aliases.push(alias.clone());
                }
            }
        }
        Ok(aliases)
    }

    /// Records the room. A device without its own recorder gives one more licence to the
    /// recorder dialing in; a device recording without limits needs no recording service.
    fn allocate_recording(
        &mut self,
        context: &mut SchedulerContext<'_>,
        variant: &RoomProviderVariant,
        executable: &ExecutableId,
        recording: &RecordingServiceSpecification,
        room_recorder: Option<&Capability>,
    ) -> Result<(), SchedulerError> {
        let slot = self.base.slot;
        match room_recorder {
            Some(capability) if capability.is_unlimited_recording() => return Ok(()),
            Some(_) => {}
            None => {
                let kind = ReservationKind::Room { resource: variant.capability.resource.clone(), capability: variant.capability.id.clone(), license_count: 1 };
                let recorder_licence = context.create_reservation(Reservation::new(slot, kind));
                context.add_allocated_reservation(recorder_licence)?;
                self.base.child_reservations.push(recorder_licence);
            }
        }
        let mut recording_task = RecordingServiceReservationTask::new(slot, executable.clone(), variant.technologies.clone(), recording.resource.clone(), recording.enabled);
        self.base.add_child_task(context, &mut recording_task)?;
        Ok(())
    }

    fn allocate_variant(&mut self, context: &mut SchedulerContext<'_>, variant: &RoomProviderVariant) -> Result<ReservationId, SchedulerError> {
        let slot = self.base.slot;
        let mut license_count = self.participant_count;
        let mut reused_executable = None;

        if let Some(reused_room) = self.find_reused_room(context, variant) {
            let reservation_request = context.get_reservation_request_of(reused_room.available.original).map(|reservation_request| reservation_request.id.clone());
            context.remove_available_reservation(reused_room.available.original)?;
            let existing = Reservation::new(slot, ReservationKind::Existing { reused: reused_room.available.original });
            if reused_room.license_count >= self.participant_count {
                self.base.add_report(SchedulerReport::new(ReportKind::ReservationReusing { reservation_request }));
                return Ok(context.create_reservation(existing));
            }

            let existing = context.create_reservation(existing);
            context.add_allocated_reservation(existing)?;
            self.base.child_reservations.push(existing);
            self.base.add_report(SchedulerReport::new(ReportKind::ExecutableReusing { executable: reused_room.executable.clone() }));
            license_count = self.participant_count - reused_room.license_count;
            reused_executable = Some(reused_room.executable);
        }

        let recording = if context.is_executable_allowed() { self.recording.clone() } else { None };
        let room_recorder = match recording {
            Some(_) => context.get_cache().get_resources().resource_capability(&variant.capability.resource, CapabilityType::Recording).cloned(),
            None => None,
        };
        let recorder_license_count = if recording.is_some() && room_recorder.is_none() { 1 } else { 0 };

        if variant.available_room.available_license_count < license_count + recorder_license_count {
            return Err(SchedulerError::new(ReportKind::ResourceRoomCapacityExceeded {
                resource: variant.capability.resource.clone(),
                available_license_count: variant.available_room.available_license_count,
                max_license_count: variant.available_room.maximum_license_count,
            }));
        }

        let kind = if license_count > 0 {
            ReservationKind::Room { resource: variant.capability.resource.clone(), capability: variant.capability.id.clone(), license_count }
        } else {
            ReservationKind::Plain
        };
        let mut reservation = Reservation::new(slot, kind);

        if context.is_executable_allowed() {
            self.base.begin_report(SchedulerReport::new(ReportKind::AllocatingExecutable));
            let aliases = match self.allocate_aliases(context, variant) {
                Ok(aliases) => aliases,
                Err(error) => {
                    self.base.end_report_error(&error);
                    return Err(SchedulerError::current());
                }
            };

            let room = RoomEndpoint {
                resource: variant.capability.resource.clone(),
                capability: variant.capability.id.clone(),
                technologies: variant.technologies.clone(),
                license_count: self.participant_count,
                aliases,
                reused_room: reused_executable,
                migrate_from: None,
            };
            let executable = Executable::new(slot, ExecutableKind::RoomEndpoint(room));
            if let Some(recording) = &recording {
                if let Err(error) = self.allocate_recording(context, variant, &executable.id, recording, room_recorder.as_ref()) {
                    self.base.end_report_error(&error);
                    return Err(SchedulerError::current());
                }
            }
            self.base.end_report();
            context.add_notification(Notification::RoomCreated { resource: variant.capability.resource.clone(), executable: executable.id.clone(), slot })?;
            reservation.executable = Some(executable);
        }

        log::debug!("Allocated room with {} licences in '{}' for {}.", license_count, variant.capability.resource, slot);
        Ok(context.create_reservation(reservation))
    }
}

impl ReservationTask for RoomReservationTask {
    fn get_base(&self) -> &TaskBase {
        &self.base
    }

    fn get_base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn create_main_report(&self, _context: &SchedulerContext<'_>) -> Option<SchedulerReport> {
        Some(SchedulerReport::new(ReportKind::AllocatingRoom {
            technology_variants: self.technology_variants.iter().cloned().collect(),
            participant_count: self.participant_count,
            resource: self.resource.clone(),
        }))
    }

    fn allocate_reservation(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError> {
        self.base.check_maximum_duration(context)?;

        self.base.begin_report(SchedulerReport::new(ReportKind::FindingAvailableResource));
        let mut variants = self.find_variants(context)?;
        self.base.end_report();

        self.base.add_report(SchedulerReport::new(ReportKind::SortingResources));
        variants.sort_by(Self::compare_variants);

        for variant in &variants {
            self.base.begin_report(SchedulerReport::new(ReportKind::AllocatingResource { resource: variant.capability.resource.clone() }));
            let savepoint = context.create_savepoint();
            let child_count = self.base.child_reservations.len();
            match self.allocate_variant(context, variant) {
                Ok(reservation) => {
                    context.destroy(savepoint);
                    self.base.end_report();
                    return Ok(reservation);
                }
                Err(error) => {
                    log::debug!("Room provider '{}' failed for {}, reverting.", variant.capability.resource, Technology::format_set(&variant.technologies));
                    context.revert(savepoint)?;
                    self.base.truncate_child_reservations(child_count);
                    self.base.end_report_error(&error);
                }
            }
        }
        Err(SchedulerError::current())
    }

    /// Points the new room to the started room it replaces.
    fn migrate_reservation(&mut self, context: &mut SchedulerContext<'_>, old: ReservationId, new: ReservationId) -> Result<(), SchedulerError> {
        let old_target = context.get_target(old);
        let old_executable = match &context.get_reservation(old_target)?.executable {
            Some(executable) if executable.state.is_started() => executable.id.clone(),
            _ => return Ok(()),
        };
        let new_target = context.get_target(new);
        if !context.is_created_reservation(new_target) {
            return Ok(());
        }
        let reservation = context.get_created_reservation_mut(new_target)?;
        if let Some(room) = reservation.executable.as_mut().and_then(|executable| executable.get_room_endpoint_mut()) {
            log::info!("Room {} will be migrated into the newly allocated room.", old_executable);
            room.migrate_from = Some(old_executable);
        }
        Ok(())
    }
}
