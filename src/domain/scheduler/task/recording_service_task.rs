use std::collections::BTreeSet;

use crate::domain::cache::available_room::{AvailableRoom, compute_peak_license_usage};
use crate::domain::reservation::reservation::{ObjectKey, Reservation, ReservationKind};
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::resource::capability::{Capability, CapabilityType};
use crate::domain::scheduler::context::SchedulerContext;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::reservation_task::{ReservationTask, TaskBase};
use crate::domain::technology::Technology;
use crate::domain::utils::id::{ExecutableId, ResourceId};
use crate::domain::utils::interval::Interval;

/// Recorder with its licence usage in the slot.
#[derive(Debug, Clone)]
struct AvailableRecorder {
    capability: Capability,
    usage: AvailableRoom,
}

/// Allocates a recording licence for a room executable in one of the recorders.
#[derive(Debug)]
pub struct RecordingServiceReservationTask {
    base: TaskBase,
    executable: ExecutableId,

    /// Technologies of the recorded room, the recorder must support all of them.
    technologies: BTreeSet<Technology>,

    /// Recorder which must be used.
    resource: Option<ResourceId>,

    /// Recording starts together with the room.
    enabled: bool,
}

impl RecordingServiceReservationTask {
    pub fn new(slot: Interval, executable: ExecutableId, technologies: BTreeSet<Technology>, resource: Option<ResourceId>, enabled: bool) -> RecordingServiceReservationTask {
        RecordingServiceReservationTask { base: TaskBase::new(slot), executable, technologies, resource, enabled }
    }

    fn find_recorders(&mut self, context: &mut SchedulerContext<'_>) -> Result<Vec<AvailableRecorder>, SchedulerError> {
        let slot = self.base.slot;
        let capabilities: Vec<Capability> = context.get_cache().get_resources().capabilities_of_type(CapabilityType::Recording).into_iter().cloned().collect();
        let mut recorders = Vec::new();
        for capability in capabilities {
            if self.resource.as_ref().is_some_and(|resource| *resource != capability.resource) {
                continue;
            }
            let device_technologies = context.get_cache().get_resource(&capability.resource)?.get_technologies();
            if !self.technologies.is_subset(&device_technologies) {
                continue;
            }

            let maximum_license_count = if capability.is_unlimited_recording() { u32::MAX } else { capability.get_license_count() };
            let reservations = context.list_reservations(&ObjectKey::Recording(capability.id.clone()), &slot);
            let used_license_count = compute_peak_license_usage(reservations.iter().filter_map(|id| context.get_cache().reservations().get(*id)), &slot);
            let usage = AvailableRoom {
                resource: capability.resource.clone(),
                capability: capability.id.clone(),
                maximum_license_count,
                available_license_count: maximum_license_count.saturating_sub(used_license_count),
            };
            if usage.available_license_count == 0 {
                self.base.add_report(SchedulerReport::new(ReportKind::ResourceRecordingCapacityExceeded { resource: capability.resource.clone() }));
                continue;
            }
            self.base.add_report(SchedulerReport::new(ReportKind::Resource { resource: capability.resource.clone() }));
            recorders.push(AvailableRecorder { capability, usage });
        }
        if recorders.is_empty() {
            return Err(SchedulerError::new(ReportKind::ResourceNotFound));
        }
        Ok(recorders)
    }
}

impl ReservationTask for RecordingServiceReservationTask {
    fn get_base(&self) -> &TaskBase {
        &self.base
    }

    fn get_base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn create_main_report(&self, _context: &SchedulerContext<'_>) -> Option<SchedulerReport> {
        Some(SchedulerReport::new(ReportKind::AllocatingRecordingService { enabled: self.enabled }))
    }

    fn allocate_reservation(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError> {
        let slot = self.base.slot;

        self.base.begin_report(SchedulerReport::new(ReportKind::FindingAvailableResource));
        let mut recorders = self.find_recorders(context)?;
        self.base.end_report();

        // Fuller recorders first.
        self.base.add_report(SchedulerReport::new(ReportKind::SortingResources));
        recorders.sort_by(|first, second| second.usage.get_fullness_ratio().total_cmp(&first.usage.get_fullness_ratio()));

        for recorder in &recorders {
            let resource = recorder.capability.resource.clone();
            self.base.begin_report(SchedulerReport::new(ReportKind::AllocatingResource { resource: resource.clone() }));
            if let Err(error) = context.check_capability_available(&recorder.capability, &slot, &mut self.base) {
                self.base.end_report_error(&error);
                continue;
            }
            let reservation = Reservation::new(
                slot,
                ReservationKind::RecordingService { resource: resource.clone(), capability: recorder.capability.id.clone(), executable: self.executable.clone(), enabled: self.enabled },
            );
            self.base.end_report();
            log::debug!("Allocated recording of {} in '{}' for {}.", self.executable, resource, slot);
            return Ok(context.create_reservation(reservation));
        }
        Err(SchedulerError::current())
    }
}
