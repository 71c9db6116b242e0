use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::technology::{AliasType, Technology};
use crate::domain::utils::id::{ExecutableId, ReservationRequestId, ResourceId};
use crate::domain::utils::interval::{Interval, format_duration, format_time};

/// Audience for which a report is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    /// End user, sees only reports which explain a failure and no resource names.
    User,
    /// Administrator of the domain, sees every report.
    DomainAdmin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportKind {
    AllocatingResource { resource: ResourceId },
    AllocatingAlias { technologies: BTreeSet<Technology>, alias_types: BTreeSet<AliasType>, value: Option<String> },
    AllocatingValue { resource: ResourceId },
    AllocatingRoom { technology_variants: BTreeSet<BTreeSet<Technology>>, participant_count: u32, resource: Option<ResourceId> },
    AllocatingCompartment,
    AllocatingExecutable,
    AllocatingRecordingService { enabled: bool },
    FindingAvailableResource,
    SortingResources,
    Resource { resource: ResourceId },
    ReservationReusing { reservation_request: Option<ReservationRequestId> },
    ExecutableReusing { executable: ExecutableId },
    ConnectionBetween { endpoint_from: String, endpoint_to: String, technology: Technology },
    ConnectionFromTo { endpoint_from: String, endpoint_to: String },
    CollidingReservations { reservations: Vec<(ReservationRequestId, Interval)> },
    ReallocatingReservationRequests { reservation_requests: Vec<ReservationRequestId> },
    ReallocatingReservationRequest { reservation_request: ReservationRequestId },

    ResourceNotFound,
    ResourceNotAllocatable { resource: ResourceId },
    ResourceAlreadyAllocated { resource: ResourceId, interval: Interval },
    ResourceUnderMaintenance { interval: Interval },
    ResourceNotAvailable { resource: ResourceId, max_date_time: i64 },
    ResourceRoomCapacityExceeded { resource: ResourceId, available_license_count: u32, max_license_count: u32 },
    ResourceSingleRoomLimitExceeded { max_licences_per_room: u32 },
    ResourceRecordingCapacityExceeded { resource: ResourceId },
    ResourceNotEndpoint { resource: ResourceId },
    ResourceMultipleRequested { resource: ResourceId },
    EndpointNotFound { technologies: BTreeSet<Technology> },
    CompartmentNotEnoughEndpoint,
    CompartmentAssignAliasToExternalEndpoint,
    ConnectionToMultiple { endpoint_from: String, endpoint_to: String },
    ReservationRequestInvalidSlot { interval: Interval, reservation_request: ReservationRequestId },
    ReservationWithoutMandatoryUsage { reservation_request: ReservationRequestId },
    ReservationAlreadyUsed { reservation_request: ReservationRequestId, usage_reservation_request: ReservationRequestId, usage_interval: Interval },
    ValueAlreadyAllocated { value: String, interval: Interval },
    ValueInvalid { value: String },
    ValueNotAvailable,
    SpecificationNotAllocatable { specification: String },
    MaximumDurationExceeded { duration: i64, max_duration: i64 },
    UserNotOwner,
    /// Infrastructure problem (missing entity, invalid state) met during allocation.
    Internal { message: String },
}

impl ReportKind {
    /// Reports describing the progress of the scheduler are shown to domain
    /// administrators only.
    pub fn is_visible_to(&self, message_type: MessageType) -> bool {
        match message_type {
            MessageType::DomainAdmin => true,
            MessageType::User => !matches!(
                self,
                ReportKind::Resource { .. }
                    | ReportKind::FindingAvailableResource
                    | ReportKind::SortingResources
                    | ReportKind::AllocatingExecutable
                    | ReportKind::ExecutableReusing { .. }
                    | ReportKind::ConnectionBetween { .. }
                    | ReportKind::ConnectionFromTo { .. }
                    | ReportKind::CollidingReservations { .. }
                    | ReportKind::ReallocatingReservationRequests { .. }
            ),
        }
    }

    /// Whether the report describes why an allocation failed.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ReportKind::ResourceNotFound
                | ReportKind::ResourceNotAllocatable { .. }
                | ReportKind::ResourceAlreadyAllocated { .. }
                | ReportKind::ResourceUnderMaintenance { .. }
                | ReportKind::ResourceNotAvailable { .. }
                | ReportKind::ResourceRoomCapacityExceeded { .. }
                | ReportKind::ResourceSingleRoomLimitExceeded { .. }
                | ReportKind::ResourceRecordingCapacityExceeded { .. }
                | ReportKind::ResourceNotEndpoint { .. }
                | ReportKind::ResourceMultipleRequested { .. }
                | ReportKind::EndpointNotFound { .. }
                | ReportKind::CompartmentNotEnoughEndpoint
                | ReportKind::CompartmentAssignAliasToExternalEndpoint
                | ReportKind::ConnectionToMultiple { .. }
                | ReportKind::ReservationRequestInvalidSlot { .. }
                | ReportKind::ReservationWithoutMandatoryUsage { .. }
                | ReportKind::ReservationAlreadyUsed { .. }
                | ReportKind::ValueAlreadyAllocated { .. }
                | ReportKind::ValueInvalid { .. }
                | ReportKind::ValueNotAvailable
                | ReportKind::SpecificationNotAllocatable { .. }
                | ReportKind::MaximumDurationExceeded { .. }
                | ReportKind::UserNotOwner
                | ReportKind::Internal { .. }
        )
    }

    pub fn get_message(&self, message_type: MessageType) -> String {
        let resource = |resource: &ResourceId| match message_type {
            MessageType::DomainAdmin => format!("resource {}", resource),
            MessageType::User => "resource".to_string(),
        };
        match self {
            ReportKind::AllocatingResource { resource: id } => format!("Allocating the {}.", resource(id)),
            ReportKind::AllocatingAlias { technologies, alias_types, value } => format!(
                "Allocating alias for the following specification: \n  Technology: {} \n  Alias Type: {} \n       Value: {}",
                if technologies.is_empty() { "Any".to_string() } else { Technology::format_set(technologies) },
                if alias_types.is_empty() { "Any".to_string() } else { alias_types.iter().map(|alias_type| format!("{:?}", alias_type)).collect::<Vec<_>>().join(", ") },
                value.as_deref().unwrap_or("Any")
            ),
            ReportKind::AllocatingValue { resource: id } => format!("Allocating value in the {}.", resource(id)),
            ReportKind::AllocatingRoom { technology_variants, participant_count, resource: id } => format!(
                "Allocating room for the following specification: \n    Technology: {} \n  Participants: {} \n      Resource: {}",
                Technology::format_variants(technology_variants),
                participant_count,
                match (id, message_type) {
                    (Some(id), MessageType::DomainAdmin) => id.to_string(),
                    _ => "Any".to_string(),
                }
            ),
            ReportKind::AllocatingCompartment => "Allocating compartment.".to_string(),
            ReportKind::AllocatingExecutable => "Allocating executable.".to_string(),
            ReportKind::AllocatingRecordingService { enabled } => {
                format!("Allocating recording service{}.", if *enabled { " which starts with the room" } else { "" })
            }
            ReportKind::FindingAvailableResource => "Finding available resource.".to_string(),
            ReportKind::SortingResources => "Sorting resources.".to_string(),
            ReportKind::Resource { resource: id } => format!("Resource {}.", id),
            ReportKind::ReservationReusing { reservation_request } => match reservation_request {
                Some(reservation_request) => format!("Reusing reservation of reservation request {}.", reservation_request),
                None => "Reusing existing reservation.".to_string(),
            },
            ReportKind::ExecutableReusing { executable } => format!("Reusing existing executable {}.", executable),
            ReportKind::ConnectionBetween { endpoint_from, endpoint_to, technology } => {
                format!("Creating connection between {} and {} in technology {}.", endpoint_from, endpoint_to, technology)
            }
            ReportKind::ConnectionFromTo { endpoint_from, endpoint_to } => format!("Creating connection from {} to {}.", endpoint_from, endpoint_to),
            ReportKind::CollidingReservations { reservations } => {
                let mut message = "The following reservations are colliding, trying to reallocate them:".to_string();
                for (reservation_request, slot) in reservations {
                    message.push_str(&format!("\n-{} ({})", reservation_request, slot));
                }
                message
            }
            ReportKind::ReallocatingReservationRequests { reservation_requests } => {
                let mut message = "The following reservation requests will be reallocated:".to_string();
                for reservation_request in reservation_requests {
                    message.push_str(&format!("\n-{}", reservation_request));
                }
                message
            }
            ReportKind::ReallocatingReservationRequest { reservation_request } => format!("Reallocating reservation request {}.", reservation_request),
            ReportKind::ResourceNotFound => "No resource was found.".to_string(),
            ReportKind::ResourceNotAllocatable { resource: id } => format!("The {} is disabled for allocation.", resource(id)),
            ReportKind::ResourceAlreadyAllocated { resource: id, interval } => format!("The {} is already allocated in the time slot {}.", resource(id), interval),
            ReportKind::ResourceUnderMaintenance { interval } => format!("There is no available capacity due to maintenance in the time slot {}.", interval),
            ReportKind::ResourceNotAvailable { resource: id, max_date_time } => format!(
                "The {} is not available for the requested time slot. The maximum date/time for which the resource can be allocated is {}.",
                resource(id),
                format_time(*max_date_time)
            ),
            ReportKind::ResourceRoomCapacityExceeded { resource: id, available_license_count, max_license_count } => {
                format!("The {} has available only {} from {} licenses.", resource(id), available_license_count, max_license_count)
            }
            ReportKind::ResourceSingleRoomLimitExceeded { max_licences_per_room } => {
                format!("The resource has capacity limit per room of {} licences.", max_licences_per_room)
            }
            ReportKind::ResourceRecordingCapacityExceeded { resource: id } => format!("The {} has no recording licence left.", resource(id)),
            ReportKind::ResourceNotEndpoint { resource: id } => format!("The {} is not endpoint.", resource(id)),
            ReportKind::ResourceMultipleRequested { resource: id } => format!("The {} is requested multiple times.", resource(id)),
            ReportKind::EndpointNotFound { technologies } => {
                format!("No available endpoint was found for the following specification: Technologies: {}", Technology::format_set(technologies))
            }
            ReportKind::CompartmentNotEnoughEndpoint => "Not enough endpoints are requested for the compartment.".to_string(),
            ReportKind::CompartmentAssignAliasToExternalEndpoint => "Cannot assign alias to allocated external endpoint.".to_string(),
            ReportKind::ConnectionToMultiple { endpoint_from, endpoint_to } => format!(
                "Cannot create connection from {} to {}, because the target represents multiple endpoints (not supported yet).",
                endpoint_from, endpoint_to
            ),
            ReportKind::ReservationRequestInvalidSlot { interval, reservation_request } => {
                format!("Requested time slot doesn't correspond to {} from reused reservation request {}.", interval, reservation_request)
            }
            ReportKind::ReservationWithoutMandatoryUsage { reservation_request } => {
                format!("Reused reservation request {} is mandatory but wasn't used.", reservation_request)
            }
            ReportKind::ReservationAlreadyUsed { reservation_request, usage_reservation_request, usage_interval } => format!(
                "Reused reservation request {} is not available because it's already used in reservation request {} for {}.",
                reservation_request, usage_reservation_request, usage_interval
            ),
            ReportKind::ValueAlreadyAllocated { value, interval } => format!("Value {} is already allocated in interval {}.", value, interval),
            ReportKind::ValueInvalid { value } => format!("Value {} is invalid.", value),
            ReportKind::ValueNotAvailable => "No value is available.".to_string(),
            ReportKind::SpecificationNotAllocatable { specification } => format!("The specification {} is not supposed to be allocated.", specification),
            ReportKind::MaximumDurationExceeded { duration, max_duration } => {
                format!("Duration {} is longer than maximum {}.", format_duration(*duration), format_duration(*max_duration))
            }
            ReportKind::UserNotOwner => "User is not resource owner.".to_string(),
            ReportKind::Internal { message } => match message_type {
                MessageType::DomainAdmin => format!("Internal error: {}", message),
                MessageType::User => "Internal error.".to_string(),
            },
        }
    }
}

/// Tree of reports explaining what the scheduler tried and why it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerReport {
    pub kind: ReportKind,
    pub children: Vec<SchedulerReport>,
}

impl SchedulerReport {
    pub fn new(kind: ReportKind) -> SchedulerReport {
        SchedulerReport { kind, children: Vec::new() }
    }

    pub fn add_child(&mut self, report: SchedulerReport) {
        self.children.push(report);
    }

    /// Whether this report or any descendant is an error report.
    pub fn contains_error(&self) -> bool {
        self.kind.is_error() || self.children.iter().any(SchedulerReport::contains_error)
    }

    /// Renders the report tree for the given audience.
    ///
    /// Reports which are not visible to the audience are skipped and their children are
    /// rendered in their place.
    pub fn get_message(&self, message_type: MessageType) -> String {
        let mut output = String::new();
        self.render(message_type, 0, &mut output);
        output.trim_end().to_string()
    }

    fn render(&self, message_type: MessageType, depth: usize, output: &mut String) {
        let child_depth = if self.kind.is_visible_to(message_type) {
            let indent = "  ".repeat(depth);
            let message = self.kind.get_message(message_type);
            let mut lines = message.lines();
            if let Some(first) = lines.next() {
                output.push_str(&format!("{}-{}\n", indent, first));
            }
            for line in lines {
                output.push_str(&format!("{} {}\n", indent, line));
            }
            depth + 1
        } else {
            depth
        };
        for child in &self.children {
            child.render(message_type, child_depth, output);
        }
    }
}

impl fmt::Display for SchedulerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_message(MessageType::DomainAdmin))
    }
}
