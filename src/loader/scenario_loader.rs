use crate::api::scenario_dto::ScenarioDto;
use crate::api::scenario_dto::request_dto::{IntervalDto, ReservationRequestDto, ReservationRequestSetDto, SetSlotDto};
use crate::api::scenario_dto::resource_dto::{AliasTemplateDto, CapabilityDto, CapabilityKindDto, ResourceDto, ValueFilterDto, ValueProviderDto, ValueProviderKindDto};
use crate::api::scenario_dto::specification_dto::{AliasSpecificationDto, ParticipantDto, SpecificationDto};
use crate::config::SchedulerConfig;
use crate::domain::cache::cache::Cache;
use crate::domain::request::reservation_request::{ReservationRequest, ReservationRequestSet, SetSlot};
use crate::domain::request::specification::{
    AliasSetSpecification, AliasSpecification, CompartmentSpecification, ExternalEndpoint, Participant, RecordingServiceSpecification, RoomSpecification,
    Specification,
};
use crate::domain::resource::capability::{AliasTemplate, Capability, CapabilityKind};
use crate::domain::resource::resource::{DeviceInfo, Resource};
use crate::domain::scheduler::context::ROOT_USER_ID;
use crate::domain::scheduler::persistence::{InMemoryPersistence, Persistence};
use crate::domain::utils::id::{ResourceId, UserId, ValueProviderId};
use crate::domain::utils::interval::Interval;
use crate::domain::value::pattern::Pattern;
use crate::domain::value::value_provider::{ValueFilter, ValueProvider, ValueProviderKind};
use crate::error::{Error, Result};
use crate::loader::parser::parse_json_file;

/// Everything needed for a scheduler run, built from a scenario file.
#[derive(Debug)]
pub struct Scenario {
    pub config: SchedulerConfig,
    pub interval: Interval,
    pub cache: Cache,
    pub persistence: InMemoryPersistence,
}

/// Loads and validates the scenario stored in `file_path`.
pub fn load_scenario(file_path: &str) -> Result<Scenario> {
    let dto: ScenarioDto = parse_json_file(file_path)?;
    log::info!("Scenario file '{}' parsed successfully.", file_path);
    Scenario::from_dto(dto)
}

impl Scenario {
    pub fn from_dto(dto: ScenarioDto) -> Result<Scenario> {
        let interval = match dto.interval {
            Some(interval) => interval_from_dto(interval)?,
            None => Interval::infinite(),
        };

        let mut cache = Cache::new();
        for resource in dto.resources {
            let (resource, capabilities) = resource_from_dto(resource)?;
            cache.add_resource(resource, capabilities)?;
        }
        for value_provider in dto.value_providers {
            cache.add_value_provider(value_provider_from_dto(value_provider)?)?;
        }
        validate_cache(&cache)?;
        log::info!("Cache built with {} resources.", cache.get_resources().len());

        let mut persistence = InMemoryPersistence::new();
        for reservation_request in dto.reservation_requests {
            let reservation_request = reservation_request_from_dto(reservation_request)?;
            validate_specification(&cache, &reservation_request.specification)?;
            persistence.add_reservation_request(reservation_request)?;
        }
        for reservation_request_set in dto.reservation_request_sets {
            let reservation_request_set = reservation_request_set_from_dto(reservation_request_set)?;
            validate_specification(&cache, &reservation_request_set.specification)?;
            persistence.add_reservation_request_set(reservation_request_set)?;
        }
        for reservation_request in persistence.list_reservation_requests() {
            if let Some(reused) = &reservation_request.reused_allocation {
                let reused_request = persistence.reservation_request(reused)?;
                if !reused_request.reusement.allows(&reused_request.user_id, &reservation_request.user_id) {
                    return Err(Error::ModelConstructionError(format!(
                        "Reservation request '{}' cannot reuse the allocation of '{}'.",
                        reservation_request.id, reused
                    )));
                }
            }
        }

        Ok(Scenario { config: dto.config, interval, cache, persistence })
    }
}

fn interval_from_dto(dto: IntervalDto) -> Result<Interval> {
    Interval::new(dto.start, dto.end)
}

fn resource_from_dto(dto: ResourceDto) -> Result<(Resource, Vec<Capability>)> {
    let mut resource = Resource::new(dto.id.as_str());
    if let Some(name) = dto.name {
        resource.name = name;
    }
    resource.allocatable = dto.allocatable;
    resource.parent = dto.parent.map(ResourceId::new);
    resource.maximum_future = dto.maximum_future;
    resource.owners = dto.owners.into_iter().map(UserId::new).collect();
    resource.device = dto.device.map(|device| DeviceInfo { technologies: device.technologies, address: device.address, preferred_technology: device.preferred_technology });

    let capabilities = dto.capabilities.into_iter().map(|capability| capability_from_dto(&resource.id, capability)).collect();
    Ok((resource, capabilities))
}

fn capability_from_dto(resource: &ResourceId, dto: CapabilityDto) -> Capability {
    let kind = match dto.kind {
        CapabilityKindDto::RoomProvider { license_count, max_licences_per_room } => CapabilityKind::RoomProvider { license_count, max_licences_per_room },
        CapabilityKindDto::AliasProvider { value_provider, aliases, restricted_to_resource } => CapabilityKind::AliasProvider {
            value_provider: ValueProviderId::new(value_provider),
            aliases: aliases.into_iter().map(alias_template_from_dto).collect(),
            restricted_to_resource,
        },
        CapabilityKindDto::ValueProvider { value_provider } => CapabilityKind::ValueProvider { value_provider: ValueProviderId::new(value_provider) },
        CapabilityKindDto::Terminal { aliases, standalone } => CapabilityKind::Terminal { aliases, standalone },
        CapabilityKindDto::Recording { license_count } => CapabilityKind::Recording { license_count },
    };
    let mut capability = Capability::new(dto.id.as_str(), resource.clone(), kind);
    capability.maximum_future = dto.maximum_future;
    capability
}

fn alias_template_from_dto(dto: AliasTemplateDto) -> AliasTemplate {
    let mut template = AliasTemplate::new(dto.alias_type, dto.value);
    if let Some(technology) = dto.technology {
        template.technology = technology;
    }
    template
}

fn value_provider_from_dto(dto: ValueProviderDto) -> Result<ValueProvider> {
    let capability = dto.capability.as_str().into();
    match dto.kind {
        ValueProviderKindDto::Pattern { patterns, allow_any_requested_value } => {
            let patterns = patterns.iter().map(|pattern| Pattern::parse(pattern)).collect::<Result<Vec<_>>>()?;
            Ok(ValueProvider { id: ValueProviderId::new(dto.id), capability, kind: ValueProviderKind::Pattern { patterns, allow_any_requested_value } })
        }
        ValueProviderKindDto::Filtered { filter, target } => {
            let filter = match filter {
                ValueFilterDto::ConvertToUrl => ValueFilter::ConvertToUrl,
            };
            Ok(ValueProvider::new_filtered(dto.id.as_str(), capability, filter, ValueProviderId::new(target)))
        }
    }
}

/// Checks references between resources, capabilities and value providers.
fn validate_cache(cache: &Cache) -> Result<()> {
    let resources = cache.get_resources();
    for resource in resources.resources() {
        if let Some(parent) = &resource.parent {
            if resources.get(parent).is_none() {
                return Err(Error::not_found("Resource", parent));
            }
        }
        for capability in &resource.capabilities {
            if let Some(value_provider) = resources.capability(capability)?.get_value_provider() {
                cache.get_value_provider(value_provider)?;
            }
        }
    }
    for resource in resources.resources() {
        let mut ancestors = Vec::new();
        let mut current = resource.parent.clone();
        while let Some(parent) = current {
            if parent == resource.id || ancestors.contains(&parent) {
                return Err(Error::ModelConstructionError(format!("Resource '{}' is its own ancestor.", resource.id)));
            }
            current = resources.get(&parent).and_then(|parent| parent.parent.clone());
            ancestors.push(parent);
        }
    }
    Ok(())
}

fn validate_specification(cache: &Cache, specification: &Specification) -> Result<()> {
    let check_resource = |resource: &ResourceId| cache.get_resource(resource).map(|_| ());
    match specification {
        Specification::Resource { resource } | Specification::ExistingEndpoint { resource } => check_resource(resource),
        Specification::Room(room) => {
            if let Some(resource) = &room.resource {
                check_resource(resource)?;
            }
            if let Some(resource) = room.recording.as_ref().and_then(|recording| recording.resource.as_ref()) {
                check_resource(resource)?;
            }
            room.aliases.iter().filter_map(|alias| alias.resource.as_ref()).try_for_each(check_resource)
        }
        Specification::Alias(alias) => alias.resource.as_ref().map_or(Ok(()), check_resource),
        Specification::AliasSet(alias_set) => alias_set.aliases.iter().filter_map(|alias| alias.resource.as_ref()).try_for_each(check_resource),
        Specification::Compartment(compartment) => compartment
            .participants
            .iter()
            .filter_map(|participant| match participant {
                Participant::Existing { resource, .. } => Some(resource),
                _ => None,
            })
            .try_for_each(check_resource),
        Specification::Value { value_provider, .. } => cache.get_value_provider(value_provider).map(|_| ()),
        Specification::LookupEndpoint { .. } => Ok(()),
    }
}

fn alias_specification_from_dto(dto: AliasSpecificationDto) -> AliasSpecification {
    AliasSpecification { technologies: dto.technologies, alias_types: dto.alias_types, value: dto.value, resource: dto.resource.map(ResourceId::new) }
}

fn specification_from_dto(dto: SpecificationDto) -> Specification {
    match dto {
        SpecificationDto::Resource { resource } => Specification::Resource { resource: ResourceId::new(resource) },
        SpecificationDto::Room { participant_count, technologies, resource, aliases, slot_minutes_before, slot_minutes_after, recording } => {
            Specification::Room(RoomSpecification {
                participant_count,
                technologies,
                resource: resource.map(ResourceId::new),
                aliases: aliases.into_iter().map(alias_specification_from_dto).collect(),
                slot_minutes_before,
                slot_minutes_after,
                recording: recording.map(|recording| RecordingServiceSpecification { enabled: recording.enabled, resource: recording.resource.map(ResourceId::new) }),
            })
        }
        SpecificationDto::Alias(alias) => Specification::Alias(alias_specification_from_dto(alias)),
        SpecificationDto::AliasSet { aliases, shared_executable } => {
            Specification::AliasSet(AliasSetSpecification { aliases: aliases.into_iter().map(alias_specification_from_dto).collect(), shared_executable })
        }
        SpecificationDto::Compartment { participants, call_initiation } => Specification::Compartment(CompartmentSpecification {
            participants: participants
                .into_iter()
                .map(|participant| match participant {
                    ParticipantDto::External { technologies, count, aliases, call_initiation } => {
                        Participant::External(ExternalEndpoint { technologies, count, aliases, call_initiation })
                    }
                    ParticipantDto::Existing { resource, call_initiation } => Participant::Existing { resource: ResourceId::new(resource), call_initiation },
                    ParticipantDto::Lookup { technologies } => Participant::Lookup { technologies },
                })
                .collect(),
            call_initiation,
        }),
        SpecificationDto::Value { value_provider, value } => Specification::Value { value_provider: ValueProviderId::new(value_provider), value },
        SpecificationDto::ExistingEndpoint { resource } => Specification::ExistingEndpoint { resource: ResourceId::new(resource) },
        SpecificationDto::LookupEndpoint { technologies } => Specification::LookupEndpoint { technologies },
    }
}

fn reservation_request_from_dto(dto: ReservationRequestDto) -> Result<ReservationRequest> {
    let slot = interval_from_dto(dto.slot)?;
    let mut reservation_request = ReservationRequest::new(dto.id.as_str(), slot, specification_from_dto(dto.specification));
    reservation_request.purpose = dto.purpose;
    reservation_request.priority = dto.priority;
    reservation_request.user_id = UserId::new(dto.user_id.unwrap_or_else(|| ROOT_USER_ID.to_string()));
    reservation_request.created_at = dto.created_at;
    reservation_request.description = dto.description;
    reservation_request.reusement = dto.reusement;
    reservation_request.reused_allocation = dto.reused_allocation.map(|reused| reused.as_str().into());
    reservation_request.reused_allocation_mandatory = dto.reused_allocation_mandatory;
    Ok(reservation_request)
}

fn reservation_request_set_from_dto(dto: ReservationRequestSetDto) -> Result<ReservationRequestSet> {
    let slots = dto
        .slots
        .into_iter()
        .map(|slot| match slot {
            SetSlotDto::Absolute { start, end } => Interval::new(start, end).map(SetSlot::Absolute),
            SetSlotDto::Periodic { start, period, duration, end } => {
                if period <= 0 || duration < 0 {
                    return Err(Error::ModelConstructionError(format!("Invalid periodic slot (period {} ms, duration {} ms).", period, duration)));
                }
                Ok(SetSlot::Periodic { start, period, duration, end })
            }
        })
        .collect::<Result<Vec<_>>>()?;
    let mut reservation_request_set = ReservationRequestSet::new(dto.id.as_str(), slots, specification_from_dto(dto.specification));
    reservation_request_set.purpose = dto.purpose;
    reservation_request_set.priority = dto.priority;
    reservation_request_set.user_id = UserId::new(dto.user_id.unwrap_or_else(|| ROOT_USER_ID.to_string()));
    reservation_request_set.created_at = dto.created_at;
    reservation_request_set.description = dto.description;
    Ok(reservation_request_set)
}
