use std::collections::BTreeSet;

use crate::domain::request::specification::{CompartmentSpecification, Participant};
use crate::domain::reservation::executable::{Compartment, Connection, ConnectionKind, Endpoint, EndpointKind, Executable, ExecutableKind};
use crate::domain::reservation::reservation::{Reservation, ReservationKind};
use crate::domain::reservation::reservation_store::ReservationId;
use crate::domain::scheduler::context::SchedulerContext;
use crate::domain::scheduler::report::{ReportKind, SchedulerReport};
use crate::domain::scheduler::scheduler_error::SchedulerError;
use crate::domain::scheduler::task::alias_task::AliasReservationTask;
use crate::domain::scheduler::task::endpoint_task::{EndpointReservationTask, create_resource_endpoint};
use crate::domain::scheduler::task::reservation_task::{ReservationTask, TaskBase};
use crate::domain::scheduler::task::room_task::RoomReservationTask;
use crate::domain::technology::{CallInitiation, Technology};
use crate::domain::utils::interval::Interval;
use crate::error::Error;

/// Interconnects the participants of a compartment.
///
/// Two standalone terminals sharing a technology are connected directly, otherwise a
/// single virtual room supporting a technology of every participant is allocated and
/// every participant is connected to it.
#[derive(Debug)]
pub struct CompartmentReservationTask {
    base: TaskBase,
    specification: CompartmentSpecification,
    endpoints: Vec<Endpoint>,
    connections: Vec<Connection>,
}

impl CompartmentReservationTask {
    pub fn new(slot: Interval, specification: CompartmentSpecification) -> CompartmentReservationTask {
        CompartmentReservationTask { base: TaskBase::new(slot), specification, endpoints: Vec::new(), connections: Vec::new() }
    }

    fn get_call_initiation(&self) -> CallInitiation {
        self.specification.call_initiation.unwrap_or(CallInitiation::Terminal)
    }

    fn get_total_endpoint_count(&self) -> u32 {
        self.endpoints.iter().map(|endpoint| endpoint.count).sum()
    }

    fn get_common_technologies(first: &Endpoint, second: &Endpoint) -> BTreeSet<Technology> {
        first.technologies.intersection(&second.technologies).copied().collect()
    }

    fn add_participant(&mut self, context: &mut SchedulerContext<'_>, participant: &Participant) -> Result<(), SchedulerError> {
        let slot = self.base.slot;
        let (mut endpoint_task, call_initiation) = match participant {
            Participant::External(external) => {
                self.endpoints.push(Endpoint {
                    kind: EndpointKind::External,
                    technologies: external.technologies.clone(),
                    count: external.count.max(1),
                    standalone: false,
                    aliases: external.aliases.clone(),
                    assigned_aliases: Vec::new(),
                    call_initiation: external.call_initiation,
                    address: None,
                    preferred_technology: None,
                });
                return Ok(());
            }
            Participant::Existing { resource, call_initiation } => (EndpointReservationTask::existing(slot, resource.clone()), *call_initiation),
            Participant::Lookup { technologies } => (EndpointReservationTask::lookup(slot, technologies.clone()), None),
        };
        let reservation = self.base.add_child_task(context, &mut endpoint_task)?;
        self.endpoints.push(create_resource_endpoint(context, reservation, call_initiation)?);
        Ok(())
    }

    fn determine_call_initiation(&self, endpoint_from: &Endpoint, endpoint_to: &Endpoint) -> CallInitiation {
        let mut call_initiation = endpoint_from.call_initiation;
        if let Some(call_initiation_to) = endpoint_to.call_initiation {
            match call_initiation {
                None => call_initiation = Some(call_initiation_to),
                // The called endpoint wins only when it wants to be called from the room.
                Some(current) if current != call_initiation_to => {
                    if !endpoint_to.is_room() && call_initiation_to == CallInitiation::VirtualRoom {
                        call_initiation = Some(call_initiation_to);
                    }
                }
                Some(_) => {}
            }
        }
        call_initiation.unwrap_or_else(|| self.get_call_initiation())
    }

    /// Connects two endpoints (indices into `endpoints`), trying the opposite direction
    /// when the first one fails.
    fn add_connection(&mut self, context: &mut SchedulerContext<'_>, first: usize, second: usize) -> Result<(), SchedulerError> {
        let (mut endpoint_from, mut endpoint_to) = (first, second);
        let call_initiation = self.determine_call_initiation(&self.endpoints[endpoint_from], &self.endpoints[endpoint_to]);
        let swap = match call_initiation {
            CallInitiation::VirtualRoom => !self.endpoints[endpoint_from].is_room() && self.endpoints[endpoint_to].is_room(),
            CallInitiation::Terminal => self.endpoints[endpoint_from].is_room() && !self.endpoints[endpoint_to].is_room(),
        };
        if swap {
            std::mem::swap(&mut endpoint_from, &mut endpoint_to);
        }

        let technologies = Self::get_common_technologies(&self.endpoints[endpoint_from], &self.endpoints[endpoint_to]);
        let technology = match technologies.len() {
            0 => return Err(Error::InvalidState("Endpoints without a common technology cannot be connected.".to_string()).into()),
            1 => technologies.iter().next().copied(),
            _ => {
                let preferred = self.endpoints[endpoint_from].preferred_technology.or(self.endpoints[endpoint_to].preferred_technology);
                preferred.filter(|preferred| technologies.contains(preferred)).or_else(|| technologies.iter().next().copied())
            }
        };
        let technology = match technology {
            Some(technology) => technology,
            None => return Err(SchedulerError::current()),
        };

        self.base.begin_report(SchedulerReport::new(ReportKind::ConnectionBetween {
            endpoint_from: self.endpoints[endpoint_from].to_string(),
            endpoint_to: self.endpoints[endpoint_to].to_string(),
            technology,
        }));
        let savepoint = context.create_savepoint();
        let endpoints = self.endpoints.clone();
        let connection_count = self.connections.len();
        let child_count = self.base.child_reservations.len();

        let result = match self.add_connection_by(context, endpoint_from, endpoint_to, technology) {
            Ok(()) => Ok(()),
            Err(first_error) => {
                context.revert(savepoint)?;
                self.endpoints = endpoints;
                self.connections.truncate(connection_count);
                self.base.truncate_child_reservations(child_count);
                self.base.add_error_report(&first_error);
                match self.add_connection_by(context, endpoint_to, endpoint_from, technology) {
                    Ok(()) => Ok(()),
                    Err(second_error) => {
                        self.base.add_error_report(&second_error);
                        Err(SchedulerError::current())
                    }
                }
            }
        };
        context.destroy(savepoint);
        self.base.end_report();
        result
    }

    fn add_connection_by(&mut self, context: &mut SchedulerContext<'_>, endpoint_from: usize, endpoint_to: usize, technology: Technology) -> Result<(), SchedulerError> {
        self.base.begin_report(SchedulerReport::new(ReportKind::ConnectionFromTo {
            endpoint_from: self.endpoints[endpoint_from].to_string(),
            endpoint_to: self.endpoints[endpoint_to].to_string(),
        }));
        let result = self.create_connection(context, endpoint_from, endpoint_to, technology);
        match result {
            Ok(connection) => {
                self.connections.push(connection);
                self.base.end_report();
                Ok(())
            }
            Err(error) => {
                self.base.end_report_error(&error);
                Err(SchedulerError::current())
            }
        }
    }

    fn create_connection(&mut self, context: &mut SchedulerContext<'_>, endpoint_from: usize, endpoint_to: usize, technology: Technology) -> Result<Connection, SchedulerError> {
        if self.endpoints[endpoint_to].count > 1 {
            return Err(SchedulerError::new(ReportKind::ConnectionToMultiple {
                endpoint_from: self.endpoints[endpoint_from].to_string(),
                endpoint_to: self.endpoints[endpoint_to].to_string(),
            }));
        }

        if let Some(alias) = self.endpoints[endpoint_to].get_aliases().find(|alias| alias.technology == technology) {
            return Ok(Connection { endpoint_from, endpoint_to, technology, kind: ConnectionKind::ByAlias(alias.clone()) });
        }

        let target = &self.endpoints[endpoint_to];
        if matches!(target.kind, EndpointKind::External) {
            return Err(SchedulerError::new(ReportKind::CompartmentAssignAliasToExternalEndpoint));
        }
        let device = target.get_resource().cloned();
        let address = target.address.clone();

        let mut alias_task = AliasReservationTask::new(self.base.slot);
        alias_task.add_technology(technology);
        alias_task.set_target_resource(device);
        let alias_reservation = match self.base.add_child_task(context, &mut alias_task) {
            Ok(alias_reservation) => alias_reservation,
            Err(error) => {
                // Devices with a known address can still be dialed directly.
                if let Some(address) = address.filter(|_| matches!(technology, Technology::H323 | Technology::Sip)) {
                    self.base.add_error_report(&error);
                    return Ok(Connection { endpoint_from, endpoint_to, technology, kind: ConnectionKind::ByAddress(address) });
                }
                return Err(error);
            }
        };

        let aliases = context.get_reservation(context.get_target(alias_reservation))?.get_aliases().to_vec();
        let target = &mut self.endpoints[endpoint_to];
        let mut connection_alias = None;
        for alias in aliases {
            if target.technologies.contains(&alias.technology) {
                if alias.technology == technology && connection_alias.is_none() {
                    connection_alias = Some(alias.clone());
                }
                target.assigned_aliases.push(alias);
            }
        }
        match connection_alias {
            Some(alias) => Ok(Connection { endpoint_from, endpoint_to, technology, kind: ConnectionKind::ByAlias(alias) }),
            None => Err(Error::InvalidState(format!("Allocated aliases contain no alias for technology {}.", technology)).into()),
        }
    }

    /// Connects at most two standalone endpoints without a room.
    ///
    /// Returns `false` when a room is needed.
    fn create_no_room_connections(&mut self, context: &mut SchedulerContext<'_>) -> Result<bool, SchedulerError> {
        if self.get_total_endpoint_count() > 2 || self.endpoints.len() > 2 {
            return Ok(false);
        }
        match self.endpoints.len() {
            2 => {
                let (first, second) = (&self.endpoints[0], &self.endpoints[1]);
                if !first.standalone || !second.standalone || Self::get_common_technologies(first, second).is_empty() {
                    return Ok(false);
                }
                self.add_connection(context, 0, 1)?;
                Ok(true)
            }
            1 => Ok(matches!(self.endpoints[0].kind, EndpointKind::Resource(_))),
            _ => Ok(false),
        }
    }

    fn create_single_room(&mut self, context: &mut SchedulerContext<'_>) -> Result<(), SchedulerError> {
        let groups: Vec<BTreeSet<Technology>> = self.endpoints.iter().map(|endpoint| endpoint.technologies.clone()).collect();
        let mut room_task = RoomReservationTask::new(self.base.slot, self.get_total_endpoint_count());
        for technologies in Technology::interconnect(&groups) {
            room_task.add_technology_variant(technologies);
        }
        let room_reservation = self.base.add_child_task(context, &mut room_task)?;

        let room_target = context.get_reservation(context.get_target(room_reservation))?;
        let executable = match &room_target.executable {
            Some(executable) => executable,
            None => return Err(Error::InvalidState("Room for the compartment has no executable.".to_string()).into()),
        };
        let room = match executable.get_room_endpoint() {
            Some(room) => room,
            None => return Err(Error::InvalidState("Room for the compartment has no room endpoint.".to_string()).into()),
        };
        let address = context.get_cache().get_resource(&room.resource)?.device.as_ref().and_then(|device| device.address.clone());
        let room_endpoint = Endpoint {
            kind: EndpointKind::Room { resource: room.resource.clone(), executable: executable.id.clone() },
            technologies: room.technologies.clone(),
            count: 1,
            standalone: false,
            aliases: room.aliases.clone(),
            assigned_aliases: Vec::new(),
            call_initiation: None,
            address,
            preferred_technology: None,
        };

        let participants = self.endpoints.len();
        self.endpoints.push(room_endpoint);
        let room_index = self.endpoints.len() - 1;
        for participant in 0..participants {
            self.add_connection(context, room_index, participant)?;
        }
        Ok(())
    }
}

impl ReservationTask for CompartmentReservationTask {
    fn get_base(&self) -> &TaskBase {
        &self.base
    }

    fn get_base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn create_main_report(&self, _context: &SchedulerContext<'_>) -> Option<SchedulerReport> {
        Some(SchedulerReport::new(ReportKind::AllocatingCompartment))
    }

    fn allocate_reservation(&mut self, context: &mut SchedulerContext<'_>) -> Result<ReservationId, SchedulerError> {
        if !context.is_executable_allowed() {
            return Err(Error::NotImplemented("Allocating compartment without executable.".to_string()).into());
        }

        for participant in self.specification.participants.clone() {
            self.add_participant(context, &participant)?;
        }

        if self.get_total_endpoint_count() <= 1 {
            let resource_requested = self.endpoints.iter().any(|endpoint| matches!(endpoint.kind, EndpointKind::Resource(_)));
            if !resource_requested {
                return Err(SchedulerError::new(ReportKind::CompartmentNotEnoughEndpoint));
            }
        }

        if !self.create_no_room_connections(context)? {
            self.create_single_room(context)?;
        }

        log::debug!("Allocated compartment with {} endpoints and {} connections.", self.endpoints.len(), self.connections.len());
        let compartment = Compartment { endpoints: self.endpoints.clone(), connections: self.connections.clone() };
        let mut reservation = Reservation::new(self.base.slot, ReservationKind::Plain);
        reservation.executable = Some(Executable::new(self.base.slot, ExecutableKind::Compartment(compartment)));
        Ok(context.create_reservation(reservation))
    }
}
