mod common;

use serde_json::{Value, json};

use shongo_scheduler::domain::reservation::reservation::{ObjectKey, Reservation, ReservationKind};
use shongo_scheduler::domain::utils::id::CapabilityId;
use shongo_scheduler::loader::scenario_loader::Scenario;

use common::interval;

fn room_request(id: &str, start: i64, end: i64, participant_count: u32) -> Value {
    json!({
        "id": id,
        "slot": { "start": start, "end": end },
        "specification": { "type": "ROOM", "participantCount": participant_count, "recording": { "enabled": true } }
    })
}

/// H.323 MCU without its own recorder next to an external recorder with two licences.
fn mcu_with_external_recorder(requests: Vec<Value>) -> Scenario {
    common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [
            { "id": "mcu", "device": { "technologies": ["H323"] },
              "capabilities": [{ "id": "mcu-room", "type": "ROOM_PROVIDER", "licenseCount": 10 }] },
            { "id": "tcs", "device": { "technologies": ["H323", "SIP"] },
              "capabilities": [{ "id": "tcs-recording", "type": "RECORDING", "licenseCount": 2 }] }
        ],
        "reservationRequests": requests
    }))
}

/// Every reservation of the request's reservation tree.
fn reservation_tree<'a>(scenario: &'a Scenario, id: &str) -> Vec<&'a Reservation> {
    let top = *common::request(scenario, id).allocation.reservations.last().expect("Reservation request must have a reservation.");
    scenario.cache.reservations().get_set_of_all(top).into_iter().filter_map(|id| scenario.cache.reservations().get(id)).collect()
}

fn recording_resources(scenario: &Scenario, id: &str) -> Vec<String> {
    reservation_tree(scenario, id)
        .into_iter()
        .filter_map(|reservation| match &reservation.kind {
            ReservationKind::RecordingService { resource, .. } => Some(resource.to_string()),
            _ => None,
        })
        .collect()
}

fn used_room_licences(scenario: &Scenario, capability: &str) -> u32 {
    scenario
        .cache
        .list_reservations(&ObjectKey::RoomProvider(CapabilityId::new(capability)), &interval(0, 1000))
        .into_iter()
        .filter_map(|id| scenario.cache.reservations().get(id))
        .map(|reservation| reservation.get_license_count())
        .sum()
}

#[test]
fn test_room_recorded_by_external_recorder() {
    let mut scenario = mcu_with_external_recorder(vec![room_request("room", 100, 200, 5)]);
    common::run(&mut scenario);

    common::assert_allocated(&scenario, "room");
    assert_eq!(recording_resources(&scenario, "room"), vec!["tcs".to_string()]);
    let room_executable = common::reservation(&scenario, "room").executable.as_ref().map(|executable| executable.id.clone());
    let recorded_executable = reservation_tree(&scenario, "room").into_iter().find_map(|reservation| match &reservation.kind {
        ReservationKind::RecordingService { executable, enabled, .. } => Some((executable.clone(), *enabled)),
        _ => None,
    });
    assert_eq!(recorded_executable, room_executable.map(|executable| (executable, true)), "Recording must belong to the allocated room.");
    assert_eq!(used_room_licences(&scenario, "mcu-room"), 6, "The recorder dialing into the room takes one more licence.");
}

#[test]
fn test_recorder_capacity_exceeded() {
    let mut scenario = mcu_with_external_recorder(vec![
        room_request("first", 100, 300, 2),
        room_request("second", 150, 350, 2),
        room_request("third", 200, 250, 2),
        room_request("later", 350, 400, 2),
    ]);
    common::run(&mut scenario);

    common::assert_allocated(&scenario, "first");
    common::assert_allocated(&scenario, "second");
    common::assert_failed(&scenario, "third");
    common::assert_allocated(&scenario, "later");

    let report = common::request(&scenario, "third").allocation_report.clone().unwrap_or_default();
    assert!(report.contains("resource tcs has no recording licence left"), "Report should name the full recorder:\n{}", report);
    assert_eq!(used_room_licences(&scenario, "mcu-room"), 9, "Failed room must not keep its licences.");
}

#[test]
fn test_recording_counts_recorder_licence_against_room_capacity() {
    let mut scenario = mcu_with_external_recorder(vec![room_request("room", 100, 200, 10)]);
    common::run(&mut scenario);

    common::assert_failed(&scenario, "room");
}

#[test]
fn test_unlimited_recording_device_needs_no_service() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [
            { "id": "connect", "device": { "technologies": ["ADOBE_CONNECT"] },
              "capabilities": [
                  { "id": "connect-room", "type": "ROOM_PROVIDER", "licenseCount": 5 },
                  { "id": "connect-recording", "type": "RECORDING" }
              ] }
        ],
        "reservationRequests": [room_request("room", 100, 200, 5)]
    }));
    common::run(&mut scenario);

    common::assert_allocated(&scenario, "room");
    assert!(recording_resources(&scenario, "room").is_empty(), "Rooms of the device are always recordable.");
    assert_eq!(used_room_licences(&scenario, "connect-room"), 5);
}

#[test]
fn test_own_recorder_is_used_without_extra_licence() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [
            { "id": "mcu", "device": { "technologies": ["H323"] },
              "capabilities": [
                  { "id": "mcu-room", "type": "ROOM_PROVIDER", "licenseCount": 10 },
                  { "id": "mcu-recording", "type": "RECORDING", "licenseCount": 1 }
              ] }
        ],
        "reservationRequests": [room_request("first", 100, 200, 4), room_request("second", 150, 250, 4)]
    }));
    common::run(&mut scenario);

    common::assert_allocated(&scenario, "first");
    assert_eq!(recording_resources(&scenario, "first"), vec!["mcu".to_string()]);
    common::assert_failed(&scenario, "second");
    assert_eq!(used_room_licences(&scenario, "mcu-room"), 4);
}
