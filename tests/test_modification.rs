mod common;

use serde_json::json;

use shongo_scheduler::domain::reservation::executable::ExecutableState;
use shongo_scheduler::domain::reservation::reservation::ObjectKey;
use shongo_scheduler::domain::scheduler::notification::Notification;
use shongo_scheduler::domain::scheduler::persistence::Persistence;
use shongo_scheduler::domain::utils::id::{CapabilityId, ReservationRequestId};
use shongo_scheduler::loader::scenario_loader::Scenario;

fn room_scenario() -> Scenario {
    common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [
            { "id": "mcu", "device": { "technologies": ["H323"] },
              "capabilities": [{ "id": "mcu-room", "type": "ROOM_PROVIDER", "licenseCount": 10 }] }
        ],
        "reservationRequests": [
            { "id": "room", "slot": { "start": 100, "end": 300 }, "specification": { "type": "ROOM", "participantCount": 5 } }
        ]
    }))
}

/// Changes the slot of the request and marks it for the next scheduler pass.
fn modify_slot(scenario: &mut Scenario, id: &str, start: i64, end: i64) {
    let reservation_request = scenario.persistence.reservation_request_mut(&ReservationRequestId::new(id)).unwrap();
    reservation_request.slot = common::interval(start, end);
    reservation_request.clear_state();
}

fn allocation_slots(scenario: &Scenario, id: &str) -> Vec<(i64, i64)> {
    common::request(scenario, id)
        .allocation
        .reservations
        .iter()
        .map(|reservation| scenario.cache.get_reservation(*reservation).unwrap().slot)
        .map(|slot| (slot.start, slot.end))
        .collect()
}

#[test]
fn test_modified_request_is_reallocated() {
    let mut scenario = room_scenario();
    let result = common::run(&mut scenario);
    assert!(result.notifications.iter().any(|notification| matches!(notification, Notification::ReservationNew { .. })));

    modify_slot(&mut scenario, "room", 100, 400);
    let result = common::run(&mut scenario);
    assert_eq!((result.scheduler.allocated, result.scheduler.deleted), (1, 1));
    common::assert_allocated(&scenario, "room");
    assert_eq!(allocation_slots(&scenario, "room"), vec![(100, 400)]);
    assert_eq!(scenario.cache.reservations().len(), 1, "The old room must be removed.");
    assert!(result.notifications.contains(&Notification::ReservationModified {
        reservation_request: ReservationRequestId::new("room"),
        slot: common::interval(100, 400),
    }));
}

#[test]
fn test_history_is_kept() {
    let mut scenario = room_scenario();
    common::run(&mut scenario);

    modify_slot(&mut scenario, "room", 100, 400);
    let result = common::run_in(&mut scenario, 200, 1000);
    assert_eq!((result.scheduler.allocated, result.scheduler.deleted), (1, 0));
    assert_eq!(allocation_slots(&scenario, "room"), vec![(100, 200), (200, 400)], "The past part of the old room stays allocated.");
}

#[test]
fn test_started_room_is_migrated() {
    let mut scenario = room_scenario();
    common::run(&mut scenario);

    let old = *common::request(&scenario, "room").allocation.reservations.last().unwrap();
    let old_executable = {
        let executable = scenario.cache.reservations_mut().get_mut(old).unwrap().executable.as_mut().unwrap();
        executable.state = ExecutableState::Started;
        executable.id.clone()
    };

    modify_slot(&mut scenario, "room", 100, 400);
    common::run_in(&mut scenario, 200, 1000);
    common::assert_allocated(&scenario, "room");

    let new = common::reservation(&scenario, "room");
    let room = new.executable.as_ref().and_then(|executable| executable.get_room_endpoint()).unwrap();
    assert_eq!(room.migrate_from, Some(old_executable));
    assert_eq!(scenario.cache.get_reservation(old).unwrap().slot, common::interval(100, 200));
}

#[test]
fn test_room_replaced_at_its_start_is_not_listed() {
    let mut scenario = room_scenario();
    common::run(&mut scenario);

    let old = *common::request(&scenario, "room").allocation.reservations.last().unwrap();
    scenario.cache.reservations_mut().get_mut(old).unwrap().executable.as_mut().unwrap().state = ExecutableState::Started;

    modify_slot(&mut scenario, "room", 100, 400);
    common::run_in(&mut scenario, 100, 1000);
    common::assert_allocated(&scenario, "room");
    assert_eq!(scenario.cache.get_reservation(old).unwrap().slot, common::interval(100, 100));

    let listed = scenario.cache.list_reservations(&ObjectKey::RoomProvider(CapabilityId::new("mcu-room")), &common::interval(0, 1000));
    assert!(!listed.contains(&old), "Emptied history room must not occupy the provider.");
    assert_eq!(listed.len(), 1);
}

#[test]
fn test_shortened_room_drops_trailing_part() {
    let mut scenario = room_scenario();
    common::run(&mut scenario);

    modify_slot(&mut scenario, "room", 100, 200);
    let result = common::run_in(&mut scenario, 150, 1000);
    assert_eq!(result.scheduler.allocated, 1);
    common::assert_allocated(&scenario, "room");
    assert_eq!(allocation_slots(&scenario, "room"), vec![(100, 150), (150, 200)], "Nothing may remain allocated after the new end.");
    assert_eq!(scenario.cache.reservations().len(), 2);
}

#[test]
fn test_reallocated_alias_keeps_value() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [
            { "id": "gatekeeper",
              "capabilities": [{ "id": "gatekeeper-alias", "type": "ALIAS_PROVIDER", "valueProvider": "gatekeeper-numbers",
                                 "aliases": [{ "aliasType": "H323_E164", "value": "950{value}" }] }] }
        ],
        "valueProviders": [{ "id": "gatekeeper-numbers", "capability": "gatekeeper-alias", "type": "PATTERN", "patterns": ["{digit:3}"] }],
        "reservationRequests": [
            { "id": "first", "slot": { "start": 100, "end": 200 }, "createdAt": 1,
              "specification": { "type": "ALIAS", "technologies": ["H323"] } },
            { "id": "second", "slot": { "start": 100, "end": 300 }, "createdAt": 2,
              "specification": { "type": "ALIAS", "technologies": ["H323"] } }
        ]
    }));
    common::run(&mut scenario);
    assert_eq!(common::reservation(&scenario, "second").get_aliases()[0].value, "950002");

    scenario.persistence.delete_reservation_request(&ReservationRequestId::new("first")).unwrap();
    modify_slot(&mut scenario, "second", 100, 400);
    common::run(&mut scenario);

    common::assert_allocated(&scenario, "second");
    assert_eq!(common::reservation(&scenario, "second").get_aliases()[0].value, "950002", "The freed lower value must not replace the old one.");
}
