mod common;

use serde_json::json;

use shongo_scheduler::domain::request::reservation_request::{ReservationRequest, ReservationRequestPurpose};
use shongo_scheduler::domain::request::specification::Specification;
use shongo_scheduler::domain::reservation::reservation::ReservationKind;
use shongo_scheduler::domain::scheduler::notification::Notification;
use shongo_scheduler::domain::scheduler::persistence::Persistence;
use shongo_scheduler::domain::utils::id::ResourceId;

fn resource_request(id: &str, resource: &str, start: i64, end: i64) -> ReservationRequest {
    ReservationRequest::new(id, common::interval(start, end), Specification::Resource { resource: ResourceId::new(resource) })
}

fn room_resource(scenario: &shongo_scheduler::loader::scenario_loader::Scenario, id: &str) -> String {
    match &common::reservation(scenario, id).kind {
        ReservationKind::Room { resource, .. } => resource.to_string(),
        kind => panic!("Room reservation expected, got {:?}.", kind),
    }
}

#[test]
fn test_higher_priority_takes_resource() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [{ "id": "projector" }],
        "reservationRequests": [
            { "id": "low", "slot": { "start": 100, "end": 200 }, "specification": { "type": "RESOURCE", "resource": "projector" } }
        ]
    }));
    common::run(&mut scenario);
    common::assert_allocated(&scenario, "low");

    let mut high = resource_request("high", "projector", 150, 250);
    high.priority = 5;
    high.created_at = 10;
    scenario.persistence.add_reservation_request(high).unwrap();

    let result = common::run(&mut scenario);
    assert_eq!((result.scheduler.allocated, result.scheduler.failed, result.scheduler.deleted), (1, 1, 1));
    common::assert_allocated(&scenario, "high");
    common::assert_failed(&scenario, "low");
    assert!(common::request(&scenario, "low").allocation.reservations.is_empty(), "Forced reallocation drops the old reservation.");
    let report = common::request(&scenario, "low").allocation_report.clone().unwrap_or_default();
    assert!(report.contains("already allocated"), "Unexpected report:\n{}", report);
}

#[test]
fn test_equal_priority_collision_fails() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [{ "id": "projector" }],
        "reservationRequests": [
            { "id": "first", "slot": { "start": 100, "end": 200 }, "createdAt": 1,
              "specification": { "type": "RESOURCE", "resource": "projector" } },
            { "id": "second", "slot": { "start": 150, "end": 250 }, "createdAt": 2,
              "specification": { "type": "RESOURCE", "resource": "projector" } },
            { "id": "third", "slot": { "start": 200, "end": 300 }, "createdAt": 3,
              "specification": { "type": "RESOURCE", "resource": "projector" } }
        ]
    }));

    let result = common::run(&mut scenario);
    assert_eq!((result.scheduler.allocated, result.scheduler.failed), (2, 1));
    common::assert_failed(&scenario, "second");
    common::assert_allocated(&scenario, "third");
}

#[test]
fn test_maintenance_is_scheduled_first() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [{ "id": "projector" }],
        "reservationRequests": [
            { "id": "meeting", "slot": { "start": 100, "end": 200 }, "createdAt": 1,
              "specification": { "type": "RESOURCE", "resource": "projector" } },
            { "id": "maintenance", "slot": { "start": 0, "end": 500 }, "createdAt": 2, "purpose": "MAINTENANCE",
              "specification": { "type": "RESOURCE", "resource": "projector" } }
        ]
    }));

    common::run(&mut scenario);
    common::assert_allocated(&scenario, "maintenance");
    common::assert_failed(&scenario, "meeting");
    let report = common::request(&scenario, "meeting").allocation_report.clone().unwrap_or_default();
    assert!(report.contains("maintenance"), "Unexpected report:\n{}", report);
}

#[test]
fn test_maintenance_moves_rooms() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [
            { "id": "mcu1", "device": { "technologies": ["H323"] },
              "capabilities": [{ "id": "mcu1-room", "type": "ROOM_PROVIDER", "licenseCount": 20 }] },
            { "id": "mcu2", "device": { "technologies": ["H323"] },
              "capabilities": [{ "id": "mcu2-room", "type": "ROOM_PROVIDER", "licenseCount": 10 }] }
        ],
        "reservationRequests": [
            { "id": "meeting", "slot": { "start": 100, "end": 200 }, "specification": { "type": "ROOM", "participantCount": 5 } }
        ]
    }));
    common::run(&mut scenario);
    assert_eq!(room_resource(&scenario, "meeting"), "mcu1");

    let mut maintenance = resource_request("maintenance", "mcu1", 0, 500);
    maintenance.purpose = ReservationRequestPurpose::Maintenance;
    scenario.persistence.add_reservation_request(maintenance).unwrap();

    let result = common::run(&mut scenario);
    assert_eq!((result.scheduler.allocated, result.scheduler.failed, result.scheduler.deleted), (1, 0, 1));
    common::assert_allocated(&scenario, "maintenance");
    common::assert_allocated(&scenario, "meeting");
    assert_eq!(room_resource(&scenario, "meeting"), "mcu2");
    assert_eq!(common::request(&scenario, "meeting").allocation.reservations.len(), 1);

    let modified = result.notifications.iter().any(|notification| matches!(notification, Notification::ReservationModified { .. }));
    assert!(!modified, "Reallocation caused by maintenance is not announced.");
}

#[test]
fn test_owner_purpose_requires_ownership() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [{ "id": "projector", "owners": ["7"] }],
        "reservationRequests": [
            { "id": "stranger", "slot": { "start": 100, "end": 200 }, "purpose": "OWNER", "userId": "5",
              "specification": { "type": "RESOURCE", "resource": "projector" } },
            { "id": "owner", "slot": { "start": 300, "end": 400 }, "purpose": "OWNER", "userId": "7",
              "specification": { "type": "RESOURCE", "resource": "projector" } }
        ]
    }));

    common::run(&mut scenario);
    common::assert_failed(&scenario, "stranger");
    common::assert_allocated(&scenario, "owner");
    let report = common::request(&scenario, "stranger").allocation_report.clone().unwrap_or_default();
    assert!(report.contains("not resource owner"), "Unexpected report:\n{}", report);
}
