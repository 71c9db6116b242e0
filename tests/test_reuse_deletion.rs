mod common;

use serde_json::{Value, json};

use shongo_scheduler::domain::reservation::reservation::ReservationKind;
use shongo_scheduler::domain::scheduler::notification::Notification;
use shongo_scheduler::domain::scheduler::persistence::Persistence;
use shongo_scheduler::domain::utils::id::ReservationRequestId;
use shongo_scheduler::error::Error;

fn mcu() -> Value {
    json!([
        { "id": "mcu", "device": { "technologies": ["H323", "SIP"] },
          "capabilities": [{ "id": "mcu-room", "type": "ROOM_PROVIDER", "licenseCount": 20 }] }
    ])
}

fn permanent_room() -> Value {
    json!({ "id": "permanent", "slot": { "start": 0, "end": 1000 }, "createdAt": 1, "reusement": "ARBITRARY",
            "specification": { "type": "ROOM", "participantCount": 10, "technologies": ["H323"] } })
}

fn usage(id: &str, start: i64, end: i64, created_at: i64, technologies: &[&str], mandatory: bool) -> Value {
    json!({ "id": id, "slot": { "start": start, "end": end }, "createdAt": created_at,
            "reusedAllocation": "permanent", "reusedAllocationMandatory": mandatory,
            "specification": { "type": "ROOM", "participantCount": 5, "technologies": technologies } })
}

#[test]
fn test_room_reused_by_usage() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": mcu(),
        "reservationRequests": [permanent_room(), usage("usage", 100, 200, 2, &["H323"], true)]
    }));

    let result = common::run(&mut scenario);
    assert_eq!(result.scheduler.allocated, 2);
    common::assert_allocated(&scenario, "permanent");
    common::assert_allocated(&scenario, "usage");

    let permanent = *common::request(&scenario, "permanent").allocation.reservations.last().unwrap();
    let usage = common::reservation(&scenario, "usage");
    assert_eq!(usage.kind, ReservationKind::Existing { reused: permanent });
    assert_eq!(usage.slot, common::interval(100, 200));
    assert!(common::request(&scenario, "usage").allocation_report.as_deref().unwrap_or_default().contains("permanent"));
}

#[test]
fn test_overlapping_usages() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": mcu(),
        "reservationRequests": [
            permanent_room(),
            usage("first", 100, 200, 2, &["H323"], false),
            usage("second", 150, 250, 3, &["H323"], false),
            usage("third", 300, 400, 4, &["H323"], false)
        ]
    }));

    common::run(&mut scenario);
    common::assert_allocated(&scenario, "first");
    common::assert_failed(&scenario, "second");
    common::assert_allocated(&scenario, "third");
    let report = common::request(&scenario, "second").allocation_report.clone().unwrap_or_default();
    assert!(report.contains("first"), "Report should name the request using the reservation:\n{}", report);
}

#[test]
fn test_mandatory_usage_not_possible() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": mcu(),
        "reservationRequests": [permanent_room(), usage("usage", 100, 200, 2, &["SIP"], true)]
    }));

    common::run(&mut scenario);
    common::assert_allocated(&scenario, "permanent");
    common::assert_failed(&scenario, "usage");
    assert_eq!(scenario.cache.reservations().len(), 1, "The room allocated for the failed usage must be dropped.");
}

#[test]
fn test_reused_allocation_deletion() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": mcu(),
        "reservationRequests": [permanent_room(), usage("usage", 100, 200, 2, &["H323"], false)]
    }));
    common::run(&mut scenario);
    assert_eq!(scenario.cache.reservations().len(), 2);

    let permanent = ReservationRequestId::new("permanent");
    let usage = ReservationRequestId::new("usage");
    match scenario.persistence.delete_reservation_request(&permanent) {
        Err(Error::NotDeletable { id, reason }) => {
            assert_eq!(id, "permanent");
            assert!(reason.contains("usage"));
        }
        result => panic!("Reused allocation must not be deletable, got {:?}.", result),
    }
    common::assert_allocated(&scenario, "permanent");

    scenario.persistence.delete_reservation_request(&usage).unwrap();
    let result = common::run(&mut scenario);
    assert_eq!(result.scheduler.deleted, 1);
    assert!(scenario.persistence.get_reservation_request(&usage).is_none());
    assert!(result.notifications.contains(&Notification::ReservationDeleted { reservation_request: Some(usage.clone()), slot: common::interval(100, 200) }));

    scenario.persistence.delete_reservation_request(&permanent).unwrap();
    let result = common::run(&mut scenario);
    assert_eq!(result.scheduler.deleted, 1);
    assert!(scenario.cache.reservations().is_empty());
    assert!(scenario.persistence.list_reservation_requests().is_empty());
}
