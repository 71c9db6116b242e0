mod common;

use serde_json::{Value, json};

use shongo_scheduler::api::scenario_dto::ScenarioDto;
use shongo_scheduler::domain::reservation::reservation::ReservationKind;
use shongo_scheduler::domain::scheduler::persistence::Persistence;
use shongo_scheduler::domain::scheduler::report::MessageType;
use shongo_scheduler::error::{Error, Result};
use shongo_scheduler::generate_scenario;
use shongo_scheduler::loader::scenario_loader::Scenario;

const SCENARIO_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/data/test/scenario_01.json");

fn from_json(json: Value) -> Result<Scenario> {
    let dto: ScenarioDto = serde_json::from_value(json)?;
    Scenario::from_dto(dto)
}

#[test]
fn test_load_scenario_file() {
    let scenario = generate_scenario(SCENARIO_FILE).unwrap();
    assert_eq!(scenario.config.domain_name, "cz.cesnet");
    assert_eq!(scenario.config.report_verbosity, MessageType::DomainAdmin);
    assert_eq!(scenario.interval, common::interval(1_700_000_000_000, 1_700_604_800_000));
    assert_eq!(scenario.cache.get_resources().len(), 4);
    assert_eq!(scenario.persistence.list_reservation_requests().len(), 3);
    assert_eq!(scenario.persistence.list_reservation_request_sets().len(), 1);

    let seminar = common::request(&scenario, "seminar");
    assert_eq!(seminar.description.as_deref(), Some("Weekly seminar"));
    assert_eq!(seminar.user_id.as_str(), "0", "Requests without a user belong to the root user.");
}

#[test]
fn test_run_scenario_file() {
    let mut scenario = generate_scenario(SCENARIO_FILE).unwrap();
    let result = common::run(&mut scenario);
    assert_eq!(result.preprocessor.created, 5);
    assert_eq!((result.scheduler.allocated, result.scheduler.failed), (8, 0));

    let seminar = common::reservation(&scenario, "seminar");
    let room = seminar.executable.as_ref().and_then(|executable| executable.get_room_endpoint()).unwrap();
    assert_eq!(room.license_count, 10);
    assert!(room.aliases.iter().any(|alias| alias.value == "950001"));
    assert_eq!(seminar.slot.start, 1_700_046_000_000 - 15 * common::MINUTE, "The room starts before the requested slot.");

    assert!(matches!(common::reservation(&scenario, "seminar-guests").kind, ReservationKind::Existing { .. }));
}

#[test]
fn test_missing_scenario_file() {
    match generate_scenario("non_existent_file.json") {
        Err(Error::IoError(_)) => {}
        result => panic!("Expected an I/O error, got {:?}.", result.map(|_| ())),
    }
}

#[test]
fn test_unknown_references() {
    let result = from_json(json!({
        "resources": [{ "id": "gatekeeper",
                        "capabilities": [{ "id": "gatekeeper-alias", "type": "ALIAS_PROVIDER", "valueProvider": "missing",
                                           "aliases": [{ "aliasType": "H323_E164", "value": "950{value}" }] }] }]
    }));
    assert!(matches!(result, Err(Error::EntityNotFound { ref id, .. }) if id == "missing"));

    let result = from_json(json!({
        "reservationRequests": [{ "id": "room", "slot": { "start": 0, "end": 10 },
                                  "specification": { "type": "RESOURCE", "resource": "missing" } }]
    }));
    assert!(matches!(result, Err(Error::EntityNotFound { ref id, .. }) if id == "missing"));

    let result = from_json(json!({
        "reservationRequests": [{ "id": "usage", "slot": { "start": 0, "end": 10 }, "reusedAllocation": "missing",
                                  "specification": { "type": "ROOM", "participantCount": 2 } }]
    }));
    assert!(matches!(result, Err(Error::EntityNotFound { ref id, .. }) if id == "missing"));
}

#[test]
fn test_invalid_model() {
    let result = from_json(json!({
        "resources": [{ "id": "building", "parent": "room" }, { "id": "room", "parent": "building" }]
    }));
    assert!(matches!(result, Err(Error::ModelConstructionError(_))), "Parent cycles are rejected.");

    let result = from_json(json!({
        "resources": [{ "id": "projector" }],
        "reservationRequestSets": [{ "id": "set", "slots": [{ "type": "PERIODIC", "start": 0, "period": 0, "duration": 10 }],
                                     "specification": { "type": "RESOURCE", "resource": "projector" } }]
    }));
    assert!(matches!(result, Err(Error::ModelConstructionError(_))), "Periodic slots need a positive period.");

    let result = from_json(json!({
        "reservationRequests": [{ "id": "slot", "slot": { "start": 10, "end": 0 },
                                  "specification": { "type": "ROOM", "participantCount": 2 } }]
    }));
    assert!(matches!(result, Err(Error::InvalidInterval { start: 10, end: 0 })));
}

#[test]
fn test_reusement_is_checked() {
    let requests = |reusement: &str, user: &str| {
        json!({
            "reservationRequests": [
                { "id": "permanent", "slot": { "start": 0, "end": 100 }, "reusement": reusement, "userId": "1",
                  "specification": { "type": "ROOM", "participantCount": 5 } },
                { "id": "usage", "slot": { "start": 10, "end": 20 }, "reusedAllocation": "permanent", "userId": user,
                  "specification": { "type": "ROOM", "participantCount": 2 } }
            ]
        })
    };
    assert!(matches!(from_json(requests("NONE", "1")), Err(Error::ModelConstructionError(_))));
    assert!(matches!(from_json(requests("OWNED", "2")), Err(Error::ModelConstructionError(_))));
    assert!(from_json(requests("OWNED", "1")).is_ok());
    assert!(from_json(requests("ARBITRARY", "2")).is_ok());
}
