mod common;

use serde_json::{Value, json};

use shongo_scheduler::domain::reservation::executable::{Compartment, ConnectionKind, EndpointKind};
use shongo_scheduler::domain::scheduler::notification::Notification;
use shongo_scheduler::domain::technology::Technology;
use shongo_scheduler::loader::scenario_loader::Scenario;

/// Device which creates H.323 and SIP rooms and assigns them aliases from a numeric pattern.
fn mcu_resources() -> Value {
    json!([
        { "id": "mcu", "device": { "technologies": ["H323", "SIP"] },
          "capabilities": [
              { "id": "mcu-room", "type": "ROOM_PROVIDER", "licenseCount": 10 },
              { "id": "mcu-alias", "type": "ALIAS_PROVIDER", "valueProvider": "mcu-numbers", "restrictedToResource": true,
                "aliases": [
                    { "aliasType": "H323_E164", "value": "950{value}" },
                    { "aliasType": "SIP_URI", "value": "{value}@cesnet.cz" }
                ] }
          ] }
    ])
}

fn mcu_value_providers() -> Value {
    json!([{ "id": "mcu-numbers", "capability": "mcu-alias", "type": "PATTERN", "patterns": ["{digit:3}"] }])
}

fn compartment(scenario: &Scenario, id: &str) -> Compartment {
    let reservation = common::reservation(scenario, id);
    match reservation.executable.as_ref().and_then(|executable| executable.get_compartment()) {
        Some(compartment) => compartment.clone(),
        None => panic!("Compartment executable expected for '{}'.", id),
    }
}

#[test]
fn test_standalone_terminals_connected_directly() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [
            { "id": "terminal1", "device": { "technologies": ["H323"] },
              "capabilities": [{ "id": "terminal1-terminal", "type": "TERMINAL", "standalone": true,
                                 "aliases": [{ "aliasType": "H323_E164", "technology": "H323", "value": "9501" }] }] },
            { "id": "terminal2", "device": { "technologies": ["H323"] },
              "capabilities": [{ "id": "terminal2-terminal", "type": "TERMINAL", "standalone": true,
                                 "aliases": [{ "aliasType": "H323_E164", "technology": "H323", "value": "9502" }] }] }
        ],
        "reservationRequests": [
            { "id": "call", "slot": { "start": 100, "end": 200 },
              "specification": { "type": "COMPARTMENT", "participants": [
                  { "type": "EXISTING", "resource": "terminal1" },
                  { "type": "EXISTING", "resource": "terminal2" }
              ] } }
        ]
    }));

    common::run(&mut scenario);
    common::assert_allocated(&scenario, "call");

    let compartment = compartment(&scenario, "call");
    assert_eq!(compartment.endpoints.len(), 2, "No room is needed for two standalone terminals.");
    assert!(compartment.endpoints.iter().all(|endpoint| matches!(endpoint.kind, EndpointKind::Resource(_))));
    assert_eq!(compartment.connections.len(), 1);
    let connection = &compartment.connections[0];
    assert_eq!((connection.endpoint_from, connection.endpoint_to), (0, 1));
    assert_eq!(connection.technology, Technology::H323);
    match &connection.kind {
        ConnectionKind::ByAlias(alias) => assert_eq!(alias.value, "9502"),
        kind => panic!("Connection by alias expected, got {:?}.", kind),
    }
}

#[test]
fn test_externals_connected_through_room() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": mcu_resources(),
        "valueProviders": mcu_value_providers(),
        "reservationRequests": [
            { "id": "call", "slot": { "start": 100, "end": 200 },
              "specification": { "type": "COMPARTMENT", "participants": [
                  { "type": "EXTERNAL", "technologies": ["H323"] },
                  { "type": "EXTERNAL", "technologies": ["SIP"] }
              ] } }
        ]
    }));

    let result = common::run(&mut scenario);
    common::assert_allocated(&scenario, "call");
    assert!(result.notifications.iter().any(|notification| matches!(notification, Notification::ReservationNew { .. })));

    let compartment = compartment(&scenario, "call");
    assert_eq!(compartment.endpoints.len(), 3);
    let room = &compartment.endpoints[2];
    assert!(room.is_room());
    assert_eq!(room.technologies, common::technologies(&[Technology::H323, Technology::Sip]));

    let mut values: Vec<String> = room.get_aliases().map(|alias| alias.value.clone()).collect();
    values.sort();
    assert_eq!(values, vec!["001@cesnet.cz".to_string(), "950001".to_string()]);

    assert_eq!(compartment.connections.len(), 2);
    for (participant, technology, value) in [(0, Technology::H323, "950001"), (1, Technology::Sip, "001@cesnet.cz")] {
        let connection = &compartment.connections[participant];
        assert_eq!((connection.endpoint_from, connection.endpoint_to), (participant, 2), "Participants dial the room.");
        assert_eq!(connection.technology, technology);
        assert_eq!(connection.kind, ConnectionKind::ByAlias(room.get_aliases().find(|alias| alias.value == value).cloned().unwrap()));
    }
}

#[test]
fn test_room_calls_participants_with_aliases() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": mcu_resources(),
        "valueProviders": mcu_value_providers(),
        "reservationRequests": [
            { "id": "call", "slot": { "start": 100, "end": 200 },
              "specification": { "type": "COMPARTMENT", "callInitiation": "VIRTUAL_ROOM", "participants": [
                  { "type": "EXTERNAL", "technologies": ["H323"],
                    "aliases": [{ "aliasType": "H323_E164", "technology": "H323", "value": "5001" }] },
                  { "type": "EXTERNAL", "technologies": ["SIP"],
                    "aliases": [{ "aliasType": "SIP_URI", "technology": "SIP", "value": "guest@example.org" }] }
              ] } }
        ]
    }));

    common::run(&mut scenario);
    common::assert_allocated(&scenario, "call");

    let compartment = compartment(&scenario, "call");
    let expected = [(0, "5001"), (1, "guest@example.org")];
    for (connection, (participant, value)) in compartment.connections.iter().zip(expected) {
        assert_eq!((connection.endpoint_from, connection.endpoint_to), (2, participant), "The room dials the participants.");
        match &connection.kind {
            ConnectionKind::ByAlias(alias) => assert_eq!(alias.value, value),
            kind => panic!("Connection by alias expected, got {:?}.", kind),
        }
    }
    assert_eq!(compartment.endpoints[2].assigned_aliases.len(), 0, "No alias is allocated when participants have their own.");
}

#[test]
fn test_single_external_endpoint_fails() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": mcu_resources(),
        "valueProviders": mcu_value_providers(),
        "reservationRequests": [
            { "id": "call", "slot": { "start": 100, "end": 200 },
              "specification": { "type": "COMPARTMENT", "participants": [{ "type": "EXTERNAL", "technologies": ["H323"] }] } }
        ]
    }));

    let result = common::run(&mut scenario);
    assert_eq!(result.scheduler.failed, 1);
    common::assert_failed(&scenario, "call");
    assert!(scenario.cache.reservations().is_empty(), "Failed allocation must not leave reservations behind.");
    assert!(result.notifications.iter().any(|notification| matches!(notification, Notification::AllocationFailed { .. })));
}
