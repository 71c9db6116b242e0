mod common;

use std::collections::BTreeSet;

use serde_json::{Value, json};

use shongo_scheduler::domain::reservation::reservation::ReservationKind;
use shongo_scheduler::domain::technology::Technology;

fn gatekeeper(pattern: &str) -> (Value, Value) {
    let resources = json!([
        { "id": "gatekeeper",
          "capabilities": [{ "id": "gatekeeper-alias", "type": "ALIAS_PROVIDER", "valueProvider": "gatekeeper-numbers",
                             "aliases": [{ "aliasType": "H323_E164", "value": "950{value}" }] }] }
    ]);
    let value_providers = json!([{ "id": "gatekeeper-numbers", "capability": "gatekeeper-alias", "type": "PATTERN", "patterns": [pattern] }]);
    (resources, value_providers)
}

fn alias_request(id: &str, start: i64, end: i64, created_at: i64, value: Option<&str>) -> Value {
    json!({ "id": id, "slot": { "start": start, "end": end }, "createdAt": created_at,
            "specification": { "type": "ALIAS", "technologies": ["H323"], "value": value } })
}

fn alias_value(scenario: &shongo_scheduler::loader::scenario_loader::Scenario, id: &str) -> String {
    let aliases = common::reservation(scenario, id).get_aliases();
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].technology, Technology::H323);
    aliases[0].value.clone()
}

#[test]
fn test_requested_alias_value() {
    let (resources, value_providers) = gatekeeper("{digit:3}");
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": resources,
        "valueProviders": value_providers,
        "reservationRequests": [
            alias_request("first", 100, 200, 1, Some("950005")),
            alias_request("overlapping", 150, 250, 2, Some("950005")),
            alias_request("later", 300, 400, 3, Some("950005")),
            alias_request("generated", 100, 200, 4, None)
        ]
    }));

    let result = common::run(&mut scenario);
    assert_eq!((result.scheduler.allocated, result.scheduler.failed), (3, 1));
    common::assert_failed(&scenario, "overlapping");
    let report = common::request(&scenario, "overlapping").allocation_report.clone().unwrap_or_default();
    assert!(report.contains("005"), "Report should name the taken value:\n{}", report);

    assert_eq!(alias_value(&scenario, "first"), "950005");
    assert_eq!(alias_value(&scenario, "later"), "950005");
    assert_eq!(alias_value(&scenario, "generated"), "950001");
}

#[test]
fn test_alias_values_exhausted() {
    let (resources, value_providers) = gatekeeper("{digit:1}");
    let requests: Vec<Value> = (0..10).map(|index| alias_request(&format!("alias{}", index), 100, 200, index, None)).collect();
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": resources,
        "valueProviders": value_providers,
        "reservationRequests": requests
    }));

    let result = common::run(&mut scenario);
    assert_eq!((result.scheduler.allocated, result.scheduler.failed), (9, 1));
    common::assert_failed(&scenario, "alias9");

    let values: BTreeSet<String> = (0..9).map(|index| alias_value(&scenario, &format!("alias{}", index))).collect();
    assert_eq!(values.len(), 9, "Every allocated alias must be unique.");
    assert!(values.contains("9501") && values.contains("9509"));
}

#[test]
fn test_filtered_value_provider() {
    let mut scenario = common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [
            { "id": "naming", "capabilities": [{ "id": "naming-values", "type": "VALUE_PROVIDER", "valueProvider": "names" }] }
        ],
        "valueProviders": [
            { "id": "names", "capability": "naming-values", "type": "PATTERN", "patterns": ["{hash}"], "allowAnyRequestedValue": true },
            { "id": "urls", "capability": "naming-values", "type": "FILTERED", "filter": "CONVERT_TO_URL", "target": "names" }
        ],
        "reservationRequests": [
            { "id": "first", "slot": { "start": 100, "end": 200 }, "createdAt": 1,
              "specification": { "type": "VALUE", "valueProvider": "urls", "value": "My Room" } },
            { "id": "duplicate", "slot": { "start": 150, "end": 250 }, "createdAt": 2,
              "specification": { "type": "VALUE", "valueProvider": "names", "value": "my-room" } }
        ]
    }));

    common::run(&mut scenario);
    common::assert_allocated(&scenario, "first");
    common::assert_failed(&scenario, "duplicate");

    match &common::reservation(&scenario, "first").kind {
        ReservationKind::Value { value_provider, value, requested_value, .. } => {
            assert_eq!(value_provider.as_str(), "names", "Filtered values live in the space of the target provider.");
            assert_eq!(value, "my-room");
            assert_eq!(requested_value.as_deref(), Some("My Room"));
        }
        kind => panic!("Value reservation expected, got {:?}.", kind),
    }
}

/// Restricted alias provider `a-restricted` declared before unrestricted `b-free`, plus a room provider.
fn restricted_and_free_providers(requests: Value) -> shongo_scheduler::loader::scenario_loader::Scenario {
    common::load(json!({
        "interval": { "start": 0, "end": 1000 },
        "resources": [
            { "id": "a-restricted", "device": { "technologies": ["H323"] },
              "capabilities": [{ "id": "a-restricted-alias", "type": "ALIAS_PROVIDER", "valueProvider": "a-numbers", "restrictedToResource": true,
                                 "aliases": [{ "aliasType": "H323_E164", "value": "111{value}" }] }] },
            { "id": "b-free",
              "capabilities": [{ "id": "b-free-alias", "type": "ALIAS_PROVIDER", "valueProvider": "b-numbers",
                                 "aliases": [{ "aliasType": "H323_E164", "value": "222{value}" }] }] },
            { "id": "mcu", "device": { "technologies": ["H323"] },
              "capabilities": [{ "id": "mcu-room", "type": "ROOM_PROVIDER", "licenseCount": 10 }] }
        ],
        "valueProviders": [
            { "id": "a-numbers", "capability": "a-restricted-alias", "type": "PATTERN", "patterns": ["{digit:3}"] },
            { "id": "b-numbers", "capability": "b-free-alias", "type": "PATTERN", "patterns": ["{digit:3}"] }
        ],
        "reservationRequests": requests
    }))
}

#[test]
fn test_unrestricted_alias_provider_preferred() {
    let mut scenario = restricted_and_free_providers(json!([alias_request("alias", 100, 200, 1, None)]));

    common::run(&mut scenario);
    match &common::reservation(&scenario, "alias").kind {
        ReservationKind::Alias { resource, .. } => assert_eq!(resource.as_str(), "b-free"),
        kind => panic!("Alias reservation expected, got {:?}.", kind),
    }
    assert_eq!(alias_value(&scenario, "alias"), "222001");
}

#[test]
fn test_restricted_alias_provider_skipped_for_other_device() {
    let mut scenario = restricted_and_free_providers(json!([
        { "id": "room", "slot": { "start": 100, "end": 200 },
          "specification": { "type": "ROOM", "participantCount": 5, "aliases": [{ "technologies": ["H323"] }] } }
    ]));

    common::run(&mut scenario);
    common::assert_allocated(&scenario, "room");
    let room = common::reservation(&scenario, "room").executable.as_ref().and_then(|executable| executable.get_room_endpoint()).unwrap();
    let values: Vec<&str> = room.aliases.iter().map(|alias| alias.value.as_str()).collect();
    assert_eq!(values, vec!["222001"], "Aliases restricted to another device must not be assigned to the room.");
}
