//! Cross-dialect invariants: idempotence, output purity, reference form,
//! sniffer classification of downgraded output, and operation-id
//! preservation.

use emend_core::{DowngradeTarget, DowngradedDocument, SpecVersion};
use serde_json::Value;

const PETSTORE_20: &str = include_str!("fixtures/petstore-swagger2.json");
const PETSTORE_30: &str = include_str!("fixtures/petstore-30.yaml");
const EVENTS_31: &str = include_str!("fixtures/events-31.yaml");

fn converted_values() -> Vec<Value> {
    vec![
        serde_json::to_value(&emend_core::convert_json(PETSTORE_20).unwrap().document).unwrap(),
        serde_json::to_value(&emend_core::convert_yaml(PETSTORE_30).unwrap().document).unwrap(),
        serde_json::to_value(&emend_core::convert_yaml(EVENTS_31).unwrap().document).unwrap(),
    ]
}

/// Every syntactic variant the emended dialect forbids.
fn assert_emended_purity(value: &Value) {
    match value {
        Value::Object(map) => {
            for banned in [
                "nullable",
                "anyOf",
                "allOf",
                "x-nullable",
                "x-oneOf",
                "x-anyOf",
                "$recursiveRef",
            ] {
                assert!(!map.contains_key(banned), "output contains `{banned}`");
            }
            if let Some(kind) = map.get("type") {
                assert!(!kind.is_array(), "output contains a type array");
            }
            if let Some(reference) = map.get("$ref") {
                let reference = reference.as_str().unwrap();
                assert!(
                    reference.starts_with("#/components/"),
                    "reference `{reference}` escapes #/components/"
                );
            }
            if let Some(one_of) = map.get("oneOf") {
                for branch in one_of.as_array().unwrap() {
                    assert!(
                        branch.get("oneOf").is_none(),
                        "oneOf branches must not nest"
                    );
                }
            }
            for nested in map.values() {
                assert_emended_purity(nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                assert_emended_purity(item);
            }
        }
        _ => {}
    }
}

fn operation_ids(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(id) = map.get("operationId").and_then(Value::as_str) {
                out.push(id.to_string());
            }
            for nested in map.values() {
                operation_ids(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                operation_ids(item, out);
            }
        }
        _ => {}
    }
}

#[test]
fn convert_is_idempotent() {
    for value in converted_values() {
        let again = emend_core::convert(&value).unwrap();
        let round = serde_json::to_value(&again.document).unwrap();
        assert_eq!(value, round);
        assert!(again.diagnostics.is_empty());
    }
}

#[test]
fn output_contains_no_source_dialect_syntax() {
    for value in converted_values() {
        assert_emended_purity(&value);
    }
}

#[test]
fn operation_ids_survive_conversion() {
    // listPets/createPet/uploadPhoto survive; brokenOp is dropped as
    // malformed.
    let value = serde_json::to_value(&emend_core::convert_json(PETSTORE_20).unwrap().document)
        .unwrap();
    let mut ids = Vec::new();
    operation_ids(&value, &mut ids);
    ids.sort();
    assert_eq!(ids, vec!["createPet", "listPets", "uploadPhoto"]);
}

#[test]
fn downgraded_documents_classify_as_their_target() {
    let converted = emend_core::convert_yaml(PETSTORE_30).unwrap();

    let down30 = emend_core::downgrade(&converted.document, DowngradeTarget::V30);
    let DowngradedDocument::OpenApi30(doc) = &down30.document else {
        panic!("expected a 3.0 document");
    };
    let value = serde_json::to_value(doc).unwrap();
    assert_eq!(SpecVersion::detect(&value).unwrap(), SpecVersion::OpenApi30);

    let down20 = emend_core::downgrade(&converted.document, DowngradeTarget::V20);
    let DowngradedDocument::Swagger(doc) = &down20.document else {
        panic!("expected a 2.0 document");
    };
    let value = serde_json::to_value(doc).unwrap();
    assert_eq!(SpecVersion::detect(&value).unwrap(), SpecVersion::Swagger20);
}

#[test]
fn already_emended_input_converts_to_equal_output() {
    let value = serde_json::to_value(&emend_core::convert_yaml(PETSTORE_30).unwrap().document)
        .unwrap();
    assert!(emend_core::is_emended(&value));
    let again = emend_core::convert(&value).unwrap();
    assert_eq!(serde_json::to_value(&again.document).unwrap(), value);
}

#[test]
fn unrecognized_document_is_rejected() {
    let err = emend_core::convert(&serde_json::json!({"swagger": "1.2"})).unwrap_err();
    assert!(matches!(err, emend_core::ConvertError::UnrecognizedVersion(_)));
}
