use emend_core::emended::{BoolOrSchema, PathOrReference, Schema};
use emend_core::Converted;
use serde_json::json;

const EVENTS_31: &str = include_str!("fixtures/events-31.yaml");

fn events() -> Converted {
    emend_core::convert_yaml(EVENTS_31).expect("should convert events-31")
}

fn event_property<'a>(converted: &'a Converted, name: &str) -> &'a Schema {
    match &converted.document.components.schemas["Event"] {
        Schema::Object(object) => &object.properties[name],
        other => panic!("Event should be an object, got {other:?}"),
    }
}

#[test]
fn type_array_expands_into_union() {
    let converted = events();
    let get = converted.document.paths["/events"].get.as_ref().unwrap();
    let kind = &get.parameters[0];
    match &kind.schema {
        Schema::OneOf(one_of) => {
            assert_eq!(one_of.branches.len(), 3);
            assert!(matches!(one_of.branches[0], Schema::String(_)));
            assert!(matches!(one_of.branches[1], Schema::Integer(_)));
            assert!(one_of.branches[2].is_null());
        }
        other => panic!("expected oneOf, got {other:?}"),
    }
}

#[test]
fn const_wins_over_type() {
    let converted = events();
    match event_property(&converted, "kind") {
        Schema::Constant(constant) => assert_eq!(constant.value, json!("created")),
        other => panic!("expected constant, got {other:?}"),
    }
}

#[test]
fn prefix_items_become_tuple() {
    let converted = events();
    match event_property(&converted, "pair") {
        Schema::Tuple(tuple) => {
            assert_eq!(tuple.prefix_items.len(), 2);
            assert!(matches!(tuple.prefix_items[0], Schema::String(_)));
            assert!(matches!(tuple.prefix_items[1], Schema::Integer(_)));
            assert!(tuple.additional_items.is_none());
        }
        other => panic!("expected tuple, got {other:?}"),
    }
}

#[test]
fn legacy_items_list_becomes_tuple() {
    let converted = events();
    match event_property(&converted, "legacy") {
        Schema::Tuple(tuple) => {
            assert_eq!(tuple.prefix_items.len(), 2);
            assert!(matches!(
                tuple.additional_items,
                Some(BoolOrSchema::Bool(false))
            ));
        }
        other => panic!("expected tuple, got {other:?}"),
    }
}

#[test]
fn numeric_exclusive_bound_demotes_to_flag() {
    let converted = events();
    match event_property(&converted, "size") {
        Schema::Integer(integer) => {
            assert_eq!(integer.minimum, Some(0.0));
            assert_eq!(integer.exclusive_minimum, Some(true));
        }
        other => panic!("expected integer, got {other:?}"),
    }
}

#[test]
fn enum_with_null_value_adds_null_branch() {
    let converted = events();
    match event_property(&converted, "level") {
        Schema::OneOf(one_of) => {
            assert_eq!(one_of.branches.len(), 3);
            assert!(matches!(one_of.branches[0], Schema::Constant(_)));
            assert!(matches!(one_of.branches[1], Schema::Constant(_)));
            assert!(one_of.branches[2].is_null());
        }
        other => panic!("expected oneOf, got {other:?}"),
    }
}

#[test]
fn recursive_ref_demotes_to_plain_ref() {
    let converted = events();
    match event_property(&converted, "parent") {
        Schema::Reference(reference) => {
            assert_eq!(reference.reference, "#/components/schemas/Event");
        }
        other => panic!("expected reference, got {other:?}"),
    }
}

#[test]
fn webhooks_convert_and_keep_references() {
    let converted = events();
    match &converted.document.webhooks["event"] {
        PathOrReference::Reference { reference } => {
            assert_eq!(reference, "#/components/pathItems/EventHook");
        }
        other => panic!("expected reference webhook, got {other:?}"),
    }
    match &converted.document.webhooks["inline"] {
        PathOrReference::Path(path) => {
            let post = path.post.as_ref().expect("inline webhook should have post");
            assert_eq!(post.operation_id.as_deref(), Some("onInlineEvent"));
        }
        other => panic!("expected inline webhook, got {other:?}"),
    }
    let hook = &converted.document.components.path_items["EventHook"];
    assert_eq!(
        hook.post.as_ref().unwrap().operation_id.as_deref(),
        Some("onEvent")
    );
}
