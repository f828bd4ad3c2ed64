use emend_core::common::{OAuthFlow, OAuthFlows, SecurityScheme, SecuritySchemeType};
use emend_core::emended;
use emend_core::emended::schema::{
    Attributes, BoolOrSchema, IntegerSchema, NullSchema, OneOfSchema, Schema, StringSchema,
    TupleSchema,
};
use emend_core::{Diagnostic, DowngradeTarget, DowngradedDocument};
use serde_json::json;

const PETSTORE_20: &str = include_str!("fixtures/petstore-swagger2.json");
const EVENTS_31: &str = include_str!("fixtures/events-31.yaml");

/// An emended document holding a single named schema.
fn document_with_schema(name: &str, schema: Schema) -> emended::Document {
    let mut document = emended::Document::default();
    document.components.schemas.insert(name.to_string(), schema);
    document
}

fn downgraded_30(document: &emended::Document) -> emend_core::v30::Document {
    match emend_core::downgrade(document, DowngradeTarget::V30).document {
        DowngradedDocument::OpenApi30(doc) => doc,
        other => panic!("expected 3.0, got {other:?}"),
    }
}

fn downgraded_20(document: &emended::Document) -> emend_core::v20::Document {
    match emend_core::downgrade(document, DowngradeTarget::V20).document {
        DowngradedDocument::Swagger(doc) => doc,
        other => panic!("expected 2.0, got {other:?}"),
    }
}

#[test]
fn nullable_roundtrips_through_the_emended_dialect() {
    let input = json!({
        "openapi": "3.0.3",
        "paths": {},
        "components": {
            "schemas": {
                "Name": {"type": "string", "nullable": true}
            }
        }
    });
    let converted = emend_core::convert(&input).unwrap();

    let emended_value =
        serde_json::to_value(&converted.document.components.schemas["Name"]).unwrap();
    assert_eq!(
        emended_value,
        json!({"oneOf": [{"type": "string"}, {"type": "null"}]})
    );

    let downgraded = downgraded_30(&converted.document);
    let schema = &downgraded.components.as_ref().unwrap().schemas["Name"];
    assert_eq!(
        serde_json::to_value(schema).unwrap(),
        json!({"type": "string", "nullable": true})
    );
}

#[test]
fn tuple_downgrade_loses_positional_typing() {
    let tuple = Schema::Tuple(TupleSchema {
        kind: Default::default(),
        prefix_items: vec![
            Schema::String(StringSchema::default()),
            Schema::Integer(IntegerSchema::default()),
        ],
        additional_items: Some(BoolOrSchema::Bool(false)),
        min_items: None,
        max_items: None,
        attributes: Attributes::default(),
    });
    let document = document_with_schema("Pair", tuple);

    let downgraded = downgraded_30(&document);
    let schema = &downgraded.components.as_ref().unwrap().schemas["Pair"];
    assert_eq!(
        serde_json::to_value(schema).unwrap(),
        json!({
            "type": "array",
            "items": {"oneOf": [{"type": "string"}, {"type": "integer"}]},
            "minItems": 2,
            "maxItems": 2
        })
    );
}

#[test]
fn null_only_union_downgrades_to_bare_nullable() {
    let document = document_with_schema("Nothing", Schema::Null(NullSchema::default()));
    let downgraded = downgraded_30(&document);
    let schema = &downgraded.components.as_ref().unwrap().schemas["Nothing"];
    assert_eq!(serde_json::to_value(schema).unwrap(), json!({"nullable": true}));
}

#[test]
fn constant_downgrades_to_single_value_enum() {
    let converted = emend_core::convert_yaml(EVENTS_31).unwrap();
    let downgraded = downgraded_30(&converted.document);
    let event = &downgraded.components.as_ref().unwrap().schemas["Event"];
    let value = serde_json::to_value(event).unwrap();
    assert_eq!(
        value["properties"]["kind"],
        json!({"type": "string", "enum": ["created"]})
    );
}

#[test]
fn webhooks_drop_on_downgrade_with_a_record() {
    let converted = emend_core::convert_yaml(EVENTS_31).unwrap();
    let result = emend_core::downgrade(&converted.document, DowngradeTarget::V30);
    assert!(result.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::UnsupportedConstruct { location, .. } if location == "webhooks"
    )));
}

#[test]
fn swagger_downgrade_flattens_request_body() {
    let converted = emend_core::convert_json(PETSTORE_20).unwrap();
    let downgraded = downgraded_20(&converted.document);

    let post = downgraded.paths["/pets"].post.as_ref().unwrap();
    assert_eq!(post.consumes, vec!["application/json"]);

    let body = post
        .parameters
        .iter()
        .find_map(|entry| match entry {
            emend_core::v20::ParameterOrRef::Parameter(p) if p.is_body() => Some(p),
            _ => None,
        })
        .expect("should have a body parameter");
    assert_eq!(body.name, "body");
    assert!(body.required);
    assert_eq!(
        body.schema.as_ref().unwrap().reference.as_deref(),
        Some("#/definitions/Pet")
    );
}

#[test]
fn swagger_downgrade_splits_servers_into_host() {
    let converted = emend_core::convert_json(PETSTORE_20).unwrap();
    let downgraded = downgraded_20(&converted.document);
    assert_eq!(downgraded.host.as_deref(), Some("petstore.example.com"));
    assert_eq!(downgraded.base_path.as_deref(), Some("/v2"));
    assert_eq!(downgraded.schemes, vec!["https", "http"]);
}

#[test]
fn swagger_downgrade_uses_escape_hatches_for_unions() {
    let union = Schema::OneOf(OneOfSchema {
        branches: vec![
            Schema::String(StringSchema::default()),
            Schema::Integer(IntegerSchema::default()),
        ],
        discriminator: None,
        attributes: Attributes::default(),
    });
    let document = document_with_schema("Either", union);
    let downgraded = downgraded_20(&document);
    assert_eq!(
        serde_json::to_value(&downgraded.definitions["Either"]).unwrap(),
        json!({"x-oneOf": [{"type": "string"}, {"type": "integer"}]})
    );
}

#[test]
fn swagger_downgrade_marks_null_branches_on_siblings() {
    let union = Schema::OneOf(OneOfSchema {
        branches: vec![
            Schema::String(StringSchema::default()),
            Schema::Null(NullSchema::default()),
        ],
        discriminator: None,
        attributes: Attributes::default(),
    });
    let document = document_with_schema("MaybeName", union);
    let downgraded = downgraded_20(&document);
    assert_eq!(
        serde_json::to_value(&downgraded.definitions["MaybeName"]).unwrap(),
        json!({"type": "string", "x-nullable": true})
    );
}

#[test]
fn oauth2_flows_fan_out_into_one_scheme_per_flow() {
    let mut document = emended::Document::default();
    document.components.security_schemes.insert(
        "auth".to_string(),
        SecurityScheme {
            scheme_type: SecuritySchemeType::OAuth2,
            description: None,
            name: None,
            location: None,
            scheme: None,
            bearer_format: None,
            flows: Some(OAuthFlows {
                implicit: Some(OAuthFlow {
                    authorization_url: Some("https://auth.example.com/authorize".to_string()),
                    ..OAuthFlow::default()
                }),
                authorization_code: Some(OAuthFlow {
                    authorization_url: Some("https://auth.example.com/authorize".to_string()),
                    token_url: Some("https://auth.example.com/token".to_string()),
                    ..OAuthFlow::default()
                }),
                ..OAuthFlows::default()
            }),
            open_id_connect_url: None,
        },
    );

    let downgraded = downgraded_20(&document);
    let keys: Vec<&str> = downgraded
        .security_definitions
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["auth_implicit", "auth_accessCode"]);
}

#[test]
fn schema_deprecation_is_dropped_on_swagger_downgrade() {
    let schema = Schema::String(StringSchema {
        attributes: Attributes {
            deprecated: Some(true),
            ..Attributes::default()
        },
        ..StringSchema::default()
    });
    let document = document_with_schema("Old", schema);

    let result = emend_core::downgrade(&document, DowngradeTarget::V20);
    let DowngradedDocument::Swagger(doc) = &result.document else {
        panic!("expected 2.0, got {:?}", result.document);
    };
    assert_eq!(
        serde_json::to_value(&doc.definitions["Old"]).unwrap(),
        json!({"type": "string"})
    );
    assert!(result.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::UnsupportedConstruct { location, .. } if location == "definitions.Old"
    )));
}

#[test]
fn downgrade_value_serializes_the_target_document() {
    let converted = emend_core::convert_json(PETSTORE_20).unwrap();

    let result = emend_core::downgrade_value(&converted.document, DowngradeTarget::V20).unwrap();
    assert_eq!(result.document["swagger"], json!("2.0"));
    assert!(result.document.get("x-samchon-emended").is_none());

    let result = emend_core::downgrade_value(&converted.document, DowngradeTarget::V30).unwrap();
    assert!(result.document["openapi"].as_str().unwrap().starts_with("3.0."));
}

#[test]
fn downgraded_output_drops_the_emended_marker() {
    let converted = emend_core::convert_json(PETSTORE_20).unwrap();

    let value = serde_json::to_value(&downgraded_20(&converted.document)).unwrap();
    assert!(value.get("x-samchon-emended").is_none());

    let value = serde_json::to_value(&downgraded_30(&converted.document)).unwrap();
    assert!(value.get("x-samchon-emended").is_none());
}
