use emend_core::common::{ParameterLocation, SecuritySchemeType};
use emend_core::emended::Schema;
use emend_core::{Converted, Diagnostic};
use serde_json::json;

const PETSTORE_20: &str = include_str!("fixtures/petstore-swagger2.json");

fn petstore() -> Converted {
    emend_core::convert_json(PETSTORE_20).expect("should convert petstore-swagger2")
}

#[test]
fn host_lifts_into_servers() {
    let converted = petstore();
    let urls: Vec<&str> = converted
        .document
        .servers
        .iter()
        .map(|s| s.url.as_str())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://petstore.example.com/v2",
            "http://petstore.example.com/v2"
        ]
    );
}

#[test]
fn definitions_move_under_components() {
    let converted = petstore();
    assert!(converted.document.components.schemas.contains_key("Pet"));
    let value = serde_json::to_value(&converted.document).unwrap();
    assert!(value.get("definitions").is_none());
}

#[test]
fn body_parameter_promotes_into_request_body() {
    let converted = petstore();
    let post = converted.document.paths["/pets"].post.as_ref().unwrap();

    // Only the path-level header parameter survives; the body one is gone.
    assert_eq!(post.parameters.len(), 1);
    assert_eq!(post.parameters[0].name.as_deref(), Some("x-trace-id"));

    let body = post.request_body.as_ref().expect("should have request body");
    assert!(body.required);
    match body.content["application/json"].schema.as_ref().unwrap() {
        Schema::Reference(reference) => {
            assert_eq!(reference.reference, "#/components/schemas/Pet");
        }
        other => panic!("expected reference, got {other:?}"),
    }
}

#[test]
fn form_data_parameters_promote_into_request_body() {
    let converted = petstore();
    let post = converted.document.paths["/pets/{petId}/photo"]
        .post
        .as_ref()
        .unwrap();

    assert_eq!(post.parameters.len(), 1);
    assert_eq!(post.parameters[0].name.as_deref(), Some("petId"));
    assert_eq!(post.parameters[0].location, ParameterLocation::Path);

    let body = post.request_body.as_ref().expect("should have request body");
    assert!(body.required, "a required form field makes the body required");
    let media = &body.content["multipart/form-data"];
    match media.schema.as_ref().unwrap() {
        Schema::Object(object) => {
            assert!(object.properties.contains_key("caption"));
            assert!(object.properties.contains_key("file"));
            assert_eq!(object.required, vec!["file"]);
        }
        other => panic!("expected object, got {other:?}"),
    }
}

#[test]
fn two_body_parameters_drop_the_operation() {
    let converted = petstore();
    assert!(converted.document.paths["/broken"].post.is_none());
    assert!(converted.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::MalformedOperation { method, path, .. }
            if method == "post" && path == "/broken"
    )));
}

#[test]
fn x_one_of_collapses_into_one_of() {
    let converted = petstore();
    let Schema::Object(pet) = &converted.document.components.schemas["Pet"] else {
        panic!("Pet should be an object");
    };
    match &pet.properties["kind"] {
        Schema::OneOf(one_of) => {
            assert_eq!(one_of.branches.len(), 2);
            assert!(matches!(one_of.branches[0], Schema::String(_)));
            assert!(matches!(one_of.branches[1], Schema::Number(_)));
        }
        other => panic!("expected oneOf, got {other:?}"),
    }
}

#[test]
fn x_nullable_adds_null_branch() {
    let converted = petstore();
    let get = converted.document.paths["/pets"].get.as_ref().unwrap();
    let limit = get
        .parameters
        .iter()
        .find(|p| p.name.as_deref() == Some("limit"))
        .unwrap();
    match &limit.schema {
        Schema::OneOf(one_of) => {
            assert!(matches!(one_of.branches[0], Schema::Integer(_)));
            assert!(one_of.branches[1].is_null());
        }
        other => panic!("expected oneOf, got {other:?}"),
    }
}

#[test]
fn bare_response_schema_wraps_into_content() {
    let converted = petstore();
    let get = converted.document.paths["/pets"].get.as_ref().unwrap();
    let ok = &get.responses["200"];
    match ok.content["application/json"].schema.as_ref().unwrap() {
        Schema::Array(array) => {
            assert!(matches!(&*array.items, Schema::Reference(r)
                if r.reference == "#/components/schemas/Pet"));
        }
        other => panic!("expected array, got {other:?}"),
    }
    let next = &ok.headers["x-next"];
    assert_eq!(next.location, ParameterLocation::Header);
    assert_eq!(next.description.as_deref(), Some("next page"));
}

#[test]
fn response_reference_is_inlined() {
    let converted = petstore();
    let post = converted.document.paths["/pets"].post.as_ref().unwrap();
    let created = &post.responses["201"];
    assert_eq!(created.description.as_deref(), Some("created"));
    assert!(matches!(
        created.content["application/json"].schema.as_ref().unwrap(),
        Schema::Reference(_)
    ));
}

#[test]
fn security_schemes_map_to_three_x_shapes() {
    let converted = petstore();
    let schemes = &converted.document.components.security_schemes;

    let basic = &schemes["basic_auth"];
    assert_eq!(basic.scheme_type, SecuritySchemeType::Http);
    assert_eq!(basic.scheme.as_deref(), Some("basic"));

    let oauth = &schemes["petstore_auth"];
    assert_eq!(oauth.scheme_type, SecuritySchemeType::OAuth2);
    let flows = oauth.flows.as_ref().unwrap();
    let code = flows.authorization_code.as_ref().unwrap();
    assert_eq!(
        code.authorization_url.as_deref(),
        Some("https://auth.example.com/authorize")
    );
    assert_eq!(code.token_url.as_deref(), Some("https://auth.example.com/token"));
    assert_eq!(code.scopes["read:pets"], "read");

    // The unrecognized kind is dropped with a record.
    assert!(!schemes.contains_key("legacy"));
    assert!(converted.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::UnknownSecurityScheme { name } if name == "legacy"
    )));
}

#[test]
fn vendor_extensions_are_preserved() {
    let converted = petstore();
    let pet = &converted.document.components.schemas["Pet"];
    assert_eq!(pet.attributes().extensions["x-pet-kind"], json!("domestic"));
}
