use emend_core::common::{ParameterLocation, SecuritySchemeType};
use emend_core::emended::Schema;
use emend_core::{Converted, SpecVersion};
use serde_json::json;

const PETSTORE_30: &str = include_str!("fixtures/petstore-30.yaml");

fn petstore() -> Converted {
    emend_core::convert_yaml(PETSTORE_30).expect("should convert petstore-30")
}

#[test]
fn nullable_becomes_null_union_branch() {
    let converted = petstore();
    let get = converted.document.paths["/pets"].get.as_ref().unwrap();
    let limit = get
        .parameters
        .iter()
        .find(|p| p.name.as_deref() == Some("limit"))
        .expect("should have limit parameter");
    match &limit.schema {
        Schema::OneOf(one_of) => {
            assert_eq!(one_of.branches.len(), 2);
            assert!(matches!(one_of.branches[0], Schema::Integer(_)));
            assert!(one_of.branches[1].is_null());
        }
        other => panic!("expected oneOf, got {other:?}"),
    }
}

#[test]
fn path_parameters_merge_into_operations() {
    let converted = petstore();
    let path = &converted.document.paths["/pets"];

    let get = path.get.as_ref().unwrap();
    assert_eq!(get.parameters.len(), 2);
    assert_eq!(get.parameters[0].name.as_deref(), Some("x-trace-id"));
    assert_eq!(get.parameters[0].location, ParameterLocation::Header);

    // createPet declares no parameters of its own; it still inherits the
    // path-level one.
    let post = path.post.as_ref().unwrap();
    assert_eq!(post.parameters.len(), 1);
    assert_eq!(post.parameters[0].name.as_deref(), Some("x-trace-id"));

    // The path object itself carries no parameters key.
    let value = serde_json::to_value(&converted.document).unwrap();
    assert!(value["paths"]["/pets"].get("parameters").is_none());
}

#[test]
fn enum_fans_out_to_constants() {
    let converted = petstore();
    let pet = &converted.document.components.schemas["Pet"];
    let Schema::Object(object) = pet else {
        panic!("Pet should be an object");
    };
    match &object.properties["status"] {
        Schema::OneOf(one_of) => {
            assert_eq!(one_of.branches.len(), 3);
            for branch in &one_of.branches {
                assert!(matches!(branch, Schema::Constant(_)));
            }
        }
        other => panic!("expected oneOf of constants, got {other:?}"),
    }
}

#[test]
fn all_of_of_objects_merges() {
    let converted = petstore();
    let Schema::Object(dog) = &converted.document.components.schemas["Dog"] else {
        panic!("Dog should merge into an object");
    };
    for property in ["id", "name", "tag", "status", "bark"] {
        assert!(dog.properties.contains_key(property), "missing {property}");
    }
    assert_eq!(dog.required, vec!["id", "name", "bark"]);
}

#[test]
fn any_of_collapses_to_one_of() {
    let converted = petstore();
    match &converted.document.components.schemas["AnyPet"] {
        Schema::OneOf(one_of) => {
            assert_eq!(one_of.branches.len(), 2);
            assert!(matches!(&one_of.branches[0], Schema::Reference(r)
                if r.reference == "#/components/schemas/Pet"));
            assert!(matches!(one_of.branches[1], Schema::String(_)));
        }
        other => panic!("expected oneOf, got {other:?}"),
    }
}

#[test]
fn request_body_reference_is_inlined() {
    let converted = petstore();
    let post = converted.document.paths["/pets"].post.as_ref().unwrap();
    let body = post.request_body.as_ref().expect("should have request body");
    assert!(body.required);
    let media = &body.content["application/json"];
    assert!(matches!(media.schema.as_ref().unwrap(), Schema::Reference(r)
        if r.reference == "#/components/schemas/Pet"));
}

#[test]
fn response_and_header_references_are_inlined() {
    let converted = petstore();
    let path = &converted.document.paths["/pets"];

    let created = &path.post.as_ref().unwrap().responses["201"];
    assert_eq!(created.description.as_deref(), Some("Created"));
    assert!(matches!(
        created.content["application/json"].schema.as_ref().unwrap(),
        Schema::Reference(_)
    ));

    let ok = &path.get.as_ref().unwrap().responses["200"];
    let next = &ok.headers["x-next"];
    assert_eq!(next.location, ParameterLocation::Header);
    assert_eq!(next.description.as_deref(), Some("Link to the next page"));
    assert!(matches!(next.schema, Schema::String(_)));
}

#[test]
fn output_carries_emended_marker() {
    let converted = petstore();
    assert!(converted.document.emended);
    let value = serde_json::to_value(&converted.document).unwrap();
    assert_eq!(value["x-samchon-emended"], json!(true));
    assert!(value["openapi"].as_str().unwrap().starts_with("3.1"));
    assert_eq!(SpecVersion::detect(&value).unwrap(), SpecVersion::Emended);
}

#[test]
fn vendor_extensions_are_preserved() {
    let converted = petstore();
    let pet = &converted.document.components.schemas["Pet"];
    assert_eq!(pet.attributes().extensions["x-stability"], json!("stable"));
}

#[test]
fn security_schemes_pass_through() {
    let converted = petstore();
    let scheme = &converted.document.components.security_schemes["api_key"];
    assert_eq!(scheme.scheme_type, SecuritySchemeType::ApiKey);
    assert_eq!(scheme.name.as_deref(), Some("X-Api-Key"));
    assert!(converted.diagnostics.is_empty());
}
