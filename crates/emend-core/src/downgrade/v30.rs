//! Downgrade to OpenAPI 3.0: `Null` union branches hoist back into
//! `nullable: true`, constants re-express as single-value enums, and tuples
//! lose their positional typing (`items` becomes a union of the prefix
//! shapes).

use indexmap::IndexMap;
use serde_json::Value;

use crate::common::{SecuritySchemeOrUnknown, SecuritySchemeType};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::emended;
use crate::emended::schema::{Attributes, BoolOrSchema, Schema};
use crate::upgrade::union::MAX_DEPTH;
use crate::v30 as target;

/// The version tag stamped on downgraded 3.0 documents.
const OPENAPI_VERSION: &str = "3.0.3";

pub(crate) fn downgrade_document(
    document: &emended::Document,
    diagnostics: &mut Diagnostics,
) -> target::Document {
    Downgrader {
        diagnostics,
        context: String::new(),
    }
    .run(document)
}

struct Downgrader<'a> {
    diagnostics: &'a mut Diagnostics,
    context: String,
}

impl Downgrader<'_> {
    fn run(mut self, document: &emended::Document) -> target::Document {
        let mut out = target::Document {
            openapi: OPENAPI_VERSION.to_string(),
            info: document.info.clone(),
            servers: document.servers.clone(),
            security: document.security.clone(),
            tags: document.tags.clone(),
            ..target::Document::default()
        };

        if !document.webhooks.is_empty() {
            self.diagnostics.record(Diagnostic::UnsupportedConstruct {
                location: "webhooks".to_string(),
                detail: "webhooks cannot be expressed in OpenAPI 3.0; dropped".to_string(),
            });
        }

        let mut components = target::Components::default();
        for (name, schema) in &document.components.schemas {
            self.context = format!("components.schemas.{name}");
            let downgraded = self.downgrade_schema(schema);
            components.schemas.insert(name.clone(), downgraded);
        }
        for (name, scheme) in &document.components.security_schemes {
            if scheme.scheme_type == SecuritySchemeType::MutualTls {
                self.diagnostics
                    .record(Diagnostic::UnknownSecurityScheme { name: name.clone() });
                continue;
            }
            components
                .security_schemes
                .insert(name.clone(), SecuritySchemeOrUnknown::Known(scheme.clone()));
        }
        out.components = Some(components);

        for (pattern, path) in &document.paths {
            self.context = format!("paths.{pattern}");
            let item = self.downgrade_path(path);
            out.paths.insert(pattern.clone(), item);
        }

        out
    }

    fn downgrade_path(&mut self, path: &emended::Path) -> target::PathItem {
        let mut item = target::PathItem {
            servers: path.servers.clone(),
            summary: path.summary.clone(),
            description: path.description.clone(),
            ..target::PathItem::default()
        };

        macro_rules! downgrade_op {
            ($source:expr, $slot:expr) => {
                if let Some(ref op) = $source {
                    $slot = Some(self.downgrade_operation(op));
                }
            };
        }
        downgrade_op!(path.get, item.get);
        downgrade_op!(path.post, item.post);
        downgrade_op!(path.put, item.put);
        downgrade_op!(path.delete, item.delete);
        downgrade_op!(path.options, item.options);
        downgrade_op!(path.head, item.head);
        downgrade_op!(path.patch, item.patch);
        downgrade_op!(path.trace, item.trace);

        item
    }

    fn downgrade_operation(&mut self, op: &emended::Operation) -> target::Operation {
        let parameters = op
            .parameters
            .iter()
            .map(|param| target::ParameterOrRef::Parameter(Box::new(self.downgrade_parameter(param))))
            .collect();

        let request_body = op.request_body.as_ref().map(|body| {
            target::RequestBodyOrRef::RequestBody(Box::new(self.downgrade_request_body(body)))
        });

        let mut responses = IndexMap::new();
        for (status, response) in &op.responses {
            responses.insert(
                status.clone(),
                target::ResponseOrRef::Response(Box::new(self.downgrade_response(response))),
            );
        }

        target::Operation {
            operation_id: op.operation_id.clone(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            tags: op.tags.clone(),
            servers: op.servers.clone(),
            parameters,
            request_body,
            responses,
            deprecated: op.deprecated,
            security: op.security.clone(),
        }
    }

    fn downgrade_parameter(&mut self, param: &emended::Parameter) -> target::Parameter {
        target::Parameter {
            name: param.name.clone().unwrap_or_default(),
            location: param.location,
            description: param.description.clone(),
            required: param.required,
            schema: Some(self.downgrade_schema(&param.schema)),
            example: param.example.clone(),
        }
    }

    fn downgrade_request_body(&mut self, body: &emended::RequestBody) -> target::RequestBody {
        target::RequestBody {
            description: body.description.clone(),
            content: self.downgrade_content(&body.content),
            required: body.required,
            encrypted: body.encrypted,
        }
    }

    fn downgrade_response(&mut self, response: &emended::Response) -> target::Response {
        let mut headers = IndexMap::new();
        for (name, header) in &response.headers {
            headers.insert(
                name.clone(),
                target::HeaderOrRef::Header(Box::new(target::Header {
                    description: header.description.clone(),
                    required: header.required,
                    schema: Some(self.downgrade_schema(&header.schema)),
                })),
            );
        }
        target::Response {
            description: response.description.clone().unwrap_or_default(),
            content: self.downgrade_content(&response.content),
            headers,
            encrypted: response.encrypted,
        }
    }

    fn downgrade_content(
        &mut self,
        content: &IndexMap<String, emended::MediaType>,
    ) -> IndexMap<String, target::MediaType> {
        let mut out = IndexMap::new();
        for (media, entry) in content {
            out.insert(
                media.clone(),
                target::MediaType {
                    schema: entry.schema.as_ref().map(|s| self.downgrade_schema(s)),
                    example: entry.example.clone(),
                },
            );
        }
        out
    }

    fn downgrade_schema(&mut self, schema: &Schema) -> target::Schema {
        self.downgrade_schema_at(schema, 0)
    }

    fn downgrade_schema_at(&mut self, schema: &Schema, depth: usize) -> target::Schema {
        if depth > MAX_DEPTH {
            self.diagnostics.record(Diagnostic::UnsupportedConstruct {
                location: self.context.clone(),
                detail: format!("schema nesting deeper than {MAX_DEPTH} levels; subtree truncated"),
            });
            return target::Schema::default();
        }
        let mut out = match schema {
            Schema::Constant(constant) => target::Schema {
                schema_type: constant_type(&constant.value),
                enum_values: vec![constant.value.clone()],
                ..target::Schema::default()
            },
            Schema::Boolean(boolean) => target::Schema {
                schema_type: Some("boolean".to_string()),
                default_value: boolean.default_value.clone(),
                ..target::Schema::default()
            },
            Schema::Integer(integer) => target::Schema {
                schema_type: Some("integer".to_string()),
                format: integer.format.clone(),
                default_value: integer.default_value.clone(),
                minimum: integer.minimum,
                maximum: integer.maximum,
                exclusive_minimum: integer.exclusive_minimum,
                exclusive_maximum: integer.exclusive_maximum,
                multiple_of: integer.multiple_of,
                ..target::Schema::default()
            },
            Schema::Number(number) => target::Schema {
                schema_type: Some("number".to_string()),
                format: number.format.clone(),
                default_value: number.default_value.clone(),
                minimum: number.minimum,
                maximum: number.maximum,
                exclusive_minimum: number.exclusive_minimum,
                exclusive_maximum: number.exclusive_maximum,
                multiple_of: number.multiple_of,
                ..target::Schema::default()
            },
            Schema::String(string) => target::Schema {
                schema_type: Some("string".to_string()),
                format: string.format.clone(),
                pattern: string.pattern.clone(),
                min_length: string.min_length,
                max_length: string.max_length,
                default_value: string.default_value.clone(),
                ..target::Schema::default()
            },
            Schema::Array(array) => target::Schema {
                schema_type: Some("array".to_string()),
                items: Some(Box::new(self.downgrade_schema_at(&array.items, depth + 1))),
                min_items: array.min_items,
                max_items: array.max_items,
                unique_items: array.unique_items,
                ..target::Schema::default()
            },
            Schema::Tuple(tuple) => self.downgrade_tuple(tuple, depth),
            Schema::Object(object) => {
                let mut properties = IndexMap::new();
                for (name, property) in &object.properties {
                    properties.insert(name.clone(), self.downgrade_schema_at(property, depth + 1));
                }
                let additional_properties = object.additional_properties.as_ref().map(|ap| {
                    match ap {
                        BoolOrSchema::Bool(allowed) => target::AdditionalProperties::Bool(*allowed),
                        BoolOrSchema::Schema(inner) => target::AdditionalProperties::Schema(
                            Box::new(self.downgrade_schema_at(inner, depth + 1)),
                        ),
                    }
                });
                target::Schema {
                    schema_type: Some("object".to_string()),
                    properties,
                    required: object.required.clone(),
                    additional_properties,
                    ..target::Schema::default()
                }
            }
            Schema::Reference(reference) => target::Schema {
                reference: Some(reference.reference.clone()),
                ..target::Schema::default()
            },
            Schema::OneOf(one_of) => {
                let non_null: Vec<&Schema> =
                    one_of.branches.iter().filter(|b| !b.is_null()).collect();
                let had_null = non_null.len() != one_of.branches.len();
                let mut branches: Vec<target::Schema> = non_null
                    .iter()
                    .map(|branch| self.downgrade_schema_at(branch, depth + 1))
                    .collect();
                if had_null {
                    for branch in &mut branches {
                        branch.nullable = Some(true);
                    }
                }
                match branches.len() {
                    0 => target::Schema {
                        nullable: Some(true),
                        ..target::Schema::default()
                    },
                    1 => branches.remove(0),
                    _ => target::Schema {
                        one_of: branches,
                        discriminator: one_of.discriminator.clone(),
                        ..target::Schema::default()
                    },
                }
            }
            Schema::Null(_) => target::Schema {
                nullable: Some(true),
                ..target::Schema::default()
            },
            Schema::Unknown(_) => target::Schema::default(),
        };
        apply_attributes(&mut out, schema.attributes());
        out
    }

    /// A tuple loses its positional typing: `items` becomes a union of the
    /// prefix shapes, `minItems` pins the prefix length, and `maxItems` is
    /// set only when additional items are forbidden.
    fn downgrade_tuple(
        &mut self,
        tuple: &crate::emended::schema::TupleSchema,
        depth: usize,
    ) -> target::Schema {
        let mut branches: Vec<target::Schema> = tuple
            .prefix_items
            .iter()
            .map(|item| self.downgrade_schema_at(item, depth + 1))
            .collect();
        if let Some(BoolOrSchema::Schema(extra)) = &tuple.additional_items {
            branches.push(self.downgrade_schema_at(extra, depth + 1));
        }
        let fixed_length = matches!(tuple.additional_items, Some(BoolOrSchema::Bool(false)));
        let length = tuple.prefix_items.len() as u64;
        let items = match branches.len() {
            0 => None,
            1 => Some(Box::new(branches.remove(0))),
            _ => Some(Box::new(target::Schema {
                one_of: branches,
                ..target::Schema::default()
            })),
        };
        target::Schema {
            schema_type: Some("array".to_string()),
            items,
            min_items: Some(length),
            max_items: fixed_length.then_some(length),
            ..target::Schema::default()
        }
    }
}

fn constant_type(value: &Value) -> Option<String> {
    let name = match value {
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        _ => return None,
    };
    Some(name.to_string())
}

fn apply_attributes(schema: &mut target::Schema, attributes: &Attributes) {
    if attributes.title.is_some() {
        schema.title = attributes.title.clone();
    }
    if attributes.description.is_some() {
        schema.description = attributes.description.clone();
    }
    if attributes.deprecated.is_some() {
        schema.deprecated = attributes.deprecated;
    }
    for (key, value) in &attributes.extensions {
        schema.extensions.insert(key.clone(), value.clone());
    }
}
