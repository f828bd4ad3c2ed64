//! Downgrade to Swagger 2.0: `components.schemas` moves back under
//! `definitions`, request bodies flatten into `in: body` (or `formData`)
//! parameters, servers split into `schemes`/`host`/`basePath`, and unions
//! fall back to the `x-oneOf`/`x-nullable` escape hatches.

use indexmap::IndexMap;
use serde_json::{json, Value};
use url::Url;

use crate::common::{
    ApiKeyLocation, ParameterLocation, SecurityScheme, SecuritySchemeType,
};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::emended;
use crate::emended::schema::{Attributes, BoolOrSchema, Schema};
use crate::upgrade::union::MAX_DEPTH;
use crate::v20 as target;

const SCHEMAS_PREFIX: &str = "#/components/schemas/";
const JSON_MEDIA_TYPE: &str = "application/json";

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
            swagger: "2.0".to_string(),
            info: document.info.clone(),
            security: document.security.clone(),
            tags: document.tags.clone(),
            ..target::Document::default()
        };

        if let Some((schemes, host, base_path)) = split_servers(&document.servers) {
            out.schemes = schemes;
            out.host = Some(host);
            out.base_path = base_path;
        }

        if !document.webhooks.is_empty() {
            self.diagnostics.record(Diagnostic::UnsupportedConstruct {
                location: "webhooks".to_string(),
                detail: "webhooks cannot be expressed in Swagger 2.0; dropped".to_string(),
            });
        }

        for (name, schema) in &document.components.schemas {
            self.context = format!("definitions.{name}");
            let downgraded = self.downgrade_schema(schema);
            out.definitions.insert(name.clone(), downgraded);
        }

        self.downgrade_security_schemes(
            &document.components.security_schemes,
            &mut out.security_definitions,
        );

        for (pattern, path) in &document.paths {
            self.context = format!("paths.{pattern}");
            let item = self.downgrade_path(pattern, path);
            out.paths.insert(pattern.clone(), item);
        }

        out
    }

    fn downgrade_path(&mut self, pattern: &str, path: &emended::Path) -> target::PathItem {
        let mut item = target::PathItem::default();

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

        if path.trace.is_some() {
            self.diagnostics.record(Diagnostic::UnsupportedConstruct {
                location: format!("paths.{pattern}.trace"),
                detail: "Swagger 2.0 has no trace method; operation dropped".to_string(),
            });
        }

        item
    }

    fn downgrade_operation(&mut self, op: &emended::Operation) -> target::Operation {
        let mut parameters: Vec<target::ParameterOrRef> = op
            .parameters
            .iter()
            .filter_map(|param| self.downgrade_parameter(param))
            .map(|param| target::ParameterOrRef::Parameter(Box::new(param)))
            .collect();

        let mut consumes = Vec::new();
        if let Some(body) = &op.request_body {
            self.flatten_request_body(body, &mut parameters, &mut consumes);
        }

        let mut produces = Vec::new();
        let mut responses = IndexMap::new();
        for (status, response) in &op.responses {
            for media in response.content.keys() {
                if !produces.contains(media) {
                    produces.push(media.clone());
                }
            }
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
            consumes,
            produces,
            parameters,
            responses,
            deprecated: op.deprecated,
            security: op.security.clone(),
        }
    }

    fn downgrade_parameter(&mut self, param: &emended::Parameter) -> Option<target::Parameter> {
        let location = match param.location {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => {
                self.diagnostics.record(Diagnostic::UnsupportedConstruct {
                    location: self.context.clone(),
                    detail: format!(
                        "cookie parameter `{}` cannot be expressed in Swagger 2.0; dropped",
                        param.name.as_deref().unwrap_or("")
                    ),
                });
                return None;
            }
        };
        // The inline fragment is flattened into the parameter object, so
        // its `description`/`required` slots must not collide with the
        // parameter's own fields.
        let mut inline = self.downgrade_schema(&param.schema);
        inline.required.clear();
        let description = param.description.clone().or_else(|| inline.description.take());
        Some(target::Parameter {
            name: param.name.clone().unwrap_or_default(),
            location: location.to_string(),
            description,
            required: param.required,
            schema: None,
            inline,
        })
    }

    /// Flatten the request body back into parameters: form content with an
    /// object schema explodes into `formData` entries, everything else
    /// becomes a single `in: body` parameter carrying the JSON schema (a
    /// non-JSON media type is noted via `x-nestia-content-type`).
    fn flatten_request_body(
        &mut self,
        body: &emended::RequestBody,
        parameters: &mut Vec<target::ParameterOrRef>,
        consumes: &mut Vec<String>,
    ) {
        for media in body.content.keys() {
            if !consumes.contains(media) {
                consumes.push(media.clone());
            }
        }

        for (media, entry) in &body.content {
            let is_form =
                media == "application/x-www-form-urlencoded" || media.starts_with("multipart/");
            if !is_form {
                continue;
            }
            if let Some(Schema::Object(object)) = &entry.schema {
                for (name, property) in &object.properties {
                    let mut inline = self.downgrade_schema(property);
                    inline.required.clear();
                    let description = inline.description.take();
                    parameters.push(target::ParameterOrRef::Parameter(Box::new(
                        target::Parameter {
                            name: name.clone(),
                            location: "formData".to_string(),
                            description,
                            required: object.required.contains(name),
                            schema: None,
                            inline,
                        },
                    )));
                }
                return;
            }
        }

        let Some((media, entry)) = body
            .content
            .get_key_value(JSON_MEDIA_TYPE)
            .or_else(|| body.content.first())
        else {
            return;
        };
        let mut inline = target::JsonSchema::default();
        if media != JSON_MEDIA_TYPE {
            inline
                .extensions
                .insert("x-nestia-content-type".to_string(), json!(media));
        }
        if body.encrypted == Some(true) {
            inline
                .extensions
                .insert("x-nestia-encrypted".to_string(), json!(true));
        }
        parameters.push(target::ParameterOrRef::Parameter(Box::new(
            target::Parameter {
                name: "body".to_string(),
                location: "body".to_string(),
                description: body.description.clone(),
                required: body.required,
                schema: entry.schema.as_ref().map(|s| self.downgrade_schema(s)),
                inline,
            },
        )));
    }

    fn downgrade_response(&mut self, response: &emended::Response) -> target::Response {
        let schema = response
            .content
            .get(JSON_MEDIA_TYPE)
            .or_else(|| response.content.values().next())
            .and_then(|entry| entry.schema.as_ref())
            .map(|s| self.downgrade_schema(s));

        let mut headers = IndexMap::new();
        for (name, header) in &response.headers {
            let mut downgraded = self.downgrade_schema(&header.schema);
            if downgraded.description.is_none() {
                downgraded.description = header.description.clone();
            }
            headers.insert(name.clone(), downgraded);
        }

        target::Response {
            description: response.description.clone().unwrap_or_default(),
            schema,
            headers,
            encrypted: response.encrypted,
        }
    }

    /// Reverse security mapping. An oauth2 scheme fans out into one 2.0
    /// scheme per present flow, in the fixed order implicit, accessCode,
    /// password, application; a single flow keeps the scheme name, multiple
    /// flows suffix it with the 2.0 flow name.
    fn downgrade_security_schemes(
        &mut self,
        schemes: &IndexMap<String, SecurityScheme>,
        out: &mut IndexMap<String, target::SecuritySchemeOrUnknown>,
    ) {
        for (name, scheme) in schemes {
            match scheme.scheme_type {
                SecuritySchemeType::Http if scheme.scheme.as_deref() == Some("basic") => {
                    out.insert(
                        name.clone(),
                        target::SecuritySchemeOrUnknown::Known(target::SecurityScheme::Basic {
                            description: scheme.description.clone(),
                        }),
                    );
                }
                SecuritySchemeType::ApiKey => {
                    let location = match scheme.location {
                        Some(ApiKeyLocation::Query) => target::ApiKeyLocation::Query,
                        Some(ApiKeyLocation::Header) | None => target::ApiKeyLocation::Header,
                        Some(ApiKeyLocation::Cookie) => {
                            self.diagnostics
                                .record(Diagnostic::UnknownSecurityScheme { name: name.clone() });
                            continue;
                        }
                    };
                    out.insert(
                        name.clone(),
                        target::SecuritySchemeOrUnknown::Known(target::SecurityScheme::ApiKey {
                            name: scheme.name.clone().unwrap_or_default(),
                            location,
                            description: scheme.description.clone(),
                        }),
                    );
                }
                SecuritySchemeType::OAuth2 => {
                    self.downgrade_oauth2(name, scheme, out);
                }
                _ => {
                    self.diagnostics
                        .record(Diagnostic::UnknownSecurityScheme { name: name.clone() });
                }
            }
        }
    }

    fn downgrade_oauth2(
        &mut self,
        name: &str,
        scheme: &SecurityScheme,
        out: &mut IndexMap<String, target::SecuritySchemeOrUnknown>,
    ) {
        let Some(flows) = &scheme.flows else {
            self.diagnostics.record(Diagnostic::UnknownSecurityScheme {
                name: name.to_string(),
            });
            return;
        };
        let mut entries: Vec<(target::OAuthFlowKind, &crate::common::OAuthFlow)> = Vec::new();
        if let Some(flow) = &flows.implicit {
            entries.push((target::OAuthFlowKind::Implicit, flow));
        }
        if let Some(flow) = &flows.authorization_code {
            entries.push((target::OAuthFlowKind::AccessCode, flow));
        }
        if let Some(flow) = &flows.password {
            entries.push((target::OAuthFlowKind::Password, flow));
        }
        if let Some(flow) = &flows.client_credentials {
            entries.push((target::OAuthFlowKind::Application, flow));
        }
        if entries.is_empty() {
            self.diagnostics.record(Diagnostic::UnknownSecurityScheme {
                name: name.to_string(),
            });
            return;
        }
        let multiple = entries.len() > 1;
        for (kind, flow) in entries {
            let key = if multiple {
                format!("{name}_{}", flow_suffix(kind))
            } else {
                name.to_string()
            };
            out.insert(
                key,
                target::SecuritySchemeOrUnknown::Known(target::SecurityScheme::OAuth2 {
                    flow: kind,
                    authorization_url: flow.authorization_url.clone(),
                    token_url: flow.token_url.clone(),
                    scopes: flow.scopes.clone(),
                    description: scheme.description.clone(),
                }),
            );
        }
    }

    fn downgrade_schema(&mut self, schema: &Schema) -> target::JsonSchema {
        self.downgrade_schema_at(schema, 0)
    }

    fn downgrade_schema_at(&mut self, schema: &Schema, depth: usize) -> target::JsonSchema {
        if depth > MAX_DEPTH {
            self.diagnostics.record(Diagnostic::UnsupportedConstruct {
                location: self.context.clone(),
                detail: format!("schema nesting deeper than {MAX_DEPTH} levels; subtree truncated"),
            });
            return target::JsonSchema::default();
        }
        let mut out = match schema {
            Schema::Constant(constant) => target::JsonSchema {
                schema_type: constant_type(&constant.value),
                enum_values: vec![constant.value.clone()],
                ..target::JsonSchema::default()
            },
            Schema::Boolean(boolean) => target::JsonSchema {
                schema_type: Some("boolean".to_string()),
                default_value: boolean.default_value.clone(),
                ..target::JsonSchema::default()
            },
            Schema::Integer(integer) => target::JsonSchema {
                schema_type: Some("integer".to_string()),
                format: integer.format.clone(),
                default_value: integer.default_value.clone(),
                minimum: integer.minimum,
                maximum: integer.maximum,
                exclusive_minimum: integer.exclusive_minimum,
                exclusive_maximum: integer.exclusive_maximum,
                multiple_of: integer.multiple_of,
                ..target::JsonSchema::default()
            },
            Schema::Number(number) => target::JsonSchema {
                schema_type: Some("number".to_string()),
                format: number.format.clone(),
                default_value: number.default_value.clone(),
                minimum: number.minimum,
                maximum: number.maximum,
                exclusive_minimum: number.exclusive_minimum,
                exclusive_maximum: number.exclusive_maximum,
                multiple_of: number.multiple_of,
                ..target::JsonSchema::default()
            },
            Schema::String(string) => target::JsonSchema {
                schema_type: Some("string".to_string()),
                format: string.format.clone(),
                pattern: string.pattern.clone(),
                min_length: string.min_length,
                max_length: string.max_length,
                default_value: string.default_value.clone(),
                ..target::JsonSchema::default()
            },
            Schema::Array(array) => target::JsonSchema {
                schema_type: Some("array".to_string()),
                items: Some(Box::new(self.downgrade_schema_at(&array.items, depth + 1))),
                min_items: array.min_items,
                max_items: array.max_items,
                unique_items: array.unique_items,
                ..target::JsonSchema::default()
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
                target::JsonSchema {
                    schema_type: Some("object".to_string()),
                    properties,
                    required: object.required.clone(),
                    additional_properties,
                    ..target::JsonSchema::default()
                }
            }
            Schema::Reference(reference) => target::JsonSchema {
                reference: Some(self.rewrite_reference(&reference.reference)),
                ..target::JsonSchema::default()
            },
            Schema::OneOf(one_of) => {
                let non_null: Vec<&Schema> =
                    one_of.branches.iter().filter(|b| !b.is_null()).collect();
                let had_null = non_null.len() != one_of.branches.len();
                let mut branches: Vec<target::JsonSchema> = non_null
                    .iter()
                    .map(|branch| self.downgrade_schema_at(branch, depth + 1))
                    .collect();
                if had_null {
                    for branch in &mut branches {
                        branch.x_nullable = Some(true);
                    }
                }
                match branches.len() {
                    0 => target::JsonSchema {
                        x_nullable: Some(true),
                        ..target::JsonSchema::default()
                    },
                    1 => branches.remove(0),
                    _ => target::JsonSchema {
                        x_one_of: branches,
                        ..target::JsonSchema::default()
                    },
                }
            }
            Schema::Null(_) => target::JsonSchema {
                x_nullable: Some(true),
                ..target::JsonSchema::default()
            },
            Schema::Unknown(_) => target::JsonSchema::default(),
        };
        self.apply_attributes(&mut out, schema.attributes());
        out
    }

    fn apply_attributes(&mut self, schema: &mut target::JsonSchema, attributes: &Attributes) {
        if attributes.title.is_some() {
            schema.title = attributes.title.clone();
        }
        if attributes.description.is_some() {
            schema.description = attributes.description.clone();
        }
        for (key, value) in &attributes.extensions {
            schema.extensions.insert(key.clone(), value.clone());
        }
        // 2.0 schemas have no deprecation slot; the flag cannot be carried.
        if attributes.deprecated == Some(true) {
            self.diagnostics.record(Diagnostic::UnsupportedConstruct {
                location: self.context.clone(),
                detail: "schema-level deprecated cannot be expressed in Swagger 2.0; dropped"
                    .to_string(),
            });
        }
    }

    /// Same policy as the 3.0 downgrade, with the union expressed through
    /// the `x-oneOf` escape hatch.
    fn downgrade_tuple(
        &mut self,
        tuple: &crate::emended::schema::TupleSchema,
        depth: usize,
    ) -> target::JsonSchema {
        let mut branches: Vec<target::JsonSchema> = tuple
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
            _ => Some(Box::new(target::JsonSchema {
                x_one_of: branches,
                ..target::JsonSchema::default()
            })),
        };
        target::JsonSchema {
            schema_type: Some("array".to_string()),
            items,
            min_items: Some(length),
            max_items: fixed_length.then_some(length),
            ..target::JsonSchema::default()
        }
    }

    /// `#/components/schemas/X` rewrites to `#/definitions/X`; other
    /// component subtrees have no 2.0 counterpart and stay verbatim with a
    /// record.
    fn rewrite_reference(&mut self, reference: &str) -> String {
        if let Some(name) = reference.strip_prefix(SCHEMAS_PREFIX) {
            return format!("#/definitions/{name}");
        }
        self.diagnostics.record(Diagnostic::DanglingReference {
            reference: reference.to_string(),
            location: self.context.clone(),
        });
        reference.to_string()
    }
}

/// Split the first server back into `schemes` + `host` + `basePath`;
/// further servers sharing the same host contribute their schemes.
fn split_servers(servers: &[crate::common::Server]) -> Option<(Vec<String>, String, Option<String>)> {
    let first = servers.first()?;
    let (mut schemes, host, base_path) = split_server_url(&first.url)?;
    for server in &servers[1..] {
        if let Some((extra, other_host, _)) = split_server_url(&server.url) {
            if other_host == host {
                for scheme in extra {
                    if !schemes.contains(&scheme) {
                        schemes.push(scheme);
                    }
                }
            }
        }
    }
    Some((schemes, host, base_path))
}

fn split_server_url(url: &str) -> Option<(Vec<String>, String, Option<String>)> {
    if let Some(rest) = url.strip_prefix("//") {
        let (host, path) = match rest.find('/') {
            Some(index) => (&rest[..index], Some(rest[index..].to_string())),
            None => (rest, None),
        };
        if host.is_empty() {
            return None;
        }
        return Some((Vec::new(), host.to_string(), path));
    }
    let parsed = Url::parse(url).ok()?;
    let mut host = parsed.host_str()?.to_string();
    if let Some(port) = parsed.port() {
        host = format!("{host}:{port}");
    }
    let base_path = match parsed.path() {
        "" | "/" => None,
        path => Some(path.to_string()),
    };
    Some((vec![parsed.scheme().to_string()], host, base_path))
}

fn flow_suffix(kind: target::OAuthFlowKind) -> &'static str {
    match kind {
        target::OAuthFlowKind::Implicit => "implicit",
        target::OAuthFlowKind::AccessCode => "accessCode",
        target::OAuthFlowKind::Password => "password",
        target::OAuthFlowKind::Application => "application",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_scheme_url() {
        let (schemes, host, base) = split_server_url("https://api.example.com/v1").unwrap();
        assert_eq!(schemes, vec!["https".to_string()]);
        assert_eq!(host, "api.example.com");
        assert_eq!(base.as_deref(), Some("/v1"));
    }

    #[test]
    fn split_protocol_relative_url() {
        let (schemes, host, base) = split_server_url("//api.example.com/v1").unwrap();
        assert!(schemes.is_empty());
        assert_eq!(host, "api.example.com");
        assert_eq!(base.as_deref(), Some("/v1"));
    }

    #[test]
    fn split_url_with_port() {
        let (_, host, base) = split_server_url("http://localhost:8080").unwrap();
        assert_eq!(host, "localhost:8080");
        assert_eq!(base, None);
    }

    #[test]
    fn split_merges_schemes_of_shared_host() {
        let servers = vec![
            crate::common::Server::bare("https://api.example.com/v1"),
            crate::common::Server::bare("http://api.example.com/v1"),
        ];
        let (schemes, host, _) = split_servers(&servers).unwrap();
        assert_eq!(schemes, vec!["https".to_string(), "http".to_string()]);
        assert_eq!(host, "api.example.com");
    }
}
