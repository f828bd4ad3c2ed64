//! Swagger 2.0 upgrade: `definitions` moves under `components.schemas`,
//! `host`/`basePath`/`schemes` lift into servers, `in: body` and
//! `in: formData` parameters promote into a request body, bare response
//! schemas wrap into content maps, and the `x-nullable`/`x-oneOf`/`x-anyOf`
//! escape hatches feed the union accumulator.

use indexmap::IndexMap;

use super::union::{UnionAccumulator, MAX_DEPTH};
use crate::common::{
    ApiKeyLocation, OAuthFlow, OAuthFlows, ParameterLocation, SecurityScheme, SecuritySchemeType,
    Server,
};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::emended;
use crate::emended::schema::{
    ArraySchema, Attributes, BoolOrSchema, BooleanSchema, ConstantSchema, IntegerSchema,
    NumberSchema, ObjectSchema, Schema, StringSchema, UnknownSchema,
};
use crate::v20 as src;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const JSON_MEDIA_TYPE: &str = "application/json";

pub(crate) fn convert_document(
    document: &src::Document,
    diagnostics: &mut Diagnostics,
) -> emended::Document {
    Upgrader {
        document,
        diagnostics,
        context: String::new(),
    }
    .run()
}

struct Upgrader<'a> {
    document: &'a src::Document,
    diagnostics: &'a mut Diagnostics,
    context: String,
}

impl Upgrader<'_> {
    fn run(mut self) -> emended::Document {
        let document = self.document;
        let mut out = emended::Document {
            servers: self.convert_servers(),
            info: document.info.clone(),
            security: document.security.clone(),
            tags: document.tags.clone(),
            ..emended::Document::default()
        };

        for (name, schema) in &document.definitions {
            self.context = format!("definitions.{name}");
            let converted = self.convert_schema(schema);
            out.components.schemas.insert(name.clone(), converted);
        }

        for (name, scheme) in &document.security_definitions {
            match scheme {
                src::SecuritySchemeOrUnknown::Known(scheme) => {
                    out.components
                        .security_schemes
                        .insert(name.clone(), convert_security_scheme(scheme));
                }
                src::SecuritySchemeOrUnknown::Unknown(_) => {
                    self.diagnostics
                        .record(Diagnostic::UnknownSecurityScheme { name: name.clone() });
                }
            }
        }

        for (pattern, item) in &document.paths {
            self.context = format!("paths.{pattern}");
            let path = self.convert_path(pattern, item);
            out.paths.insert(pattern.clone(), path);
        }

        out
    }

    /// Lift `host`/`basePath`/`schemes` into a server list: one entry per
    /// scheme, or a single protocol-relative URL when no scheme is declared.
    fn convert_servers(&mut self) -> Vec<Server> {
        let Some(host) = &self.document.host else {
            return Vec::new();
        };
        let base = self.document.base_path.as_deref().unwrap_or("");
        if self.document.schemes.is_empty() {
            return vec![Server::bare(format!("//{host}{base}"))];
        }
        self.document
            .schemes
            .iter()
            .map(|scheme| Server::bare(format!("{scheme}://{host}{base}")))
            .collect()
    }

    fn convert_path(&mut self, pattern: &str, item: &src::PathItem) -> emended::Path {
        let path_params = self.resolve_raw_parameters(&item.parameters);
        let mut path = emended::Path::default();

        macro_rules! convert_op {
            ($method:literal, $source:expr, $slot:expr) => {
                if let Some(ref op) = $source {
                    self.context = format!("paths.{pattern}.{}", $method);
                    $slot = self.convert_operation(pattern, $method, op, &path_params);
                }
            };
        }
        convert_op!("get", item.get, path.get);
        convert_op!("post", item.post, path.post);
        convert_op!("put", item.put, path.put);
        convert_op!("delete", item.delete, path.delete);
        convert_op!("options", item.options, path.options);
        convert_op!("head", item.head, path.head);
        convert_op!("patch", item.patch, path.patch);

        path
    }

    /// Per-operation state machine: collect raw parameters, dereference,
    /// partition body-shaped from general ones, then emit a parameter list
    /// plus at most one request body. Two body parameters (or a body mixed
    /// with form data) make the operation malformed; it is omitted.
    fn convert_operation(
        &mut self,
        pattern: &str,
        method: &str,
        op: &src::Operation,
        path_params: &[src::Parameter],
    ) -> Option<emended::Operation> {
        // collect + dereference
        let mut raw = path_params.to_vec();
        raw.extend(self.resolve_raw_parameters(&op.parameters));

        // partition
        let mut body = Vec::new();
        let mut form = Vec::new();
        let mut general = Vec::new();
        for param in raw {
            if param.is_body() {
                body.push(param);
            } else if param.is_form_data() {
                form.push(param);
            } else {
                general.push(param);
            }
        }
        if body.len() > 1 {
            self.diagnostics.record(Diagnostic::MalformedOperation {
                method: method.to_string(),
                path: pattern.to_string(),
                detail: format!("{} body parameters", body.len()),
            });
            return None;
        }
        if !body.is_empty() && !form.is_empty() {
            self.diagnostics.record(Diagnostic::MalformedOperation {
                method: method.to_string(),
                path: pattern.to_string(),
                detail: "body and formData parameters on the same operation".to_string(),
            });
            return None;
        }

        // emit
        let parameters = general
            .iter()
            .filter_map(|param| self.convert_general_parameter(param))
            .collect();
        let request_body = if let Some(param) = body.first() {
            Some(self.promote_body(op, param))
        } else if !form.is_empty() {
            Some(self.promote_form_data(op, &form))
        } else {
            None
        };

        let mut responses = IndexMap::new();
        for (status, entry) in &op.responses {
            if let Some(response) = self.resolve_response(op, entry) {
                responses.insert(status.clone(), response);
            }
        }

        Some(emended::Operation {
            operation_id: op.operation_id.clone(),
            parameters,
            request_body,
            responses,
            servers: Vec::new(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            security: op.security.clone(),
            tags: op.tags.clone(),
            deprecated: op.deprecated,
        })
    }

    fn resolve_raw_parameters(&mut self, params: &[src::ParameterOrRef]) -> Vec<src::Parameter> {
        let mut resolved = Vec::new();
        for entry in params {
            match entry {
                src::ParameterOrRef::Ref { ref_path } => match self.lookup_parameter(ref_path) {
                    Some(param) => resolved.push(param),
                    None => self.dangling(ref_path),
                },
                src::ParameterOrRef::Parameter(param) => resolved.push((**param).clone()),
            }
        }
        resolved
    }

    fn convert_general_parameter(&mut self, param: &src::Parameter) -> Option<emended::Parameter> {
        let location = match param.location.as_str() {
            "path" => ParameterLocation::Path,
            "query" => ParameterLocation::Query,
            "header" => ParameterLocation::Header,
            "cookie" => ParameterLocation::Cookie,
            other => {
                self.diagnostics.record(Diagnostic::UnsupportedConstruct {
                    location: self.context.clone(),
                    detail: format!("parameter `{}` with in: {other}", param.name),
                });
                return None;
            }
        };
        Some(emended::Parameter {
            name: Some(param.name.clone()),
            location,
            schema: self.convert_schema(&param.inline),
            required: param.required,
            description: param.description.clone(),
            example: None,
        })
    }

    /// A `body` parameter becomes the request body; `consumes` selects the
    /// media types its schema is published under.
    fn promote_body(&mut self, op: &src::Operation, param: &src::Parameter) -> emended::RequestBody {
        let schema = match &param.schema {
            Some(schema) => self.convert_schema(schema),
            None => Schema::default(),
        };
        let mut content = IndexMap::new();
        for media in self.request_media_types(op) {
            content.insert(
                media,
                emended::MediaType {
                    schema: Some(schema.clone()),
                    example: None,
                },
            );
        }
        emended::RequestBody {
            description: param.description.clone(),
            content,
            required: param.required,
            encrypted: param
                .inline
                .extensions
                .get("x-nestia-encrypted")
                .and_then(serde_json::Value::as_bool),
        }
    }

    /// `formData` parameters collapse into one object-typed request body.
    fn promote_form_data(
        &mut self,
        op: &src::Operation,
        params: &[src::Parameter],
    ) -> emended::RequestBody {
        let mut object = ObjectSchema::default();
        for param in params {
            object
                .properties
                .insert(param.name.clone(), self.convert_schema(&param.inline));
            if param.required {
                object.required.push(param.name.clone());
            }
        }
        let media = if self
            .request_media_types(op)
            .iter()
            .any(|m| m.starts_with("multipart/"))
        {
            "multipart/form-data"
        } else {
            "application/x-www-form-urlencoded"
        };
        let mut content = IndexMap::new();
        content.insert(
            media.to_string(),
            emended::MediaType {
                schema: Some(Schema::Object(object)),
                example: None,
            },
        );
        emended::RequestBody {
            description: None,
            content,
            required: params.iter().any(|p| p.required),
            encrypted: None,
        }
    }

    fn request_media_types(&self, op: &src::Operation) -> Vec<String> {
        let consumes = if !op.consumes.is_empty() {
            &op.consumes
        } else {
            &self.document.consumes
        };
        if consumes.is_empty() {
            vec![JSON_MEDIA_TYPE.to_string()]
        } else {
            consumes.clone()
        }
    }

    fn response_media_types(&self, op: &src::Operation) -> Vec<String> {
        let produces = if !op.produces.is_empty() {
            &op.produces
        } else {
            &self.document.produces
        };
        if produces.is_empty() {
            vec![JSON_MEDIA_TYPE.to_string()]
        } else {
            produces.clone()
        }
    }

    /// Wrap the bare `schema` form into a content map keyed by `produces`.
    fn resolve_response(
        &mut self,
        op: &src::Operation,
        entry: &src::ResponseOrRef,
    ) -> Option<emended::Response> {
        let response = match entry {
            src::ResponseOrRef::Ref { ref_path } => match self.lookup_response(ref_path) {
                Some(response) => response,
                None => {
                    self.dangling(ref_path);
                    return None;
                }
            },
            src::ResponseOrRef::Response(response) => (**response).clone(),
        };

        let mut content = IndexMap::new();
        if let Some(schema) = &response.schema {
            let converted = self.convert_schema(schema);
            for media in self.response_media_types(op) {
                content.insert(
                    media,
                    emended::MediaType {
                        schema: Some(converted.clone()),
                        example: None,
                    },
                );
            }
        }

        let mut headers = IndexMap::new();
        for (name, header) in &response.headers {
            headers.insert(
                name.clone(),
                emended::Parameter {
                    name: Some(name.clone()),
                    location: ParameterLocation::Header,
                    schema: self.convert_schema(header),
                    required: false,
                    description: header.description.clone(),
                    example: None,
                },
            );
        }

        Some(emended::Response {
            description: Some(response.description.clone()).filter(|d| !d.is_empty()),
            content,
            headers,
            encrypted: response.encrypted,
        })
    }

    fn lookup_parameter(&self, ref_path: &str) -> Option<src::Parameter> {
        let name = ref_path.strip_prefix("#/parameters/")?;
        self.document.parameters.get(name).cloned()
    }

    fn lookup_response(&self, ref_path: &str) -> Option<src::Response> {
        let name = ref_path.strip_prefix("#/responses/")?;
        self.document.responses.get(name).cloned()
    }

    fn lookup_schema(&self, ref_path: &str) -> Option<src::JsonSchema> {
        let name = ref_path.strip_prefix(DEFINITIONS_PREFIX)?;
        let schema = self.document.definitions.get(name)?;
        if let Some(inner) = &schema.reference {
            let inner_name = inner.strip_prefix(DEFINITIONS_PREFIX)?;
            return self.document.definitions.get(inner_name).cloned();
        }
        Some(schema.clone())
    }

    fn dangling(&mut self, reference: &str) {
        self.diagnostics.record(Diagnostic::DanglingReference {
            reference: reference.to_string(),
            location: self.context.clone(),
        });
    }

    // Schema normalization.

    pub(crate) fn convert_schema(&mut self, schema: &src::JsonSchema) -> Schema {
        self.convert_schema_at(schema, 0)
    }

    fn convert_schema_at(&mut self, schema: &src::JsonSchema, depth: usize) -> Schema {
        let bag = attribute_bag(schema);
        let mut union = UnionAccumulator::default();
        self.visit(schema, &mut union, depth);
        union.finish(bag)
    }

    fn visit(&mut self, schema: &src::JsonSchema, union: &mut UnionAccumulator, depth: usize) {
        if depth > MAX_DEPTH {
            self.truncate(union);
            return;
        }
        if schema.x_nullable == Some(true) {
            union.mark_nullable();
        }
        if let Some(reference) = &schema.reference {
            union.push(self.reference_schema(reference));
            return;
        }
        if !schema.x_one_of.is_empty() || !schema.x_any_of.is_empty() {
            for branch in schema.x_one_of.iter().chain(&schema.x_any_of) {
                self.visit(branch, union, depth + 1);
            }
            return;
        }
        if !schema.all_of.is_empty() {
            self.visit_all_of(schema, union, depth);
            return;
        }
        match schema.schema_type.as_deref() {
            Some("boolean" | "integer" | "number" | "string") if !schema.enum_values.is_empty() => {
                let branch_bag = attribute_bag(schema);
                for value in &schema.enum_values {
                    if value.is_null() {
                        union.mark_nullable();
                    } else {
                        union.push(Schema::Constant(ConstantSchema {
                            value: value.clone(),
                            attributes: branch_bag.clone(),
                        }));
                    }
                }
            }
            Some("boolean") => union.push(Schema::Boolean(BooleanSchema {
                default_value: schema.default_value.clone(),
                ..BooleanSchema::default()
            })),
            Some("integer") => union.push(Schema::Integer(IntegerSchema {
                format: schema.format.clone(),
                default_value: schema.default_value.clone(),
                minimum: schema.minimum,
                maximum: schema.maximum,
                exclusive_minimum: schema.exclusive_minimum,
                exclusive_maximum: schema.exclusive_maximum,
                multiple_of: schema.multiple_of,
                ..IntegerSchema::default()
            })),
            Some("number") => union.push(Schema::Number(NumberSchema {
                format: schema.format.clone(),
                default_value: schema.default_value.clone(),
                minimum: schema.minimum,
                maximum: schema.maximum,
                exclusive_minimum: schema.exclusive_minimum,
                exclusive_maximum: schema.exclusive_maximum,
                multiple_of: schema.multiple_of,
                ..NumberSchema::default()
            })),
            Some("string") => union.push(Schema::String(StringSchema {
                format: schema.format.clone(),
                pattern: schema.pattern.clone(),
                min_length: schema.min_length,
                max_length: schema.max_length,
                default_value: schema.default_value.clone(),
                ..StringSchema::default()
            })),
            Some("array") => {
                let items = match &schema.items {
                    Some(items) => self.convert_schema_at(items, depth + 1),
                    None => Schema::default(),
                };
                union.push(Schema::Array(ArraySchema {
                    kind: Default::default(),
                    items: Box::new(items),
                    min_items: schema.min_items,
                    max_items: schema.max_items,
                    unique_items: schema.unique_items,
                    attributes: Attributes::default(),
                }));
            }
            Some("object") => {
                let object = self.object_shape(schema, depth);
                union.push(Schema::Object(object));
            }
            Some("null") => union.mark_nullable(),
            _ => {
                if !schema.properties.is_empty() || schema.additional_properties.is_some() {
                    let object = self.object_shape(schema, depth);
                    union.push(Schema::Object(object));
                } else {
                    union.push(Schema::Unknown(UnknownSchema::default()));
                }
            }
        }
    }

    fn visit_all_of(&mut self, schema: &src::JsonSchema, union: &mut UnionAccumulator, depth: usize) {
        let mut resolved: Vec<src::JsonSchema> = Vec::new();
        let mut all_objects = true;
        for branch in &schema.all_of {
            let target = if let Some(reference) = &branch.reference {
                match self.lookup_schema(reference) {
                    Some(target) => target,
                    None => {
                        self.dangling(reference);
                        all_objects = false;
                        branch.clone()
                    }
                }
            } else {
                branch.clone()
            };
            if !is_object_like(&target) {
                all_objects = false;
            }
            resolved.push(target);
        }
        if !schema.properties.is_empty() {
            resolved.push(src::JsonSchema {
                properties: schema.properties.clone(),
                required: schema.required.clone(),
                additional_properties: schema.additional_properties.clone(),
                ..src::JsonSchema::default()
            });
        }

        if all_objects && !resolved.is_empty() {
            let mut merged = ObjectSchema::default();
            for branch in &resolved {
                if branch.x_nullable == Some(true) {
                    union.mark_nullable();
                }
                let shape = self.object_shape(branch, depth + 1);
                for (name, property) in shape.properties {
                    merged.properties.entry(name).or_insert(property);
                }
                for name in shape.required {
                    if !merged.required.contains(&name) {
                        merged.required.push(name);
                    }
                }
                if merged.additional_properties.is_none() {
                    merged.additional_properties = shape.additional_properties;
                }
            }
            union.push(Schema::Object(merged));
        } else {
            for branch in &schema.all_of {
                self.visit(branch, union, depth + 1);
            }
            if !schema.properties.is_empty() {
                let object = self.object_shape(schema, depth);
                union.push(Schema::Object(object));
            }
        }
    }

    fn object_shape(&mut self, schema: &src::JsonSchema, depth: usize) -> ObjectSchema {
        let mut properties = IndexMap::new();
        for (name, property) in &schema.properties {
            properties.insert(name.clone(), self.convert_schema_at(property, depth + 1));
        }
        let additional_properties = schema.additional_properties.as_ref().map(|ap| match ap {
            src::AdditionalProperties::Bool(allowed) => BoolOrSchema::Bool(*allowed),
            src::AdditionalProperties::Schema(inner) => {
                BoolOrSchema::Schema(Box::new(self.convert_schema_at(inner, depth + 1)))
            }
        });
        ObjectSchema {
            kind: Default::default(),
            properties,
            required: schema.required.clone(),
            additional_properties,
            attributes: Attributes::default(),
        }
    }

    /// `#/definitions/X` rewrites to `#/components/schemas/X`; anything else
    /// is emitted verbatim with a dangling-reference record.
    fn reference_schema(&mut self, reference: &str) -> Schema {
        if let Some(name) = reference.strip_prefix(DEFINITIONS_PREFIX) {
            if !self.document.definitions.contains_key(name) {
                self.dangling(reference);
            }
            return Schema::reference(format!("#/components/schemas/{name}"));
        }
        if !reference.starts_with("#/components/") {
            self.dangling(reference);
        }
        Schema::reference(reference)
    }

    fn truncate(&mut self, union: &mut UnionAccumulator) {
        self.diagnostics.record(Diagnostic::UnsupportedConstruct {
            location: self.context.clone(),
            detail: format!("schema nesting deeper than {MAX_DEPTH} levels; subtree truncated"),
        });
        union.push(Schema::default());
    }
}

fn convert_security_scheme(scheme: &src::SecurityScheme) -> SecurityScheme {
    let mut out = SecurityScheme {
        scheme_type: SecuritySchemeType::Http,
        description: None,
        name: None,
        location: None,
        scheme: None,
        bearer_format: None,
        flows: None,
        open_id_connect_url: None,
    };
    match scheme {
        src::SecurityScheme::Basic { description } => {
            out.scheme_type = SecuritySchemeType::Http;
            out.scheme = Some("basic".to_string());
            out.description = description.clone();
        }
        src::SecurityScheme::ApiKey {
            name,
            location,
            description,
        } => {
            out.scheme_type = SecuritySchemeType::ApiKey;
            out.name = Some(name.clone());
            out.location = Some(match location {
                src::ApiKeyLocation::Query => ApiKeyLocation::Query,
                src::ApiKeyLocation::Header => ApiKeyLocation::Header,
            });
            out.description = description.clone();
        }
        src::SecurityScheme::OAuth2 {
            flow,
            authorization_url,
            token_url,
            scopes,
            description,
        } => {
            let entry = OAuthFlow {
                authorization_url: authorization_url.clone(),
                token_url: token_url.clone(),
                refresh_url: None,
                scopes: scopes.clone(),
            };
            let mut flows = OAuthFlows::default();
            match flow {
                src::OAuthFlowKind::Implicit => flows.implicit = Some(entry),
                src::OAuthFlowKind::Password => flows.password = Some(entry),
                src::OAuthFlowKind::Application => flows.client_credentials = Some(entry),
                src::OAuthFlowKind::AccessCode => flows.authorization_code = Some(entry),
            }
            out.scheme_type = SecuritySchemeType::OAuth2;
            out.flows = Some(flows);
            out.description = description.clone();
        }
    }
    out
}

fn attribute_bag(schema: &src::JsonSchema) -> Attributes {
    Attributes {
        title: schema.title.clone(),
        description: schema.description.clone(),
        deprecated: None,
        extensions: schema
            .extensions
            .iter()
            .filter(|(key, _)| key.starts_with("x-") && key.as_str() != crate::version::EMENDED_MARKER)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

fn is_object_like(schema: &src::JsonSchema) -> bool {
    match schema.schema_type.as_deref() {
        Some("object") => true,
        Some(_) => false,
        None => {
            (!schema.properties.is_empty() || schema.additional_properties.is_some())
                && schema.reference.is_none()
                && schema.x_one_of.is_empty()
                && schema.x_any_of.is_empty()
                && schema.all_of.is_empty()
        }
    }
}
