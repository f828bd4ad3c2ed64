//! OpenAPI 3.1 upgrade: `type` arrays expand into union branches, `const`
//! wins over any concomitant `type`, numeric exclusive bounds demote to the
//! boolean form, `prefixItems` (or the legacy list-valued `items`) selects
//! the tuple shape, and `$recursiveRef` demotes to `$ref`.

use indexmap::IndexMap;
use serde_json::Value;

use super::union::{UnionAccumulator, MAX_DEPTH};
use super::component_name;
use crate::common::{ParameterLocation, SecuritySchemeOrUnknown};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::emended;
use crate::emended::schema::{
    ArraySchema, Attributes, BoolOrSchema, BooleanSchema, ConstantSchema, IntegerSchema,
    NumberSchema, ObjectSchema, Schema, StringSchema, TupleSchema, UnknownSchema,
};
use crate::v31 as src;

pub(crate) fn convert_document(
    document: &src::Document,
    diagnostics: &mut Diagnostics,
) -> emended::Document {
    Upgrader {
        components: document.components.as_ref(),
        diagnostics,
        context: String::new(),
    }
    .run(document)
}

struct Upgrader<'a> {
    components: Option<&'a src::Components>,
    diagnostics: &'a mut Diagnostics,
    context: String,
}

impl Upgrader<'_> {
    fn run(mut self, document: &src::Document) -> emended::Document {
        let mut out = emended::Document {
            servers: document.servers.clone(),
            info: document.info.clone(),
            security: document.security.clone(),
            tags: document.tags.clone(),
            ..emended::Document::default()
        };

        if let Some(components) = self.components {
            for (name, schema) in &components.schemas {
                self.context = format!("components.schemas.{name}");
                let converted = self.convert_schema(schema);
                out.components.schemas.insert(name.clone(), converted);
            }
            for (name, item) in &components.path_items {
                self.context = format!("components.pathItems.{name}");
                let path = self.convert_path(item);
                out.components.path_items.insert(name.clone(), path);
            }
            for (name, scheme) in &components.security_schemes {
                match scheme {
                    SecuritySchemeOrUnknown::Known(s) => {
                        out.components
                            .security_schemes
                            .insert(name.clone(), s.clone());
                    }
                    SecuritySchemeOrUnknown::Unknown(_) => {
                        self.diagnostics
                            .record(Diagnostic::UnknownSecurityScheme { name: name.clone() });
                    }
                }
            }
        }

        for (pattern, item) in &document.paths {
            self.context = format!("paths.{pattern}");
            let path = self.convert_path(item);
            out.paths.insert(pattern.clone(), path);
        }

        for (name, entry) in &document.webhooks {
            self.context = format!("webhooks.{name}");
            match entry {
                src::PathItemOrRef::Ref { ref_path } => {
                    let known = component_name(ref_path, "pathItems").is_some_and(|target| {
                        self.components
                            .is_some_and(|c| c.path_items.contains_key(target))
                    });
                    if !known {
                        self.diagnostics.record(Diagnostic::DanglingReference {
                            reference: ref_path.clone(),
                            location: self.context.clone(),
                        });
                    }
                    out.webhooks.insert(
                        name.clone(),
                        emended::PathOrReference::Reference {
                            reference: ref_path.clone(),
                        },
                    );
                }
                src::PathItemOrRef::PathItem(item) => {
                    let path = self.convert_path(item);
                    out.webhooks
                        .insert(name.clone(), emended::PathOrReference::Path(Box::new(path)));
                }
            }
        }

        out
    }

    fn convert_path(&mut self, item: &src::PathItem) -> emended::Path {
        let path_params = self.resolve_parameters(&item.parameters);
        let mut path = emended::Path {
            servers: item.servers.clone(),
            summary: item.summary.clone(),
            description: item.description.clone(),
            ..emended::Path::default()
        };

        macro_rules! convert_op {
            ($source:expr, $slot:expr) => {
                if let Some(ref op) = $source {
                    $slot = Some(self.convert_operation(op, &path_params));
                }
            };
        }
        convert_op!(item.get, path.get);
        convert_op!(item.post, path.post);
        convert_op!(item.put, path.put);
        convert_op!(item.delete, path.delete);
        convert_op!(item.options, path.options);
        convert_op!(item.head, path.head);
        convert_op!(item.patch, path.patch);
        convert_op!(item.trace, path.trace);

        path
    }

    fn convert_operation(
        &mut self,
        op: &src::Operation,
        path_params: &[emended::Parameter],
    ) -> emended::Operation {
        let mut parameters = path_params.to_vec();
        parameters.extend(self.resolve_parameters(&op.parameters));

        let request_body = op
            .request_body
            .as_ref()
            .and_then(|body| self.resolve_request_body(body));

        let mut responses = IndexMap::new();
        for (status, entry) in &op.responses {
            if let Some(response) = self.resolve_response(entry) {
                responses.insert(status.clone(), response);
            }
        }

        emended::Operation {
            operation_id: op.operation_id.clone(),
            parameters,
            request_body,
            responses,
            servers: op.servers.clone(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            security: op.security.clone(),
            tags: op.tags.clone(),
            deprecated: op.deprecated,
        }
    }

    fn resolve_parameters(&mut self, params: &[src::ParameterOrRef]) -> Vec<emended::Parameter> {
        let mut resolved = Vec::new();
        for entry in params {
            match entry {
                src::ParameterOrRef::Ref { ref_path } => match self.lookup_parameter(ref_path) {
                    Some(param) => resolved.push(self.convert_parameter(&param)),
                    None => self.dangling(ref_path),
                },
                src::ParameterOrRef::Parameter(param) => {
                    resolved.push(self.convert_parameter(param));
                }
            }
        }
        resolved
    }

    fn convert_parameter(&mut self, param: &src::Parameter) -> emended::Parameter {
        emended::Parameter {
            name: Some(param.name.clone()),
            location: param.location,
            schema: match &param.schema {
                Some(schema) => self.convert_schema(schema),
                None => Schema::default(),
            },
            required: param.required,
            description: param.description.clone(),
            example: param.example.clone(),
        }
    }

    fn resolve_request_body(&mut self, entry: &src::RequestBodyOrRef) -> Option<emended::RequestBody> {
        let body = match entry {
            src::RequestBodyOrRef::Ref { ref_path } => match self.lookup_request_body(ref_path) {
                Some(body) => body,
                None => {
                    self.dangling(ref_path);
                    return None;
                }
            },
            src::RequestBodyOrRef::RequestBody(body) => (**body).clone(),
        };
        Some(emended::RequestBody {
            description: body.description.clone(),
            content: self.convert_content(&body.content),
            required: body.required,
            encrypted: body.encrypted,
        })
    }

    fn resolve_response(&mut self, entry: &src::ResponseOrRef) -> Option<emended::Response> {
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
        Some(emended::Response {
            description: Some(response.description.clone()).filter(|d| !d.is_empty()),
            content: self.convert_content(&response.content),
            headers: self.convert_headers(&response.headers),
            encrypted: response.encrypted,
        })
    }

    fn convert_content(
        &mut self,
        content: &IndexMap<String, src::MediaType>,
    ) -> IndexMap<String, emended::MediaType> {
        let mut out = IndexMap::new();
        for (media, entry) in content {
            out.insert(
                media.clone(),
                emended::MediaType {
                    schema: entry.schema.as_ref().map(|s| self.convert_schema(s)),
                    example: entry.example.clone(),
                },
            );
        }
        out
    }

    fn convert_headers(
        &mut self,
        headers: &IndexMap<String, src::HeaderOrRef>,
    ) -> IndexMap<String, emended::Parameter> {
        let mut out = IndexMap::new();
        for (name, entry) in headers {
            let header = match entry {
                src::HeaderOrRef::Ref { ref_path } => match self.lookup_header(ref_path) {
                    Some(header) => header,
                    None => {
                        self.dangling(ref_path);
                        continue;
                    }
                },
                src::HeaderOrRef::Header(header) => (**header).clone(),
            };
            out.insert(
                name.clone(),
                emended::Parameter {
                    name: Some(name.clone()),
                    location: ParameterLocation::Header,
                    schema: match &header.schema {
                        Some(schema) => self.convert_schema(schema),
                        None => Schema::default(),
                    },
                    required: header.required,
                    description: header.description.clone(),
                    example: None,
                },
            );
        }
        out
    }

    fn lookup_parameter(&self, ref_path: &str) -> Option<src::Parameter> {
        let name = component_name(ref_path, "parameters")?;
        match self.components?.parameters.get(name)? {
            src::ParameterOrRef::Parameter(param) => Some((**param).clone()),
            src::ParameterOrRef::Ref { ref_path } => {
                let name = component_name(ref_path, "parameters")?;
                match self.components?.parameters.get(name)? {
                    src::ParameterOrRef::Parameter(param) => Some((**param).clone()),
                    src::ParameterOrRef::Ref { .. } => None,
                }
            }
        }
    }

    fn lookup_request_body(&self, ref_path: &str) -> Option<src::RequestBody> {
        let name = component_name(ref_path, "requestBodies")?;
        match self.components?.request_bodies.get(name)? {
            src::RequestBodyOrRef::RequestBody(body) => Some((**body).clone()),
            src::RequestBodyOrRef::Ref { .. } => None,
        }
    }

    fn lookup_response(&self, ref_path: &str) -> Option<src::Response> {
        let name = component_name(ref_path, "responses")?;
        match self.components?.responses.get(name)? {
            src::ResponseOrRef::Response(response) => Some((**response).clone()),
            src::ResponseOrRef::Ref { .. } => None,
        }
    }

    fn lookup_header(&self, ref_path: &str) -> Option<src::Header> {
        let name = component_name(ref_path, "headers")?;
        match self.components?.headers.get(name)? {
            src::HeaderOrRef::Header(header) => Some((**header).clone()),
            src::HeaderOrRef::Ref { .. } => None,
        }
    }

    fn lookup_schema(&self, ref_path: &str) -> Option<src::Schema> {
        let name = component_name(ref_path, "schemas")?;
        let schema = self.components?.schemas.get(name)?;
        if let Some(inner) = &schema.reference {
            let inner_name = component_name(inner, "schemas")?;
            return self.components?.schemas.get(inner_name).cloned();
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

    pub(crate) fn convert_schema(&mut self, schema: &src::Schema) -> Schema {
        self.convert_schema_at(schema, 0)
    }

    fn convert_schema_at(&mut self, schema: &src::Schema, depth: usize) -> Schema {
        let bag = attribute_bag(schema);
        let mut union = UnionAccumulator::default();
        self.visit(schema, &mut union, depth);
        union.finish(bag)
    }

    fn visit(&mut self, schema: &src::Schema, union: &mut UnionAccumulator, depth: usize) {
        if depth > MAX_DEPTH {
            self.truncate(union);
            return;
        }
        if let Some(value) = &schema.const_value {
            // `const` wins over any concomitant `type`.
            union.push(Schema::Constant(ConstantSchema {
                value: value.clone(),
                attributes: Attributes::default(),
            }));
            return;
        }
        if let Some(reference) = &schema.reference {
            union.push(self.reference_schema(reference));
            return;
        }
        if let Some(reference) = &schema.recursive_reference {
            // Demoted to a plain `$ref`; cycles are expressed through the
            // components map.
            union.push(Schema::reference(reference.clone()));
            return;
        }
        if !schema.one_of.is_empty() || !schema.any_of.is_empty() {
            if let Some(discriminator) = &schema.discriminator {
                union.set_discriminator(discriminator.clone());
            }
            for branch in schema.one_of.iter().chain(&schema.any_of) {
                self.visit(branch, union, depth + 1);
            }
            return;
        }
        if !schema.all_of.is_empty() {
            self.visit_all_of(schema, union, depth);
            return;
        }
        match &schema.schema_type {
            Some(src::TypeSet::One(kind)) => self.visit_typed(kind, schema, union, depth),
            Some(src::TypeSet::Many(kinds)) => {
                for kind in kinds {
                    self.visit_typed(kind, schema, union, depth);
                }
            }
            None => {
                if !schema.properties.is_empty() || schema.additional_properties.is_some() {
                    let object = self.object_shape(schema, depth);
                    union.push(Schema::Object(object));
                } else {
                    union.push(Schema::Unknown(UnknownSchema::default()));
                }
            }
        }
    }

    /// One expanded visit per declared type. Constraint keywords apply to
    /// the type they belong to, so a `["string", "integer"]` schema fans its
    /// length bounds into the string branch and its range bounds into the
    /// integer branch.
    fn visit_typed(
        &mut self,
        kind: &str,
        schema: &src::Schema,
        union: &mut UnionAccumulator,
        depth: usize,
    ) {
        if matches!(kind, "boolean" | "integer" | "number" | "string")
            && !schema.enum_values.is_empty()
        {
            let branch_bag = attribute_bag(schema);
            for value in &schema.enum_values {
                if value.is_null() {
                    union.mark_nullable();
                } else if value_matches_type(kind, value) {
                    union.push(Schema::Constant(ConstantSchema {
                        value: value.clone(),
                        attributes: branch_bag.clone(),
                    }));
                }
            }
            return;
        }
        match kind {
            "null" => union.mark_nullable(),
            "boolean" => union.push(Schema::Boolean(BooleanSchema {
                default_value: schema.default_value.clone(),
                ..BooleanSchema::default()
            })),
            "integer" => {
                let (minimum, exclusive_minimum) = lower_bound(schema);
                let (maximum, exclusive_maximum) = upper_bound(schema);
                union.push(Schema::Integer(IntegerSchema {
                    format: schema.format.clone(),
                    default_value: schema.default_value.clone(),
                    minimum,
                    maximum,
                    exclusive_minimum,
                    exclusive_maximum,
                    multiple_of: schema.multiple_of,
                    ..IntegerSchema::default()
                }));
            }
            "number" => {
                let (minimum, exclusive_minimum) = lower_bound(schema);
                let (maximum, exclusive_maximum) = upper_bound(schema);
                union.push(Schema::Number(NumberSchema {
                    format: schema.format.clone(),
                    default_value: schema.default_value.clone(),
                    minimum,
                    maximum,
                    exclusive_minimum,
                    exclusive_maximum,
                    multiple_of: schema.multiple_of,
                    ..NumberSchema::default()
                }));
            }
            "string" => union.push(Schema::String(StringSchema {
                format: schema.format.clone(),
                pattern: schema.pattern.clone(),
                min_length: schema.min_length,
                max_length: schema.max_length,
                content_media_type: schema.content_media_type.clone(),
                default_value: schema.default_value.clone(),
                ..StringSchema::default()
            })),
            "array" => {
                let array = self.array_or_tuple(schema, depth);
                union.push(array);
            }
            "object" => {
                let object = self.object_shape(schema, depth);
                union.push(Schema::Object(object));
            }
            _ => union.push(Schema::Unknown(UnknownSchema::default())),
        }
    }

    /// `prefixItems` (or the legacy list-valued `items`) selects the tuple
    /// shape; `prefixItems` wins over a single `items`, which then describes
    /// the additional elements.
    fn array_or_tuple(&mut self, schema: &src::Schema, depth: usize) -> Schema {
        if !schema.prefix_items.is_empty() {
            let prefix_items = schema
                .prefix_items
                .iter()
                .map(|item| self.convert_schema_at(item, depth + 1))
                .collect();
            let additional_items = match (&schema.items, &schema.additional_items) {
                (Some(src::Items::One(item)), _) => Some(BoolOrSchema::Schema(Box::new(
                    self.convert_schema_at(item, depth + 1),
                ))),
                (_, Some(additional)) => Some(self.convert_additional_items(additional, depth)),
                _ => None,
            };
            return Schema::Tuple(TupleSchema {
                kind: Default::default(),
                prefix_items,
                additional_items,
                min_items: schema.min_items,
                max_items: schema.max_items,
                attributes: Attributes::default(),
            });
        }
        if let Some(src::Items::Many(list)) = &schema.items {
            let prefix_items = list
                .iter()
                .map(|item| self.convert_schema_at(item, depth + 1))
                .collect();
            let additional_items = schema
                .additional_items
                .as_ref()
                .map(|additional| self.convert_additional_items(additional, depth));
            return Schema::Tuple(TupleSchema {
                kind: Default::default(),
                prefix_items,
                additional_items,
                min_items: schema.min_items,
                max_items: schema.max_items,
                attributes: Attributes::default(),
            });
        }
        let items = match &schema.items {
            Some(src::Items::One(item)) => self.convert_schema_at(item, depth + 1),
            _ => Schema::default(),
        };
        Schema::Array(ArraySchema {
            kind: Default::default(),
            items: Box::new(items),
            min_items: schema.min_items,
            max_items: schema.max_items,
            unique_items: schema.unique_items,
            attributes: Attributes::default(),
        })
    }

    fn convert_additional_items(
        &mut self,
        additional: &src::AdditionalItems,
        depth: usize,
    ) -> BoolOrSchema {
        match additional {
            src::AdditionalItems::Bool(allowed) => BoolOrSchema::Bool(*allowed),
            src::AdditionalItems::Schema(inner) => {
                BoolOrSchema::Schema(Box::new(self.convert_schema_at(inner, depth + 1)))
            }
        }
    }

    fn visit_all_of(&mut self, schema: &src::Schema, union: &mut UnionAccumulator, depth: usize) {
        let mut resolved: Vec<src::Schema> = Vec::new();
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
            resolved.push(src::Schema {
                properties: schema.properties.clone(),
                required: schema.required.clone(),
                additional_properties: schema.additional_properties.clone(),
                ..src::Schema::default()
            });
        }

        if all_objects && !resolved.is_empty() {
            let mut merged = ObjectSchema::default();
            for branch in &resolved {
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

    fn object_shape(&mut self, schema: &src::Schema, depth: usize) -> ObjectSchema {
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

    fn reference_schema(&mut self, reference: &str) -> Schema {
        if let Some(name) = component_name(reference, "schemas") {
            let known = self
                .components
                .is_some_and(|c| c.schemas.contains_key(name));
            if !known {
                self.dangling(reference);
            }
        } else if !reference.starts_with("#/components/") {
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

/// Translate draft-2020-12 numeric exclusive bounds into the boolean form.
fn lower_bound(schema: &src::Schema) -> (Option<f64>, Option<bool>) {
    match schema.exclusive_minimum {
        Some(bound) => (Some(bound), Some(true)),
        None => (schema.minimum, None),
    }
}

fn upper_bound(schema: &src::Schema) -> (Option<f64>, Option<bool>) {
    match schema.exclusive_maximum {
        Some(bound) => (Some(bound), Some(true)),
        None => (schema.maximum, None),
    }
}

fn value_matches_type(kind: &str, value: &Value) -> bool {
    match kind {
        "boolean" => value.is_boolean(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "string" => value.is_string(),
        _ => false,
    }
}

fn attribute_bag(schema: &src::Schema) -> Attributes {
    Attributes {
        title: schema.title.clone(),
        description: schema.description.clone(),
        deprecated: schema.deprecated,
        extensions: schema
            .extensions
            .iter()
            .filter(|(key, _)| key.starts_with("x-") && key.as_str() != crate::version::EMENDED_MARKER)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

fn is_object_like(schema: &src::Schema) -> bool {
    match &schema.schema_type {
        Some(src::TypeSet::One(kind)) => kind == "object",
        Some(src::TypeSet::Many(_)) => false,
        None => {
            (!schema.properties.is_empty() || schema.additional_properties.is_some())
                && schema.reference.is_none()
                && schema.one_of.is_empty()
                && schema.any_of.is_empty()
                && schema.all_of.is_empty()
        }
    }
}
