//! The emended JSON Schema dialect: a closed sum over the canonical shapes
//! every source variant is rewritten into.
//!
//! The dialect admits no `type` arrays, no `nullable`, no `anyOf`/`allOf`,
//! and no `$recursiveRef`; their semantics live in [`Schema::OneOf`] (with a
//! [`Schema::Null`] branch where applicable), [`Schema::Reference`], and
//! merged [`Schema::Object`] shapes. Exclusive numeric bounds are 3.0-style
//! boolean flags.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::Discriminator;

/// Attributes every schema variant carries: title, description, deprecation,
/// and preserved `x-*` vendor extensions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Attributes {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.deprecated.is_none()
            && self.extensions.is_empty()
    }

    /// Overlay `other` onto `self`: set fields carry over, extensions extend.
    pub fn merge(&mut self, other: &Attributes) {
        if other.title.is_some() {
            self.title = other.title.clone();
        }
        if other.description.is_some() {
            self.description = other.description.clone();
        }
        if other.deprecated.is_some() {
            self.deprecated = other.deprecated;
        }
        for (key, value) in &other.extensions {
            self.extensions.insert(key.clone(), value.clone());
        }
    }
}

/// Literal `"boolean"` type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanTag {
    #[default]
    #[serde(rename = "boolean")]
    Boolean,
}

/// Literal `"integer"` type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegerTag {
    #[default]
    #[serde(rename = "integer")]
    Integer,
}

/// Literal `"number"` type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberTag {
    #[default]
    #[serde(rename = "number")]
    Number,
}

/// Literal `"string"` type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringTag {
    #[default]
    #[serde(rename = "string")]
    String,
}

/// Literal `"array"` type tag, shared by [`ArraySchema`] and [`TupleSchema`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayTag {
    #[default]
    #[serde(rename = "array")]
    Array,
}

/// Literal `"object"` type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectTag {
    #[default]
    #[serde(rename = "object")]
    Object,
}

/// Literal `"null"` type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullTag {
    #[default]
    #[serde(rename = "null")]
    Null,
}

/// A single literal value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstantSchema {
    #[serde(rename = "const")]
    pub value: Value,

    #[serde(flatten)]
    pub attributes: Attributes,
}

/// A `$ref` into the enclosing document, always `#/components/...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSchema {
    #[serde(rename = "$ref")]
    pub reference: String,

    #[serde(flatten)]
    pub attributes: Attributes,
}

/// An exclusive union of non-`OneOf` alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneOfSchema {
    #[serde(rename = "oneOf")]
    pub branches: Vec<Schema>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

/// The singleton null type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NullSchema {
    #[serde(rename = "type")]
    pub kind: NullTag,

    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BooleanSchema {
    #[serde(rename = "type")]
    pub kind: BooleanTag,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntegerSchema {
    #[serde(rename = "type")]
    pub kind: IntegerTag,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(rename = "exclusiveMinimum", skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<bool>,

    #[serde(rename = "exclusiveMaximum", skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<bool>,

    #[serde(rename = "multipleOf", skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NumberSchema {
    #[serde(rename = "type")]
    pub kind: NumberTag,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(rename = "exclusiveMinimum", skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<bool>,

    #[serde(rename = "exclusiveMaximum", skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<bool>,

    #[serde(rename = "multipleOf", skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StringSchema {
    #[serde(rename = "type")]
    pub kind: StringTag,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(rename = "contentMediaType", skip_serializing_if = "Option::is_none")]
    pub content_media_type: Option<String>,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

/// Homogeneous array: exactly one `items` schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySchema {
    #[serde(rename = "type")]
    pub kind: ArrayTag,

    pub items: Box<Schema>,

    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(rename = "uniqueItems", skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

/// Fixed-prefix array: `prefixItems` plus the policy for the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleSchema {
    #[serde(rename = "type")]
    pub kind: ArrayTag,

    #[serde(rename = "prefixItems")]
    pub prefix_items: Vec<Schema>,

    #[serde(rename = "additionalItems", skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<BoolOrSchema>,

    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(rename = "type")]
    pub kind: ObjectTag,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<BoolOrSchema>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

/// A schema with no declared type; carries only attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnknownSchema {
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// `additionalProperties` / `additionalItems`: a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoolOrSchema {
    Bool(bool),
    Schema(Box<Schema>),
}

/// The central sum type of the emended dialect.
///
/// Variant order doubles as the untagged deserialization order: variants
/// with a distinguishing required key come first, the catch-all
/// [`Schema::Unknown`] last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    Constant(ConstantSchema),
    Reference(ReferenceSchema),
    OneOf(OneOfSchema),
    Null(NullSchema),
    Boolean(BooleanSchema),
    Integer(IntegerSchema),
    Number(NumberSchema),
    String(StringSchema),
    Tuple(TupleSchema),
    Array(ArraySchema),
    Object(ObjectSchema),
    Unknown(UnknownSchema),
}

impl Default for Schema {
    fn default() -> Self {
        Schema::Unknown(UnknownSchema::default())
    }
}

impl Schema {
    pub fn attributes(&self) -> &Attributes {
        match self {
            Schema::Constant(s) => &s.attributes,
            Schema::Reference(s) => &s.attributes,
            Schema::OneOf(s) => &s.attributes,
            Schema::Null(s) => &s.attributes,
            Schema::Boolean(s) => &s.attributes,
            Schema::Integer(s) => &s.attributes,
            Schema::Number(s) => &s.attributes,
            Schema::String(s) => &s.attributes,
            Schema::Tuple(s) => &s.attributes,
            Schema::Array(s) => &s.attributes,
            Schema::Object(s) => &s.attributes,
            Schema::Unknown(s) => &s.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Schema::Constant(s) => &mut s.attributes,
            Schema::Reference(s) => &mut s.attributes,
            Schema::OneOf(s) => &mut s.attributes,
            Schema::Null(s) => &mut s.attributes,
            Schema::Boolean(s) => &mut s.attributes,
            Schema::Integer(s) => &mut s.attributes,
            Schema::Number(s) => &mut s.attributes,
            Schema::String(s) => &mut s.attributes,
            Schema::Tuple(s) => &mut s.attributes,
            Schema::Array(s) => &mut s.attributes,
            Schema::Object(s) => &mut s.attributes,
            Schema::Unknown(s) => &mut s.attributes,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Schema::Null(_))
    }

    /// A reference schema with no further attributes.
    pub fn reference(target: impl Into<String>) -> Self {
        Schema::Reference(ReferenceSchema {
            reference: target.into(),
            attributes: Attributes::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(value: serde_json::Value) -> Schema {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn deserialize_discriminates_by_shape() {
        assert!(matches!(roundtrip(json!({"const": "a"})), Schema::Constant(_)));
        assert!(matches!(
            roundtrip(json!({"$ref": "#/components/schemas/Pet"})),
            Schema::Reference(_)
        ));
        assert!(matches!(
            roundtrip(json!({"oneOf": [{"type": "null"}]})),
            Schema::OneOf(_)
        ));
        assert!(matches!(roundtrip(json!({"type": "null"})), Schema::Null(_)));
        assert!(matches!(
            roundtrip(json!({"type": "integer", "minimum": 3})),
            Schema::Integer(_)
        ));
        assert!(matches!(
            roundtrip(json!({"type": "array", "items": {"type": "string"}})),
            Schema::Array(_)
        ));
        assert!(matches!(
            roundtrip(json!({"type": "array", "prefixItems": [{"type": "string"}]})),
            Schema::Tuple(_)
        ));
        assert!(matches!(
            roundtrip(json!({"type": "object", "properties": {"id": {"type": "integer"}}})),
            Schema::Object(_)
        ));
        assert!(matches!(roundtrip(json!({})), Schema::Unknown(_)));
    }

    #[test]
    fn extensions_survive_roundtrip() {
        let input = json!({
            "type": "string",
            "title": "Name",
            "x-custom": {"nested": true}
        });
        let schema = roundtrip(input.clone());
        let attrs = schema.attributes();
        assert_eq!(attrs.title.as_deref(), Some("Name"));
        assert_eq!(attrs.extensions["x-custom"], json!({"nested": true}));
        assert_eq!(serde_json::to_value(&schema).unwrap(), input);
    }

    #[test]
    fn constant_beats_concomitant_type() {
        let schema = roundtrip(json!({"const": 1, "type": "integer"}));
        assert!(matches!(schema, Schema::Constant(_)));
    }

    #[test]
    fn merge_overlays_attributes() {
        let mut base = Attributes {
            title: Some("old".to_string()),
            ..Attributes::default()
        };
        let other = Attributes {
            title: Some("new".to_string()),
            deprecated: Some(true),
            ..Attributes::default()
        };
        base.merge(&other);
        assert_eq!(base.title.as_deref(), Some("new"));
        assert_eq!(base.deprecated, Some(true));
    }
}
