use std::str::FromStr;

use serde_json::Value;

use crate::error::ConvertError;

/// The marker every emended document carries at rest.
pub const EMENDED_MARKER: &str = "x-samchon-emended";

/// The input dialects the converter recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    Swagger20,
    OpenApi30,
    OpenApi31,
    Emended,
}

impl SpecVersion {
    /// Classify a generic value tree. Classification rules, in precedence
    /// order: emended marker, `openapi: 3.1.x`, `openapi: 3.0.x`,
    /// `swagger: 2.0` with a `definitions` or `paths` key.
    pub fn detect(value: &Value) -> Result<Self, ConvertError> {
        if is_emended(value) {
            return Ok(SpecVersion::Emended);
        }
        if is_openapi_v31(value) {
            return Ok(SpecVersion::OpenApi31);
        }
        if is_openapi_v30(value) {
            return Ok(SpecVersion::OpenApi30);
        }
        if is_swagger_v2(value) {
            return Ok(SpecVersion::Swagger20);
        }
        Err(ConvertError::UnrecognizedVersion(describe_version(value)))
    }
}

/// True when the value already passed through `convert`.
pub fn is_emended(value: &Value) -> bool {
    value.get(EMENDED_MARKER) == Some(&Value::Bool(true))
        && openapi_field(value).is_some_and(|v| v.starts_with("3.1"))
}

/// True for an OpenAPI 3.1 document that has not been emended.
pub fn is_openapi_v31(value: &Value) -> bool {
    openapi_field(value).is_some_and(|v| v.starts_with("3.1."))
}

/// True for an OpenAPI 3.0 document.
pub fn is_openapi_v30(value: &Value) -> bool {
    openapi_field(value).is_some_and(|v| v.starts_with("3.0."))
}

/// True for a Swagger 2.0 document.
pub fn is_swagger_v2(value: &Value) -> bool {
    value.get("swagger").and_then(Value::as_str) == Some("2.0")
        && (value.get("definitions").is_some() || value.get("paths").is_some())
}

fn openapi_field(value: &Value) -> Option<&str> {
    value.get("openapi").and_then(Value::as_str)
}

fn describe_version(value: &Value) -> String {
    if let Some(v) = openapi_field(value) {
        return format!("openapi {v}");
    }
    if let Some(v) = value.get("swagger").and_then(Value::as_str) {
        return format!("swagger {v}");
    }
    "no version field".to_string()
}

/// Target dialect of `downgrade`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowngradeTarget {
    /// Swagger 2.0.
    V20,
    /// OpenAPI 3.0.
    V30,
}

impl FromStr for DowngradeTarget {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2.0" => Ok(DowngradeTarget::V20),
            "3.0" => Ok(DowngradeTarget::V30),
            other => Err(ConvertError::UnrecognizedVersion(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detect_emended_before_v31() {
        let doc = json!({"openapi": "3.1.0", "x-samchon-emended": true});
        assert_eq!(SpecVersion::detect(&doc).unwrap(), SpecVersion::Emended);
        assert!(is_emended(&doc));
        // Without the marker the same document is plain 3.1.
        let doc = json!({"openapi": "3.1.0"});
        assert_eq!(SpecVersion::detect(&doc).unwrap(), SpecVersion::OpenApi31);
    }

    #[test]
    fn detect_marker_must_be_true() {
        let doc = json!({"openapi": "3.1.0", "x-samchon-emended": false});
        assert_eq!(SpecVersion::detect(&doc).unwrap(), SpecVersion::OpenApi31);
    }

    #[test]
    fn detect_v30() {
        let doc = json!({"openapi": "3.0.3", "paths": {}});
        assert_eq!(SpecVersion::detect(&doc).unwrap(), SpecVersion::OpenApi30);
    }

    #[test]
    fn detect_swagger_needs_definitions_or_paths() {
        let doc = json!({"swagger": "2.0", "definitions": {}});
        assert_eq!(SpecVersion::detect(&doc).unwrap(), SpecVersion::Swagger20);
        let doc = json!({"swagger": "2.0", "paths": {}});
        assert_eq!(SpecVersion::detect(&doc).unwrap(), SpecVersion::Swagger20);
        let doc = json!({"swagger": "2.0"});
        assert!(SpecVersion::detect(&doc).is_err());
    }

    #[test]
    fn detect_rejects_unversioned() {
        let err = SpecVersion::detect(&json!({"title": "nope"})).unwrap_err();
        assert!(err.to_string().contains("no version field"));
    }

    #[test]
    fn downgrade_target_from_str() {
        assert_eq!("2.0".parse::<DowngradeTarget>().unwrap(), DowngradeTarget::V20);
        assert_eq!("3.0".parse::<DowngradeTarget>().unwrap(), DowngradeTarget::V30);
        assert!("3.1".parse::<DowngradeTarget>().is_err());
    }
}
