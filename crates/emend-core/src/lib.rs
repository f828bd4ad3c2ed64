//! Normalization core for OpenAPI documents.
//!
//! Three overlapping source dialects (Swagger 2.0, OpenAPI 3.0, and
//! OpenAPI 3.1) are rewritten into a single *emended* 3.1 dialect that
//! downstream generators can consume without handling the syntactic
//! redundancy of the originals: no `type` arrays, no `nullable`, no
//! `anyOf`/`allOf`, no path-level parameters, one reference form. The
//! inverse direction downgrades an emended document back to 3.0 or 2.0.
//!
//! The core is a pure tree-to-tree transformer: it consumes and produces
//! already-parsed [`serde_json::Value`] trees (thin [`convert_json`] /
//! [`convert_yaml`] wrappers cover the common ingestion cases) and holds no
//! state across invocations.
//!
//! ```
//! use serde_json::json;
//!
//! let input = json!({
//!     "openapi": "3.0.3",
//!     "paths": {},
//!     "components": {
//!         "schemas": {
//!             "Name": {"type": "string", "nullable": true}
//!         }
//!     }
//! });
//! let converted = emend_core::convert(&input).unwrap();
//! assert!(converted.document.emended);
//! ```

pub mod common;
pub mod diagnostics;
pub mod downgrade;
pub mod emended;
pub mod error;
pub mod upgrade;
pub mod v20;
pub mod v30;
pub mod v31;
pub mod version;

use serde_json::Value;

pub use diagnostics::Diagnostic;
pub use downgrade::{downgrade, downgrade_value, Downgraded, DowngradedDocument, DowngradedValue};
pub use error::ConvertError;
pub use upgrade::{convert, Converted};
pub use version::{
    is_emended, is_openapi_v30, is_openapi_v31, is_swagger_v2, DowngradeTarget, SpecVersion,
};

/// Parse a JSON document and convert it.
pub fn convert_json(input: &str) -> Result<Converted, ConvertError> {
    let value: Value = serde_json::from_str(input)?;
    convert(&value)
}

/// Parse a YAML document and convert it.
pub fn convert_yaml(input: &str) -> Result<Converted, ConvertError> {
    let value: Value = serde_yaml_ng::from_str(input)?;
    convert(&value)
}
