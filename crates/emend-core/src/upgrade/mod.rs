//! Document upgrade: classify an input value tree and rewrite it into the
//! emended dialect.

pub(crate) mod union;
pub(crate) mod v20;
pub(crate) mod v30;
pub(crate) mod v31;

use serde_json::Value;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::emended;
use crate::error::ConvertError;
use crate::version::SpecVersion;

/// The outcome of a successful upgrade: the emended document plus every
/// non-fatal event recorded along the way.
#[derive(Debug)]
pub struct Converted {
    pub document: emended::Document,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrite any recognized input document into the emended dialect.
///
/// Idempotent on already-emended input; fails only when the value cannot be
/// classified or does not deserialize as the grammar it declares.
pub fn convert(value: &Value) -> Result<Converted, ConvertError> {
    let mut diagnostics = Diagnostics::new();
    let document = match SpecVersion::detect(value)? {
        SpecVersion::Emended => serde_json::from_value(value.clone())?,
        SpecVersion::OpenApi31 => {
            let doc: crate::v31::Document = serde_json::from_value(value.clone())?;
            v31::convert_document(&doc, &mut diagnostics)
        }
        SpecVersion::OpenApi30 => {
            let doc: crate::v30::Document = serde_json::from_value(value.clone())?;
            v30::convert_document(&doc, &mut diagnostics)
        }
        SpecVersion::Swagger20 => {
            let doc: crate::v20::Document = serde_json::from_value(value.clone())?;
            v20::convert_document(&doc, &mut diagnostics)
        }
    };
    Ok(Converted {
        document,
        diagnostics: diagnostics.into_vec(),
    })
}

/// Extract the component name of `ref_path` when it points into the given
/// `#/components/` section.
pub(crate) fn component_name<'a>(ref_path: &'a str, section: &str) -> Option<&'a str> {
    ref_path
        .strip_prefix("#/components/")?
        .strip_prefix(section)?
        .strip_prefix('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_name_extracts_section() {
        assert_eq!(
            component_name("#/components/schemas/Pet", "schemas"),
            Some("Pet")
        );
        assert_eq!(
            component_name("#/components/parameters/Limit", "schemas"),
            None
        );
        assert_eq!(component_name("#/definitions/Pet", "schemas"), None);
    }
}
