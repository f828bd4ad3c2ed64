//! Document downgrade: rewrite an emended document into OpenAPI 3.0 or
//! Swagger 2.0 for older tooling.

pub(crate) mod v20;
pub(crate) mod v30;

use serde_json::Value;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::emended;
use crate::error::ConvertError;
use crate::version::DowngradeTarget;

/// The outcome of a downgrade: the target-dialect document plus every
/// non-fatal event recorded along the way.
#[derive(Debug)]
pub struct Downgraded {
    pub document: DowngradedDocument,
    pub diagnostics: Vec<Diagnostic>,
}

/// A downgraded document in its target grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum DowngradedDocument {
    Swagger(crate::v20::Document),
    OpenApi30(crate::v30::Document),
}

/// Rewrite an emended document into the requested target dialect.
///
/// Total: constructs the target cannot express degrade to `x-` annotations
/// or are dropped, with a diagnostic either way.
pub fn downgrade(document: &emended::Document, target: DowngradeTarget) -> Downgraded {
    let mut diagnostics = Diagnostics::new();
    let document = match target {
        DowngradeTarget::V30 => {
            DowngradedDocument::OpenApi30(v30::downgrade_document(document, &mut diagnostics))
        }
        DowngradeTarget::V20 => {
            DowngradedDocument::Swagger(v20::downgrade_document(document, &mut diagnostics))
        }
    };
    Downgraded {
        document,
        diagnostics: diagnostics.into_vec(),
    }
}

/// The outcome of [`downgrade_value`]: the target document serialized back
/// into a generic value tree.
#[derive(Debug)]
pub struct DowngradedValue {
    pub document: Value,
    pub diagnostics: Vec<Diagnostic>,
}

/// Like [`downgrade`], returning the target document as a generic value
/// tree instead of its typed grammar.
pub fn downgrade_value(
    document: &emended::Document,
    target: DowngradeTarget,
) -> Result<DowngradedValue, ConvertError> {
    let Downgraded {
        document,
        diagnostics,
    } = downgrade(document, target);
    let document = match &document {
        DowngradedDocument::Swagger(doc) => serde_json::to_value(doc)?,
        DowngradedDocument::OpenApi30(doc) => serde_json::to_value(doc)?,
    };
    Ok(DowngradedValue {
        document,
        diagnostics,
    })
}
