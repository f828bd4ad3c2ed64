use thiserror::Error;

/// Fatal failures of `convert` / `downgrade`.
///
/// Everything else that can go wrong during a conversion is non-fatal and
/// surfaces as a [`crate::diagnostics::Diagnostic`] next to the output.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unrecognized specification version: {0}")]
    UnrecognizedVersion(String),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}
