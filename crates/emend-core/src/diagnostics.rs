use thiserror::Error;
use tracing::warn;

/// A non-fatal event recorded while converting or downgrading a document.
///
/// Conversions are total on well-versioned inputs: a dangling reference or a
/// construct the target dialect cannot express never aborts the run, it is
/// recorded here and the affected node is emitted in degraded form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// A `$ref` pointed outside the recognized component subtrees or at a
    /// missing entry. The reference is emitted verbatim.
    #[error("dangling reference `{reference}` at {location}")]
    DanglingReference { reference: String, location: String },

    /// An operation that cannot be represented (e.g. two `in: body`
    /// parameters in Swagger 2.0). The operation is omitted from the output.
    #[error("malformed operation `{method} {path}`: {detail}")]
    MalformedOperation {
        method: String,
        path: String,
        detail: String,
    },

    /// A construct the target dialect cannot express. The output carries an
    /// `x-` annotation or a degraded rendition instead.
    #[error("unsupported construct at {location}: {detail}")]
    UnsupportedConstruct { location: String, detail: String },

    /// A security scheme of a kind the target dialect does not know. The
    /// scheme is dropped.
    #[error("unknown security scheme `{name}`")]
    UnknownSecurityScheme { name: String },
}

/// Ordered sink for [`Diagnostic`] events, shared by one conversion run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        warn!(%diagnostic, "conversion diagnostic");
        self.events.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_accumulate_in_order() {
        let mut sink = Diagnostics::new();
        sink.record(Diagnostic::UnknownSecurityScheme {
            name: "legacy".to_string(),
        });
        sink.record(Diagnostic::DanglingReference {
            reference: "#/components/schemas/Missing".to_string(),
            location: "paths./pets.get".to_string(),
        });
        let events = sink.into_vec();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Diagnostic::UnknownSecurityScheme { .. }));
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::MalformedOperation {
            method: "post".to_string(),
            path: "/pets".to_string(),
            detail: "2 body parameters".to_string(),
        };
        assert_eq!(
            d.to_string(),
            "malformed operation `post /pets`: 2 body parameters"
        );
    }
}
