use serde::Serialize;
use std::fmt;

/// What went wrong while normalizing or projecting a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A later fragment replaced a leaf value
    LeafOverride,
    /// Two fragments declared different `type`s for the same node; first kept
    TypeMismatch,
    /// An object met a non-object at the same key; first kept
    ShapeMismatch,
    /// A property the engine cannot project; excluded from descriptors
    Unsupported,
}

impl DiagnosticKind {
    /// Structural conflicts are the ones where a fragment's value was rejected
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::TypeMismatch | Self::ShapeMismatch)
    }
}

/// A recovered problem. Diagnostics are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// JSON-pointer-like location, e.g. `/properties/price/type`
    pub path: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at '{}': {}", self.kind, self.path, self.message)
    }
}
