//! Structured error types shared across the HPMC crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`HpmcError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (type ids, dimensions, shape kinds).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for shape analysis and shape mutation.
///
/// Statistical noise is never reported through this type, and neither is an
/// undefined pressure estimate: that outcome is an `Option::None` at the call
/// site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum HpmcError {
    /// Missing configuration, missing shape definitions, dimensionality mismatches.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// No overlap or move implementation exists for the requested shape kind.
    #[error("unsupported combination: {0}")]
    UnsupportedCombination(ErrorInfo),
    /// A caller supplied shape callback returned a malformed shape.
    #[error("callback contract violation: {0}")]
    CallbackContract(ErrorInfo),
    /// Degenerate geometry such as a zero-volume hull.
    #[error("geometry error: {0}")]
    Geometry(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl HpmcError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            HpmcError::Configuration(info)
            | HpmcError::UnsupportedCombination(info)
            | HpmcError::CallbackContract(info)
            | HpmcError::Geometry(info)
            | HpmcError::Serde(info) => info,
        }
    }

    /// Shorthand for a [`HpmcError::Configuration`] error.
    pub fn configuration(code: &str, message: impl Into<String>) -> Self {
        HpmcError::Configuration(ErrorInfo::new(code, message))
    }

    /// Shorthand for a [`HpmcError::Geometry`] error.
    pub fn geometry(code: &str, message: impl Into<String>) -> Self {
        HpmcError::Geometry(ErrorInfo::new(code, message))
    }

    /// Error raised when a referenced particle type has no shape definition.
    pub fn missing_shape(type_id: usize) -> Self {
        HpmcError::Configuration(
            ErrorInfo::new("missing-shape", "no shape is defined for the particle type")
                .with_context("type_id", type_id)
                .with_hint("assign a shape to every type before computing"),
        )
    }

    /// Returns true for errors that only invalidate a single proposal.
    pub fn is_degenerate_geometry(&self) -> bool {
        matches!(self, HpmcError::Geometry(_))
    }
}
