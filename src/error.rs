//! Error types for kube-hygiene.
//!
//! Absence conditions (zero replicas, missing metrics, undeclared resources)
//! are never errors: sanitizers report them as issues. The variants below
//! cover broken inputs and failures of the surrounding driver.

use thiserror::Error;

/// Errors that can occur while loading cluster state or sanitizing it.
#[derive(Debug, Error)]
pub enum HygieneError {
    /// A resource quantity string could not be parsed
    #[error("Invalid {kind} quantity: {value:?}")]
    Quantity {
        /// Resource dimension the quantity belongs to (cpu, memory)
        kind: &'static str,
        /// The offending raw value
        value: String,
    },

    /// A resource is missing a field the sanitizers require
    #[error("Resource {fqn} is missing required field `{field}`")]
    MissingField {
        /// Fully qualified name of the resource
        fqn: String,
        /// Field path
        field: &'static str,
    },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Kubernetes API access failed
    #[error("Kubernetes API error: {0}")]
    Kube(String),
}

impl HygieneError {
    pub(crate) fn missing(fqn: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            fqn: fqn.into(),
            field,
        }
    }
}

/// Result type alias for kube-hygiene operations
pub type Result<T> = std::result::Result<T, HygieneError>;
