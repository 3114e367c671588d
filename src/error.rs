//! Error types for the virt controller

use thiserror::Error;

/// Main error type for virt-controller operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    ///
    /// Covers reads, writes and optimistic-concurrency conflicts against the
    /// VirtualMachine and Migration stores; always treated as transient.
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// A job pod is missing one of its correlation labels
    ///
    /// Delivered pods are expected to carry the domain and migration labels;
    /// a pod without them is malformed input and is dropped, not retried.
    #[error("job is missing required label '{label}'")]
    MissingLabel {
        /// The label key that was absent or empty
        label: String,
    },

    /// Watch selector construction failed
    ///
    /// Running with a partial filter would deliver unrelated pods, so the
    /// caller treats this as fatal at startup.
    #[error("invalid watch selector: {0}")]
    Selector(#[from] kube::core::ParseExpressionError),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a missing-label error for the given label key
    pub fn missing_label(label: impl Into<String>) -> Self {
        Self::MissingLabel {
            label: label.into(),
        }
    }
}
