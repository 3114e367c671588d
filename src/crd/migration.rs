//! Migration Custom Resource Definition
//!
//! A Migration is a request to move a running VirtualMachine to another node.
//! The migration job controller drives its phase to a terminal value once the
//! execution job finishes; `Succeeded` and `Failed` are absorbing and are
//! never overwritten by later (duplicate or stale) job events.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a Migration
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "virt.dev",
    version = "v1alpha1",
    kind = "Migration",
    plural = "migrations",
    shortname = "mig",
    status = "MigrationStatus",
    namespaced,
    printcolumn = r#"{"name":"VM","type":"string","jsonPath":".spec.vmName"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSpec {
    /// Name of the VirtualMachine to migrate
    pub vm_name: String,

    /// Explicit target node; empty to let the scheduler pick one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
}

/// Status for a Migration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    /// Current phase of the migration lifecycle
    #[serde(default)]
    pub phase: MigrationPhase,
}

/// Migration lifecycle phase
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[non_exhaustive]
pub enum MigrationPhase {
    /// Migration has been requested but no job is running yet
    #[default]
    Pending,
    /// The migration execution job is in flight
    Running,
    /// The VM was moved to the target node
    Succeeded,
    /// The migration attempt ended without moving the VM
    Failed,
}

impl MigrationPhase {
    /// Returns true for the absorbing phases that must never be overwritten
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}
