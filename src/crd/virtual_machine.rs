//! VirtualMachine Custom Resource Definition
//!
//! A VirtualMachine represents a single virtual machine instance placed on a
//! node. The migration job controller only touches its status fields and the
//! node-name label; creation, scheduling and deletion belong to other
//! components.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a VirtualMachine
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "virt.dev",
    version = "v1alpha1",
    kind = "VirtualMachine",
    plural = "virtualmachines",
    shortname = "vm",
    status = "VirtualMachineStatus",
    namespaced,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Node","type":"string","jsonPath":".status.nodeName"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineSpec {
    /// Node selector constraining where the VM may be placed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,
}

/// Status for a VirtualMachine
///
/// `migration_node_name` is only populated while the VM is in the `Migrating`
/// phase; it names the node an in-flight migration is moving the VM to and is
/// consumed exactly once when the migration job finishes.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineStatus {
    /// Current lifecycle phase of the VM
    #[serde(default)]
    pub phase: VmPhase,

    /// Name of the node the VM is currently running on
    ///
    /// Mirrored into the `virt.dev/nodeName` label; the two must never
    /// diverge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Target node of an in-flight migration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_node_name: Option<String>,
}

/// VirtualMachine lifecycle phase
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[non_exhaustive]
pub enum VmPhase {
    /// VM is waiting to be scheduled
    #[default]
    Pending,
    /// VM is being placed on a node
    Scheduling,
    /// VM is running on its node
    Running,
    /// VM is being live-migrated to another node
    Migrating,
    /// VM shut down cleanly
    Succeeded,
    /// VM encountered a fatal error
    Failed,
}

impl std::fmt::Display for VmPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Scheduling => write!(f, "Scheduling"),
            Self::Running => write!(f, "Running"),
            Self::Migrating => write!(f, "Migrating"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_phase_is_pending() {
        assert_eq!(VmPhase::default(), VmPhase::Pending);
        assert_eq!(VirtualMachineStatus::default().phase, VmPhase::Pending);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = VirtualMachineStatus {
            phase: VmPhase::Migrating,
            node_name: Some("node-1".to_string()),
            migration_node_name: Some("node-2".to_string()),
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "Migrating");
        assert_eq!(json["nodeName"], "node-1");
        assert_eq!(json["migrationNodeName"], "node-2");
    }

    #[test]
    fn test_empty_status_omits_node_fields() {
        let json = serde_json::to_value(VirtualMachineStatus::default()).unwrap();
        assert!(json.get("nodeName").is_none());
        assert!(json.get("migrationNodeName").is_none());
    }
}
