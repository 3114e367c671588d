//! virt-controller - Kubernetes operator for virtual machine live migration
//!
//! The controller watches the pods that execute live migrations and, when a
//! job reaches a terminal phase, folds the outcome back into the two custom
//! resources that own the migration:
//!
//! - the [`crd::VirtualMachine`] leaves its in-flight `Migrating` phase and,
//!   on success, moves to the target node recorded in its status
//! - the [`crd::Migration`] request is driven to its terminal
//!   `Succeeded`/`Failed` phase, which is never overwritten afterwards
//!
//! Event delivery, caching, per-key single-flight and rate-limited requeueing
//! are all owned by the kube runtime; the reconciler itself is a stateless
//! function over immutable collaborator handles.
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (VirtualMachine, Migration)
//! - [`controller`] - Job reconciliation logic and watch filter
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod controller;
pub mod crd;
pub mod error;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Well-known labels
// =============================================================================
// Correlation between a migration job pod and the resources it belongs to is
// carried entirely in these labels; the job holds no object references.

/// Label identifying which virt component a pod belongs to
pub const APP_LABEL: &str = "virt.dev/app";

/// Value of [`APP_LABEL`] carried by migration-execution job pods
pub const APP_MIGRATION: &str = "migration";

/// Label on a job pod naming the VirtualMachine being migrated
pub const DOMAIN_LABEL: &str = "virt.dev/domain";

/// Label on a job pod naming the Migration request that triggered it
pub const MIGRATION_LABEL: &str = "virt.dev/migration";

/// Label on a VirtualMachine mirroring `status.nodeName`
pub const NODE_NAME_LABEL: &str = "virt.dev/nodeName";
