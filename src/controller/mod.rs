//! Controller implementations for virt CRDs
//!
//! This module contains the reconciliation logic for the migration job
//! controller. Controllers follow the Kubernetes controller pattern with
//! observe-diff-act loops driven by the kube runtime.

mod job;
mod stores;

pub use job::{
    error_policy, migration_job_watch_config, reconcile, Context, JobCorrelation, JobOutcome,
    MigrationStore, VmStore,
};
pub use stores::{MigrationStoreImpl, VmStoreImpl};
