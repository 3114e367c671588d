//! Migration job controller implementation
//!
//! Watches the pods that execute live migrations and, once a job reaches a
//! terminal phase, reconciles the outcome into the owning VirtualMachine and
//! Migration resources:
//!
//! - VirtualMachine: `Migrating` -> `Running`; on job success the VM moves to
//!   its recorded migration target node, on failure it stays where it was.
//!   The pending target is consumed in both outcomes.
//! - Migration: `{Pending, Running}` -> `{Succeeded, Failed}`, one-way.
//!
//! The kube runtime owns the watch, the snapshot cache, per-key single-flight
//! and rate-limited redelivery; the reconciler only returns decisions and
//! never sleeps. Every store failure is classified transient and requeued by
//! [`error_policy`]; a pod without its correlation labels is malformed input
//! and is dropped instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use kube::core::Selector;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use crate::controller::stores::{MigrationStoreImpl, VmStoreImpl};
use crate::crd::{Migration, MigrationPhase, VirtualMachine, VmPhase};
use crate::error::Error;
use crate::{APP_LABEL, APP_MIGRATION, DOMAIN_LABEL, MIGRATION_LABEL, NODE_NAME_LABEL};

/// Pod phase string marking a successfully completed job
const POD_SUCCEEDED: &str = "Succeeded";

/// Trait abstracting VirtualMachine store access
///
/// Allows the reconciler to be exercised against deterministic fakes in
/// tests, independent of the real API machinery.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VmStore: Send + Sync {
    /// Fetch a VirtualMachine by name; `Ok(None)` if it does not exist
    async fn fetch(&self, name: &str) -> Result<Option<VirtualMachine>, Error>;

    /// Persist a VirtualMachine with a version-checked full update
    ///
    /// A concurrent writer surfaces as a conflict error, never as a blind
    /// overwrite.
    async fn put(&self, vm: &VirtualMachine) -> Result<VirtualMachine, Error>;
}

/// Trait abstracting Migration store access
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MigrationStore: Send + Sync {
    /// Fetch a Migration by name; `Ok(None)` if it does not exist
    async fn fetch(&self, name: &str) -> Result<Option<Migration>, Error>;

    /// Persist a Migration's status with a version-checked update
    async fn update(&self, migration: &Migration) -> Result<(), Error>;
}

/// Shared context for the migration job controller
///
/// Holds only immutable collaborator handles; the controller keeps no
/// mutable state across keys.
pub struct Context {
    /// VirtualMachine store accessor
    pub vms: Arc<dyn VmStore>,
    /// Migration store accessor
    pub migrations: Arc<dyn MigrationStore>,
}

impl Context {
    /// Create a context from explicit store implementations
    pub fn new(vms: Arc<dyn VmStore>, migrations: Arc<dyn MigrationStore>) -> Self {
        Self { vms, migrations }
    }

    /// Create a context with API-backed stores for the given namespace
    pub fn from_client(client: Client, namespace: &str) -> Self {
        Self::new(
            Arc::new(VmStoreImpl::new(client.clone(), namespace)),
            Arc::new(MigrationStoreImpl::new(client, namespace)),
        )
    }
}

/// Build the watch predicate for migration job pods
///
/// Delivered pods must carry the migration app tag plus both correlation
/// labels, and be outside the `Pending`/`Running`/`Unknown` phases, so only
/// terminal-or-unexpected outcomes reach the reconciler.
///
/// # Errors
///
/// Returns [`Error::Selector`] if the label predicate does not parse. The
/// caller must treat this as fatal at startup: running with a partial filter
/// would deliver unrelated pods.
pub fn migration_job_watch_config() -> Result<WatcherConfig, Error> {
    let labels = LabelSelector {
        match_labels: Some(
            [(APP_LABEL.to_string(), APP_MIGRATION.to_string())]
                .into_iter()
                .collect(),
        ),
        match_expressions: Some(vec![
            LabelSelectorRequirement {
                key: DOMAIN_LABEL.to_string(),
                operator: "Exists".to_string(),
                values: None,
            },
            LabelSelectorRequirement {
                key: MIGRATION_LABEL.to_string(),
                operator: "Exists".to_string(),
                values: None,
            },
        ]),
    };
    let selector = Selector::try_from(labels)?;

    Ok(WatcherConfig::default()
        .labels_from(&selector)
        .fields("status.phase!=Pending,status.phase!=Running,status.phase!=Unknown"))
}

/// Correlation identifiers extracted from a job pod's labels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobCorrelation {
    /// Name of the VirtualMachine being migrated
    pub domain: String,
    /// Name of the Migration request that spawned the job
    pub migration: String,
}

impl JobCorrelation {
    /// Extract the correlation labels from a job pod
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingLabel`] if either label is absent or empty;
    /// [`error_policy`] classifies that as malformed input and drops the
    /// event rather than retrying it forever.
    pub fn from_job(job: &Pod) -> Result<Self, Error> {
        let label = |key: &str| -> Result<String, Error> {
            job.metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(key))
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or_else(|| Error::missing_label(key))
        };

        Ok(Self {
            domain: label(DOMAIN_LABEL)?,
            migration: label(MIGRATION_LABEL)?,
        })
    }
}

/// Terminal outcome of a migration job pod
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job pod completed successfully
    Succeeded,
    /// The job pod failed or ended in an unexpected phase
    Failed,
}

impl JobOutcome {
    /// Classify a delivered job pod
    ///
    /// The watch filter only admits terminal-or-unexpected phases, so
    /// anything other than `Succeeded` counts as a failed attempt.
    pub fn from_job(job: &Pod) -> Self {
        match job.status.as_ref().and_then(|s| s.phase.as_deref()) {
            Some(POD_SUCCEEDED) => Self::Succeeded,
            _ => Self::Failed,
        }
    }
}

/// Reconcile a finished migration job pod
///
/// Each step is a hard sequence point: a transient failure aborts the
/// remaining steps for this attempt and the whole key is redelivered later.
/// Redelivery is safe because both sub-reconciliations are idempotent — a VM
/// no longer in `Migrating` and a Migration already terminal are left
/// untouched.
#[instrument(skip_all, fields(job = %job.name_any()))]
pub async fn reconcile(job: Arc<Pod>, ctx: Arc<Context>) -> Result<Action, Error> {
    let correlation = JobCorrelation::from_job(&job)?;
    let outcome = JobOutcome::from_job(&job);

    debug!(
        vm = %correlation.domain,
        migration = %correlation.migration,
        ?outcome,
        "migration job finished"
    );

    reconcile_vm(&ctx, &correlation.domain, outcome).await?;
    reconcile_migration(&ctx, &correlation.migration, outcome).await?;

    Ok(Action::await_change())
}

/// Fold the job outcome into the VirtualMachine, if it is still migrating
///
/// The VM always leaves the `Migrating` phase: the attempt is over whether it
/// worked or not. Only a successful job moves `node_name` (and its mirrored
/// label) to the pending target; the target itself is consumed either way.
async fn reconcile_vm(ctx: &Context, name: &str, outcome: JobOutcome) -> Result<(), Error> {
    let Some(mut vm) = ctx.vms.fetch(name).await? else {
        debug!(vm = %name, "virtual machine no longer exists, skipping");
        return Ok(());
    };

    let phase = vm
        .status
        .as_ref()
        .map(|s| s.phase.clone())
        .unwrap_or_default();
    if phase != VmPhase::Migrating {
        // Stale or duplicate event; this attempt was already folded in.
        debug!(vm = %name, %phase, "virtual machine is not migrating, skipping");
        return Ok(());
    }

    let status = vm.status.get_or_insert_with(Default::default);
    status.phase = VmPhase::Running;
    let target = status.migration_node_name.take();

    let moved_to = match (outcome, target) {
        (JobOutcome::Succeeded, Some(node)) => {
            status.node_name = Some(node.clone());
            Some(node)
        }
        // Failed attempt: the VM stays on its previous node.
        _ => None,
    };

    if let Some(node) = moved_to.clone() {
        vm.metadata
            .labels
            .get_or_insert_with(Default::default)
            .insert(NODE_NAME_LABEL.to_string(), node);
    }

    ctx.vms.put(&vm).await?;
    info!(vm = %name, node = ?moved_to, "virtual machine migration finished");
    Ok(())
}

/// Drive the Migration request to its terminal phase
///
/// `Succeeded` and `Failed` are absorbing: a Migration that already reached
/// one of them is never touched again, so duplicate or late redeliveries
/// cannot flip a terminal result.
async fn reconcile_migration(ctx: &Context, name: &str, outcome: JobOutcome) -> Result<(), Error> {
    let Some(mut migration) = ctx.migrations.fetch(name).await? else {
        debug!(migration = %name, "migration no longer exists, skipping");
        return Ok(());
    };

    let phase = migration
        .status
        .as_ref()
        .map(|s| s.phase.clone())
        .unwrap_or_default();
    if phase.is_terminal() {
        debug!(migration = %name, %phase, "migration already terminal, skipping");
        return Ok(());
    }

    let status = migration.status.get_or_insert_with(Default::default);
    status.phase = match outcome {
        JobOutcome::Succeeded => MigrationPhase::Succeeded,
        JobOutcome::Failed => MigrationPhase::Failed,
    };
    let phase = status.phase.clone();

    ctx.migrations.update(&migration).await?;
    info!(migration = %name, %phase, "migration finished");
    Ok(())
}

/// Error policy for the migration job controller
///
/// Classifies every reconciliation failure: malformed job pods (missing
/// correlation labels) are logged and dropped, everything else is transient
/// and requeued with backoff. The runtime's rate limiter owns the actual
/// delay scheduling.
pub fn error_policy(job: Arc<Pod>, error: &Error, _ctx: Arc<Context>) -> Action {
    match error {
        Error::MissingLabel { label } => {
            warn!(
                job = %job.name_any(),
                label = %label,
                "job pod is missing a correlation label, dropping event"
            );
            Action::await_change()
        }
        _ => {
            error!(
                ?error,
                job = %job.name_any(),
                "reconciliation failed"
            );
            Action::requeue(Duration::from_secs(5))
        }
    }
}
