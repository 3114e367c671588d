//! Kubernetes-backed store implementations
//!
//! Production implementations of the store traits the job controller
//! reconciles through. All writes are version-checked full updates: the
//! resourceVersion carried over from the fetched object makes a racing
//! writer surface as a 409 conflict, which the controller classifies as
//! transient and requeues.

use async_trait::async_trait;
use kube::api::PostParams;
use kube::{Api, Client, ResourceExt};

use crate::controller::job::{MigrationStore, VmStore};
use crate::crd::{Migration, VirtualMachine};
use crate::error::Error;

/// [`VmStore`] backed by the Kubernetes API
pub struct VmStoreImpl {
    api: Api<VirtualMachine>,
}

impl VmStoreImpl {
    /// Create a store operating in the given namespace
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait]
impl VmStore for VmStoreImpl {
    async fn fetch(&self, name: &str) -> Result<Option<VirtualMachine>, Error> {
        Ok(self.api.get_opt(name).await?)
    }

    async fn put(&self, vm: &VirtualMachine) -> Result<VirtualMachine, Error> {
        let name = vm.name_any();
        let pp = PostParams::default();

        // The VM update touches both the metadata labels and the status
        // subresource; replace only persists the former, so the status goes
        // through replace_status with the refreshed resourceVersion.
        let mut updated = self.api.replace(&name, &pp, vm).await?;
        updated.status = vm.status.clone();
        let updated = self
            .api
            .replace_status(&name, &pp, serde_json::to_vec(&updated)?)
            .await?;
        Ok(updated)
    }
}

/// [`MigrationStore`] backed by the Kubernetes API
pub struct MigrationStoreImpl {
    api: Api<Migration>,
}

impl MigrationStoreImpl {
    /// Create a store operating in the given namespace
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait]
impl MigrationStore for MigrationStoreImpl {
    async fn fetch(&self, name: &str) -> Result<Option<Migration>, Error> {
        Ok(self.api.get_opt(name).await?)
    }

    async fn update(&self, migration: &Migration) -> Result<(), Error> {
        let name = migration.name_any();
        self.api
            .replace_status(&name, &PostParams::default(), serde_json::to_vec(migration)?)
            .await?;
        Ok(())
    }
}
