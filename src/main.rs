//! virt-controller - Kubernetes operator reconciling VM live-migration jobs

use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use virt_controller::controller::{error_policy, migration_job_watch_config, reconcile, Context};
use virt_controller::crd::{Migration, VirtualMachine};

/// virt-controller - folds migration job outcomes into VM and Migration status
#[derive(Parser, Debug)]
#[command(name = "virt-controller", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    /// Namespace migration jobs run in
    #[arg(short, long, env = "VIRT_NAMESPACE", default_value = "default")]
    namespace: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        // Generate CRD YAML for both resources
        println!("{}", serde_yaml::to_string(&VirtualMachine::crd())?);
        println!("---");
        println!("{}", serde_yaml::to_string(&Migration::crd())?);
        return Ok(());
    }

    run_controller(&cli.namespace).await
}

/// Run the migration job controller until shutdown
async fn run_controller(namespace: &str) -> anyhow::Result<()> {
    // An unparsable selector would leave the watch unfiltered; refuse to start.
    let watch_config = migration_job_watch_config()
        .map_err(|e| anyhow::anyhow!("failed to build migration job selector: {e}"))?;

    let client = Client::try_default().await?;
    let jobs: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let ctx = Arc::new(Context::from_client(client, namespace));

    tracing::info!(%namespace, "starting migration job controller");

    Controller::new(jobs, watch_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok(obj) => {
                    tracing::debug!(?obj, "job reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(error = ?e, "job reconciliation error");
                }
            }
        })
        .await;

    tracing::info!("migration job controller stopped");
    Ok(())
}
