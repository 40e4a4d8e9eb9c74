mod config;
mod reconcile;
mod store;
mod types;

use std::sync::Arc;

use anyhow::Result;
use futures_util::stream::StreamExt;
use kube::api::{Api, ListParams};
use kube::runtime::controller::{Context, Controller};
use kube::Client;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::store::KubeStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let client = Client::try_default().await?;

    let calculator_api = match config.namespace.as_deref() {
        Some(namespace) => Api::<types::Calculator>::namespaced(client.clone(), namespace),
        None => Api::<types::Calculator>::all(client.clone()),
    };

    let store = Arc::new(KubeStore::new(client));
    let data = reconcile::Data {
        calculators: store.clone(),
        secrets: store,
        error_requeue: config.error_requeue,
    };

    tracing::info!(namespace = ?config.namespace, "starting calculator controller");

    Controller::new(calculator_api, ListParams::default())
        .shutdown_on_signal()
        .run(reconcile::reconcile, reconcile::error_policy, Context::new(data))
        .for_each(|res| async move {
            match res {
                Ok(o) => tracing::info!("reconciled {:?}", o),
                Err(e) => tracing::warn!("reconcile failed: {}", e),
            }
        })
        .await;

    tracing::info!("controller terminated");

    Ok(())
}
