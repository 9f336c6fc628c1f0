//! Linode Cloud Controller Manager
//!
//! Reconciles Kubernetes objects with Linode:
//! - LoadBalancer Services: NodeBalancers, their port configs and backends,
//!   and optional Cloud Firewalls
//! - Nodes: provider ID, instance type and region labels, shutdown taint

mod annotations;
mod backoff;
mod coerce;
mod config;
mod controller;
mod error;
mod firewall;
mod instances;
mod loadbalancers;
mod reconciler;
mod service_config;
mod tls;
mod watcher;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod firewall_test;
#[cfg(test)]
mod loadbalancers_test;

use anyhow::{Context, Result};
use config::CcmConfig;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Linode cloud controller manager");

    let config = CcmConfig::from_env().context("loading configuration")?;

    info!("Configuration:");
    info!("  Linode API URL: {}", config.api_url);
    info!("  Region: {}", config.region);
    info!("  Cluster name: {}", config.cluster_name);
    info!("  Hostname-only ingress: {}", config.hostname_only_ingress);
    info!(
        "  Namespace: {}",
        config.namespace.as_deref().unwrap_or("all namespaces")
    );

    let controller = Controller::new(config)
        .await
        .context("initializing controller")?;
    controller.run().await.context("running controller")?;

    Ok(())
}
