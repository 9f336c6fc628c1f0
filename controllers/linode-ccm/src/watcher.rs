//! Kubernetes resource watchers.
//!
//! Services and Nodes are each driven by a `kube_runtime::Controller` through
//! the generic `watch_resource()` helper, which takes care of reconnection,
//! debouncing and per-object error backoff.

use crate::error::ControllerError;
use crate::reconciler::{Reconciler, object_key};
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Node, Service};
use kube::Api;
use kube_runtime::{Controller, controller::{Action, Config as ControllerConfig}, watcher};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Run a `kube_runtime::Controller` for `K` until its stream ends.
///
/// Failed reconciliations are requeued after the object's Fibonacci backoff.
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = object_key(obj.as_ref());
        ctx.increment_error(&key);
        let (backoff_seconds, error_count) = ctx.get_backoff_for_resource(&key);
        error!(
            "Reconciliation error ({}) for {} {} (attempt {}), retrying in {}s: {}",
            error.kind(),
            resource_name,
            key,
            error_count,
            backoff_seconds,
            error
        );
        Action::requeue(Duration::from_secs(backoff_seconds))
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            debug!("Reconciling {} {}", resource_name, object_key(obj.as_ref()));
            reconcile_fn(ctx, obj).await
        }
    };

    // 5s debounce, at most 3 concurrent reconciles per watcher
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error for {}: {}", resource_name, e);
            }
        })
        .await;

    Ok(())
}

/// Watches Services and Nodes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    service_api: Api<Service>,
    node_api: Api<Node>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, service_api: Api<Service>, node_api: Api<Node>) -> Self {
        Self {
            reconciler,
            service_api,
            node_api,
        }
    }

    /// Starts watching Services.
    pub async fn watch_services(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.service_api.clone(),
            self.reconciler.clone(),
            |reconciler, service| {
                Box::pin(async move { reconciler.reconcile_service(&service).await })
            },
            "Service",
        )
        .await
    }

    /// Starts watching Nodes.
    pub async fn watch_nodes(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.node_api.clone(),
            self.reconciler.clone(),
            |reconciler, node| Box::pin(async move { reconciler.reconcile_node(&node).await }),
            "Node",
        )
        .await
    }
}
