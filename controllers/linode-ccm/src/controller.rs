//! Main controller implementation.
//!
//! `Controller` wires the Linode client, the load balancer and instance
//! reconcilers, and runs one watcher for Services and one for Nodes.

use crate::config::CcmConfig;
use crate::error::ControllerError;
use crate::instances::Instances;
use crate::loadbalancers::LoadBalancers;
use crate::reconciler::Reconciler;
use crate::tls::KubeSecretResolver;
use crate::watcher::Watcher;
use k8s_openapi::api::core::v1::{Node, Service};
use kube::{Api, Client};
use linode_client::{LinodeClient, LinodeClientTrait};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Cloud controller manager for Linode.
pub struct Controller {
    service_watcher: JoinHandle<Result<(), ControllerError>>,
    node_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates the controller and starts its watchers.
    pub async fn new(config: CcmConfig) -> Result<Self, ControllerError> {
        info!("Initializing Linode cloud controller manager");

        let kube_client = Client::try_default().await?;

        let linode_client = LinodeClient::new(config.api_url.clone(), config.api_token.clone())?;

        info!("Validating Linode token and connectivity...");
        linode_client.validate_token().await.map_err(|e| {
            error!("Failed to validate Linode token: {}", e);
            error!("Please ensure:");
            error!("  1. LINODE_API_TOKEN environment variable is set correctly");
            error!("  2. The token has read/write scopes for NodeBalancers, Firewalls and Linodes");
            error!("  3. The Linode API is reachable at {}", config.api_url);
            ControllerError::Linode(e)
        })?;
        info!("Linode token validated and connectivity established");

        let linode_client: Arc<dyn LinodeClientTrait> = Arc::new(linode_client);
        let load_balancers = LoadBalancers::new(
            linode_client.clone(),
            Arc::new(KubeSecretResolver::new(kube_client.clone())),
            config.region.clone(),
            config.cluster_name.clone(),
            config.hostname_only_ingress,
        );
        let instances = Instances::new(linode_client);

        let service_api: Api<Service> = match config.namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };
        let node_api: Api<Node> = Api::all(kube_client.clone());

        let reconciler = Arc::new(Reconciler::new(kube_client, load_balancers, instances));
        let watcher_instance = Arc::new(Watcher::new(reconciler, service_api, node_api));

        let service_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_services().await })
        };

        let node_watcher = {
            let watcher = watcher_instance;
            tokio::spawn(async move { watcher.watch_nodes().await })
        };

        Ok(Self {
            service_watcher,
            node_watcher,
        })
    }

    /// Runs the controller until a watcher exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Linode cloud controller manager running");

        tokio::select! {
            result = &mut self.service_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Service watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Service watcher error: {}", e)))?;
            }
            result = &mut self.node_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Node watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Node watcher error: {}", e)))?;
            }
        }

        Ok(())
    }
}
