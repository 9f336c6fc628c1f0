//! Service reconciliation.
//!
//! LoadBalancer Services get the cleanup finalizer, a NodeBalancer and a
//! status. Deleted Services, and Services that stopped being LoadBalancers
//! while still holding the finalizer, get their NodeBalancer removed.

use super::{RESYNC_INTERVAL, Reconciler, object_key};
use crate::annotations::{EXCLUDE_FROM_LOAD_BALANCERS_LABEL, LOAD_BALANCER_CLEANUP_FINALIZER};
use crate::error::ControllerError;
use k8s_openapi::api::core::v1::{LoadBalancerStatus, Node, Service};
use kube::Api;
use kube::api::{ListParams, Patch, PatchParams};
use kube_runtime::controller::Action;
use serde_json::json;
use tracing::{debug, info};

impl Reconciler {
    /// Reconcile one Service.
    pub async fn reconcile_service(&self, service: &Service) -> Result<Action, ControllerError> {
        let key = object_key(service);
        let name = service.metadata.name.as_deref().unwrap_or_default();
        let namespace = service.metadata.namespace.as_deref().unwrap_or("default");
        let api: Api<Service> = Api::namespaced(self.kube_client.clone(), namespace);

        if service.metadata.deletion_timestamp.is_some() {
            if has_finalizer(service) {
                info!("Service {} is being deleted, removing its NodeBalancer", key);
                self.load_balancers.ensure_load_balancer_deleted(service).await?;
                self.patch_finalizers(&api, service, false).await?;
            }
            self.forget_resource(&key);
            return Ok(Action::await_change());
        }

        if !is_load_balancer(service) {
            if has_finalizer(service) {
                info!(
                    "Service {} is no longer of type LoadBalancer, removing its NodeBalancer",
                    key
                );
                self.load_balancers.ensure_load_balancer_deleted(service).await?;
                let patch = json!({ "status": { "loadBalancer": { "ingress": null } } });
                api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
                self.patch_finalizers(&api, service, false).await?;
            } else {
                debug!("Skipping Service {}: not of type LoadBalancer", key);
            }
            self.forget_resource(&key);
            return Ok(Action::await_change());
        }

        info!("Reconciling Service {}", key);
        self.patch_finalizers(&api, service, true).await?;

        let nodes = self.load_balancer_nodes().await?;
        let status = self
            .load_balancers
            .ensure_load_balancer(service, &nodes)
            .await?;

        if status_changed(service, &status) {
            info!("Updating load balancer status of Service {}", key);
            let patch = json!({ "status": { "loadBalancer": status } });
            api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }

        self.reset_error(&key);
        Ok(Action::requeue(RESYNC_INTERVAL))
    }

    /// Nodes eligible as NodeBalancer backends
    async fn load_balancer_nodes(&self) -> Result<Vec<Node>, ControllerError> {
        let api: Api<Node> = Api::all(self.kube_client.clone());
        let nodes = api.list(&ListParams::default()).await?;
        Ok(eligible_nodes(nodes.items))
    }

    async fn patch_finalizers(
        &self,
        api: &Api<Service>,
        service: &Service,
        present: bool,
    ) -> Result<(), ControllerError> {
        let Some(finalizers) = finalizers_with(service, present) else {
            return Ok(());
        };
        let name = service.metadata.name.as_deref().unwrap_or_default();
        debug!(
            "{} finalizer on Service {}",
            if present { "Adding" } else { "Removing" },
            object_key(service)
        );
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

/// Whether the Service asks for an external load balancer
pub fn is_load_balancer(service: &Service) -> bool {
    service
        .spec
        .as_ref()
        .and_then(|s| s.type_.as_deref())
        == Some("LoadBalancer")
}

/// Whether the Service holds the cleanup finalizer
pub fn has_finalizer(service: &Service) -> bool {
    service
        .metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|f| f == LOAD_BALANCER_CLEANUP_FINALIZER))
}

/// Full finalizer list with the cleanup finalizer added (`present`) or
/// removed. `None` when the list already has the wanted shape.
pub fn finalizers_with(service: &Service, present: bool) -> Option<Vec<String>> {
    if has_finalizer(service) == present {
        return None;
    }
    let mut finalizers = service.metadata.finalizers.clone().unwrap_or_default();
    if present {
        finalizers.push(LOAD_BALANCER_CLEANUP_FINALIZER.to_string());
    } else {
        finalizers.retain(|f| f != LOAD_BALANCER_CLEANUP_FINALIZER);
    }
    Some(finalizers)
}

/// Drop nodes labelled out of external load balancers
pub fn eligible_nodes(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .filter(|node| {
            !node
                .metadata
                .labels
                .as_ref()
                .is_some_and(|l| l.contains_key(EXCLUDE_FROM_LOAD_BALANCERS_LABEL))
        })
        .collect()
}

/// Whether `status` differs from what the Service currently reports
pub fn status_changed(service: &Service, status: &LoadBalancerStatus) -> bool {
    let current = service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref());
    current != Some(status)
}
