//! Ensure and update of NodeBalancers.
//!
//! Step order is fixed: throttle, tags, config deletes, config
//! creates/rebuilds, stale NodeBalancer cleanup, firewall. Each step diffs
//! against what the API reports and only writes on a mismatch.

use super::nodes::{backend_nodes, config_options, needs_rebuild};
use super::{LoadBalancers, make_load_balancer_status};
use crate::coerce::{load_balancer_name, service_key};
use crate::error::ControllerError;
use crate::firewall::{FirewallTarget, delete_owned_firewalls, reconcile_firewall};
use crate::service_config::ServiceConfig;
use k8s_openapi::api::core::v1::{LoadBalancerStatus, Node, Service};
use linode_client::{
    LinodeError, NodeBalancer, NodeBalancerConfigOptions, NodeBalancerCreateOptions,
    NodeBalancerUpdateOptions,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

impl LoadBalancers {
    /// Create or converge the Service's NodeBalancer and return its status.
    ///
    /// An empty node list is rejected before anything else happens.
    pub async fn ensure_load_balancer(
        &self,
        service: &Service,
        nodes: &[Node],
    ) -> Result<LoadBalancerStatus, ControllerError> {
        let key = service_key(service);
        if nodes.is_empty() {
            return Err(ControllerError::NoNodesAvailable(key));
        }
        let config = ServiceConfig::from_service(service, self.hostname_only_default)?;

        let nb = match self
            .get_nodebalancer_for_service(service, config.nodebalancer_id)
            .await?
        {
            Some(nb) => {
                info!("Updating NodeBalancer {} for service {}", nb.id, key);
                self.update_nodebalancer(service, &config, &nb, nodes).await?;
                self.client.get_nodebalancer(nb.id).await?
            }
            None => {
                info!("Creating NodeBalancer for service {}", key);
                self.build_load_balancer(service, &config, nodes).await?
            }
        };

        Ok(make_load_balancer_status(&nb, config.hostname_only_ingress))
    }

    /// Converge an existing NodeBalancer. Fails if the Service has none.
    pub async fn update_load_balancer(
        &self,
        service: &Service,
        nodes: &[Node],
    ) -> Result<(), ControllerError> {
        let key = service_key(service);
        if nodes.is_empty() {
            return Err(ControllerError::NoNodesAvailable(key));
        }
        let config = ServiceConfig::from_service(service, self.hostname_only_default)?;

        let nb = self
            .get_nodebalancer_for_service(service, config.nodebalancer_id)
            .await?
            .ok_or_else(|| {
                ControllerError::Linode(LinodeError::NotFound(format!(
                    "NodeBalancer for service {} not found",
                    key
                )))
            })?;

        self.update_nodebalancer(service, &config, &nb, nodes).await
    }

    async fn build_load_balancer(
        &self,
        service: &Service,
        config: &ServiceConfig,
        nodes: &[Node],
    ) -> Result<NodeBalancer, ControllerError> {
        let label = load_balancer_name(service)?;
        let configs = self.desired_configs(service, config, nodes).await?;
        let tags = self.desired_tags(&config.tags);

        let nb = self
            .client
            .create_nodebalancer(&NodeBalancerCreateOptions {
                label: Some(label.clone()),
                region: self.region.clone(),
                client_conn_throttle: config.throttle,
                configs,
                tags: tags.clone(),
            })
            .await?;
        info!(
            "Created NodeBalancer {} ({}) for service {}",
            nb.id,
            label,
            service_key(service)
        );

        reconcile_firewall(
            self.client.as_ref(),
            &FirewallTarget {
                nodebalancer_id: nb.id,
                owned_label: &label,
                service_name: service.metadata.name.as_deref().unwrap_or_default(),
                ports: &config.port_numbers(),
                tags: &tags,
            },
            config.firewall.as_ref(),
        )
        .await?;

        Ok(nb)
    }

    /// Create/rebuild options for every Service port, TLS resolved.
    /// Runs before any mutating call.
    async fn desired_configs(
        &self,
        service: &Service,
        config: &ServiceConfig,
        nodes: &[Node],
    ) -> Result<Vec<NodeBalancerConfigOptions>, ControllerError> {
        let namespace = service.metadata.namespace.as_deref().unwrap_or("default");
        let mut desired = Vec::with_capacity(config.ports.len());

        for port in &config.ports {
            let tls = match &port.tls_secret_name {
                Some(secret) => Some(self.tls.resolve(namespace, secret).await?),
                None => None,
            };
            let backends = backend_nodes(nodes, port.node_port);
            if backends.is_empty() {
                return Err(ControllerError::NoNodesAvailable(service_key(service)));
            }
            desired.push(config_options(port, tls, backends));
        }

        Ok(desired)
    }

    async fn update_nodebalancer(
        &self,
        service: &Service,
        config: &ServiceConfig,
        nb: &NodeBalancer,
        nodes: &[Node],
    ) -> Result<(), ControllerError> {
        let desired_configs = self.desired_configs(service, config, nodes).await?;

        if nb.client_conn_throttle != config.throttle {
            info!(
                "Updating throttle of NodeBalancer {}: {} -> {}",
                nb.id, nb.client_conn_throttle, config.throttle
            );
            self.client
                .update_nodebalancer(
                    nb.id,
                    &NodeBalancerUpdateOptions {
                        client_conn_throttle: Some(config.throttle),
                        ..Default::default()
                    },
                )
                .await?;
        }

        let tags = self.desired_tags(&config.tags);
        let observed_tags = nb.tags.iter().collect::<BTreeSet<_>>();
        if observed_tags != tags.iter().collect::<BTreeSet<_>>() {
            info!("Updating tags of NodeBalancer {}: {:?}", nb.id, tags);
            self.client
                .update_nodebalancer(
                    nb.id,
                    &NodeBalancerUpdateOptions {
                        tags: Some(tags.clone()),
                        ..Default::default()
                    },
                )
                .await?;
        }

        let existing = self.client.list_nodebalancer_configs(nb.id).await?;
        let desired_ports = desired_configs.iter().map(|c| c.port).collect::<BTreeSet<_>>();
        for stale in existing.iter().filter(|c| !desired_ports.contains(&c.port)) {
            info!(
                "Deleting config {} (port {}) of NodeBalancer {}",
                stale.id, stale.port, nb.id
            );
            self.client
                .delete_nodebalancer_config(nb.id, stale.id)
                .await?;
        }

        for desired in &desired_configs {
            match existing.iter().find(|c| c.port == desired.port) {
                Some(current) => {
                    let observed_nodes = self
                        .client
                        .list_nodebalancer_nodes(nb.id, current.id)
                        .await?;
                    if needs_rebuild(current, &observed_nodes, desired) {
                        info!(
                            "Rebuilding config {} (port {}) of NodeBalancer {}",
                            current.id, desired.port, nb.id
                        );
                        self.client
                            .rebuild_nodebalancer_config(nb.id, current.id, desired)
                            .await
                            .map_err(|source| ControllerError::ConfigRebuild {
                                port: desired.port,
                                source,
                            })?;
                    } else {
                        debug!(
                            "Config {} (port {}) of NodeBalancer {} is up to date",
                            current.id, desired.port, nb.id
                        );
                    }
                }
                None => {
                    info!("Creating config for port {} on NodeBalancer {}", desired.port, nb.id);
                    self.client
                        .create_nodebalancer_config(nb.id, desired)
                        .await?;
                }
            }
        }

        let label = load_balancer_name(service)?;
        self.cleanup_old_nodebalancer(service, config.nodebalancer_id, &label)
            .await?;

        reconcile_firewall(
            self.client.as_ref(),
            &FirewallTarget {
                nodebalancer_id: nb.id,
                owned_label: &label,
                service_name: service.metadata.name.as_deref().unwrap_or_default(),
                ports: &config.port_numbers(),
                tags: &tags,
            },
            config.firewall.as_ref(),
        )
        .await
    }

    /// Delete the NodeBalancer recorded in status when the id annotation now
    /// points elsewhere.
    ///
    /// Without the annotation this makes no API calls at all.
    pub(crate) async fn cleanup_old_nodebalancer(
        &self,
        service: &Service,
        annotated_id: Option<u64>,
        owned_label: &str,
    ) -> Result<(), ControllerError> {
        let Some(new_id) = annotated_id else {
            return Ok(());
        };

        let Some(previous) = self.nodebalancer_by_status(service).await? else {
            return Ok(());
        };
        if previous.id == new_id {
            return Ok(());
        }

        info!(
            "Service {} moved from NodeBalancer {} to {}, deleting the old one",
            service_key(service),
            previous.id,
            new_id
        );
        delete_owned_firewalls(self.client.as_ref(), previous.id, owned_label).await?;
        match self.client.delete_nodebalancer(previous.id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
