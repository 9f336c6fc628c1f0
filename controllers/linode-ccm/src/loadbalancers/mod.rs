//! NodeBalancer lifecycle for LoadBalancer Services.
//!
//! This module is organized by verb:
//! - `mod.rs`: lookup (`get_load_balancer`) and the status projection
//! - `update.rs`: `ensure_load_balancer` / `update_load_balancer` and stale NodeBalancer cleanup
//! - `delete.rs`: `ensure_load_balancer_deleted`
//! - `nodes.rs`: backend node and config option construction
//!
//! Nothing is cached between calls. Every verb re-reads the NodeBalancer and
//! diffs before it writes, so a failed attempt can simply be retried.

mod delete;
mod nodes;
mod update;

use crate::coerce::{load_balancer_name, service_key};
use crate::error::ControllerError;
use crate::service_config;
use crate::tls::TlsResolver;
use k8s_openapi::api::core::v1::{LoadBalancerIngress, LoadBalancerStatus, Service};
use linode_client::{LinodeClientTrait, ListFilter, NodeBalancer};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reconciles NodeBalancers for Services.
pub struct LoadBalancers {
    pub(crate) client: Arc<dyn LinodeClientTrait>,
    pub(crate) tls: Arc<dyn TlsResolver>,
    pub(crate) region: String,
    pub(crate) cluster_name: String,
    pub(crate) hostname_only_default: bool,
}

impl LoadBalancers {
    /// Creates a new NodeBalancer reconciler.
    pub fn new(
        client: Arc<dyn LinodeClientTrait>,
        tls: Arc<dyn TlsResolver>,
        region: impl Into<String>,
        cluster_name: impl Into<String>,
        hostname_only_default: bool,
    ) -> Self {
        Self {
            client,
            tls,
            region: region.into(),
            cluster_name: cluster_name.into(),
            hostname_only_default,
        }
    }

    /// Status of the Service's NodeBalancer, or `None` when it has none.
    ///
    /// A NodeBalancer id annotation pointing at a deleted NodeBalancer is
    /// reported as `None` with a warning. A malformed one is ignored.
    pub async fn get_load_balancer(
        &self,
        service: &Service,
    ) -> Result<Option<LoadBalancerStatus>, ControllerError> {
        let annotated_id = service_config::lookup_nodebalancer_id(service);
        match self.get_nodebalancer_for_service(service, annotated_id).await {
            Ok(nb) => Ok(nb.map(|nb| {
                make_load_balancer_status(
                    &nb,
                    service_config::hostname_only_ingress(service, self.hostname_only_default),
                )
            })),
            Err(e @ ControllerError::NodeBalancerNotFound { .. }) => {
                warn!("{}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve the NodeBalancer backing a Service.
    ///
    /// Order: explicit id annotation (404 is a hard error), then the
    /// NodeBalancer named by the Service's status, then a label search.
    pub(crate) async fn get_nodebalancer_for_service(
        &self,
        service: &Service,
        annotated_id: Option<u64>,
    ) -> Result<Option<NodeBalancer>, ControllerError> {
        if let Some(id) = annotated_id {
            return match self.client.get_nodebalancer(id).await {
                Ok(nb) => Ok(Some(nb)),
                Err(e) if e.is_not_found() => Err(ControllerError::NodeBalancerNotFound {
                    service: service_key(service),
                    id,
                }),
                Err(e) => Err(e.into()),
            };
        }

        if !status_ingress(service).is_empty() {
            if let Some(nb) = self.nodebalancer_by_status(service).await? {
                return Ok(Some(nb));
            }
            debug!(
                "Status of service {} names no existing NodeBalancer",
                service_key(service)
            );
        }

        self.nodebalancer_by_label(service).await
    }

    /// Find the NodeBalancer whose hostname (or IPv4) is recorded in status.
    ///
    /// Entries carrying an IP are looked up with an `ipv4` filter, and the
    /// hostname, when also present, must agree. Only hostname-only entries
    /// need the full listing, fetched at most once.
    pub(crate) async fn nodebalancer_by_status(
        &self,
        service: &Service,
    ) -> Result<Option<NodeBalancer>, ControllerError> {
        let mut listed: Option<Vec<NodeBalancer>> = None;

        for entry in status_ingress(service) {
            let hostname = non_empty(entry.hostname.as_deref());
            let found = match (hostname, non_empty(entry.ip.as_deref())) {
                (_, Some(ip)) => self
                    .client
                    .list_nodebalancers(Some(&ListFilter::ipv4(ip)))
                    .await?
                    .into_iter()
                    .find(|nb| hostname.is_none_or(|h| nb.hostname.as_deref() == Some(h))),
                (Some(hostname), None) => {
                    let all = match listed.take() {
                        Some(all) => all,
                        None => self.client.list_nodebalancers(None).await?,
                    };
                    let found = all
                        .iter()
                        .find(|nb| nb.hostname.as_deref() == Some(hostname))
                        .cloned();
                    listed = Some(all);
                    found
                }
                (None, None) => None,
            };
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    async fn nodebalancer_by_label(
        &self,
        service: &Service,
    ) -> Result<Option<NodeBalancer>, ControllerError> {
        let label = load_balancer_name(service)?;
        let mut matches = self
            .client
            .list_nodebalancers(Some(&ListFilter::label(label.as_str())))
            .await?;
        if matches.len() > 1 {
            warn!(
                "Found {} NodeBalancers labelled {}, using the first",
                matches.len(),
                label
            );
        }
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        })
    }

    /// Tags applied to NodeBalancers: the cluster name, then annotation tags
    pub(crate) fn desired_tags(&self, annotation_tags: &[String]) -> Vec<String> {
        let mut tags = Vec::with_capacity(annotation_tags.len() + 1);
        tags.push(self.cluster_name.clone());
        for tag in annotation_tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        tags
    }
}

/// Project a NodeBalancer into the Service status.
///
/// With `hostname_only` the IP is omitted so clients resolve the hostname.
pub fn make_load_balancer_status(nb: &NodeBalancer, hostname_only: bool) -> LoadBalancerStatus {
    let ip = if hostname_only { None } else { nb.ipv4.clone() };
    LoadBalancerStatus {
        ingress: Some(vec![LoadBalancerIngress {
            hostname: nb.hostname.clone(),
            ip,
            ..Default::default()
        }]),
    }
}

fn status_ingress(service: &Service) -> &[LoadBalancerIngress] {
    service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_deref())
        .unwrap_or_default()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
