//! Backend nodes and config options.

use crate::annotations::NODE_PRIVATE_IP;
use crate::coerce::node_label;
use crate::service_config::PortConfig;
use crate::tls::TlsMaterial;
use k8s_openapi::api::core::v1::Node;
use linode_client::{
    ConfigProtocol, NodeBalancerConfig, NodeBalancerConfigOptions, NodeBalancerNode,
    NodeBalancerNodeCreateOptions, NodeMode, REDACTED_SSL_VALUE,
};
use std::collections::HashSet;
use tracing::warn;

/// Weight given to every backend
pub const NODE_WEIGHT: u32 = 100;

/// Address used to reach a node from the NodeBalancer: the private-ip
/// annotation when set, else the first InternalIP.
pub fn node_private_ip(node: &Node) -> Option<String> {
    if let Some(ip) = node
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(NODE_PRIVATE_IP))
        .filter(|ip| !ip.is_empty())
    {
        return Some(ip.clone());
    }

    node.status
        .as_ref()
        .and_then(|s| s.addresses.as_ref())
        .and_then(|addresses| {
            addresses
                .iter()
                .find(|a| a.type_ == "InternalIP" && !a.address.is_empty())
        })
        .map(|a| a.address.clone())
}

/// Backend entries for `node_port` on every node that has a private address.
/// Nodes without one are skipped.
pub fn backend_nodes(nodes: &[Node], node_port: u16) -> Vec<NodeBalancerNodeCreateOptions> {
    nodes
        .iter()
        .filter_map(|node| {
            let name = node.metadata.name.as_deref().unwrap_or_default();
            match node_private_ip(node) {
                Some(ip) => Some(NodeBalancerNodeCreateOptions {
                    address: format!("{}:{}", ip, node_port),
                    label: node_label(name),
                    weight: NODE_WEIGHT,
                    mode: NodeMode::Accept,
                }),
                None => {
                    warn!("Node {} has no private IP address, skipping as backend", name);
                    None
                }
            }
        })
        .collect()
}

/// Full create/rebuild body for a port
pub(crate) fn config_options(
    port: &PortConfig,
    tls: Option<TlsMaterial>,
    nodes: Vec<NodeBalancerNodeCreateOptions>,
) -> NodeBalancerConfigOptions {
    let hc = &port.health_check;
    let (ssl_cert, ssl_key) = match tls {
        Some(material) if port.protocol == ConfigProtocol::Https => {
            (Some(material.cert), Some(material.key))
        }
        _ => (None, None),
    };

    NodeBalancerConfigOptions {
        port: port.port,
        protocol: port.protocol,
        proxy_protocol: port.proxy_protocol,
        check: hc.check,
        check_interval: hc.interval,
        check_timeout: hc.timeout,
        check_attempts: hc.attempts,
        check_path: hc.path.clone(),
        check_body: hc.body.clone(),
        check_passive: hc.passive,
        ssl_cert,
        ssl_key,
        nodes,
    }
}

/// Whether an existing config differs from the desired options.
///
/// Backends are compared as a set. A redacted or missing certificate never
/// matches a desired one, so https configs read back from the API rebuild.
pub(crate) fn needs_rebuild(
    existing: &NodeBalancerConfig,
    observed_nodes: &[NodeBalancerNode],
    desired: &NodeBalancerConfigOptions,
) -> bool {
    let settings_differ = existing.protocol != desired.protocol
        || existing.proxy_protocol != desired.proxy_protocol
        || existing.check != desired.check
        || existing.check_interval != desired.check_interval
        || existing.check_timeout != desired.check_timeout
        || existing.check_attempts != desired.check_attempts
        || existing.check_passive != desired.check_passive
        || (desired.check_path.is_some() && existing.check_path != desired.check_path)
        || (desired.check_body.is_some() && existing.check_body != desired.check_body);
    if settings_differ {
        return true;
    }

    if desired.ssl_cert.is_some() {
        let observed_cert = existing.ssl_cert.as_deref();
        if observed_cert.is_none_or(|c| c == REDACTED_SSL_VALUE) || observed_cert != desired.ssl_cert.as_deref() {
            return true;
        }
        let observed_key = existing.ssl_key.as_deref();
        if observed_key.is_none_or(|k| k == REDACTED_SSL_VALUE) || observed_key != desired.ssl_key.as_deref() {
            return true;
        }
    }

    let observed = observed_nodes
        .iter()
        .map(|n| (n.address.as_str(), n.label.as_str(), n.weight, n.mode))
        .collect::<HashSet<_>>();
    let wanted = desired
        .nodes
        .iter()
        .map(|n| (n.address.as_str(), n.label.as_str(), n.weight, n.mode))
        .collect::<HashSet<_>>();
    observed != wanted || observed_nodes.len() != desired.nodes.len()
}
