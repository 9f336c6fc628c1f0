//! Node to Linode instance resolution.
//!
//! Every lookup lists all instances once and matches locally: by provider ID
//! when the node has one, else by name (the instance label), and for metadata
//! finally by IP address.

use crate::error::ControllerError;
use k8s_openapi::api::core::v1::{Node, NodeAddress};
use linode_client::{Instance, InstanceStatus, LinodeClientTrait};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::debug;

/// Scheme of Linode provider IDs (`linode://<id>`)
pub const PROVIDER_ID_PREFIX: &str = "linode://";

/// What the cluster learns about a node from its instance
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceMetadata {
    pub provider_id: String,
    pub instance_type: Option<String>,
    pub region: String,
    /// Hostname, then external IPs, then internal IPs
    pub node_addresses: Vec<NodeAddress>,
}

/// Parse `linode://<id>` into the instance id
pub fn parse_provider_id(provider_id: &str) -> Result<u64, ControllerError> {
    provider_id
        .strip_prefix(PROVIDER_ID_PREFIX)
        .and_then(|id| id.parse::<u64>().ok())
        .ok_or_else(|| ControllerError::InvalidProviderId(provider_id.to_string()))
}

/// Provider ID for an instance id
pub fn provider_id(instance_id: u64) -> String {
    format!("{}{}", PROVIDER_ID_PREFIX, instance_id)
}

/// Resolves nodes to Linode instances.
pub struct Instances {
    client: Arc<dyn LinodeClientTrait>,
}

impl Instances {
    pub fn new(client: Arc<dyn LinodeClientTrait>) -> Self {
        Self { client }
    }

    /// Whether the node's instance still exists
    pub async fn instance_exists(&self, node: &Node) -> Result<bool, ControllerError> {
        match self.lookup(node, false).await {
            Ok(_) => Ok(true),
            Err(ControllerError::InstanceNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether the node's instance is powered off or powering off
    pub async fn instance_shutdown(&self, node: &Node) -> Result<bool, ControllerError> {
        let instance = self.lookup(node, false).await?;
        Ok(matches!(
            instance.status,
            InstanceStatus::Offline | InstanceStatus::ShuttingDown
        ))
    }

    /// Provider ID, type, region and addresses of the node's instance
    pub async fn instance_metadata(&self, node: &Node) -> Result<InstanceMetadata, ControllerError> {
        let instance = self.lookup(node, true).await?;

        if instance.ipv4.is_empty() {
            return Err(ControllerError::NoIpAddresses(instance.id));
        }

        Ok(InstanceMetadata {
            provider_id: provider_id(instance.id),
            instance_type: instance.instance_type.clone(),
            region: instance.region.clone(),
            node_addresses: node_addresses(&instance),
        })
    }

    async fn lookup(&self, node: &Node, match_by_ip: bool) -> Result<Instance, ControllerError> {
        let name = node.metadata.name.clone().unwrap_or_default();
        let node_provider_id = node
            .spec
            .as_ref()
            .and_then(|s| s.provider_id.as_deref())
            .filter(|id| !id.is_empty());

        let wanted_id = node_provider_id.map(parse_provider_id).transpose()?;
        let instances = self.client.list_instances(None).await?;

        let found = if let Some(id) = wanted_id {
            instances.into_iter().find(|i| i.id == id)
        } else if let Some(instance) = instances.iter().find(|i| i.label == name) {
            Some(instance.clone())
        } else if match_by_ip {
            let ips = node_ips(node);
            if ips.is_empty() {
                return Err(ControllerError::NoNodeAddress(name));
            }
            debug!("Matching node {} to an instance by address {:?}", name, ips);
            instances
                .into_iter()
                .find(|i| i.ipv4.iter().any(|ip| ips.contains(ip)))
        } else {
            None
        };

        found.ok_or(ControllerError::InstanceNotFound(name))
    }
}

/// Addresses used for the IP fallback: ExternalIPs, or InternalIPs when the
/// node reports no external address.
fn node_ips(node: &Node) -> Vec<Ipv4Addr> {
    let addresses = node
        .status
        .as_ref()
        .and_then(|s| s.addresses.as_deref())
        .unwrap_or_default();
    let of_type = |kind: &str| -> Vec<Ipv4Addr> {
        addresses
            .iter()
            .filter(|a| a.type_ == kind)
            .filter_map(|a| a.address.parse().ok())
            .collect()
    };

    let external = of_type("ExternalIP");
    if external.is_empty() {
        of_type("InternalIP")
    } else {
        external
    }
}

/// Hostname first, then public then private IPv4 addresses, each in API order
pub fn node_addresses(instance: &Instance) -> Vec<NodeAddress> {
    let mut addresses = Vec::with_capacity(instance.ipv4.len() + 1);
    if !instance.label.is_empty() {
        addresses.push(NodeAddress {
            type_: "Hostname".to_string(),
            address: instance.label.clone(),
        });
    }
    addresses.extend(
        instance
            .ipv4
            .iter()
            .filter(|ip| !ip.is_private())
            .map(|ip| NodeAddress {
                type_: "ExternalIP".to_string(),
                address: ip.to_string(),
            }),
    );
    addresses.extend(
        instance
            .ipv4
            .iter()
            .filter(|ip| ip.is_private())
            .map(|ip| NodeAddress {
                type_: "InternalIP".to_string(),
                address: ip.to_string(),
            }),
    );
    addresses
}
