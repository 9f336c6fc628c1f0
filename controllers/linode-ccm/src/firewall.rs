//! Cloud Firewall handling for NodeBalancers.
//!
//! A Service either references an existing firewall by id or describes an ACL
//! that the controller turns into a firewall it owns. A NodeBalancer carries at
//! most one firewall. The controller-owned firewall is recognised by carrying
//! the same label as the NodeBalancer.

use crate::coerce::coerce_string;
use crate::error::ControllerError;
use linode_client::{
    Firewall, FirewallCreateOptions, FirewallDeviceCreateOptions, FirewallDeviceType,
    FirewallDevicesCreateOptions, FirewallPolicy, FirewallRule, FirewallRuleSet, LinodeClientTrait,
    NetworkAddresses, NetworkProtocol,
};
use serde::Deserialize;
use tracing::{debug, info};

/// Linode accepts at most this many addresses per rule
pub const MAX_ADDRESSES_PER_RULE: usize = 255;

const MAX_RULE_LABEL_LEN: usize = 32;

/// IPv4 and IPv6 CIDRs of one ACL list
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddressList {
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default)]
    pub ipv6: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAcl {
    allow_list: Option<AddressList>,
    deny_list: Option<AddressList>,
}

/// Parsed `firewall-acl` annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallAcl {
    /// Only these addresses may connect
    Allow(AddressList),
    /// Everyone except these addresses may connect
    Deny(AddressList),
}

impl FirewallAcl {
    /// Parse the ACL JSON. Exactly one of `allowList` / `denyList` must be present.
    pub fn parse(raw: &str) -> Result<Self, ControllerError> {
        let acl: RawAcl = serde_json::from_str(raw).map_err(|e| {
            ControllerError::InvalidFirewallConfig(format!("unable to parse firewall ACL {:?}: {}", raw, e))
        })?;

        match (acl.allow_list, acl.deny_list) {
            (Some(allow), None) => Ok(Self::Allow(allow)),
            (None, Some(deny)) => Ok(Self::Deny(deny)),
            (Some(_), Some(_)) => Err(ControllerError::InvalidFirewallConfig(
                "allowList and denyList are mutually exclusive".to_string(),
            )),
            (None, None) => Err(ControllerError::InvalidFirewallConfig(
                "one of allowList or denyList must be specified".to_string(),
            )),
        }
    }

    fn parts(&self) -> (FirewallPolicy, FirewallPolicy, &AddressList) {
        match self {
            Self::Allow(list) => (FirewallPolicy::Accept, FirewallPolicy::Drop, list),
            Self::Deny(list) => (FirewallPolicy::Drop, FirewallPolicy::Accept, list),
        }
    }
}

/// Firewall wanted for a Service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallSpec {
    /// Attach an existing firewall
    Id(u64),
    /// Create and own a firewall built from the ACL
    Acl(FirewallAcl),
}

/// Translate an ACL into inbound rules for the given ports.
///
/// IPv4 and IPv6 addresses are chunked separately into rules of at most
/// [`MAX_ADDRESSES_PER_RULE`] addresses. Outbound traffic is always accepted.
pub fn rule_set_for_acl(
    acl: &FirewallAcl,
    ports: &[u16],
    firewall_label: &str,
    service_name: &str,
) -> FirewallRuleSet {
    let (action, inbound_policy, list) = acl.parts();
    let ports = ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let rule_label = coerce_string(
        &format!("{}-{}", policy_name(action), service_name),
        3,
        MAX_RULE_LABEL_LEN,
        "",
    );

    let ipv4_chunks = list.ipv4.chunks(MAX_ADDRESSES_PER_RULE).map(|chunk| NetworkAddresses {
        ipv4: Some(chunk.to_vec()),
        ipv6: None,
    });
    let ipv6_chunks = list.ipv6.chunks(MAX_ADDRESSES_PER_RULE).map(|chunk| NetworkAddresses {
        ipv4: None,
        ipv6: Some(chunk.to_vec()),
    });

    let inbound = ipv4_chunks
        .chain(ipv6_chunks)
        .enumerate()
        .map(|(i, addresses)| FirewallRule {
            action,
            label: rule_label.clone(),
            description: Some(format!(
                "Rule {}, Created by linode-ccm: {}, for {}",
                i, firewall_label, service_name
            )),
            ports: Some(ports.clone()),
            protocol: NetworkProtocol::Tcp,
            addresses,
        })
        .collect();

    FirewallRuleSet {
        inbound,
        inbound_policy,
        outbound: Vec::new(),
        outbound_policy: FirewallPolicy::Accept,
    }
}

fn policy_name(policy: FirewallPolicy) -> &'static str {
    match policy {
        FirewallPolicy::Accept => "ACCEPT",
        FirewallPolicy::Drop => "DROP",
    }
}

/// Inputs needed to reconcile the firewall of one NodeBalancer
#[derive(Debug)]
pub struct FirewallTarget<'a> {
    pub nodebalancer_id: u64,
    /// Label of the NodeBalancer, reused for the controller-owned firewall
    pub owned_label: &'a str,
    pub service_name: &'a str,
    pub ports: &'a [u16],
    pub tags: &'a [String],
}

/// Converge the firewall attachment of a NodeBalancer on `spec`.
///
/// - `None`: owned firewalls are deleted, foreign ones detached.
/// - `Id`: the referenced firewall is attached, anything else removed.
/// - `Acl`: the owned firewall's rules are updated only on change; a foreign
///   firewall is detached and an owned one created.
pub async fn reconcile_firewall(
    client: &dyn LinodeClientTrait,
    target: &FirewallTarget<'_>,
    spec: Option<&FirewallSpec>,
) -> Result<(), ControllerError> {
    let attached = client.list_nodebalancer_firewalls(target.nodebalancer_id).await?;

    match spec {
        None => {
            for firewall in &attached {
                remove_firewall(client, firewall, target).await?;
            }
        }
        Some(FirewallSpec::Id(id)) => {
            let mut present = false;
            for firewall in &attached {
                if firewall.id == *id {
                    present = true;
                } else {
                    remove_firewall(client, firewall, target).await?;
                }
            }
            if !present {
                info!(
                    "Attaching firewall {} to NodeBalancer {}",
                    id, target.nodebalancer_id
                );
                client
                    .create_firewall_device(
                        *id,
                        &FirewallDeviceCreateOptions {
                            id: target.nodebalancer_id,
                            kind: FirewallDeviceType::NodeBalancer,
                        },
                    )
                    .await?;
            }
        }
        Some(FirewallSpec::Acl(acl)) => {
            let desired = rule_set_for_acl(acl, target.ports, target.owned_label, target.service_name);
            let mut owned_present = false;
            for firewall in &attached {
                if firewall.label == target.owned_label {
                    owned_present = true;
                    if firewall.rules == desired {
                        debug!("Firewall {} rules already up to date", firewall.id);
                    } else {
                        info!("Updating rules of firewall {}", firewall.id);
                        client.update_firewall_rules(firewall.id, &desired).await?;
                    }
                } else {
                    detach_firewall(client, firewall, target.nodebalancer_id).await?;
                }
            }
            if !owned_present {
                info!(
                    "Creating firewall {} for NodeBalancer {}",
                    target.owned_label, target.nodebalancer_id
                );
                client
                    .create_firewall(&FirewallCreateOptions {
                        label: target.owned_label.to_string(),
                        rules: desired,
                        tags: target.tags.to_vec(),
                        devices: FirewallDevicesCreateOptions {
                            linodes: Vec::new(),
                            nodebalancers: vec![target.nodebalancer_id],
                        },
                    })
                    .await?;
            }
        }
    }

    Ok(())
}

/// Delete every controller-owned firewall attached to a NodeBalancer
pub async fn delete_owned_firewalls(
    client: &dyn LinodeClientTrait,
    nodebalancer_id: u64,
    owned_label: &str,
) -> Result<(), ControllerError> {
    for firewall in client.list_nodebalancer_firewalls(nodebalancer_id).await? {
        if firewall.label == owned_label {
            info!("Deleting firewall {} ({})", firewall.id, firewall.label);
            client.delete_firewall(firewall.id).await?;
        }
    }
    Ok(())
}

async fn remove_firewall(
    client: &dyn LinodeClientTrait,
    firewall: &Firewall,
    target: &FirewallTarget<'_>,
) -> Result<(), ControllerError> {
    if firewall.label == target.owned_label {
        info!("Deleting firewall {} ({})", firewall.id, firewall.label);
        client.delete_firewall(firewall.id).await?;
        Ok(())
    } else {
        detach_firewall(client, firewall, target.nodebalancer_id).await
    }
}

async fn detach_firewall(
    client: &dyn LinodeClientTrait,
    firewall: &Firewall,
    nodebalancer_id: u64,
) -> Result<(), ControllerError> {
    let devices = client.list_firewall_devices(firewall.id).await?;
    for device in devices.iter().filter(|d| {
        d.entity.kind == FirewallDeviceType::NodeBalancer && d.entity.id == nodebalancer_id
    }) {
        info!(
            "Detaching firewall {} from NodeBalancer {}",
            firewall.id, nodebalancer_id
        );
        client.delete_firewall_device(firewall.id, device.id).await?;
    }
    Ok(())
}
