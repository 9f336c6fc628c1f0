//! Linode API v4 models
//!
//! These models match the JSON bodies of the Linode API v4.
//! See: https://techdocs.akamai.com/linode-api/reference/api

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// NodeBalancers
// ---------------------------------------------------------------------------

/// NodeBalancer model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBalancer {
    pub id: u64,
    #[serde(default)]
    pub label: Option<String>,
    pub region: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
    pub client_conn_throttle: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: Option<String>, // ISO 8601 datetime
    #[serde(default)]
    pub updated: Option<String>, // ISO 8601 datetime
}

/// Request body for creating a NodeBalancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBalancerCreateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub region: String,
    pub client_conn_throttle: u32,
    #[serde(default)]
    pub configs: Vec<NodeBalancerConfigOptions>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request body for updating a NodeBalancer
///
/// Only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBalancerUpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_conn_throttle: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Listener protocol of a NodeBalancer config
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigProtocol {
    #[default]
    Tcp,
    Http,
    Https,
}

impl ConfigProtocol {
    /// Wire value of the protocol
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for ConfigProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(other.to_string()),
        }
    }
}

/// PROXY protocol mode of a NodeBalancer config
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyProtocol {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "v1")]
    V1,
    #[serde(rename = "v2")]
    V2,
}

impl ProxyProtocol {
    /// Wire value of the proxy protocol mode
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

impl fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            other => Err(other.to_string()),
        }
    }
}

/// Health check type of a NodeBalancer config
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigCheck {
    None,
    #[default]
    Connection,
    Http,
    HttpBody,
}

impl ConfigCheck {
    /// Wire value of the health check type
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Connection => "connection",
            Self::Http => "http",
            Self::HttpBody => "http_body",
        }
    }
}

impl fmt::Display for ConfigCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "connection" => Ok(Self::Connection),
            "http" => Ok(Self::Http),
            "http_body" => Ok(Self::HttpBody),
            other => Err(other.to_string()),
        }
    }
}

/// Value the API returns in place of stored TLS material
pub const REDACTED_SSL_VALUE: &str = "<REDACTED>";

/// NodeBalancer config (one listener port) as returned by the API
///
/// The API redacts `ssl_cert` and `ssl_key` on reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBalancerConfig {
    pub id: u64,
    pub nodebalancer_id: u64,
    pub port: u16,
    #[serde(default)]
    pub protocol: ConfigProtocol,
    #[serde(default)]
    pub proxy_protocol: ProxyProtocol,
    #[serde(default)]
    pub check: ConfigCheck,
    #[serde(default)]
    pub check_interval: u32,
    #[serde(default)]
    pub check_timeout: u32,
    #[serde(default)]
    pub check_attempts: u32,
    #[serde(default)]
    pub check_path: Option<String>,
    #[serde(default)]
    pub check_body: Option<String>,
    #[serde(default)]
    pub check_passive: bool,
    #[serde(default)]
    pub ssl_cert: Option<String>,
    #[serde(default)]
    pub ssl_key: Option<String>,
}

/// Request body for creating or rebuilding a NodeBalancer config
///
/// `nodes` replaces the full backend set of the config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBalancerConfigOptions {
    pub port: u16,
    pub protocol: ConfigProtocol,
    pub proxy_protocol: ProxyProtocol,
    pub check: ConfigCheck,
    pub check_interval: u32,
    pub check_timeout: u32,
    pub check_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_body: Option<String>,
    pub check_passive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_key: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeBalancerNodeCreateOptions>,
}

/// Backend mode of a NodeBalancer node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    #[default]
    Accept,
    Reject,
    Drain,
    Backup,
}

/// Backend node of a NodeBalancer config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBalancerNode {
    pub id: u64,
    pub address: String, // "<ip>:<port>"
    pub label: String,
    #[serde(default)]
    pub status: Option<String>,
    pub weight: u32,
    #[serde(default)]
    pub mode: NodeMode,
    pub config_id: u64,
    pub nodebalancer_id: u64,
}

/// Backend node entry sent with config create/rebuild requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeBalancerNodeCreateOptions {
    pub address: String,
    pub label: String,
    pub weight: u32,
    pub mode: NodeMode,
}

// ---------------------------------------------------------------------------
// Cloud Firewalls
// ---------------------------------------------------------------------------

/// Firewall policy / rule action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FirewallPolicy {
    #[default]
    Accept,
    Drop,
}

/// Network protocol of a firewall rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkProtocol {
    #[default]
    Tcp,
    Udp,
    Icmp,
    Ipencap,
}

/// Address lists of a firewall rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAddresses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<Vec<String>>,
}

/// Single firewall rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub action: FirewallPolicy,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>, // e.g. "80,443"
    pub protocol: NetworkProtocol,
    #[serde(default)]
    pub addresses: NetworkAddresses,
}

/// Inbound and outbound rules of a firewall
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRuleSet {
    #[serde(default)]
    pub inbound: Vec<FirewallRule>,
    pub inbound_policy: FirewallPolicy,
    #[serde(default)]
    pub outbound: Vec<FirewallRule>,
    pub outbound_policy: FirewallPolicy,
}

/// Cloud Firewall model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firewall {
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub status: Option<String>, // enabled, disabled, deleted
    #[serde(default)]
    pub rules: FirewallRuleSet,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// Devices attached to a firewall at creation time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallDevicesCreateOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linodes: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodebalancers: Vec<u64>,
}

/// Request body for creating a firewall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallCreateOptions {
    pub label: String,
    pub rules: FirewallRuleSet,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub devices: FirewallDevicesCreateOptions,
}

/// Kind of entity a firewall device points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallDeviceType {
    Linode,
    NodeBalancer,
}

/// Entity referenced by a firewall device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallDeviceEntity {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: FirewallDeviceType,
    #[serde(default)]
    pub label: Option<String>,
}

/// Firewall device (attachment of a firewall to an entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallDevice {
    pub id: u64,
    pub entity: FirewallDeviceEntity,
}

/// Request body for attaching a firewall to an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallDeviceCreateOptions {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: FirewallDeviceType,
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

/// Linode instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Running,
    Offline,
    Booting,
    Rebooting,
    ShuttingDown,
    Provisioning,
    Deleting,
    Migrating,
    Rebuilding,
    Cloning,
    Restoring,
    Stopped,
    #[serde(other)]
    Unknown,
}

/// Linode instance model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: u64,
    pub label: String,
    pub region: String,
    #[serde(rename = "type", default)]
    pub instance_type: Option<String>,
    pub status: InstanceStatus,
    #[serde(default)]
    pub ipv4: Vec<Ipv4Addr>,
    #[serde(default)]
    pub ipv6: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Profile of the token owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}
