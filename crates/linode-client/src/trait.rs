//! LinodeClient trait for mocking
//!
//! This trait abstracts the LinodeClient to enable mocking in unit tests.
//! The concrete LinodeClient implements this trait, and tests can use the mock implementation.

use crate::common::filter::ListFilter;
use crate::error::LinodeError;
use crate::models::*;

/// Trait for Linode API client operations
///
/// This trait enables mocking of Linode API calls for unit testing.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait LinodeClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the API token
    async fn validate_token(&self) -> Result<(), LinodeError>;

    // Instance Operations
    async fn list_instances(&self, filter: Option<&ListFilter>) -> Result<Vec<Instance>, LinodeError>;
    async fn get_instance(&self, id: u64) -> Result<Instance, LinodeError>;

    // NodeBalancer Operations
    async fn list_nodebalancers(&self, filter: Option<&ListFilter>) -> Result<Vec<NodeBalancer>, LinodeError>;
    async fn get_nodebalancer(&self, id: u64) -> Result<NodeBalancer, LinodeError>;
    async fn create_nodebalancer(&self, opts: &NodeBalancerCreateOptions) -> Result<NodeBalancer, LinodeError>;
    async fn update_nodebalancer(&self, id: u64, opts: &NodeBalancerUpdateOptions) -> Result<NodeBalancer, LinodeError>;
    async fn delete_nodebalancer(&self, id: u64) -> Result<(), LinodeError>;

    // NodeBalancer Config Operations
    async fn list_nodebalancer_configs(&self, nodebalancer_id: u64) -> Result<Vec<NodeBalancerConfig>, LinodeError>;
    async fn create_nodebalancer_config(&self, nodebalancer_id: u64, opts: &NodeBalancerConfigOptions) -> Result<NodeBalancerConfig, LinodeError>;
    async fn rebuild_nodebalancer_config(&self, nodebalancer_id: u64, config_id: u64, opts: &NodeBalancerConfigOptions) -> Result<NodeBalancerConfig, LinodeError>;
    async fn delete_nodebalancer_config(&self, nodebalancer_id: u64, config_id: u64) -> Result<(), LinodeError>;
    async fn list_nodebalancer_nodes(&self, nodebalancer_id: u64, config_id: u64) -> Result<Vec<NodeBalancerNode>, LinodeError>;

    // Firewall Operations
    async fn list_nodebalancer_firewalls(&self, nodebalancer_id: u64) -> Result<Vec<Firewall>, LinodeError>;
    async fn get_firewall(&self, id: u64) -> Result<Firewall, LinodeError>;
    async fn create_firewall(&self, opts: &FirewallCreateOptions) -> Result<Firewall, LinodeError>;
    async fn delete_firewall(&self, id: u64) -> Result<(), LinodeError>;
    async fn update_firewall_rules(&self, id: u64, rules: &FirewallRuleSet) -> Result<FirewallRuleSet, LinodeError>;
    async fn list_firewall_devices(&self, firewall_id: u64) -> Result<Vec<FirewallDevice>, LinodeError>;
    async fn create_firewall_device(&self, firewall_id: u64, opts: &FirewallDeviceCreateOptions) -> Result<FirewallDevice, LinodeError>;
    async fn delete_firewall_device(&self, firewall_id: u64, device_id: u64) -> Result<(), LinodeError>;
}
