//! Linode API client
//!
//! Implements the Linode API v4 operations needed to run NodeBalancers,
//! Cloud Firewalls and instance lookups.
//! Based on the Linode API structure: /v4/nodebalancers, /v4/networking/firewalls, /v4/linode/instances

use crate::common::HttpClient;
use crate::common::filter::ListFilter;
use crate::error::LinodeError;
use crate::linode_trait::LinodeClientTrait;
use crate::models::*;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default Linode API endpoint
pub const DEFAULT_API_URL: &str = "https://api.linode.com/v4";

/// Linode API client
#[derive(Debug)]
pub struct LinodeClient {
    http: HttpClient,
}

impl LinodeClient {
    /// Create a new Linode client
    ///
    /// # Arguments
    /// * `base_url` - Linode API base URL (e.g., "https://api.linode.com/v4")
    /// * `token` - Personal access token for authentication
    pub fn new(base_url: String, token: String) -> Result<Self, LinodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("linode-ccm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(LinodeError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the API token by making a simple authenticated request.
    ///
    /// Uses the profile endpoint, which every valid token can read.
    ///
    /// # Returns
    /// * `Ok(())` - Token is valid and the API is reachable
    /// * `Err(LinodeError)` - Token is invalid or the API is unreachable
    pub async fn validate_token(&self) -> Result<(), LinodeError> {
        debug!("Validating Linode token and connectivity");
        let profile: Profile = self.http.get("/profile").await.map_err(|e| match e {
            LinodeError::Authentication(msg) => {
                LinodeError::Authentication(format!("Invalid token: {}", msg))
            }
            other => other,
        })?;
        debug!("Token validated successfully for user {}", profile.username);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// List instances, optionally narrowed by an `X-Filter`
    pub async fn list_instances(
        &self,
        filter: Option<&ListFilter>,
    ) -> Result<Vec<Instance>, LinodeError> {
        self.http.fetch_all_pages("/linode/instances", filter).await
    }

    /// Get an instance by ID
    pub async fn get_instance(&self, id: u64) -> Result<Instance, LinodeError> {
        self.http
            .get(&format!("/linode/instances/{}", id))
            .await
            .map_err(|e| not_found_as(e, format!("Instance {} not found", id)))
    }

    // ------------------------------------------------------------------
    // NodeBalancers
    // ------------------------------------------------------------------

    /// List NodeBalancers, optionally narrowed by an `X-Filter`
    pub async fn list_nodebalancers(
        &self,
        filter: Option<&ListFilter>,
    ) -> Result<Vec<NodeBalancer>, LinodeError> {
        self.http.fetch_all_pages("/nodebalancers", filter).await
    }

    /// Get a NodeBalancer by ID
    pub async fn get_nodebalancer(&self, id: u64) -> Result<NodeBalancer, LinodeError> {
        self.http
            .get(&format!("/nodebalancers/{}", id))
            .await
            .map_err(|e| not_found_as(e, format!("NodeBalancer {} not found", id)))
    }

    /// Create a NodeBalancer, including its initial configs and their nodes
    pub async fn create_nodebalancer(
        &self,
        opts: &NodeBalancerCreateOptions,
    ) -> Result<NodeBalancer, LinodeError> {
        self.http.post("/nodebalancers", opts).await
    }

    /// Update label, throttle or tags of a NodeBalancer
    pub async fn update_nodebalancer(
        &self,
        id: u64,
        opts: &NodeBalancerUpdateOptions,
    ) -> Result<NodeBalancer, LinodeError> {
        self.http.put(&format!("/nodebalancers/{}", id), opts).await
    }

    /// Delete a NodeBalancer
    pub async fn delete_nodebalancer(&self, id: u64) -> Result<(), LinodeError> {
        self.http.delete(&format!("/nodebalancers/{}", id)).await
    }

    /// List the configs (listener ports) of a NodeBalancer
    pub async fn list_nodebalancer_configs(
        &self,
        nodebalancer_id: u64,
    ) -> Result<Vec<NodeBalancerConfig>, LinodeError> {
        self.http
            .fetch_all_pages(&format!("/nodebalancers/{}/configs", nodebalancer_id), None)
            .await
    }

    /// Create a config on a NodeBalancer
    pub async fn create_nodebalancer_config(
        &self,
        nodebalancer_id: u64,
        opts: &NodeBalancerConfigOptions,
    ) -> Result<NodeBalancerConfig, LinodeError> {
        self.http
            .post(&format!("/nodebalancers/{}/configs", nodebalancer_id), opts)
            .await
    }

    /// Rebuild a config in place, replacing its settings and backend nodes
    pub async fn rebuild_nodebalancer_config(
        &self,
        nodebalancer_id: u64,
        config_id: u64,
        opts: &NodeBalancerConfigOptions,
    ) -> Result<NodeBalancerConfig, LinodeError> {
        self.http
            .post(
                &format!(
                    "/nodebalancers/{}/configs/{}/rebuild",
                    nodebalancer_id, config_id
                ),
                opts,
            )
            .await
    }

    /// Delete a config from a NodeBalancer
    pub async fn delete_nodebalancer_config(
        &self,
        nodebalancer_id: u64,
        config_id: u64,
    ) -> Result<(), LinodeError> {
        self.http
            .delete(&format!(
                "/nodebalancers/{}/configs/{}",
                nodebalancer_id, config_id
            ))
            .await
    }

    /// List the backend nodes of a config
    pub async fn list_nodebalancer_nodes(
        &self,
        nodebalancer_id: u64,
        config_id: u64,
    ) -> Result<Vec<NodeBalancerNode>, LinodeError> {
        self.http
            .fetch_all_pages(
                &format!(
                    "/nodebalancers/{}/configs/{}/nodes",
                    nodebalancer_id, config_id
                ),
                None,
            )
            .await
    }

    // ------------------------------------------------------------------
    // Firewalls
    // ------------------------------------------------------------------

    /// List the firewalls attached to a NodeBalancer
    pub async fn list_nodebalancer_firewalls(
        &self,
        nodebalancer_id: u64,
    ) -> Result<Vec<Firewall>, LinodeError> {
        self.http
            .fetch_all_pages(&format!("/nodebalancers/{}/firewalls", nodebalancer_id), None)
            .await
    }

    /// Get a firewall by ID
    pub async fn get_firewall(&self, id: u64) -> Result<Firewall, LinodeError> {
        self.http
            .get(&format!("/networking/firewalls/{}", id))
            .await
            .map_err(|e| not_found_as(e, format!("Firewall {} not found", id)))
    }

    /// Create a firewall
    pub async fn create_firewall(&self, opts: &FirewallCreateOptions) -> Result<Firewall, LinodeError> {
        self.http.post("/networking/firewalls", opts).await
    }

    /// Delete a firewall
    pub async fn delete_firewall(&self, id: u64) -> Result<(), LinodeError> {
        self.http
            .delete(&format!("/networking/firewalls/{}", id))
            .await
    }

    /// Replace the rules of a firewall
    pub async fn update_firewall_rules(
        &self,
        id: u64,
        rules: &FirewallRuleSet,
    ) -> Result<FirewallRuleSet, LinodeError> {
        self.http
            .put(&format!("/networking/firewalls/{}/rules", id), rules)
            .await
    }

    /// List the devices a firewall is attached to
    pub async fn list_firewall_devices(
        &self,
        firewall_id: u64,
    ) -> Result<Vec<FirewallDevice>, LinodeError> {
        self.http
            .fetch_all_pages(&format!("/networking/firewalls/{}/devices", firewall_id), None)
            .await
    }

    /// Attach a firewall to an entity
    pub async fn create_firewall_device(
        &self,
        firewall_id: u64,
        opts: &FirewallDeviceCreateOptions,
    ) -> Result<FirewallDevice, LinodeError> {
        self.http
            .post(&format!("/networking/firewalls/{}/devices", firewall_id), opts)
            .await
    }

    /// Detach a firewall from an entity
    pub async fn delete_firewall_device(
        &self,
        firewall_id: u64,
        device_id: u64,
    ) -> Result<(), LinodeError> {
        self.http
            .delete(&format!(
                "/networking/firewalls/{}/devices/{}",
                firewall_id, device_id
            ))
            .await
    }
}

/// Replace the generic 404 message with a resource-specific one
fn not_found_as(err: LinodeError, message: String) -> LinodeError {
    match err {
        LinodeError::NotFound(_) => LinodeError::NotFound(message),
        other => other,
    }
}

#[async_trait::async_trait]
impl LinodeClientTrait for LinodeClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn validate_token(&self) -> Result<(), LinodeError> {
        self.validate_token().await
    }

    // Instance Operations
    async fn list_instances(&self, filter: Option<&ListFilter>) -> Result<Vec<Instance>, LinodeError> {
        self.list_instances(filter).await
    }

    async fn get_instance(&self, id: u64) -> Result<Instance, LinodeError> {
        self.get_instance(id).await
    }

    // NodeBalancer Operations
    async fn list_nodebalancers(&self, filter: Option<&ListFilter>) -> Result<Vec<NodeBalancer>, LinodeError> {
        self.list_nodebalancers(filter).await
    }

    async fn get_nodebalancer(&self, id: u64) -> Result<NodeBalancer, LinodeError> {
        self.get_nodebalancer(id).await
    }

    async fn create_nodebalancer(&self, opts: &NodeBalancerCreateOptions) -> Result<NodeBalancer, LinodeError> {
        self.create_nodebalancer(opts).await
    }

    async fn update_nodebalancer(&self, id: u64, opts: &NodeBalancerUpdateOptions) -> Result<NodeBalancer, LinodeError> {
        self.update_nodebalancer(id, opts).await
    }

    async fn delete_nodebalancer(&self, id: u64) -> Result<(), LinodeError> {
        self.delete_nodebalancer(id).await
    }

    // NodeBalancer Config Operations
    async fn list_nodebalancer_configs(&self, nodebalancer_id: u64) -> Result<Vec<NodeBalancerConfig>, LinodeError> {
        self.list_nodebalancer_configs(nodebalancer_id).await
    }

    async fn create_nodebalancer_config(&self, nodebalancer_id: u64, opts: &NodeBalancerConfigOptions) -> Result<NodeBalancerConfig, LinodeError> {
        self.create_nodebalancer_config(nodebalancer_id, opts).await
    }

    async fn rebuild_nodebalancer_config(&self, nodebalancer_id: u64, config_id: u64, opts: &NodeBalancerConfigOptions) -> Result<NodeBalancerConfig, LinodeError> {
        self.rebuild_nodebalancer_config(nodebalancer_id, config_id, opts).await
    }

    async fn delete_nodebalancer_config(&self, nodebalancer_id: u64, config_id: u64) -> Result<(), LinodeError> {
        self.delete_nodebalancer_config(nodebalancer_id, config_id).await
    }

    async fn list_nodebalancer_nodes(&self, nodebalancer_id: u64, config_id: u64) -> Result<Vec<NodeBalancerNode>, LinodeError> {
        self.list_nodebalancer_nodes(nodebalancer_id, config_id).await
    }

    // Firewall Operations
    async fn list_nodebalancer_firewalls(&self, nodebalancer_id: u64) -> Result<Vec<Firewall>, LinodeError> {
        self.list_nodebalancer_firewalls(nodebalancer_id).await
    }

    async fn get_firewall(&self, id: u64) -> Result<Firewall, LinodeError> {
        self.get_firewall(id).await
    }

    async fn create_firewall(&self, opts: &FirewallCreateOptions) -> Result<Firewall, LinodeError> {
        self.create_firewall(opts).await
    }

    async fn delete_firewall(&self, id: u64) -> Result<(), LinodeError> {
        self.delete_firewall(id).await
    }

    async fn update_firewall_rules(&self, id: u64, rules: &FirewallRuleSet) -> Result<FirewallRuleSet, LinodeError> {
        self.update_firewall_rules(id, rules).await
    }

    async fn list_firewall_devices(&self, firewall_id: u64) -> Result<Vec<FirewallDevice>, LinodeError> {
        self.list_firewall_devices(firewall_id).await
    }

    async fn create_firewall_device(&self, firewall_id: u64, opts: &FirewallDeviceCreateOptions) -> Result<FirewallDevice, LinodeError> {
        self.create_firewall_device(firewall_id, opts).await
    }

    async fn delete_firewall_device(&self, firewall_id: u64, device_id: u64) -> Result<(), LinodeError> {
        self.delete_firewall_device(firewall_id, device_id).await
    }
}
