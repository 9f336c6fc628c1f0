//! Mock LinodeClient for unit testing
//!
//! This module provides a mock implementation of LinodeClientTrait that can be used
//! in unit tests without talking to the Linode API.
//!
//! The mock is organized into domain-specific modules:
//! - `instances.rs` - Linode instances
//! - `nodebalancers.rs` - NodeBalancers, their configs and backend nodes
//! - `firewalls.rs` - Cloud Firewalls and firewall devices
//!
//! Every call is recorded as a [`RecordedRequest`] so tests can assert on the
//! exact API traffic a reconcile produced.

mod firewalls;
mod instances;
mod nodebalancers;

use crate::common::filter::ListFilter;
use crate::error::LinodeError;
use crate::linode_trait::LinodeClientTrait;
use crate::models::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A single API call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
}

impl RecordedRequest {
    /// True for POST, PUT and DELETE
    pub fn is_mutating(&self) -> bool {
        self.method != "GET"
    }
}

/// Certificate and key last written to a config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenTls {
    pub ssl_cert: Option<String>,
    pub ssl_key: Option<String>,
}

/// Attachment of a firewall to an entity, keyed by device id in the store
#[derive(Debug, Clone)]
pub(crate) struct DeviceRecord {
    pub(crate) firewall_id: u64,
    pub(crate) device: FirewallDevice,
}

/// Mock LinodeClient for testing
///
/// This mock stores resources in memory and mirrors the API's behaviour closely
/// enough for reconcile tests (ids, 404s, config rebuilds, firewall devices).
#[derive(Debug, Clone)]
pub struct MockLinodeClient {
    pub(crate) base_url: String,
    // In-memory storage for resources
    pub(crate) instances: Arc<Mutex<HashMap<u64, Instance>>>,
    pub(crate) nodebalancers: Arc<Mutex<HashMap<u64, NodeBalancer>>>,
    pub(crate) configs: Arc<Mutex<HashMap<u64, NodeBalancerConfig>>>,
    pub(crate) nodes: Arc<Mutex<HashMap<u64, NodeBalancerNode>>>,
    // TLS material as written, keyed by config id (reads are redacted)
    pub(crate) written_tls: Arc<Mutex<HashMap<u64, WrittenTls>>>,
    pub(crate) firewalls: Arc<Mutex<HashMap<u64, Firewall>>>,
    pub(crate) devices: Arc<Mutex<HashMap<u64, DeviceRecord>>>,
    // Request log
    pub(crate) requests: Arc<Mutex<Vec<RecordedRequest>>>,
    pub(crate) list_filters: Arc<Mutex<Vec<ListFilter>>>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

/// Lock a store, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockLinodeClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            instances: Arc::new(Mutex::new(HashMap::new())),
            nodebalancers: Arc::new(Mutex::new(HashMap::new())),
            configs: Arc::new(Mutex::new(HashMap::new())),
            nodes: Arc::new(Mutex::new(HashMap::new())),
            written_tls: Arc::new(Mutex::new(HashMap::new())),
            firewalls: Arc::new(Mutex::new(HashMap::new())),
            devices: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            list_filters: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add an instance to the mock (test setup, not recorded)
    pub fn add_instance(&self, instance: Instance) {
        lock(&self.instances).insert(instance.id, instance);
    }

    /// All requests served so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Requests that changed remote state (POST, PUT, DELETE)
    pub fn mutating_requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.is_mutating())
            .cloned()
            .collect()
    }

    /// `X-Filter` documents sent with list requests, in order
    pub fn list_filters(&self) -> Vec<ListFilter> {
        lock(&self.list_filters).clone()
    }

    /// Forget all recorded requests and filters
    pub fn reset_requests(&self) {
        lock(&self.requests).clear();
        lock(&self.list_filters).clear();
    }

    /// Whether a request with this method and path was served
    pub fn did_request_occur(&self, method: &str, path: &str) -> bool {
        lock(&self.requests)
            .iter()
            .any(|r| r.method == method && r.path == path)
    }

    /// Certificate and key as last sent for a config.
    /// The config itself only exposes the redacted values, like the API.
    pub fn written_tls(&self, config_id: u64) -> Option<WrittenTls> {
        lock(&self.written_tls).get(&config_id).cloned()
    }

    /// Number of requests whose path mentions `fragment`
    pub fn requests_touching(&self, fragment: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.path.contains(fragment))
            .count()
    }

    pub(crate) fn record_filter(&self, filter: Option<&ListFilter>) {
        if let Some(filter) = filter {
            lock(&self.list_filters).push(filter.clone());
        }
    }

    pub(crate) fn record(&self, method: &'static str, path: impl Into<String>) {
        lock(&self.requests).push(RecordedRequest {
            method,
            path: path.into(),
        });
    }

    pub(crate) fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        current
    }
}

/// Apply a list filter to serializable resources
pub(crate) fn filter_resources<T: serde::Serialize + Clone>(
    resources: impl Iterator<Item = T>,
    filter: Option<&ListFilter>,
) -> Result<Vec<T>, LinodeError> {
    let mut out = Vec::new();
    for resource in resources {
        let keep = match filter {
            Some(f) => f.matches(&serde_json::to_value(&resource)?),
            None => true,
        };
        if keep {
            out.push(resource);
        }
    }
    Ok(out)
}

#[async_trait::async_trait]
impl LinodeClientTrait for MockLinodeClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), LinodeError> {
        self.record("GET", "/profile");
        Ok(())
    }

    // Instance Operations
    async fn list_instances(&self, filter: Option<&ListFilter>) -> Result<Vec<Instance>, LinodeError> {
        instances::list_instances(self, filter).await
    }

    async fn get_instance(&self, id: u64) -> Result<Instance, LinodeError> {
        instances::get_instance(self, id).await
    }

    // NodeBalancer Operations
    async fn list_nodebalancers(&self, filter: Option<&ListFilter>) -> Result<Vec<NodeBalancer>, LinodeError> {
        nodebalancers::list_nodebalancers(self, filter).await
    }

    async fn get_nodebalancer(&self, id: u64) -> Result<NodeBalancer, LinodeError> {
        nodebalancers::get_nodebalancer(self, id).await
    }

    async fn create_nodebalancer(&self, opts: &NodeBalancerCreateOptions) -> Result<NodeBalancer, LinodeError> {
        nodebalancers::create_nodebalancer(self, opts).await
    }

    async fn update_nodebalancer(&self, id: u64, opts: &NodeBalancerUpdateOptions) -> Result<NodeBalancer, LinodeError> {
        nodebalancers::update_nodebalancer(self, id, opts).await
    }

    async fn delete_nodebalancer(&self, id: u64) -> Result<(), LinodeError> {
        nodebalancers::delete_nodebalancer(self, id).await
    }

    // NodeBalancer Config Operations
    async fn list_nodebalancer_configs(&self, nodebalancer_id: u64) -> Result<Vec<NodeBalancerConfig>, LinodeError> {
        nodebalancers::list_configs(self, nodebalancer_id).await
    }

    async fn create_nodebalancer_config(&self, nodebalancer_id: u64, opts: &NodeBalancerConfigOptions) -> Result<NodeBalancerConfig, LinodeError> {
        nodebalancers::create_config(self, nodebalancer_id, opts).await
    }

    async fn rebuild_nodebalancer_config(&self, nodebalancer_id: u64, config_id: u64, opts: &NodeBalancerConfigOptions) -> Result<NodeBalancerConfig, LinodeError> {
        nodebalancers::rebuild_config(self, nodebalancer_id, config_id, opts).await
    }

    async fn delete_nodebalancer_config(&self, nodebalancer_id: u64, config_id: u64) -> Result<(), LinodeError> {
        nodebalancers::delete_config(self, nodebalancer_id, config_id).await
    }

    async fn list_nodebalancer_nodes(&self, nodebalancer_id: u64, config_id: u64) -> Result<Vec<NodeBalancerNode>, LinodeError> {
        nodebalancers::list_nodes(self, nodebalancer_id, config_id).await
    }

    // Firewall Operations
    async fn list_nodebalancer_firewalls(&self, nodebalancer_id: u64) -> Result<Vec<Firewall>, LinodeError> {
        firewalls::list_nodebalancer_firewalls(self, nodebalancer_id).await
    }

    async fn get_firewall(&self, id: u64) -> Result<Firewall, LinodeError> {
        firewalls::get_firewall(self, id).await
    }

    async fn create_firewall(&self, opts: &FirewallCreateOptions) -> Result<Firewall, LinodeError> {
        firewalls::create_firewall(self, opts).await
    }

    async fn delete_firewall(&self, id: u64) -> Result<(), LinodeError> {
        firewalls::delete_firewall(self, id).await
    }

    async fn update_firewall_rules(&self, id: u64, rules: &FirewallRuleSet) -> Result<FirewallRuleSet, LinodeError> {
        firewalls::update_firewall_rules(self, id, rules).await
    }

    async fn list_firewall_devices(&self, firewall_id: u64) -> Result<Vec<FirewallDevice>, LinodeError> {
        firewalls::list_firewall_devices(self, firewall_id).await
    }

    async fn create_firewall_device(&self, firewall_id: u64, opts: &FirewallDeviceCreateOptions) -> Result<FirewallDevice, LinodeError> {
        firewalls::create_firewall_device(self, firewall_id, opts).await
    }

    async fn delete_firewall_device(&self, firewall_id: u64, device_id: u64) -> Result<(), LinodeError> {
        firewalls::delete_firewall_device(self, firewall_id, device_id).await
    }
}
