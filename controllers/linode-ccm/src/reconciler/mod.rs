//! Reconciliation of Kubernetes objects against Linode.
//!
//! - `service`: LoadBalancer Services to NodeBalancers (finalizer and status)
//! - `node`: Nodes to instance metadata (provider ID, labels, shutdown taint)

pub mod node;
pub mod service;

use crate::backoff::FibonacciBackoff;
use crate::instances::Instances;
use crate::loadbalancers::LoadBalancers;
use kube::{Client, Resource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// Periodic resync for healthy objects
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(15, 600), // 15 seconds min, 10 minutes max
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count += 1;
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Backoff state per object key (namespace/name or name)
#[derive(Debug, Default)]
struct BackoffStates {
    states: Mutex<HashMap<String, BackoffState>>,
}

impl BackoffStates {
    fn next_backoff(&self, resource_key: &str) -> (u64, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                let backoff_seconds = state.backoff.next_backoff_seconds();
                (backoff_seconds, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (60, 0)
            }
        }
    }

    fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(BackoffState::new)
                .increment_error();
        }
    }

    fn reset(&self, resource_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }

    fn remove(&self, resource_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(resource_key);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.states.lock().map(|states| states.len()).unwrap_or_default()
    }
}

/// Reconciles Services and Nodes.
pub struct Reconciler {
    pub(crate) kube_client: Client,
    pub(crate) load_balancers: LoadBalancers,
    pub(crate) instances: Instances,
    backoff_states: Arc<BackoffStates>,
}

impl Reconciler {
    /// Creates a new reconciler.
    pub fn new(kube_client: Client, load_balancers: LoadBalancers, instances: Instances) -> Self {
        Self {
            kube_client,
            load_balancers,
            instances,
            backoff_states: Arc::new(BackoffStates::default()),
        }
    }

    /// Get the Fibonacci backoff for an object based on its error count
    ///
    /// Returns (backoff_seconds, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (u64, u32) {
        self.backoff_states.next_backoff(resource_key)
    }

    /// Increment error count for an object
    pub fn increment_error(&self, resource_key: &str) {
        self.backoff_states.increment_error(resource_key);
    }

    /// Reset error count for an object (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        self.backoff_states.reset(resource_key);
    }

    /// Drop all backoff state for an object that is gone or no longer managed
    pub fn forget_resource(&self, resource_key: &str) {
        self.backoff_states.remove(resource_key);
    }
}

/// Key used for backoff tracking: `namespace/name`, or just the name for
/// cluster-scoped objects.
pub fn object_key<K: Resource>(obj: &K) -> String {
    let meta = obj.meta();
    let name = meta.name.as_deref().unwrap_or_default();
    match meta.namespace.as_deref() {
        Some(ns) => format!("{}/{}", ns, name),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_node, create_test_service};

    #[test]
    fn test_object_key() {
        let service = create_test_service("web", "shop", "uid-1", &[80], &[]);
        assert_eq!(object_key(&service), "shop/web");

        let node = create_test_node("worker-1", Some("10.0.0.1"), None);
        assert_eq!(object_key(&node), "worker-1");
    }

    #[test]
    fn test_backoff_state() {
        let mut state = BackoffState::new();
        assert_eq!(state.backoff.next_backoff_seconds(), 15);
        assert_eq!(state.backoff.next_backoff_seconds(), 15);
        assert_eq!(state.backoff.next_backoff_seconds(), 30);
        state.increment_error();
        state.increment_error();
        assert_eq!(state.error_count, 2);

        state.reset();
        assert_eq!(state.error_count, 0);
        assert_eq!(state.backoff.next_backoff_seconds(), 15);
    }

    #[test]
    fn test_backoff_states_forget_removed_objects() {
        let states = BackoffStates::default();
        states.increment_error("shop/web");
        states.increment_error("worker-1");
        assert_eq!(states.next_backoff("shop/web"), (15, 1));
        assert_eq!(states.tracked(), 2);

        states.reset("shop/web");
        assert_eq!(states.tracked(), 2);

        states.remove("shop/web");
        states.remove("worker-1");
        assert_eq!(states.tracked(), 0);

        // A returning object starts from a fresh backoff
        states.increment_error("shop/web");
        assert_eq!(states.next_backoff("shop/web"), (15, 1));
    }
}
