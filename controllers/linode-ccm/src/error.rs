//! Controller-specific error types.
//!
//! This module defines error types specific to the Linode cloud controller
//! manager that are not covered by upstream library errors.

use kube::Error as KubeError;
use linode_client::LinodeError;
use thiserror::Error;

/// Errors that can occur in the Linode cloud controller manager.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Linode API error
    #[error("Linode error: {0}")]
    Linode(#[from] LinodeError),

    /// Rebuilding a port config failed; the Linode error keeps its variant
    #[error("[port {port}] Error rebuilding NodeBalancer config: {source}")]
    ConfigRebuild {
        /// Listener port of the config
        port: u16,
        /// Underlying Linode API error
        #[source]
        source: LinodeError,
    },

    /// Invalid configuration (environment or Service annotation)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Firewall annotations do not describe exactly one ACL list
    #[error("Invalid firewall configuration: {0}")]
    InvalidFirewallConfig(String),

    /// The NodeBalancer referenced by a Service annotation no longer exists
    #[error("load balancer for service ({service}) with id {id} was not found")]
    NodeBalancerNotFound {
        /// Service namespace/name
        service: String,
        /// NodeBalancer id taken from the annotation
        id: u64,
    },

    /// Ensure/Update was called without backends
    #[error("no nodes available for NodeBalancer backends of service {0}")]
    NoNodesAvailable(String),

    /// No Linode instance matches the node
    #[error("instance not found for node {0}")]
    InstanceNotFound(String),

    /// The node's provider ID is not of the form linode://<id>
    #[error("invalid provider id: {0}")]
    InvalidProviderId(String),

    /// The instance has no IPv4 addresses
    #[error("instance {0} has no IP addresses")]
    NoIpAddresses(u64),

    /// The node reports no addresses to match against instances
    #[error("no IP address found on node {0}")]
    NoNodeAddress(String),

    /// Referenced TLS secret does not exist
    #[error("secret not found: {0}")]
    SecretNotFound(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Short label for logs and requeue decisions
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Kube(_) => "kubernetes",
            Self::Linode(e) | Self::ConfigRebuild { source: e, .. } if e.is_not_found() => {
                "not-found"
            }
            Self::Linode(_) | Self::ConfigRebuild { .. } => "linode",
            Self::InvalidConfig(_) | Self::InvalidFirewallConfig(_) => "configuration",
            Self::NodeBalancerNotFound { .. } => "stale-reference",
            Self::NoNodesAvailable(_) => "precondition",
            Self::InstanceNotFound(_)
            | Self::InvalidProviderId(_)
            | Self::NoIpAddresses(_)
            | Self::NoNodeAddress(_) => "instance",
            Self::SecretNotFound(_) => "secret",
            Self::Watch(_) => "watch",
        }
    }

    /// The Linode API error behind this one, if any
    pub fn linode_error(&self) -> Option<&LinodeError> {
        match self {
            Self::Linode(e) | Self::ConfigRebuild { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// True when the Linode API reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        self.linode_error().is_some_and(LinodeError::is_not_found)
    }
}
