//! Annotation and label keys understood by the controller.

/// Prefix shared by every Service annotation
pub const PREFIX: &str = "service.beta.kubernetes.io/linode-loadbalancer-";

pub const DEFAULT_PROTOCOL: &str = "service.beta.kubernetes.io/linode-loadbalancer-default-protocol";
pub const DEFAULT_PROXY_PROTOCOL: &str =
    "service.beta.kubernetes.io/linode-loadbalancer-default-proxy-protocol";
/// Per-port JSON annotation prefix, completed with the port number
pub const PORT_CONFIG_PREFIX: &str = "service.beta.kubernetes.io/linode-loadbalancer-port-";

pub const CHECK_TYPE: &str = "service.beta.kubernetes.io/linode-loadbalancer-check-type";
pub const CHECK_PATH: &str = "service.beta.kubernetes.io/linode-loadbalancer-check-path";
pub const CHECK_BODY: &str = "service.beta.kubernetes.io/linode-loadbalancer-check-body";
pub const CHECK_INTERVAL: &str = "service.beta.kubernetes.io/linode-loadbalancer-check-interval";
pub const CHECK_TIMEOUT: &str = "service.beta.kubernetes.io/linode-loadbalancer-check-timeout";
pub const CHECK_ATTEMPTS: &str = "service.beta.kubernetes.io/linode-loadbalancer-check-attempts";
pub const CHECK_PASSIVE: &str = "service.beta.kubernetes.io/linode-loadbalancer-check-passive";

pub const THROTTLE: &str = "service.beta.kubernetes.io/linode-loadbalancer-throttle";
pub const TAGS: &str = "service.beta.kubernetes.io/linode-loadbalancer-tags";
pub const NODEBALANCER_ID: &str = "service.beta.kubernetes.io/linode-loadbalancer-nodebalancer-id";
pub const FIREWALL_ID: &str = "service.beta.kubernetes.io/linode-loadbalancer-firewall-id";
pub const FIREWALL_ACL: &str = "service.beta.kubernetes.io/linode-loadbalancer-firewall-acl";
pub const PRESERVE: &str = "service.beta.kubernetes.io/linode-loadbalancer-preserve";
pub const HOSTNAME_ONLY_INGRESS: &str =
    "service.beta.kubernetes.io/linode-loadbalancer-hostname-only-ingress";

// Deprecated, still honoured below the per-port and default annotations
pub const DEPRECATED_PROTOCOL: &str = "service.beta.kubernetes.io/linode-loadbalancer-protocol";
pub const DEPRECATED_TLS: &str = "service.beta.kubernetes.io/linode-loadbalancer-tls";

/// Node annotation overriding the backend address
pub const NODE_PRIVATE_IP: &str = "node.k8s.linode.com/private-ip";

/// Finalizer held on LoadBalancer Services until the NodeBalancer is cleaned up
pub const LOAD_BALANCER_CLEANUP_FINALIZER: &str = "service.kubernetes.io/load-balancer-cleanup";

/// Nodes carrying this label are never registered as backends
pub const EXCLUDE_FROM_LOAD_BALANCERS_LABEL: &str =
    "node.kubernetes.io/exclude-from-external-load-balancers";

pub const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";
pub const REGION_LABEL: &str = "topology.kubernetes.io/region";
pub const SHUTDOWN_TAINT: &str = "node.cloudprovider.kubernetes.io/shutdown";

/// Build the per-port annotation key for `port`
pub fn port_config_key(port: i32) -> String {
    format!("{}{}", PORT_CONFIG_PREFIX, port)
}
