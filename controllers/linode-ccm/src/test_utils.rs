//! Test utilities for unit testing reconcilers
//!
//! Builders for Services, Nodes, Secrets and instances, plus a static TLS
//! resolver and a `LoadBalancers` wired to `MockLinodeClient`.

use crate::error::ControllerError;
use crate::loadbalancers::LoadBalancers;
use crate::tls::{TlsMaterial, TlsResolver, tls_material_from_secret};
use async_trait::async_trait;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::{
    LoadBalancerIngress, LoadBalancerStatus, Node, NodeAddress, NodeStatus, Secret, Service,
    ServicePort, ServiceSpec, ServiceStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use linode_client::{Instance, InstanceStatus, MockLinodeClient};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const TEST_REGION: &str = "us-east";
pub const TEST_CLUSTER: &str = "kubernetes";

/// Node port assigned to a Service port in tests
pub fn test_node_port(port: i32) -> i32 {
    30000 + port
}

/// Helper to create a LoadBalancer Service with TCP ports
pub fn create_test_service(
    name: &str,
    namespace: &str,
    uid: &str,
    ports: &[i32],
    annotations: &[(&str, &str)],
) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(uid.to_string()),
            annotations: (!annotations.is_empty()).then(|| {
                annotations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>()
            }),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("LoadBalancer".to_string()),
            ports: Some(
                ports
                    .iter()
                    .map(|port| ServicePort {
                        name: Some(format!("port-{}", port)),
                        port: *port,
                        node_port: Some(test_node_port(*port)),
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        status: None,
    }
}

/// Set or replace a Service annotation
pub fn set_annotation(service: &mut Service, key: &str, value: &str) {
    service
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), value.to_string());
}

/// Remove a Service annotation
pub fn remove_annotation(service: &mut Service, key: &str) {
    if let Some(annotations) = service.metadata.annotations.as_mut() {
        annotations.remove(key);
    }
}

/// Record a load balancer status on the Service, as the controller would
pub fn set_status(service: &mut Service, status: LoadBalancerStatus) {
    service.status = Some(ServiceStatus {
        load_balancer: Some(status),
        ..Default::default()
    });
}

/// Status naming only a hostname
pub fn hostname_status(hostname: &str) -> LoadBalancerStatus {
    LoadBalancerStatus {
        ingress: Some(vec![LoadBalancerIngress {
            hostname: Some(hostname.to_string()),
            ..Default::default()
        }]),
    }
}

/// Helper to create a Node with optional internal and external addresses
pub fn create_test_node(name: &str, internal_ip: Option<&str>, external_ip: Option<&str>) -> Node {
    let mut addresses = Vec::new();
    if let Some(ip) = internal_ip {
        addresses.push(NodeAddress {
            type_: "InternalIP".to_string(),
            address: ip.to_string(),
        });
    }
    if let Some(ip) = external_ip {
        addresses.push(NodeAddress {
            type_: "ExternalIP".to_string(),
            address: ip.to_string(),
        });
    }

    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: None,
        status: Some(NodeStatus {
            addresses: Some(addresses),
            ..Default::default()
        }),
    }
}

/// Helper to create a `kubernetes.io/tls` Secret
pub fn create_test_tls_secret(namespace: &str, name: &str, cert: &str, key: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some("kubernetes.io/tls".to_string()),
        data: Some(BTreeMap::from([
            ("tls.crt".to_string(), ByteString(cert.as_bytes().to_vec())),
            ("tls.key".to_string(), ByteString(key.as_bytes().to_vec())),
        ])),
        ..Default::default()
    }
}

/// Helper to create a Linode instance
pub fn create_test_instance(id: u64, label: &str, ips: &[&str], status: InstanceStatus) -> Instance {
    Instance {
        id,
        label: label.to_string(),
        region: TEST_REGION.to_string(),
        instance_type: Some("g6-standard-2".to_string()),
        status,
        ipv4: ips.iter().filter_map(|ip| ip.parse().ok()).collect(),
        ipv6: None,
        tags: Vec::new(),
    }
}

/// TLS resolver backed by in-memory Secrets
#[derive(Debug, Default, Clone)]
pub struct StaticTlsResolver {
    secrets: HashMap<(String, String), Secret>,
}

impl StaticTlsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, namespace: &str, name: &str, cert: &str, key: &str) -> Self {
        self.secrets.insert(
            (namespace.to_string(), name.to_string()),
            create_test_tls_secret(namespace, name, cert, key),
        );
        self
    }
}

#[async_trait]
impl TlsResolver for StaticTlsResolver {
    async fn resolve(&self, namespace: &str, secret_name: &str) -> Result<TlsMaterial, ControllerError> {
        let secret = self
            .secrets
            .get(&(namespace.to_string(), secret_name.to_string()))
            .ok_or_else(|| ControllerError::SecretNotFound(format!("{}/{}", namespace, secret_name)))?;
        tls_material_from_secret(secret)
    }
}

/// `LoadBalancers` over the mock with the test region and cluster name
pub fn create_test_load_balancers(
    mock: &MockLinodeClient,
    tls: StaticTlsResolver,
    hostname_only_default: bool,
) -> LoadBalancers {
    LoadBalancers::new(
        Arc::new(mock.clone()),
        Arc::new(tls),
        TEST_REGION,
        TEST_CLUSTER,
        hostname_only_default,
    )
}

/// Fresh mock client
pub fn create_mock_client() -> MockLinodeClient {
    MockLinodeClient::new("http://mock-linode")
}
