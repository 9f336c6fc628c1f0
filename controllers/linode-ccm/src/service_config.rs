//! Service annotations to typed NodeBalancer configuration.
//!
//! Service annotations are only read in this module. `ServiceConfig::from_service`
//! validates everything up front so a bad annotation fails the reconcile before
//! any Linode API call is made. Lookup and deletion use the narrower accessors
//! (`nodebalancer_id`, `preserve`, `hostname_only_ingress`) so an unrelated bad
//! annotation never blocks cleanup.

use crate::annotations as ann;
use crate::coerce::service_key;
use crate::error::ControllerError;
use crate::firewall::{FirewallAcl, FirewallSpec};
use k8s_openapi::api::core::v1::Service;
use linode_client::{ConfigCheck, ConfigProtocol, ProxyProtocol};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, warn};

/// Connection throttle applied when none (or garbage) is configured
pub const DEFAULT_THROTTLE: u32 = 20;
/// Upper bound accepted by the API
pub const MAX_THROTTLE: u32 = 20;

pub const DEFAULT_CHECK_INTERVAL: u32 = 5;
pub const DEFAULT_CHECK_TIMEOUT: u32 = 3;
pub const DEFAULT_CHECK_ATTEMPTS: u32 = 2;
pub const DEFAULT_CHECK_PATH: &str = "/";

/// Health check policy of a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub check: ConfigCheck,
    pub path: Option<String>,
    pub body: Option<String>,
    pub interval: u32,
    pub timeout: u32,
    pub attempts: u32,
    pub passive: bool,
}

/// Desired state of one NodeBalancer config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    pub port: u16,
    pub node_port: u16,
    pub protocol: ConfigProtocol,
    pub proxy_protocol: ProxyProtocol,
    /// Only set for https ports
    pub tls_secret_name: Option<String>,
    pub health_check: HealthCheck,
}

/// Fully validated NodeBalancer configuration for a Service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub throttle: u32,
    /// Tags from the annotation, without the cluster tag
    pub tags: Vec<String>,
    pub firewall: Option<FirewallSpec>,
    pub preserve: bool,
    pub nodebalancer_id: Option<u64>,
    pub hostname_only_ingress: bool,
    pub ports: Vec<PortConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct PortAnnotation {
    protocol: Option<String>,
    #[serde(rename = "proxy-protocol")]
    proxy_protocol: Option<String>,
    #[serde(rename = "tls-secret-name")]
    tls_secret_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeprecatedTlsEntry {
    #[serde(rename = "tls-secret-name")]
    tls_secret_name: String,
    port: i32,
}

impl ServiceConfig {
    /// Parse and validate the Service.
    ///
    /// `hostname_only_default` is the process-wide default used when the
    /// hostname-only-ingress annotation is absent or unparseable.
    pub fn from_service(service: &Service, hostname_only_default: bool) -> Result<Self, ControllerError> {
        let empty = BTreeMap::new();
        let annotations = service.metadata.annotations.as_ref().unwrap_or(&empty);
        let key = service_key(service);

        warn_unknown_annotations(&key, annotations);

        let health_check = parse_health_check(annotations)?;
        let deprecated_tls = parse_deprecated_tls(&key, annotations)?;

        let service_ports = service
            .spec
            .as_ref()
            .and_then(|spec| spec.ports.as_ref())
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut ports = Vec::with_capacity(service_ports.len());
        for sp in service_ports {
            let protocol = sp.protocol.as_deref().unwrap_or("TCP");
            if protocol.eq_ignore_ascii_case("UDP") {
                return Err(ControllerError::InvalidConfig(
                    "ports with the UDP protocol are not supported".to_string(),
                ));
            }
            if !protocol.eq_ignore_ascii_case("TCP") {
                return Err(ControllerError::InvalidConfig(format!(
                    "ports with the {} protocol are not supported",
                    protocol
                )));
            }

            let port = u16::try_from(sp.port).map_err(|_| {
                ControllerError::InvalidConfig(format!("port {} is out of range", sp.port))
            })?;
            let node_port = sp
                .node_port
                .filter(|np| *np > 0)
                .and_then(|np| u16::try_from(np).ok())
                .ok_or_else(|| {
                    ControllerError::InvalidConfig(format!(
                        "port {} of service {} has no node port assigned",
                        sp.port, key
                    ))
                })?;

            ports.push(parse_port(
                annotations,
                port,
                node_port,
                deprecated_tls.get(&sp.port).cloned(),
                health_check.clone(),
            )?);
        }

        Ok(Self {
            throttle: parse_throttle(annotations),
            tags: parse_tags(annotations),
            firewall: parse_firewall(&key, annotations)?,
            preserve: preserve(service),
            nodebalancer_id: nodebalancer_id(service)?,
            hostname_only_ingress: hostname_only_ingress(service, hostname_only_default),
            ports,
        })
    }

    /// Service ports, in declaration order
    pub fn port_numbers(&self) -> Vec<u16> {
        self.ports.iter().map(|p| p.port).collect()
    }
}

fn annotation<'a>(service: &'a Service, key: &str) -> Option<&'a String> {
    service
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(key))
}

/// NodeBalancer id pinned by annotation, if any
pub fn nodebalancer_id(service: &Service) -> Result<Option<u64>, ControllerError> {
    match service.metadata.annotations.as_ref() {
        Some(annotations) => parse_optional_id(annotations, ann::NODEBALANCER_ID),
        None => Ok(None),
    }
}

/// NodeBalancer id for lookup and deletion.
/// A malformed annotation is logged and treated as absent so status and label
/// resolution still find the NodeBalancer.
pub fn lookup_nodebalancer_id(service: &Service) -> Option<u64> {
    nodebalancer_id(service).unwrap_or_else(|e| {
        warn!("Ignoring annotation for service {}: {}", service_key(service), e);
        None
    })
}

/// Whether the NodeBalancer must survive Service deletion.
/// Anything but a recognised true value means delete.
pub fn preserve(service: &Service) -> bool {
    annotation(service, ann::PRESERVE)
        .and_then(|v| parse_bool(v))
        .unwrap_or(false)
}

/// Whether status should carry only the hostname
pub fn hostname_only_ingress(service: &Service, default: bool) -> bool {
    annotation(service, ann::HOSTNAME_ONLY_INGRESS)
        .and_then(|v| parse_bool(v))
        .unwrap_or(default)
}

/// Parse `1 t T TRUE true True` / `0 f F FALSE false False`
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn parse_enum<T: FromStr>(key: &str, value: &str, what: &str) -> Result<T, ControllerError> {
    value.to_lowercase().parse::<T>().map_err(|_| {
        ControllerError::InvalidConfig(format!(
            "invalid {} {:?} specified in annotation {}",
            what, value, key
        ))
    })
}

fn parse_port(
    annotations: &BTreeMap<String, String>,
    port: u16,
    node_port: u16,
    deprecated_tls_secret: Option<String>,
    health_check: HealthCheck,
) -> Result<PortConfig, ControllerError> {
    let port_key = ann::port_config_key(i32::from(port));
    let port_annotation: PortAnnotation = match annotations.get(&port_key) {
        Some(raw) => serde_json::from_str(raw).map_err(|e| {
            ControllerError::InvalidConfig(format!(
                "invalid JSON {:?} in annotation {}: {}",
                raw, port_key, e
            ))
        })?,
        None => PortAnnotation::default(),
    };

    // Precedence: per-port, service default, deprecated annotations, tcp
    let protocol = if let Some(value) = &port_annotation.protocol {
        parse_enum(&port_key, value, "protocol")?
    } else if let Some(value) = annotations.get(ann::DEFAULT_PROTOCOL) {
        parse_enum(ann::DEFAULT_PROTOCOL, value, "protocol")?
    } else if deprecated_tls_secret.is_some() {
        ConfigProtocol::Https
    } else if let Some(value) = annotations.get(ann::DEPRECATED_PROTOCOL) {
        parse_enum(ann::DEPRECATED_PROTOCOL, value, "protocol")?
    } else {
        ConfigProtocol::Tcp
    };

    let proxy_protocol = if let Some(value) = &port_annotation.proxy_protocol {
        parse_enum(&port_key, value, "proxy protocol")?
    } else if let Some(value) = annotations.get(ann::DEFAULT_PROXY_PROTOCOL) {
        parse_enum(ann::DEFAULT_PROXY_PROTOCOL, value, "proxy protocol")?
    } else {
        ProxyProtocol::None
    };

    let tls_secret_name = if protocol == ConfigProtocol::Https {
        let secret = port_annotation
            .tls_secret_name
            .filter(|s| !s.is_empty())
            .or(deprecated_tls_secret)
            .ok_or_else(|| {
                ControllerError::InvalidConfig(format!(
                    "TLS secret name for port {} is not specified",
                    port
                ))
            })?;
        Some(secret)
    } else {
        None
    };

    Ok(PortConfig {
        port,
        node_port,
        protocol,
        proxy_protocol,
        tls_secret_name,
        health_check,
    })
}

fn parse_health_check(annotations: &BTreeMap<String, String>) -> Result<HealthCheck, ControllerError> {
    let check = match annotations.get(ann::CHECK_TYPE) {
        Some(value) => parse_enum(ann::CHECK_TYPE, value, "health check type")?,
        None => ConfigCheck::Connection,
    };

    let parse_u32 = |key: &str, default: u32| -> Result<u32, ControllerError> {
        match annotations.get(key) {
            Some(value) => value.trim().parse::<u32>().map_err(|e| {
                ControllerError::InvalidConfig(format!(
                    "invalid value {:?} in annotation {}: {}",
                    value, key, e
                ))
            }),
            None => Ok(default),
        }
    };

    let interval = parse_u32(ann::CHECK_INTERVAL, DEFAULT_CHECK_INTERVAL)?;
    let timeout = parse_u32(ann::CHECK_TIMEOUT, DEFAULT_CHECK_TIMEOUT)?;
    let attempts = parse_u32(ann::CHECK_ATTEMPTS, DEFAULT_CHECK_ATTEMPTS)?;
    let passive = match annotations.get(ann::CHECK_PASSIVE) {
        Some(value) => parse_bool(value).ok_or_else(|| {
            ControllerError::InvalidConfig(format!(
                "invalid boolean {:?} in annotation {}",
                value, ann::CHECK_PASSIVE
            ))
        })?,
        None => true,
    };

    let (path, body) = match check {
        ConfigCheck::Http => (Some(check_path(annotations)), None),
        ConfigCheck::HttpBody => {
            let body = annotations
                .get(ann::CHECK_BODY)
                .filter(|b| !b.is_empty())
                .cloned()
                .ok_or_else(|| {
                    ControllerError::InvalidConfig(format!(
                        "for health check type http_body need body regex annotation {}",
                        ann::CHECK_BODY
                    ))
                })?;
            (Some(check_path(annotations)), Some(body))
        }
        ConfigCheck::None | ConfigCheck::Connection => (None, None),
    };

    Ok(HealthCheck {
        check,
        path,
        body,
        interval,
        timeout,
        attempts,
        passive,
    })
}

fn check_path(annotations: &BTreeMap<String, String>) -> String {
    annotations
        .get(ann::CHECK_PATH)
        .filter(|p| !p.is_empty())
        .cloned()
        .unwrap_or_else(|| DEFAULT_CHECK_PATH.to_string())
}

fn parse_throttle(annotations: &BTreeMap<String, String>) -> u32 {
    match annotations.get(ann::THROTTLE) {
        Some(value) => match value.trim().parse::<i64>() {
            Ok(n) => u32::try_from(n.clamp(0, i64::from(MAX_THROTTLE))).unwrap_or(DEFAULT_THROTTLE),
            Err(_) => DEFAULT_THROTTLE,
        },
        None => DEFAULT_THROTTLE,
    }
}

fn parse_tags(annotations: &BTreeMap<String, String>) -> Vec<String> {
    annotations
        .get(ann::TAGS)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_optional_id(
    annotations: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<u64>, ControllerError> {
    annotations
        .get(key)
        .map(|value| {
            value.trim().parse::<u64>().map_err(|e| {
                ControllerError::InvalidConfig(format!(
                    "invalid id {:?} in annotation {}: {}",
                    value, key, e
                ))
            })
        })
        .transpose()
}

fn parse_firewall(
    service: &str,
    annotations: &BTreeMap<String, String>,
) -> Result<Option<FirewallSpec>, ControllerError> {
    if let Some(id) = parse_optional_id(annotations, ann::FIREWALL_ID)? {
        if annotations.contains_key(ann::FIREWALL_ACL) {
            debug!(
                "Service {} sets both {} and {}, using the firewall id",
                service, ann::FIREWALL_ID, ann::FIREWALL_ACL
            );
        }
        return Ok(Some(FirewallSpec::Id(id)));
    }

    annotations
        .get(ann::FIREWALL_ACL)
        .map(|raw| FirewallAcl::parse(raw).map(FirewallSpec::Acl))
        .transpose()
}

fn parse_deprecated_tls(
    service: &str,
    annotations: &BTreeMap<String, String>,
) -> Result<BTreeMap<i32, String>, ControllerError> {
    let Some(raw) = annotations.get(ann::DEPRECATED_TLS) else {
        return Ok(BTreeMap::new());
    };
    warn!(
        "Service {} uses deprecated annotation {}, use {}<port> instead",
        service, ann::DEPRECATED_TLS, ann::PORT_CONFIG_PREFIX
    );

    let entries: Vec<DeprecatedTlsEntry> = serde_json::from_str(raw).map_err(|e| {
        ControllerError::InvalidConfig(format!(
            "invalid JSON {:?} in annotation {}: {}",
            raw, ann::DEPRECATED_TLS, e
        ))
    })?;
    Ok(entries
        .into_iter()
        .map(|e| (e.port, e.tls_secret_name))
        .collect())
}

const KNOWN_ANNOTATIONS: &[&str] = &[
    ann::DEFAULT_PROTOCOL,
    ann::DEFAULT_PROXY_PROTOCOL,
    ann::CHECK_TYPE,
    ann::CHECK_PATH,
    ann::CHECK_BODY,
    ann::CHECK_INTERVAL,
    ann::CHECK_TIMEOUT,
    ann::CHECK_ATTEMPTS,
    ann::CHECK_PASSIVE,
    ann::THROTTLE,
    ann::TAGS,
    ann::NODEBALANCER_ID,
    ann::FIREWALL_ID,
    ann::FIREWALL_ACL,
    ann::PRESERVE,
    ann::HOSTNAME_ONLY_INGRESS,
    ann::DEPRECATED_TLS,
];

fn warn_unknown_annotations(service: &str, annotations: &BTreeMap<String, String>) {
    for key in annotations.keys().filter(|k| k.starts_with(ann::PREFIX)) {
        if key == ann::DEPRECATED_PROTOCOL {
            warn!(
                "Service {} uses deprecated annotation {}, use {} instead",
                service, ann::DEPRECATED_PROTOCOL, ann::DEFAULT_PROTOCOL
            );
            continue;
        }
        let is_port_key = key
            .strip_prefix(ann::PORT_CONFIG_PREFIX)
            .is_some_and(|port| port.parse::<u16>().is_ok());
        if !is_port_key && !KNOWN_ANNOTATIONS.contains(&key.as_str()) {
            warn!("Service {} has unknown annotation {}, ignoring", service, key);
        }
    }
}
