//! Process configuration from environment variables.

use crate::error::ControllerError;
use crate::service_config::parse_bool;
use linode_client::DEFAULT_API_URL;
use std::env;
use std::fmt;

/// Settings read once at startup.
#[derive(Clone)]
pub struct CcmConfig {
    pub api_token: String,
    pub region: String,
    pub api_url: String,
    /// First tag on every NodeBalancer
    pub cluster_name: String,
    /// Default for the hostname-only-ingress annotation
    pub hostname_only_ingress: bool,
    /// Watch a single namespace instead of all of them
    pub namespace: Option<String>,
}

impl fmt::Debug for CcmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CcmConfig")
            .field("api_token", &"<REDACTED>")
            .field("region", &self.region)
            .field("api_url", &self.api_url)
            .field("cluster_name", &self.cluster_name)
            .field("hostname_only_ingress", &self.hostname_only_ingress)
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl CcmConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                ControllerError::InvalidConfig(format!(
                    "{} environment variable is required",
                    key
                ))
            })
        };

        Ok(Self {
            api_token: required("LINODE_API_TOKEN")?,
            region: required("LINODE_REGION")?,
            api_url: get("LINODE_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            cluster_name: get("LINODE_CLUSTER_NAME").unwrap_or_else(|| "kubernetes".to_string()),
            hostname_only_ingress: match get("LINODE_HOSTNAME_ONLY_INGRESS") {
                Some(v) => parse_bool(v.trim()).ok_or_else(|| {
                    ControllerError::InvalidConfig(format!(
                        "LINODE_HOSTNAME_ONLY_INGRESS must be a boolean, got {:?}",
                        v
                    ))
                })?,
                None => false,
            },
            namespace: get("WATCH_NAMESPACE"),
        })
    }
}
