//! TLS material lookup for https ports.
//!
//! Certificates live in ordinary Kubernetes Secrets (`tls.crt` / `tls.key`)
//! in the Service's namespace.

use crate::error::ControllerError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use tracing::debug;

/// Data key holding the PEM certificate chain
pub const TLS_CERT_KEY: &str = "tls.crt";
/// Data key holding the PEM private key
pub const TLS_KEY_KEY: &str = "tls.key";

/// Certificate and key for one https listener, already trimmed
#[derive(Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub cert: String,
    pub key: String,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("cert_len", &self.cert.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Resolves a secret reference into TLS material
#[async_trait]
pub trait TlsResolver: Send + Sync {
    async fn resolve(&self, namespace: &str, secret_name: &str) -> Result<TlsMaterial, ControllerError>;
}

/// Reads TLS secrets through the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretResolver {
    client: Client,
}

impl KubeSecretResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TlsResolver for KubeSecretResolver {
    async fn resolve(&self, namespace: &str, secret_name: &str) -> Result<TlsMaterial, ControllerError> {
        debug!("Resolving TLS secret {}/{}", namespace, secret_name);
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(secret_name)
            .await?
            .ok_or_else(|| ControllerError::SecretNotFound(format!("{}/{}", namespace, secret_name)))?;

        tls_material_from_secret(&secret)
    }
}

/// Extract and trim `tls.crt` / `tls.key` from a Secret
pub fn tls_material_from_secret(secret: &Secret) -> Result<TlsMaterial, ControllerError> {
    let name = format!(
        "{}/{}",
        secret.metadata.namespace.as_deref().unwrap_or_default(),
        secret.metadata.name.as_deref().unwrap_or_default()
    );
    let field = |key: &str| -> Result<String, ControllerError> {
        let bytes = secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .ok_or_else(|| {
                ControllerError::InvalidConfig(format!("secret {} has no {} entry", name, key))
            })?;
        let text = String::from_utf8(bytes.0.clone()).map_err(|e| {
            ControllerError::InvalidConfig(format!("secret {} entry {} is not UTF-8: {}", name, key, e))
        })?;
        Ok(text.trim().to_string())
    };

    Ok(TlsMaterial {
        cert: field(TLS_CERT_KEY)?,
        key: field(TLS_KEY_KEY)?,
    })
}
