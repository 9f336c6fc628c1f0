//! Label derivation for remote resources.
//!
//! Linode labels are length bounded. Everything here is pure so the same input
//! always yields the same label, both when a resource is created and when it is
//! looked up again later.

use crate::error::ControllerError;
use k8s_openapi::api::core::v1::Service;

/// Maximum length of a NodeBalancer or firewall label
pub const MAX_LABEL_LEN: usize = 32;

/// Bounds and pad used for backend node labels
pub const NODE_LABEL_MIN: usize = 3;
pub const NODE_LABEL_MAX: usize = 32;
pub const NODE_LABEL_PAD: &str = "node-";

/// Force `s` into `[min_len, max_len]` characters.
///
/// Long input is truncated to `max_len`. Short input gets `pad` prepended until
/// it reaches `min_len`, and is then truncated again if the pad overshot. An
/// empty pad is treated as `"x"`.
pub fn coerce_string(s: &str, min_len: usize, max_len: usize, pad: &str) -> String {
    let pad = if pad.is_empty() { "x" } else { pad };

    let mut out = s.to_string();
    while out.chars().count() < min_len {
        out.insert_str(0, pad);
    }
    truncate_chars(&out, max_len)
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// Label of the NodeBalancer (and controller-owned firewall) for a Service:
/// `"a"` followed by the UID without dashes, cut to 32 characters.
pub fn load_balancer_name(service: &Service) -> Result<String, ControllerError> {
    let uid = service
        .metadata
        .uid
        .as_deref()
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| {
            ControllerError::InvalidConfig(format!(
                "service {} has no UID",
                service_key(service)
            ))
        })?;

    Ok(truncate_chars(&format!("a{}", uid.replace('-', "")), MAX_LABEL_LEN))
}

/// Backend label for a Kubernetes node name
pub fn node_label(node_name: &str) -> String {
    coerce_string(node_name, NODE_LABEL_MIN, NODE_LABEL_MAX, NODE_LABEL_PAD)
}

/// `namespace/name` of a Service, used in logs and errors
pub fn service_key(service: &Service) -> String {
    format!(
        "{}/{}",
        service.metadata.namespace.as_deref().unwrap_or("default"),
        service.metadata.name.as_deref().unwrap_or_default()
    )
}
