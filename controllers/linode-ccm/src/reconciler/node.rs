//! Node reconciliation.

use super::{RESYNC_INTERVAL, Reconciler, object_key};
use crate::annotations::{INSTANCE_TYPE_LABEL, REGION_LABEL, SHUTDOWN_TAINT};
use crate::error::ControllerError;
use crate::instances::InstanceMetadata;
use k8s_openapi::api::core::v1::{Node, NodeSpec, Taint};
use kube::Api;
use kube::api::{Patch, PatchParams};
use kube_runtime::controller::Action;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

impl Reconciler {
    /// Reconcile one Node: provider ID, instance labels and the shutdown taint.
    pub async fn reconcile_node(&self, node: &Node) -> Result<Action, ControllerError> {
        let key = object_key(node);

        let metadata = match self.instances.instance_metadata(node).await {
            Ok(metadata) => metadata,
            Err(ControllerError::InstanceNotFound(_)) => {
                warn!("No Linode instance found for node {}, leaving it alone", key);
                self.forget_resource(&key);
                return Ok(Action::requeue(RESYNC_INTERVAL));
            }
            Err(e) => return Err(e),
        };

        // Shutdown lookups go by provider ID so IP-matched nodes resolve too.
        let mut resolved = node.clone();
        resolved
            .spec
            .get_or_insert_with(NodeSpec::default)
            .provider_id = Some(metadata.provider_id.clone());
        let shutdown = self.instances.instance_shutdown(&resolved).await?;

        match node_patch(node, &metadata, shutdown) {
            Some(patch) => {
                info!(
                    "Updating node {} from instance {} (shutdown: {})",
                    key, metadata.provider_id, shutdown
                );
                let api: Api<Node> = Api::all(self.kube_client.clone());
                let name = node.metadata.name.as_deref().unwrap_or_default();
                api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
            }
            None => debug!("Node {} is up to date", key),
        }

        self.reset_error(&key);
        Ok(Action::requeue(RESYNC_INTERVAL))
    }
}

/// Merge patch bringing the node in line with its instance, or `None` when
/// nothing differs.
///
/// The provider ID is only set when the node has none.
pub fn node_patch(node: &Node, metadata: &InstanceMetadata, shutdown: bool) -> Option<Value> {
    let mut spec = Map::new();
    let mut labels = Map::new();

    let spec_provider_id = node
        .spec
        .as_ref()
        .and_then(|s| s.provider_id.as_deref())
        .filter(|id| !id.is_empty());
    if spec_provider_id.is_none() {
        spec.insert("providerID".to_string(), json!(metadata.provider_id));
    }

    let current_labels = node.metadata.labels.as_ref();
    let mut wanted = vec![(REGION_LABEL, metadata.region.as_str())];
    if let Some(instance_type) = metadata.instance_type.as_deref() {
        wanted.push((INSTANCE_TYPE_LABEL, instance_type));
    }
    for (label, value) in wanted {
        if current_labels.and_then(|l| l.get(label)).map(String::as_str) != Some(value) {
            labels.insert(label.to_string(), json!(value));
        }
    }

    if let Some(taints) = taints_for(node, shutdown) {
        spec.insert("taints".to_string(), json!(taints));
    }

    if spec.is_empty() && labels.is_empty() {
        return None;
    }
    let mut patch = Map::new();
    if !spec.is_empty() {
        patch.insert("spec".to_string(), Value::Object(spec));
    }
    if !labels.is_empty() {
        patch.insert("metadata".to_string(), json!({ "labels": labels }));
    }
    Some(Value::Object(patch))
}

/// Full taint list with the shutdown taint present or absent, or `None` when
/// it already matches.
fn taints_for(node: &Node, shutdown: bool) -> Option<Vec<Taint>> {
    let taints = node
        .spec
        .as_ref()
        .and_then(|s| s.taints.clone())
        .unwrap_or_default();
    let tainted = taints.iter().any(|t| t.key == SHUTDOWN_TAINT);
    if tainted == shutdown {
        return None;
    }

    let mut taints = taints;
    if shutdown {
        taints.push(Taint {
            key: SHUTDOWN_TAINT.to_string(),
            effect: "NoSchedule".to_string(),
            ..Default::default()
        });
    } else {
        taints.retain(|t| t.key != SHUTDOWN_TAINT);
    }
    Some(taints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_node;
    use std::collections::BTreeMap;

    fn metadata() -> InstanceMetadata {
        InstanceMetadata {
            provider_id: "linode://123".to_string(),
            instance_type: Some("g6-standard-2".to_string()),
            region: "us-east".to_string(),
            node_addresses: Vec::new(),
        }
    }

    #[test]
    fn test_patch_for_fresh_node() {
        let node = create_test_node("worker-1", Some("10.0.0.1"), None);

        let patch = node_patch(&node, &metadata(), false).unwrap();
        assert_eq!(patch["spec"]["providerID"], "linode://123");
        assert_eq!(patch["metadata"]["labels"][REGION_LABEL], "us-east");
        assert_eq!(patch["metadata"]["labels"][INSTANCE_TYPE_LABEL], "g6-standard-2");
        assert!(patch["spec"].get("taints").is_none());
    }

    #[test]
    fn test_no_patch_when_up_to_date() {
        let mut node = create_test_node("worker-1", Some("10.0.0.1"), None);
        node.spec = Some(NodeSpec {
            provider_id: Some("linode://123".to_string()),
            ..Default::default()
        });
        node.metadata.labels = Some(BTreeMap::from([
            (REGION_LABEL.to_string(), "us-east".to_string()),
            (INSTANCE_TYPE_LABEL.to_string(), "g6-standard-2".to_string()),
        ]));

        assert!(node_patch(&node, &metadata(), false).is_none());
    }

    #[test]
    fn test_existing_provider_id_is_kept() {
        let mut node = create_test_node("worker-1", Some("10.0.0.1"), None);
        node.spec = Some(NodeSpec {
            provider_id: Some("linode://999".to_string()),
            ..Default::default()
        });

        let patch = node_patch(&node, &metadata(), false).unwrap();
        assert!(patch.get("spec").is_none());
    }

    #[test]
    fn test_shutdown_taint_added_and_removed() {
        let mut node = create_test_node("worker-1", Some("10.0.0.1"), None);
        node.spec = Some(NodeSpec {
            provider_id: Some("linode://123".to_string()),
            taints: Some(vec![Taint {
                key: "dedicated".to_string(),
                effect: "NoSchedule".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        });

        let taints = taints_for(&node, true).unwrap();
        assert_eq!(taints.len(), 2);
        assert!(taints.iter().any(|t| t.key == SHUTDOWN_TAINT));

        if let Some(spec) = node.spec.as_mut() {
            spec.taints = Some(taints);
        }
        assert!(taints_for(&node, true).is_none());

        let taints = taints_for(&node, false).unwrap();
        assert_eq!(taints.len(), 1);
        assert_eq!(taints[0].key, "dedicated");
    }
}
