//! NodeBalancer deletion.

use super::LoadBalancers;
use crate::coerce::{load_balancer_name, service_key};
use crate::error::ControllerError;
use crate::firewall::delete_owned_firewalls;
use crate::service_config;
use k8s_openapi::api::core::v1::Service;
use tracing::{info, warn};

impl LoadBalancers {
    /// Delete the Service's NodeBalancer (and the firewall the controller
    /// created for it).
    ///
    /// No-op when nothing resolves, including a stale id annotation. A
    /// malformed id annotation is ignored in favour of status and label. Skipped
    /// when the preserve annotation is true.
    pub async fn ensure_load_balancer_deleted(&self, service: &Service) -> Result<(), ControllerError> {
        let key = service_key(service);
        let annotated_id = service_config::lookup_nodebalancer_id(service);

        let nb = match self.get_nodebalancer_for_service(service, annotated_id).await {
            Ok(Some(nb)) => nb,
            Ok(None) => {
                info!("No NodeBalancer found for service {}, nothing to delete", key);
                return Ok(());
            }
            Err(e @ ControllerError::NodeBalancerNotFound { .. }) => {
                warn!("{}, nothing to delete", e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if service_config::preserve(service) {
            info!(
                "Preserving NodeBalancer {} of service {} as requested by annotation",
                nb.id, key
            );
            return Ok(());
        }

        let label = load_balancer_name(service)?;
        delete_owned_firewalls(self.client.as_ref(), nb.id, &label).await?;

        info!("Deleting NodeBalancer {} of service {}", nb.id, key);
        match self.client.delete_nodebalancer(nb.id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
