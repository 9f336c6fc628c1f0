//! Instance operations for MockLinodeClient

use super::{MockLinodeClient, filter_resources, lock};
use crate::common::filter::ListFilter;
use crate::error::LinodeError;
use crate::models::*;

pub async fn list_instances(
    client: &MockLinodeClient,
    filter: Option<&ListFilter>,
) -> Result<Vec<Instance>, LinodeError> {
    client.record("GET", "/linode/instances");
    client.record_filter(filter);
    let mut instances = lock(&client.instances).values().cloned().collect::<Vec<_>>();
    instances.sort_by_key(|i| i.id);
    filter_resources(instances.into_iter(), filter)
}

pub async fn get_instance(client: &MockLinodeClient, id: u64) -> Result<Instance, LinodeError> {
    client.record("GET", format!("/linode/instances/{}", id));
    lock(&client.instances)
        .get(&id)
        .cloned()
        .ok_or_else(|| LinodeError::NotFound(format!("Instance {} not found", id)))
}
