//! Firewall operations for MockLinodeClient
//!
//! Handles Cloud Firewalls and their device attachments. Like the real API, a
//! NodeBalancer accepts at most one firewall.

use super::{DeviceRecord, MockLinodeClient, lock};
use crate::error::LinodeError;
use crate::models::*;
use chrono::Utc;

pub async fn list_nodebalancer_firewalls(
    client: &MockLinodeClient,
    nodebalancer_id: u64,
) -> Result<Vec<Firewall>, LinodeError> {
    client.record("GET", format!("/nodebalancers/{}/firewalls", nodebalancer_id));
    if !lock(&client.nodebalancers).contains_key(&nodebalancer_id) {
        return Err(LinodeError::NotFound(format!(
            "NodeBalancer {} not found",
            nodebalancer_id
        )));
    }

    let mut firewall_ids = lock(&client.devices)
        .values()
        .filter(|d| is_nodebalancer(&d.device, nodebalancer_id))
        .map(|d| d.firewall_id)
        .collect::<Vec<_>>();
    firewall_ids.sort_unstable();
    firewall_ids.dedup();

    let firewalls = lock(&client.firewalls);
    Ok(firewall_ids
        .iter()
        .filter_map(|id| firewalls.get(id).cloned())
        .collect())
}

pub async fn get_firewall(client: &MockLinodeClient, id: u64) -> Result<Firewall, LinodeError> {
    client.record("GET", format!("/networking/firewalls/{}", id));
    lock(&client.firewalls)
        .get(&id)
        .cloned()
        .ok_or_else(|| LinodeError::NotFound(format!("Firewall {} not found", id)))
}

pub async fn create_firewall(
    client: &MockLinodeClient,
    opts: &FirewallCreateOptions,
) -> Result<Firewall, LinodeError> {
    client.record("POST", "/networking/firewalls");

    if lock(&client.firewalls).values().any(|f| f.label == opts.label) {
        return Err(LinodeError::InvalidRequest(format!(
            "Firewall label {} must be unique",
            opts.label
        )));
    }
    for nodebalancer_id in &opts.devices.nodebalancers {
        ensure_attachable(client, *nodebalancer_id)?;
    }

    let id = client.next_id();
    let now = Utc::now().to_rfc3339();
    let firewall = Firewall {
        id,
        label: opts.label.clone(),
        status: Some("enabled".to_string()),
        rules: opts.rules.clone(),
        tags: opts.tags.clone(),
        created: Some(now.clone()),
        updated: Some(now),
    };
    lock(&client.firewalls).insert(id, firewall.clone());

    for linode_id in &opts.devices.linodes {
        attach(client, id, *linode_id, FirewallDeviceType::Linode);
    }
    for nodebalancer_id in &opts.devices.nodebalancers {
        attach(client, id, *nodebalancer_id, FirewallDeviceType::NodeBalancer);
    }

    Ok(firewall)
}

pub async fn delete_firewall(client: &MockLinodeClient, id: u64) -> Result<(), LinodeError> {
    client.record("DELETE", format!("/networking/firewalls/{}", id));
    lock(&client.firewalls)
        .remove(&id)
        .ok_or_else(|| LinodeError::NotFound(format!("Firewall {} not found", id)))?;
    lock(&client.devices).retain(|_, d| d.firewall_id != id);
    Ok(())
}

pub async fn update_firewall_rules(
    client: &MockLinodeClient,
    id: u64,
    rules: &FirewallRuleSet,
) -> Result<FirewallRuleSet, LinodeError> {
    client.record("PUT", format!("/networking/firewalls/{}/rules", id));
    let mut firewalls = lock(&client.firewalls);
    let firewall = firewalls
        .get_mut(&id)
        .ok_or_else(|| LinodeError::NotFound(format!("Firewall {} not found", id)))?;
    firewall.rules = rules.clone();
    firewall.updated = Some(Utc::now().to_rfc3339());
    Ok(firewall.rules.clone())
}

pub async fn list_firewall_devices(
    client: &MockLinodeClient,
    firewall_id: u64,
) -> Result<Vec<FirewallDevice>, LinodeError> {
    client.record("GET", format!("/networking/firewalls/{}/devices", firewall_id));
    if !lock(&client.firewalls).contains_key(&firewall_id) {
        return Err(LinodeError::NotFound(format!("Firewall {} not found", firewall_id)));
    }
    let mut devices = lock(&client.devices)
        .values()
        .filter(|d| d.firewall_id == firewall_id)
        .map(|d| d.device.clone())
        .collect::<Vec<_>>();
    devices.sort_by_key(|d| d.id);
    Ok(devices)
}

pub async fn create_firewall_device(
    client: &MockLinodeClient,
    firewall_id: u64,
    opts: &FirewallDeviceCreateOptions,
) -> Result<FirewallDevice, LinodeError> {
    client.record("POST", format!("/networking/firewalls/{}/devices", firewall_id));
    if !lock(&client.firewalls).contains_key(&firewall_id) {
        return Err(LinodeError::NotFound(format!("Firewall {} not found", firewall_id)));
    }
    if opts.kind == FirewallDeviceType::NodeBalancer {
        ensure_attachable(client, opts.id)?;
    }
    Ok(attach(client, firewall_id, opts.id, opts.kind))
}

pub async fn delete_firewall_device(
    client: &MockLinodeClient,
    firewall_id: u64,
    device_id: u64,
) -> Result<(), LinodeError> {
    client.record(
        "DELETE",
        format!("/networking/firewalls/{}/devices/{}", firewall_id, device_id),
    );
    let mut devices = lock(&client.devices);
    match devices.get(&device_id) {
        Some(d) if d.firewall_id == firewall_id => {
            devices.remove(&device_id);
            Ok(())
        }
        _ => Err(LinodeError::NotFound(format!("Device {} not found", device_id))),
    }
}

fn is_nodebalancer(device: &FirewallDevice, nodebalancer_id: u64) -> bool {
    device.entity.kind == FirewallDeviceType::NodeBalancer && device.entity.id == nodebalancer_id
}

fn ensure_attachable(client: &MockLinodeClient, nodebalancer_id: u64) -> Result<(), LinodeError> {
    if !lock(&client.nodebalancers).contains_key(&nodebalancer_id) {
        return Err(LinodeError::NotFound(format!(
            "NodeBalancer {} not found",
            nodebalancer_id
        )));
    }
    if lock(&client.devices)
        .values()
        .any(|d| is_nodebalancer(&d.device, nodebalancer_id))
    {
        return Err(LinodeError::InvalidRequest(format!(
            "NodeBalancer {} already has a firewall attached",
            nodebalancer_id
        )));
    }
    Ok(())
}

fn attach(
    client: &MockLinodeClient,
    firewall_id: u64,
    entity_id: u64,
    kind: FirewallDeviceType,
) -> FirewallDevice {
    let label = match kind {
        FirewallDeviceType::NodeBalancer => lock(&client.nodebalancers)
            .get(&entity_id)
            .and_then(|nb| nb.label.clone()),
        FirewallDeviceType::Linode => lock(&client.instances)
            .get(&entity_id)
            .map(|i| i.label.clone()),
    };
    let device = FirewallDevice {
        id: client.next_id(),
        entity: FirewallDeviceEntity {
            id: entity_id,
            kind,
            label,
        },
    };
    lock(&client.devices).insert(
        device.id,
        DeviceRecord {
            firewall_id,
            device: device.clone(),
        },
    );
    device
}
