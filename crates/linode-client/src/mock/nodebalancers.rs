//! NodeBalancer operations for MockLinodeClient
//!
//! Handles NodeBalancers, their configs and backend nodes

use super::{MockLinodeClient, WrittenTls, filter_resources, lock};
use crate::common::filter::ListFilter;
use crate::error::LinodeError;
use crate::models::*;
use chrono::Utc;

pub async fn list_nodebalancers(
    client: &MockLinodeClient,
    filter: Option<&ListFilter>,
) -> Result<Vec<NodeBalancer>, LinodeError> {
    client.record("GET", "/nodebalancers");
    client.record_filter(filter);
    let mut nodebalancers = lock(&client.nodebalancers)
        .values()
        .cloned()
        .collect::<Vec<_>>();
    nodebalancers.sort_by_key(|nb| nb.id);
    filter_resources(nodebalancers.into_iter(), filter)
}

pub async fn get_nodebalancer(
    client: &MockLinodeClient,
    id: u64,
) -> Result<NodeBalancer, LinodeError> {
    client.record("GET", format!("/nodebalancers/{}", id));
    lookup_nodebalancer(client, id)
}

fn lookup_nodebalancer(client: &MockLinodeClient, id: u64) -> Result<NodeBalancer, LinodeError> {
    lock(&client.nodebalancers)
        .get(&id)
        .cloned()
        .ok_or_else(|| LinodeError::NotFound(format!("NodeBalancer {} not found", id)))
}

pub async fn create_nodebalancer(
    client: &MockLinodeClient,
    opts: &NodeBalancerCreateOptions,
) -> Result<NodeBalancer, LinodeError> {
    client.record("POST", "/nodebalancers");

    let id = client.next_id();
    let ipv4 = format!("45.79.{}.{}", (id / 256) % 256, id % 256);
    let now = Utc::now().to_rfc3339();
    let nodebalancer = NodeBalancer {
        id,
        label: opts.label.clone(),
        region: opts.region.clone(),
        hostname: Some(format!(
            "nb-{}.{}.nodebalancer.linode.com",
            ipv4.replace('.', "-"),
            opts.region
        )),
        ipv4: Some(ipv4),
        ipv6: None,
        client_conn_throttle: opts.client_conn_throttle,
        tags: opts.tags.clone(),
        created: Some(now.clone()),
        updated: Some(now),
    };
    lock(&client.nodebalancers).insert(id, nodebalancer.clone());

    for config in &opts.configs {
        insert_config(client, id, config)?;
    }

    Ok(nodebalancer)
}

pub async fn update_nodebalancer(
    client: &MockLinodeClient,
    id: u64,
    opts: &NodeBalancerUpdateOptions,
) -> Result<NodeBalancer, LinodeError> {
    client.record("PUT", format!("/nodebalancers/{}", id));

    let mut nodebalancers = lock(&client.nodebalancers);
    let nodebalancer = nodebalancers
        .get_mut(&id)
        .ok_or_else(|| LinodeError::NotFound(format!("NodeBalancer {} not found", id)))?;

    if let Some(label) = &opts.label {
        nodebalancer.label = Some(label.clone());
    }
    if let Some(throttle) = opts.client_conn_throttle {
        nodebalancer.client_conn_throttle = throttle;
    }
    if let Some(tags) = &opts.tags {
        nodebalancer.tags = tags.clone();
    }
    nodebalancer.updated = Some(Utc::now().to_rfc3339());

    Ok(nodebalancer.clone())
}

pub async fn delete_nodebalancer(client: &MockLinodeClient, id: u64) -> Result<(), LinodeError> {
    client.record("DELETE", format!("/nodebalancers/{}", id));

    lock(&client.nodebalancers)
        .remove(&id)
        .ok_or_else(|| LinodeError::NotFound(format!("NodeBalancer {} not found", id)))?;
    lock(&client.configs).retain(|_, c| c.nodebalancer_id != id);
    lock(&client.nodes).retain(|_, n| n.nodebalancer_id != id);
    lock(&client.devices).retain(|_, d| {
        !(d.device.entity.kind == FirewallDeviceType::NodeBalancer && d.device.entity.id == id)
    });

    Ok(())
}

pub async fn list_configs(
    client: &MockLinodeClient,
    nodebalancer_id: u64,
) -> Result<Vec<NodeBalancerConfig>, LinodeError> {
    client.record("GET", format!("/nodebalancers/{}/configs", nodebalancer_id));
    lookup_nodebalancer(client, nodebalancer_id)?;

    let mut configs = lock(&client.configs)
        .values()
        .filter(|c| c.nodebalancer_id == nodebalancer_id)
        .cloned()
        .collect::<Vec<_>>();
    configs.sort_by_key(|c| c.id);
    Ok(configs)
}

pub async fn create_config(
    client: &MockLinodeClient,
    nodebalancer_id: u64,
    opts: &NodeBalancerConfigOptions,
) -> Result<NodeBalancerConfig, LinodeError> {
    client.record("POST", format!("/nodebalancers/{}/configs", nodebalancer_id));
    lookup_nodebalancer(client, nodebalancer_id)?;
    insert_config(client, nodebalancer_id, opts)
}

pub async fn rebuild_config(
    client: &MockLinodeClient,
    nodebalancer_id: u64,
    config_id: u64,
    opts: &NodeBalancerConfigOptions,
) -> Result<NodeBalancerConfig, LinodeError> {
    client.record(
        "POST",
        format!("/nodebalancers/{}/configs/{}/rebuild", nodebalancer_id, config_id),
    );

    let rebuilt = {
        let mut configs = lock(&client.configs);
        let port_taken = configs
            .values()
            .any(|c| c.nodebalancer_id == nodebalancer_id && c.id != config_id && c.port == opts.port);
        if port_taken {
            return Err(LinodeError::InvalidRequest(format!(
                "Port {} is already in use on NodeBalancer {}",
                opts.port, nodebalancer_id
            )));
        }
        let existing = configs
            .get_mut(&config_id)
            .filter(|c| c.nodebalancer_id == nodebalancer_id)
            .ok_or_else(|| LinodeError::NotFound(format!("Config {} not found", config_id)))?;
        *existing = config_from_options(config_id, nodebalancer_id, opts);
        existing.clone()
    };

    lock(&client.nodes).retain(|_, n| n.config_id != config_id);
    insert_nodes(client, nodebalancer_id, config_id, &opts.nodes);
    record_tls(client, config_id, opts);

    Ok(rebuilt)
}

pub async fn delete_config(
    client: &MockLinodeClient,
    nodebalancer_id: u64,
    config_id: u64,
) -> Result<(), LinodeError> {
    client.record(
        "DELETE",
        format!("/nodebalancers/{}/configs/{}", nodebalancer_id, config_id),
    );

    let mut configs = lock(&client.configs);
    match configs.get(&config_id) {
        Some(c) if c.nodebalancer_id == nodebalancer_id => {
            configs.remove(&config_id);
        }
        _ => {
            return Err(LinodeError::NotFound(format!("Config {} not found", config_id)));
        }
    }
    drop(configs);

    lock(&client.nodes).retain(|_, n| n.config_id != config_id);
    lock(&client.written_tls).remove(&config_id);
    Ok(())
}

pub async fn list_nodes(
    client: &MockLinodeClient,
    nodebalancer_id: u64,
    config_id: u64,
) -> Result<Vec<NodeBalancerNode>, LinodeError> {
    client.record(
        "GET",
        format!("/nodebalancers/{}/configs/{}/nodes", nodebalancer_id, config_id),
    );

    let mut nodes = lock(&client.nodes)
        .values()
        .filter(|n| n.nodebalancer_id == nodebalancer_id && n.config_id == config_id)
        .cloned()
        .collect::<Vec<_>>();
    nodes.sort_by_key(|n| n.id);
    Ok(nodes)
}

fn insert_config(
    client: &MockLinodeClient,
    nodebalancer_id: u64,
    opts: &NodeBalancerConfigOptions,
) -> Result<NodeBalancerConfig, LinodeError> {
    let config = {
        let mut configs = lock(&client.configs);
        if configs
            .values()
            .any(|c| c.nodebalancer_id == nodebalancer_id && c.port == opts.port)
        {
            return Err(LinodeError::InvalidRequest(format!(
                "Port {} is already in use on NodeBalancer {}",
                opts.port, nodebalancer_id
            )));
        }
        let config = config_from_options(client.next_id(), nodebalancer_id, opts);
        configs.insert(config.id, config.clone());
        config
    };

    insert_nodes(client, nodebalancer_id, config.id, &opts.nodes);
    record_tls(client, config.id, opts);
    Ok(config)
}

fn insert_nodes(
    client: &MockLinodeClient,
    nodebalancer_id: u64,
    config_id: u64,
    nodes: &[NodeBalancerNodeCreateOptions],
) {
    for node in nodes {
        let id = client.next_id();
        lock(&client.nodes).insert(
            id,
            NodeBalancerNode {
                id,
                address: node.address.clone(),
                label: node.label.clone(),
                status: Some("UP".to_string()),
                weight: node.weight,
                mode: node.mode,
                config_id,
                nodebalancer_id,
            },
        );
    }
}

fn config_from_options(
    id: u64,
    nodebalancer_id: u64,
    opts: &NodeBalancerConfigOptions,
) -> NodeBalancerConfig {
    NodeBalancerConfig {
        id,
        nodebalancer_id,
        port: opts.port,
        protocol: opts.protocol,
        proxy_protocol: opts.proxy_protocol,
        check: opts.check,
        check_interval: opts.check_interval,
        check_timeout: opts.check_timeout,
        check_attempts: opts.check_attempts,
        check_path: opts.check_path.clone(),
        check_body: opts.check_body.clone(),
        check_passive: opts.check_passive,
        ssl_cert: opts.ssl_cert.as_ref().map(|_| REDACTED_SSL_VALUE.to_string()),
        ssl_key: opts.ssl_key.as_ref().map(|_| REDACTED_SSL_VALUE.to_string()),
    }
}

fn record_tls(client: &MockLinodeClient, config_id: u64, opts: &NodeBalancerConfigOptions) {
    lock(&client.written_tls).insert(
        config_id,
        WrittenTls {
            ssl_cert: opts.ssl_cert.clone(),
            ssl_key: opts.ssl_key.clone(),
        },
    );
}
