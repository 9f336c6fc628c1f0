//! Unit tests for the NodeBalancer reconciler

#[cfg(test)]
mod tests {
    use crate::annotations as ann;
    use crate::coerce::load_balancer_name;
    use crate::error::ControllerError;
    use crate::test_utils::*;
    use k8s_openapi::api::core::v1::{LoadBalancerIngress, LoadBalancerStatus, Node, Service};
    use linode_client::{
        ConfigProtocol, FirewallCreateOptions, FirewallDevicesCreateOptions, FirewallRuleSet,
        LinodeClientTrait, ListFilter, MockLinodeClient, NodeBalancer, NodeBalancerCreateOptions,
        REDACTED_SSL_VALUE, RecordedRequest, WrittenTls,
    };

    const UID: &str = "4f2e0c1a-7c9b-4a55-9e1d-0b6f1c2d3e4f";
    const ALLOW_ONE: &str = r#"{"allowList": {"ipv4": ["1.1.1.1/32"]}}"#;
    const ALLOW_TWO: &str = r#"{"allowList": {"ipv4": ["2.2.2.2/32"]}}"#;

    fn nodes() -> Vec<Node> {
        vec![
            create_test_node("worker-1", Some("10.0.0.1"), None),
            create_test_node("worker-2", Some("10.0.0.2"), None),
        ]
    }

    fn service(ports: &[i32], annotations: &[(&str, &str)]) -> Service {
        create_test_service("web", "default", UID, ports, annotations)
    }

    async fn all_nodebalancers(mock: &MockLinodeClient) -> Vec<NodeBalancer> {
        mock.list_nodebalancers(None).await.unwrap()
    }

    async fn foreign_firewall(mock: &MockLinodeClient, label: &str) -> u64 {
        mock.create_firewall(&FirewallCreateOptions {
            label: label.to_string(),
            rules: FirewallRuleSet::default(),
            tags: Vec::new(),
            devices: FirewallDevicesCreateOptions::default(),
        })
        .await
        .unwrap()
        .id
    }

    /// Requests addressing a NodeBalancer or anything below it
    fn requests_for_nodebalancer(mock: &MockLinodeClient, id: u64) -> Vec<RecordedRequest> {
        let path = format!("/nodebalancers/{}", id);
        let nested = format!("{}/", path);
        mock.requests()
            .into_iter()
            .filter(|r| r.path == path || r.path.starts_with(&nested))
            .collect()
    }

    #[tokio::test]
    async fn test_get_without_nodebalancer() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);

        assert_eq!(lbs.get_load_balancer(&service(&[80], &[])).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ensure_creates_nodebalancer() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let svc = service(&[80, 443], &[(ann::TAGS, "team-a"), (ann::THROTTLE, "10")]);

        let status = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();

        let nbs = all_nodebalancers(&mock).await;
        assert_eq!(nbs.len(), 1);
        let nb = &nbs[0];
        assert_eq!(nb.label.as_deref(), Some(load_balancer_name(&svc).unwrap().as_str()));
        assert_eq!(nb.region, TEST_REGION);
        assert_eq!(nb.client_conn_throttle, 10);
        assert_eq!(nb.tags, vec![TEST_CLUSTER.to_string(), "team-a".to_string()]);

        let ingress = status.ingress.unwrap();
        assert_eq!(ingress.len(), 1);
        assert_eq!(ingress[0].ip, nb.ipv4);
        assert_eq!(ingress[0].hostname, nb.hostname);

        let configs = mock.list_nodebalancer_configs(nb.id).await.unwrap();
        assert_eq!(configs.iter().map(|c| c.port).collect::<Vec<_>>(), vec![80, 443]);
        let backends = mock.list_nodebalancer_nodes(nb.id, configs[0].id).await.unwrap();
        let mut addresses = backends.iter().map(|n| n.address.as_str()).collect::<Vec<_>>();
        addresses.sort_unstable();
        assert_eq!(addresses, vec!["10.0.0.1:30080", "10.0.0.2:30080"]);
        assert!(backends.iter().all(|n| n.weight == 100));
    }

    #[tokio::test]
    async fn test_ensure_skips_nodes_without_address() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let mut all = nodes();
        all.push(create_test_node("no-ip", None, None));

        lbs.ensure_load_balancer(&service(&[80], &[]), &all).await.unwrap();

        let nb = &all_nodebalancers(&mock).await[0];
        let configs = mock.list_nodebalancer_configs(nb.id).await.unwrap();
        let backends = mock.list_nodebalancer_nodes(nb.id, configs[0].id).await.unwrap();
        assert_eq!(backends.len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let svc = service(&[80, 443], &[(ann::FIREWALL_ACL, ALLOW_ONE)]);

        let first = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();
        mock.reset_requests();
        let second = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();

        assert_eq!(first, second);
        assert!(mock.mutating_requests().is_empty(), "{:?}", mock.mutating_requests());
    }

    #[tokio::test]
    async fn test_empty_nodes_is_rejected_before_any_call() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);

        let err = lbs
            .ensure_load_balancer(&service(&[80], &[]), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::NoNodesAvailable(_)));

        let err = lbs
            .update_load_balancer(&service(&[80], &[]), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::NoNodesAvailable(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_without_nodebalancer_fails() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);

        let err = lbs
            .update_load_balancer(&service(&[80], &[]), &nodes())
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Linode(ref e) if e.is_not_found()));
        assert!(mock.mutating_requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_throttle_and_tags() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        lbs.ensure_load_balancer(&service(&[80], &[]), &nodes()).await.unwrap();

        let svc = service(&[80], &[(ann::THROTTLE, "5"), (ann::TAGS, "blue,green")]);
        lbs.update_load_balancer(&svc, &nodes()).await.unwrap();

        let nb = &all_nodebalancers(&mock).await[0];
        assert_eq!(nb.client_conn_throttle, 5);
        assert_eq!(
            nb.tags,
            vec![TEST_CLUSTER.to_string(), "blue".to_string(), "green".to_string()]
        );
    }

    #[tokio::test]
    async fn test_removing_port_deletes_only_that_config() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        lbs.ensure_load_balancer(&service(&[80, 443], &[]), &nodes())
            .await
            .unwrap();
        let nb = all_nodebalancers(&mock).await[0].clone();
        let removed = mock
            .list_nodebalancer_configs(nb.id)
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.port == 443)
            .unwrap();

        mock.reset_requests();
        lbs.ensure_load_balancer(&service(&[80], &[]), &nodes())
            .await
            .unwrap();

        assert_eq!(
            mock.mutating_requests(),
            vec![RecordedRequest {
                method: "DELETE",
                path: format!("/nodebalancers/{}/configs/{}", nb.id, removed.id),
            }]
        );
    }

    #[tokio::test]
    async fn test_backend_change_rebuilds_config() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        lbs.ensure_load_balancer(&service(&[80], &[]), &nodes()).await.unwrap();
        let nb = all_nodebalancers(&mock).await[0].clone();
        let config = mock.list_nodebalancer_configs(nb.id).await.unwrap()[0].clone();

        mock.reset_requests();
        let mut grown = nodes();
        grown.push(create_test_node("worker-3", Some("10.0.0.3"), None));
        lbs.ensure_load_balancer(&service(&[80], &[]), &grown).await.unwrap();

        assert_eq!(
            mock.mutating_requests(),
            vec![RecordedRequest {
                method: "POST",
                path: format!("/nodebalancers/{}/configs/{}/rebuild", nb.id, config.id),
            }]
        );
        assert_eq!(
            mock.list_nodebalancer_nodes(nb.id, config.id).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_switch_to_https() {
        let mock = create_mock_client();
        let tls = StaticTlsResolver::new().with_secret("default", "web-cert", "\n CERT-PEM \n", "\tKEY-PEM\n");
        let lbs = create_test_load_balancers(&mock, tls, false);
        lbs.ensure_load_balancer(&service(&[443], &[]), &nodes()).await.unwrap();
        let nb = all_nodebalancers(&mock).await[0].clone();

        mock.reset_requests();
        let err = lbs
            .ensure_load_balancer(&service(&[443], &[(ann::DEFAULT_PROTOCOL, "https")]), &nodes())
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
        assert!(mock.requests().is_empty());

        let svc = service(
            &[443],
            &[(
                "service.beta.kubernetes.io/linode-loadbalancer-port-443",
                r#"{"protocol": "https", "tls-secret-name": "web-cert"}"#,
            )],
        );
        lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();

        let config = mock.list_nodebalancer_configs(nb.id).await.unwrap()[0].clone();
        assert_eq!(config.protocol, ConfigProtocol::Https);
        assert_eq!(config.ssl_key.as_deref(), Some(REDACTED_SSL_VALUE));
        assert_eq!(
            mock.written_tls(config.id),
            Some(WrittenTls {
                ssl_cert: Some("CERT-PEM".to_string()),
                ssl_key: Some("KEY-PEM".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_https_config_is_rebuilt_on_every_ensure() {
        let mock = create_mock_client();
        let tls = StaticTlsResolver::new().with_secret("default", "web-cert", "CERT-PEM", "KEY-PEM");
        let lbs = create_test_load_balancers(&mock, tls, false);
        let svc = service(
            &[80, 443],
            &[(
                "service.beta.kubernetes.io/linode-loadbalancer-port-443",
                r#"{"protocol": "https", "tls-secret-name": "web-cert"}"#,
            )],
        );
        lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();
        let nb = all_nodebalancers(&mock).await[0].clone();
        let https = mock
            .list_nodebalancer_configs(nb.id)
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.port == 443)
            .unwrap();

        // Redacted TLS material cannot be compared, so only the https port is rewritten
        mock.reset_requests();
        lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();

        assert_eq!(
            mock.mutating_requests(),
            vec![RecordedRequest {
                method: "POST",
                path: format!("/nodebalancers/{}/configs/{}/rebuild", nb.id, https.id),
            }]
        );
        assert_eq!(
            mock.written_tls(https.id).and_then(|tls| tls.ssl_key).as_deref(),
            Some("KEY-PEM")
        );
    }

    #[tokio::test]
    async fn test_missing_tls_secret_fails() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let svc = service(
            &[443],
            &[(
                "service.beta.kubernetes.io/linode-loadbalancer-port-443",
                r#"{"protocol": "https", "tls-secret-name": "absent"}"#,
            )],
        );

        let err = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap_err();
        assert!(matches!(err, ControllerError::SecretNotFound(_)));
        assert!(mock.mutating_requests().is_empty());
    }

    #[tokio::test]
    async fn test_firewall_acl_then_id() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        lbs.ensure_load_balancer(&service(&[80], &[(ann::FIREWALL_ACL, ALLOW_ONE)]), &nodes())
            .await
            .unwrap();
        let nb = all_nodebalancers(&mock).await[0].clone();
        let owned = mock.list_nodebalancer_firewalls(nb.id).await.unwrap()[0].clone();
        assert_eq!(Some(owned.label.clone()), nb.label);

        let shared = foreign_firewall(&mock, "shared").await;
        let shared_id = shared.to_string();
        lbs.ensure_load_balancer(&service(&[80], &[(ann::FIREWALL_ID, &shared_id)]), &nodes())
            .await
            .unwrap();

        let attached = mock.list_nodebalancer_firewalls(nb.id).await.unwrap();
        assert_eq!(attached.iter().map(|f| f.id).collect::<Vec<_>>(), vec![shared]);
        assert!(mock.get_firewall(owned.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_firewall_id_then_acl() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let shared = foreign_firewall(&mock, "shared").await;
        let shared_id = shared.to_string();
        lbs.ensure_load_balancer(&service(&[80], &[(ann::FIREWALL_ID, &shared_id)]), &nodes())
            .await
            .unwrap();
        let nb = all_nodebalancers(&mock).await[0].clone();
        assert_eq!(mock.list_nodebalancer_firewalls(nb.id).await.unwrap()[0].id, shared);

        lbs.ensure_load_balancer(&service(&[80], &[(ann::FIREWALL_ACL, ALLOW_ONE)]), &nodes())
            .await
            .unwrap();

        let attached = mock.list_nodebalancer_firewalls(nb.id).await.unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(Some(attached[0].label.clone()), nb.label);
        // The referenced firewall is detached, never deleted
        assert!(mock.get_firewall(shared).await.is_ok());
    }

    #[tokio::test]
    async fn test_firewall_acl_update() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        lbs.ensure_load_balancer(&service(&[80], &[(ann::FIREWALL_ACL, ALLOW_ONE)]), &nodes())
            .await
            .unwrap();
        let nb = all_nodebalancers(&mock).await[0].clone();
        let owned = mock.list_nodebalancer_firewalls(nb.id).await.unwrap()[0].id;

        mock.reset_requests();
        lbs.ensure_load_balancer(&service(&[80], &[(ann::FIREWALL_ACL, ALLOW_TWO)]), &nodes())
            .await
            .unwrap();

        assert_eq!(
            mock.mutating_requests(),
            vec![RecordedRequest {
                method: "PUT",
                path: format!("/networking/firewalls/{}/rules", owned),
            }]
        );
        let firewall = mock.get_firewall(owned).await.unwrap();
        assert_eq!(
            firewall.rules.inbound[0].addresses.ipv4,
            Some(vec!["2.2.2.2/32".to_string()])
        );
    }

    #[tokio::test]
    async fn test_firewall_removed() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        lbs.ensure_load_balancer(&service(&[80], &[(ann::FIREWALL_ACL, ALLOW_ONE)]), &nodes())
            .await
            .unwrap();
        let nb = all_nodebalancers(&mock).await[0].clone();
        let owned = mock.list_nodebalancer_firewalls(nb.id).await.unwrap()[0].id;

        lbs.ensure_load_balancer(&service(&[80], &[]), &nodes()).await.unwrap();

        assert!(mock.list_nodebalancer_firewalls(nb.id).await.unwrap().is_empty());
        assert!(mock.get_firewall(owned).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_nodebalancer_id_cutover_deletes_old() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let mut svc = service(&[80], &[(ann::FIREWALL_ACL, ALLOW_ONE)]);
        let status = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();
        let old = all_nodebalancers(&mock).await[0].clone();
        set_status(&mut svc, status);

        let new = mock
            .create_nodebalancer(&NodeBalancerCreateOptions {
                label: Some("pre-provisioned".to_string()),
                region: TEST_REGION.to_string(),
                client_conn_throttle: 20,
                configs: Vec::new(),
                tags: Vec::new(),
            })
            .await
            .unwrap();
        set_annotation(&mut svc, ann::NODEBALANCER_ID, &new.id.to_string());

        let status = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();

        assert!(mock.did_request_occur("DELETE", &format!("/nodebalancers/{}", old.id)));
        assert!(mock.get_nodebalancer(old.id).await.unwrap_err().is_not_found());
        let ingress = status.ingress.clone().unwrap();
        assert_eq!(ingress[0].hostname, new.hostname);
        assert_eq!(mock.list_nodebalancer_configs(new.id).await.unwrap().len(), 1);
        assert_eq!(mock.list_nodebalancer_firewalls(new.id).await.unwrap().len(), 1);

        set_status(&mut svc, status);
        mock.reset_requests();
        lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();
        assert!(requests_for_nodebalancer(&mock, old.id).is_empty());
        assert!(mock.mutating_requests().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_without_annotation_makes_no_calls() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let mut svc = service(&[80], &[]);
        set_status(&mut svc, hostname_status("nb-45-79-0-1.us-east.nodebalancer.linode.com"));

        lbs.cleanup_old_nodebalancer(&svc, None, "a4f2e0c1a7c9b4a559e1d0b6f1c2d3e4")
            .await
            .unwrap();

        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_stale_nodebalancer_id() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let svc = service(&[80], &[(ann::NODEBALANCER_ID, "999")]);

        assert_eq!(lbs.get_load_balancer(&svc).await.unwrap(), None);
        lbs.ensure_load_balancer_deleted(&svc).await.unwrap();

        let err = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "load balancer for service (default/web) with id 999 was not found"
        );
        assert!(mock.mutating_requests().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_nodebalancer_id_does_not_block_delete() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let mut svc = service(&[80], &[]);
        let status = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();
        set_status(&mut svc, status.clone());
        set_annotation(&mut svc, ann::NODEBALANCER_ID, "not-a-number");

        assert_eq!(lbs.get_load_balancer(&svc).await.unwrap(), Some(status));

        let err = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));

        lbs.ensure_load_balancer_deleted(&svc).await.unwrap();
        assert!(all_nodebalancers(&mock).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_nodebalancer_and_owned_firewall() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let svc = service(&[80], &[(ann::FIREWALL_ACL, ALLOW_ONE)]);
        lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();
        let nb = all_nodebalancers(&mock).await[0].clone();
        let owned = mock.list_nodebalancer_firewalls(nb.id).await.unwrap()[0].id;

        lbs.ensure_load_balancer_deleted(&svc).await.unwrap();

        assert!(all_nodebalancers(&mock).await.is_empty());
        assert!(mock.get_firewall(owned).await.unwrap_err().is_not_found());

        // Deleting again is a no-op
        mock.reset_requests();
        lbs.ensure_load_balancer_deleted(&svc).await.unwrap();
        assert!(mock.mutating_requests().is_empty());
    }

    #[tokio::test]
    async fn test_preserve_annotation() {
        for (value, kept) in [("true", true), ("false", false), ("bogus", false)] {
            let mock = create_mock_client();
            let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
            let mut svc = service(&[80], &[]);
            lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();

            set_annotation(&mut svc, ann::PRESERVE, value);
            lbs.ensure_load_balancer_deleted(&svc).await.unwrap();

            assert_eq!(
                all_nodebalancers(&mock).await.len(),
                usize::from(kept),
                "preserve={}",
                value
            );
        }
    }

    #[tokio::test]
    async fn test_hostname_only_status() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), true);
        let mut svc = service(&[80], &[]);

        let status = lbs.ensure_load_balancer(&svc, &nodes()).await.unwrap();
        let ingress = status.ingress.unwrap();
        assert!(ingress[0].hostname.is_some());
        assert_eq!(ingress[0].ip, None);

        set_annotation(&mut svc, ann::HOSTNAME_ONLY_INGRESS, "false");
        let status = lbs.get_load_balancer(&svc).await.unwrap().unwrap();
        assert!(status.ingress.unwrap()[0].ip.is_some());

        remove_annotation(&mut svc, ann::HOSTNAME_ONLY_INGRESS);
        let status = lbs.get_load_balancer(&svc).await.unwrap().unwrap();
        assert_eq!(status.ingress.unwrap()[0].ip, None);
    }

    #[tokio::test]
    async fn test_get_finds_nodebalancer_by_status() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let nb = mock
            .create_nodebalancer(&NodeBalancerCreateOptions {
                label: Some("hand-made".to_string()),
                region: TEST_REGION.to_string(),
                client_conn_throttle: 20,
                configs: Vec::new(),
                tags: Vec::new(),
            })
            .await
            .unwrap();
        let mut svc = service(&[80], &[]);
        set_status(&mut svc, hostname_status(nb.hostname.as_deref().unwrap()));

        let status = lbs.get_load_balancer(&svc).await.unwrap().unwrap();
        assert_eq!(status.ingress.unwrap()[0].ip, nb.ipv4);
    }

    #[tokio::test]
    async fn test_get_by_ip_only_status_uses_ipv4_filter() {
        let mock = create_mock_client();
        let lbs = create_test_load_balancers(&mock, StaticTlsResolver::new(), false);
        let mut created = Vec::new();
        for label in ["first", "second"] {
            created.push(
                mock.create_nodebalancer(&NodeBalancerCreateOptions {
                    label: Some(label.to_string()),
                    region: TEST_REGION.to_string(),
                    client_conn_throttle: 20,
                    configs: Vec::new(),
                    tags: Vec::new(),
                })
                .await
                .unwrap(),
            );
        }
        let target = created[1].clone();
        let ip = target.ipv4.clone().unwrap();
        let mut svc = service(&[80], &[]);
        set_status(
            &mut svc,
            LoadBalancerStatus {
                ingress: Some(vec![LoadBalancerIngress {
                    ip: Some(ip.clone()),
                    ..Default::default()
                }]),
            },
        );

        mock.reset_requests();
        let status = lbs.get_load_balancer(&svc).await.unwrap().unwrap();

        assert_eq!(status.ingress.unwrap()[0].hostname, target.hostname);
        assert_eq!(mock.list_filters(), vec![ListFilter::ipv4(ip)]);
        assert_eq!(mock.requests().len(), 1);
    }
}
