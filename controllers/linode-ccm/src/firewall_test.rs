//! Unit tests for firewall ACL translation and attachment

#[cfg(test)]
mod tests {
    use crate::firewall::*;
    use crate::test_utils::create_mock_client;
    use linode_client::{
        FirewallCreateOptions, FirewallDevicesCreateOptions, FirewallPolicy, FirewallRuleSet,
        LinodeClientTrait, NodeBalancerCreateOptions,
    };

    fn addresses(count: usize, v6: bool) -> Vec<String> {
        (0..count)
            .map(|i| {
                if v6 {
                    format!("2001:db8::{:x}/128", i)
                } else {
                    format!("10.{}.{}.1/32", i / 256, i % 256)
                }
            })
            .collect()
    }

    #[test]
    fn test_parse_requires_exactly_one_list() {
        assert!(matches!(
            FirewallAcl::parse(r#"{"allowList": {"ipv4": ["1.1.1.1/32"]}}"#),
            Ok(FirewallAcl::Allow(_))
        ));
        assert!(matches!(
            FirewallAcl::parse(r#"{"denyList": {"ipv6": ["::1/128"]}}"#),
            Ok(FirewallAcl::Deny(_))
        ));
        assert!(FirewallAcl::parse(r#"{"allowList": {}, "denyList": {}}"#).is_err());
        assert!(FirewallAcl::parse("{}").is_err());
        assert!(FirewallAcl::parse("not json").is_err());
    }

    #[test]
    fn test_large_allow_list_is_chunked() {
        let acl = FirewallAcl::Allow(AddressList {
            ipv4: addresses(400, false),
            ipv6: addresses(300, true),
        });

        let rules = rule_set_for_acl(&acl, &[80, 443], "a1234", "web");

        assert_eq!(rules.inbound.len(), 4);
        assert_eq!(rules.inbound_policy, FirewallPolicy::Drop);
        assert_eq!(rules.outbound_policy, FirewallPolicy::Accept);
        assert!(rules.outbound.is_empty());

        let sizes = rules
            .inbound
            .iter()
            .map(|r| {
                (
                    r.addresses.ipv4.as_ref().map_or(0, Vec::len),
                    r.addresses.ipv6.as_ref().map_or(0, Vec::len),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![(255, 0), (145, 0), (0, 255), (0, 45)]);

        for rule in &rules.inbound {
            assert_eq!(rule.action, FirewallPolicy::Accept);
            assert_eq!(rule.ports.as_deref(), Some("80,443"));
            assert_eq!(rule.label, "ACCEPT-web");
        }
    }

    #[test]
    fn test_deny_list_policy() {
        let acl = FirewallAcl::Deny(AddressList {
            ipv4: vec!["192.0.2.0/24".to_string()],
            ipv6: Vec::new(),
        });

        let rules = rule_set_for_acl(&acl, &[80], "a1234", "web");

        assert_eq!(rules.inbound.len(), 1);
        assert_eq!(rules.inbound[0].action, FirewallPolicy::Drop);
        assert_eq!(rules.inbound_policy, FirewallPolicy::Accept);
    }

    async fn nodebalancer(client: &dyn LinodeClientTrait) -> u64 {
        client
            .create_nodebalancer(&NodeBalancerCreateOptions {
                label: Some("a1234".to_string()),
                region: "us-east".to_string(),
                client_conn_throttle: 20,
                configs: Vec::new(),
                tags: Vec::new(),
            })
            .await
            .unwrap()
            .id
    }

    fn target<'a>(nb_id: u64, ports: &'a [u16]) -> FirewallTarget<'a> {
        FirewallTarget {
            nodebalancer_id: nb_id,
            owned_label: "a1234",
            service_name: "web",
            ports,
            tags: &[],
        }
    }

    #[tokio::test]
    async fn test_acl_creates_owned_firewall_once() {
        let mock = create_mock_client();
        let nb_id = nodebalancer(&mock).await;
        let acl = FirewallSpec::Acl(FirewallAcl::parse(r#"{"allowList": {"ipv4": ["1.1.1.1/32"]}}"#).unwrap());

        reconcile_firewall(&mock, &target(nb_id, &[80]), Some(&acl)).await.unwrap();
        let attached = mock.list_nodebalancer_firewalls(nb_id).await.unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].label, "a1234");

        mock.reset_requests();
        reconcile_firewall(&mock, &target(nb_id, &[80]), Some(&acl)).await.unwrap();
        assert!(mock.mutating_requests().is_empty());
    }

    #[tokio::test]
    async fn test_none_detaches_foreign_firewall_without_deleting_it() {
        let mock = create_mock_client();
        let nb_id = nodebalancer(&mock).await;
        let foreign = mock
            .create_firewall(&FirewallCreateOptions {
                label: "shared-fw".to_string(),
                rules: FirewallRuleSet::default(),
                tags: Vec::new(),
                devices: FirewallDevicesCreateOptions {
                    linodes: Vec::new(),
                    nodebalancers: vec![nb_id],
                },
            })
            .await
            .unwrap();

        reconcile_firewall(&mock, &target(nb_id, &[80]), None).await.unwrap();

        assert!(mock.list_nodebalancer_firewalls(nb_id).await.unwrap().is_empty());
        assert!(mock.get_firewall(foreign.id).await.is_ok());
        assert!(!mock.did_request_occur("DELETE", &format!("/networking/firewalls/{}", foreign.id)));
    }

    #[tokio::test]
    async fn test_delete_owned_firewalls() {
        let mock = create_mock_client();
        let nb_id = nodebalancer(&mock).await;
        let acl = FirewallSpec::Acl(FirewallAcl::parse(r#"{"denyList": {"ipv4": ["1.1.1.1/32"]}}"#).unwrap());
        reconcile_firewall(&mock, &target(nb_id, &[80]), Some(&acl)).await.unwrap();
        let owned = mock.list_nodebalancer_firewalls(nb_id).await.unwrap()[0].id;

        delete_owned_firewalls(&mock, nb_id, "a1234").await.unwrap();

        assert!(mock.get_firewall(owned).await.unwrap_err().is_not_found());
    }
}
