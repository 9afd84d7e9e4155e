// Service-level tests: provider-first write ordering, idempotent
// apply/revoke degradation, and not-found semantics, against a wiremock
// enforcement endpoint.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fwsync_core::translate::rule_number_for;
use fwsync_core::{
    CoreError, CreateRuleRequest, Direction, EnforcementGateway, FirewallService, PortRange,
    Protocol, ProviderSettings, RuleAction, RuleStatus, RuleStore, StaticSettings, SyncStatus,
    UpdateRuleRequest,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn settings_for(server: &MockServer) -> ProviderSettings {
    ProviderSettings {
        allow_list_id: Some("al-1".into()),
        ordered_list_id: Some("ol-1".into()),
        region: "us-east-1".into(),
        api_key: SecretString::from("test-key"),
        endpoint: Some(server.uri().parse().expect("mock server uri")),
    }
}

fn service_for(server: &MockServer) -> (Arc<RuleStore>, FirewallService) {
    let store = Arc::new(RuleStore::in_memory());
    let gateway = Arc::new(EnforcementGateway::new(Arc::new(StaticSettings::new(
        settings_for(server),
    ))));
    let service = FirewallService::new(Arc::clone(&store), gateway);
    (store, service)
}

fn ssh_allow_rule() -> CreateRuleRequest {
    CreateRuleRequest {
        name: "ssh".into(),
        action: RuleAction::Allow,
        direction: Direction::Ingress,
        protocol: Protocol::Tcp,
        port_range: Some(PortRange { from: 22, to: 22 }),
        source: None,
        destination: None,
        status: RuleStatus::Enabled,
    }
}

fn smtp_deny_rule() -> CreateRuleRequest {
    CreateRuleRequest {
        name: "block-smtp".into(),
        action: RuleAction::Deny,
        direction: Direction::Ingress,
        protocol: Protocol::Tcp,
        port_range: Some(PortRange { from: 25, to: 25 }),
        source: Some("203.0.113.9".into()),
        destination: None,
        status: RuleStatus::Enabled,
    }
}

// ── Create ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_allow_rule_authorizes_with_normalized_entry() {
    let server = MockServer::start().await;
    let (store, service) = service_for(&server);

    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/authorize"))
        .and(body_json(json!({
            "protocol": "tcp",
            "fromPort": 22,
            "toPort": 22,
            "ipRanges": ["0.0.0.0/0"],
            "ipv6Ranges": ["::/0"],
            "direction": "ingress"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let rule = service.create_rule(ssh_allow_rule()).await.expect("create");

    assert_eq!(rule.sync_status, SyncStatus::Synced);
    assert_eq!(rule.sync_error, None);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn create_aborts_without_store_write_on_provider_failure() {
    let server = MockServer::start().await;
    let (store, service) = service_for(&server);

    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/authorize"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "internal failure"
        })))
        .mount(&server)
        .await;

    let err = service.create_rule(ssh_allow_rule()).await.unwrap_err();

    assert!(matches!(err, CoreError::Provider { .. }));
    assert!(store.is_empty());
}

#[tokio::test]
async fn create_treats_already_exists_as_success() {
    let server = MockServer::start().await;
    let (store, service) = service_for(&server);

    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/authorize"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "entry already exists"
        })))
        .mount(&server)
        .await;

    let rule = service.create_rule(ssh_allow_rule()).await.expect("create");

    assert_eq!(rule.sync_status, SyncStatus::Synced);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn create_disabled_rule_skips_the_provider() {
    let server = MockServer::start().await;
    let (store, service) = service_for(&server);

    let rule = service
        .create_rule(CreateRuleRequest {
            status: RuleStatus::Disabled,
            ..ssh_allow_rule()
        })
        .await
        .expect("create");

    assert_eq!(rule.sync_status, SyncStatus::NotApplicable);
    assert_eq!(rule.sync_error.as_deref(), Some("rule is disabled"));
    assert_eq!(store.len(), 1);
    assert!(server.received_requests().await.expect("requests").is_empty());
}

#[tokio::test]
async fn create_surfaces_missing_configuration() {
    let store = Arc::new(RuleStore::in_memory());
    let gateway = Arc::new(EnforcementGateway::new(Arc::new(
        StaticSettings::unconfigured(),
    )));
    let service = FirewallService::new(Arc::clone(&store), gateway);

    let err = service.create_rule(ssh_allow_rule()).await.unwrap_err();

    assert!(matches!(err, CoreError::Configuration { .. }));
    assert!(store.is_empty());
}

#[tokio::test]
async fn create_deny_rule_puts_numbered_entry() {
    let server = MockServer::start().await;
    let (store, service) = service_for(&server);

    // The slot is derived from the generated id, so match loosely on the
    // path prefix and verify the stored rule afterwards.
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let rule = service.create_rule(smtp_deny_rule()).await.expect("create");
    assert_eq!(rule.sync_status, SyncStatus::Synced);
    assert_eq!(store.len(), 1);

    let expected_slot = rule_number_for(&rule.id);
    let requests = server.received_requests().await.expect("requests");
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url.path(),
        format!("/v1/ordered-lists/ol-1/entries/{expected_slot}")
    );

    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    assert_eq!(body["ruleNumber"], u64::from(expected_slot));
    assert_eq!(body["protocol"], "6");
    assert_eq!(body["ruleAction"], "deny");
    assert_eq!(body["egress"], false);
    assert_eq!(body["cidrBlock"], "203.0.113.9/32");
    assert_eq!(body["portRange"], json!({ "from": 25, "to": 25 }));
}

// ── Update ──────────────────────────────────────────────────────────

#[tokio::test]
async fn update_reuses_the_slot_when_revoke_finds_nothing() {
    let server = MockServer::start().await;
    let (store, service) = service_for(&server);

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let rule = service.create_rule(smtp_deny_rule()).await.expect("create");
    let slot = rule_number_for(&rule.id);
    server.reset().await;

    // Old representation already gone from the provider.
    Mock::given(method("DELETE"))
        .and(path(format!("/v1/ordered-lists/ol-1/entries/{slot}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "no such entry"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("/v1/ordered-lists/ol-1/entries/{slot}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let updated = service
        .update_rule(
            &rule.id,
            UpdateRuleRequest {
                port_range: Some(PortRange { from: 26, to: 26 }),
                ..UpdateRuleRequest::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.port_range, Some(PortRange { from: 26, to: 26 }));
    assert_eq!(updated.sync_status, SyncStatus::Synced);
    let stored = store.get(&rule.id).expect("stored");
    assert_eq!(stored.port_range, Some(PortRange { from: 26, to: 26 }));
}

#[tokio::test]
async fn update_keeps_stored_record_when_apply_fails() {
    let server = MockServer::start().await;
    let (store, service) = service_for(&server);

    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/authorize"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let rule = service.create_rule(ssh_allow_rule()).await.expect("create");
    server.reset().await;

    // Revoke of the old representation succeeds, re-apply fails.
    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/revoke"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/authorize"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "internal failure"
        })))
        .mount(&server)
        .await;

    let err = service
        .update_rule(
            &rule.id,
            UpdateRuleRequest {
                port_range: Some(PortRange { from: 2222, to: 2222 }),
                ..UpdateRuleRequest::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Provider { .. }));
    let stored = store.get(&rule.id).expect("stored");
    assert_eq!(stored.port_range, Some(PortRange { from: 22, to: 22 }));
    assert_eq!(stored.sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn update_missing_rule_is_not_found() {
    let server = MockServer::start().await;
    let (_store, service) = service_for(&server);

    let err = service
        .update_rule(&Uuid::new_v4(), UpdateRuleRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound { .. }));
    assert!(server.received_requests().await.expect("requests").is_empty());
}

// ── Delete ──────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_store_record_then_revokes() {
    let server = MockServer::start().await;
    let (store, service) = service_for(&server);

    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/authorize"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let rule = service.create_rule(ssh_allow_rule()).await.expect("create");
    server.reset().await;

    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/revoke"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    service.delete_rule(&rule.id).await.expect("delete");
    assert!(store.is_empty());
}

#[tokio::test]
async fn delete_missing_rule_never_reaches_the_gateway() {
    let server = MockServer::start().await;
    let (_store, service) = service_for(&server);

    let err = service.delete_rule(&Uuid::new_v4()).await.unwrap_err();

    assert!(matches!(err, CoreError::NotFound { .. }));
    assert!(server.received_requests().await.expect("requests").is_empty());
}

#[tokio::test]
async fn delete_drops_the_record_even_when_revoke_fails() {
    let server = MockServer::start().await;
    let (store, service) = service_for(&server);

    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/authorize"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    let rule = service.create_rule(ssh_allow_rule()).await.expect("create");
    server.reset().await;

    Mock::given(method("POST"))
        .and(path("/v1/allow-lists/al-1/revoke"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "internal failure"
        })))
        .mount(&server)
        .await;

    let err = service.delete_rule(&rule.id).await.unwrap_err();

    // The store row goes first; the provider entry is orphaned and the
    // failure surfaces for the operator to repair.
    assert!(matches!(err, CoreError::Provider { .. }));
    assert!(store.is_empty());
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn get_rule_missing_is_not_found() {
    let server = MockServer::start().await;
    let (_store, service) = service_for(&server);

    let missing = Uuid::new_v4();
    let err = service.get_rule(&missing).unwrap_err();
    match err {
        CoreError::NotFound { id } => assert_eq!(id, missing),
        other => panic!("expected NotFound, got {other:?}"),
    }
}
