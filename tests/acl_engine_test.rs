//! ACL engine integration tests over a fake admin client
//!
//! Run with: cargo test --test acl_engine_test

mod common;

use common::{basic, fake_pool, security_disabled, FakeAdminClient};
use std::time::Duration;
use streamline_admin::auth::acl::{
    AclEntry, AclOperation, AclResource, DescribeAclsResult, PatternType,
};
use streamline_admin::config::AclCacheConfig;
use streamline_admin::{AclEngine, Cluster, Credential, ErrorCategory, KafkaAdminError};

fn cluster() -> Cluster {
    Cluster::direct("conn-1", "cluster-1", &["localhost:9092"])
}

fn engine_with(client: std::sync::Arc<FakeAdminClient>) -> AclEngine {
    let (pool, _) = fake_pool(client);
    AclEngine::new(pool, &AclCacheConfig::default())
}

fn alice_can_read_orders() -> Vec<AclResource> {
    vec![AclResource::topic(
        "orders",
        PatternType::Literal,
        vec![AclEntry::allow("User:alice", AclOperation::Read)],
    )]
}

// ============================================================================
// Single-topic queries
// ============================================================================

#[tokio::test]
async fn test_result_is_cached_per_topic() {
    let client = FakeAdminClient::new();
    client.set_acls(alice_can_read_orders());
    let engine = engine_with(client.clone());
    let alice = basic("alice", "secret");

    let first = engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    let second = engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();

    assert!(first.acls_available);
    assert_eq!(first.authorized_operations, vec!["READ".to_string()]);
    assert_eq!(first, second);
    assert_eq!(client.acl_query_count(), 1);

    let stats = engine.stats();
    assert_eq!(stats.queries, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[tokio::test]
async fn test_no_bindings_means_open_access_and_is_cached() {
    let client = FakeAdminClient::new();
    client.set_acls(vec![]);
    let engine = engine_with(client.clone());
    let alice = basic("alice", "secret");

    let first = engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    assert!(first.acls_available);
    assert!(first.error.is_none());
    assert_eq!(
        first.authorized_operations,
        vec![
            "ALTER",
            "ALTER_CONFIGS",
            "CREATE",
            "DELETE",
            "DESCRIBE",
            "DESCRIBE_CONFIGS",
            "READ",
            "WRITE",
        ]
    );

    let second = engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(client.acl_query_count(), 1);
    assert_eq!(engine.cache_len(), 1);
}

#[tokio::test]
async fn test_query_filter_matches_every_pattern_for_topic() {
    let client = FakeAdminClient::new();
    let engine = engine_with(client.clone());

    engine
        .get_authorized_operations(&cluster(), "orders", &basic("alice", "pw"))
        .await
        .unwrap();

    let filters = client.acl_filters.lock();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].resource_name.as_deref(), Some("orders"));
    assert_eq!(filters[0].pattern_type, PatternType::Match);
    assert!(filters[0].principal.is_none());
}

#[tokio::test]
async fn test_no_matching_acls_means_no_operations() {
    let client = FakeAdminClient::new();
    client.set_acls(alice_can_read_orders());
    let engine = engine_with(client);

    let result = engine
        .get_authorized_operations(&cluster(), "orders", &basic("bob", "pw"))
        .await
        .unwrap();
    assert!(result.acls_available);
    assert!(result.authorized_operations.is_empty());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_security_disabled_is_unavailable_not_error() {
    let client = FakeAdminClient::new();
    client.push_acl_result(Err(security_disabled()));
    client.set_acls(alice_can_read_orders());
    let engine = engine_with(client.clone());
    let alice = basic("alice", "pw");

    let result = engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    assert!(!result.acls_available);
    assert!(result.authorized_operations.is_empty());
    assert!(result.error.is_some());

    // Unavailable answers are not cached; the next call asks again
    let result = engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    assert!(result.acls_available);
    assert_eq!(client.acl_query_count(), 2);
}

#[tokio::test]
async fn test_broker_error_code_is_unavailable() {
    let client = FakeAdminClient::new();
    client.push_acl_result(Ok(DescribeAclsResult {
        error_code: 54,
        error_message: Some("No Authorizer is configured on the broker".to_string()),
        resources: vec![],
    }));
    let engine = engine_with(client);

    let result = engine
        .get_authorized_operations(&cluster(), "orders", &basic("alice", "pw"))
        .await
        .unwrap();
    assert!(!result.acls_available);
    assert!(result.error.unwrap().contains("Authorizer"));
    assert_eq!(engine.cache_len(), 0);
}

#[tokio::test]
async fn test_query_failure_propagates_and_is_not_cached() {
    let client = FakeAdminClient::new();
    client.push_acl_result(Err(KafkaAdminError::transient("connection reset by peer")));
    client.set_acls(alice_can_read_orders());
    let engine = engine_with(client.clone());
    let alice = basic("alice", "pw");

    let err = engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transient);
    assert!(err.is_retryable());
    assert!(err.message().contains("orders"));
    assert_eq!(engine.cache_len(), 0);

    let result = engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    assert_eq!(result.authorized_operations, vec!["READ".to_string()]);
    assert_eq!(client.acl_query_count(), 2);
}

#[tokio::test]
async fn test_underivable_principal_skips_query() {
    let client = FakeAdminClient::new();
    let engine = engine_with(client.clone());

    let result = engine
        .get_authorized_operations(&cluster(), "orders", &Credential::None)
        .await
        .unwrap();
    assert!(!result.acls_available);
    assert!(result.error.is_some());
    assert_eq!(client.acl_query_count(), 0);
    assert_eq!(engine.cache_len(), 0);
}

#[tokio::test]
async fn test_cloud_cluster_fails_invalid() {
    let client = FakeAdminClient::new();
    let engine = engine_with(client);
    let cloud = Cluster::cloud("ccloud", "lkc-1", "https://rest.example.com");

    let err = engine
        .get_authorized_operations(&cloud, "orders", &basic("alice", "pw"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Invalid);
}

// ============================================================================
// Cache lifetime
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cache_entry_expires_after_ttl() {
    let client = FakeAdminClient::new();
    client.set_acls(alice_can_read_orders());
    let engine = engine_with(client.clone());
    let alice = basic("alice", "pw");

    engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(59)).await;
    engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    assert_eq!(client.acl_query_count(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    assert_eq!(client.acl_query_count(), 2);
}

#[tokio::test]
async fn test_clear_cache_for_cluster_only_touches_that_cluster() {
    let client = FakeAdminClient::new();
    let engine = engine_with(client.clone());
    let alice = basic("alice", "pw");
    let other = Cluster::direct("conn-1", "cluster-2", &["localhost:9093"]);

    engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    engine
        .get_authorized_operations(&other, "orders", &alice)
        .await
        .unwrap();
    assert_eq!(engine.cache_len(), 2);

    engine.clear_cache_for_cluster(&cluster());
    assert_eq!(engine.cache_len(), 1);

    engine
        .get_authorized_operations(&other, "orders", &alice)
        .await
        .unwrap();
    assert_eq!(client.acl_query_count(), 2);

    engine.clear_cache_for_connection("conn-1");
    assert_eq!(engine.cache_len(), 0);
}

// ============================================================================
// Batched queries
// ============================================================================

#[tokio::test]
async fn test_batch_merges_cached_and_fresh_results() {
    let client = FakeAdminClient::new();
    client.set_acls(vec![AclResource::topic(
        "*",
        PatternType::Literal,
        vec![AclEntry::allow("User:alice", AclOperation::Describe)],
    )]);
    let engine = engine_with(client.clone());
    let alice = basic("alice", "pw");

    engine
        .get_authorized_operations(&cluster(), "orders", &alice)
        .await
        .unwrap();
    assert_eq!(client.acl_query_count(), 1);

    let topics = vec![
        "orders".to_string(),
        "payments".to_string(),
        "audit".to_string(),
        "payments".to_string(),
    ];
    let results = engine
        .get_authorized_operations_many(&cluster(), &topics, &alice)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    for result in results.values() {
        assert_eq!(result.authorized_operations, vec!["DESCRIBE".to_string()]);
    }
    // orders came from the cache, duplicates were queried once
    assert_eq!(client.acl_query_count(), 3);
}

#[tokio::test]
async fn test_batch_returns_first_error_and_keeps_other_results() {
    let client = FakeAdminClient::new();
    client.push_acl_result(Err(KafkaAdminError::unknown("broker exploded")));
    let engine = engine_with(client.clone());
    let alice = basic("alice", "pw");

    let topics = vec!["a".to_string(), "b".to_string()];
    let err = engine
        .get_authorized_operations_many(&cluster(), &topics, &alice)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unknown);

    // The topic that succeeded was cached
    assert_eq!(engine.cache_len(), 1);
    engine
        .get_authorized_operations_many(&cluster(), &topics, &alice)
        .await
        .unwrap();
    assert_eq!(client.acl_query_count(), 3);
}

#[tokio::test]
async fn test_batch_without_principal_marks_all_unavailable() {
    let client = FakeAdminClient::new();
    let engine = engine_with(client.clone());
    let oauth = Credential::from_value(serde_json::json!({
        "type": "oauth",
        "tokensUrl": "https://idp.example.com/token",
        "clientId": "app",
    }));

    let topics = vec!["a".to_string(), "b".to_string()];
    let results = engine
        .get_authorized_operations_many(&cluster(), &topics, &oauth)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.values().all(|r| !r.acls_available));
    assert_eq!(client.acl_query_count(), 0);
}
