//! Service graph tests: backend routing and connection lifecycle
//!
//! Run with: cargo test --test services_test

mod common;

use common::{basic, FakeAdminClient, SharedConnector};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use streamline_admin::store::StaticTokenProvider;
use streamline_admin::{
    AdminConfig, AdminServices, BackendKind, Cluster, CreateTopicOptions, ErrorCategory,
    HostCapability, InMemoryConnectionStore, ListTopicsOptions, RestFlavor,
};

fn services(client: Arc<FakeAdminClient>) -> (AdminServices, Arc<SharedConnector>) {
    let connector = SharedConnector::new(client);
    let services = AdminServices::with_connector(
        &AdminConfig::default(),
        connector.clone(),
        Arc::new(InMemoryConnectionStore::new()),
        Arc::new(StaticTokenProvider::new("token")),
    )
    .unwrap();
    (services, connector)
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_backend_selection_per_cluster() {
    let (services, _) = services(FakeAdminClient::new());

    let cases = [
        (Cluster::cloud("cc", "lkc-1", "https://rest"), BackendKind::Rest(RestFlavor::Cloud)),
        (Cluster::local("local", "dev", "http://localhost:8082"), BackendKind::Rest(RestFlavor::Local)),
        (Cluster::direct("conn", "c1", &["localhost:9092"]), BackendKind::Native),
        (
            Cluster::direct("conn", "c1", &["localhost:9092"]).with_capability(HostCapability::HttpOnly),
            BackendKind::Rest(RestFlavor::Cloud),
        ),
    ];
    for (cluster, expected) in cases {
        assert_eq!(services.topic_service(&cluster).kind(), expected, "{:?}", cluster.connection_type);
    }
    assert_eq!(
        services.topics().backend(BackendKind::Rest(RestFlavor::Legacy)).kind(),
        BackendKind::Rest(RestFlavor::Legacy)
    );
}

// ============================================================================
// Native backend over the pool
// ============================================================================

#[tokio::test]
async fn test_native_topics_share_one_handle() {
    let client = FakeAdminClient::new();
    client.add_topic("orders", 3, &[1, 2, 3], false);
    client.add_topic("__consumer_offsets", 50, &[1], true);
    let (services, connector) = services(client.clone());
    let cluster = Cluster::direct("conn", "c1", &["localhost:9092"]);
    let topics = services.topic_service(&cluster);

    let listed = topics.list_topics(&cluster, &ListTopicsOptions::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    let all = topics
        .list_topics(&cluster, &ListTopicsOptions { include_internal: true })
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let info = topics.describe_topic(&cluster, "orders").await.unwrap();
    assert_eq!(info.replication_factor, 3);
    assert_eq!(info.partitions[0].isr, vec![1, 2, 3]);

    services
        .acl()
        .get_authorized_operations(&cluster, "orders", &basic("alice", "pw"))
        .await
        .unwrap();
    assert_eq!(connector.open_count(), 1);
    assert_eq!(services.pool().stats().reused, 3);
    services.dispose().await;
}

#[tokio::test]
async fn test_create_topic_defaults_let_broker_decide() {
    let client = FakeAdminClient::new();
    let (services, _) = services(client.clone());
    let cluster = Cluster::direct("conn", "c1", &["localhost:9092"]);

    services
        .topic_service(&cluster)
        .create_topic(&cluster, &CreateTopicOptions::new("events").with_config("retention.ms", "1000"))
        .await
        .unwrap();

    let created = client.created.lock();
    let (topic, validate_only) = &created[0];
    assert_eq!(topic.name, "events");
    assert_eq!(topic.num_partitions, -1);
    assert_eq!(topic.replication_factor, -1);
    assert_eq!(topic.configs.get("retention.ms").map(String::as_str), Some("1000"));
    assert!(!validate_only);
}

#[tokio::test]
async fn test_disconnected_handle_is_reconnected() {
    let client = FakeAdminClient::new();
    client.add_topic("orders", 1, &[1], false);
    let (services, connector) = services(client.clone());
    let cluster = Cluster::direct("conn", "c1", &["localhost:9092"]);
    let topics = services.topic_service(&cluster);

    topics.describe_topic(&cluster, "orders").await.unwrap();
    client.connected.store(false, Ordering::SeqCst);
    topics.describe_topic(&cluster, "orders").await.unwrap();

    assert_eq!(client.reconnects.load(Ordering::SeqCst), 1);
    assert_eq!(connector.open_count(), 1);
    assert_eq!(services.pool().stats().reconnected, 1);
    services.dispose().await;
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_forget_connection_drops_handles_and_cache() {
    let client = FakeAdminClient::new();
    let (services, connector) = services(client.clone());
    let cluster = Cluster::direct("conn", "c1", &["localhost:9092"]);
    let alice = basic("alice", "pw");

    services.acl().get_authorized_operations(&cluster, "orders", &alice).await.unwrap();
    assert_eq!(services.acl().cache_len(), 1);
    assert_eq!(services.pool().len().await, 1);

    services.forget_connection("conn").await;
    assert_eq!(services.acl().cache_len(), 0);
    assert!(services.pool().is_empty().await);

    services.acl().get_authorized_operations(&cluster, "orders", &alice).await.unwrap();
    assert_eq!(connector.open_count(), 2);
    assert_eq!(client.acl_query_count(), 2);
    services.dispose().await;
}

#[tokio::test]
async fn test_disposed_services_reject_native_calls() {
    let (services, _) = services(FakeAdminClient::new());
    let cluster = Cluster::direct("conn", "c1", &["localhost:9092"]);
    services.dispose().await;
    services.dispose().await;

    let err = services
        .topic_service(&cluster)
        .list_topics(&cluster, &ListTopicsOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Invalid);
}
