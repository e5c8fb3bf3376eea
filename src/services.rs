//! Process-wide service graph
//!
//! Build once at startup and share by reference. `dispose` tears everything
//! down, which also gives tests a clean slate.

use crate::acl_engine::AclEngine;
use crate::admin::{AdminConnectionPool, AdminConnector};
use crate::cluster::Cluster;
use crate::config::AdminConfig;
use crate::error::Result;
use crate::protocol::NativeConnector;
use crate::store::{ConnectionStore, TokenProvider};
use crate::topics::{TopicService, TopicServiceFactory};
use std::sync::Arc;
use tracing::info;

pub struct AdminServices {
    pool: Arc<AdminConnectionPool>,
    acl: AclEngine,
    topics: TopicServiceFactory,
}

impl AdminServices {
    /// Wire the services with the native Kafka connector. Starts the pool reaper,
    /// so this must run inside a Tokio runtime.
    pub fn new(
        config: &AdminConfig,
        store: Arc<dyn ConnectionStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let connector = Arc::new(NativeConnector::new(config.native.clone()));
        Self::with_connector(config, connector, store, tokens)
    }

    pub fn with_connector(
        config: &AdminConfig,
        connector: Arc<dyn AdminConnector>,
        store: Arc<dyn ConnectionStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let pool = AdminConnectionPool::start(config.pool.clone(), connector, store.clone());
        let acl = AclEngine::new(pool.clone(), &config.acl);
        let topics = TopicServiceFactory::new(pool.clone(), &config.http, store, tokens)?;
        info!(
            idle_ttl_secs = config.pool.idle_ttl_secs,
            acl_cache_ttl_secs = config.acl.cache_ttl_secs,
            "Admin services started"
        );
        Ok(Self { pool, acl, topics })
    }

    pub fn pool(&self) -> &Arc<AdminConnectionPool> {
        &self.pool
    }

    pub fn acl(&self) -> &AclEngine {
        &self.acl
    }

    pub fn topics(&self) -> &TopicServiceFactory {
        &self.topics
    }

    /// Topic backend for `cluster`
    pub fn topic_service(&self, cluster: &Cluster) -> Arc<dyn TopicService> {
        self.topics.for_cluster(cluster)
    }

    /// Drop every cached handle and result belonging to one connection
    pub async fn forget_connection(&self, connection_id: &str) {
        self.pool.invalidate_connection(connection_id).await;
        self.acl.clear_cache_for_connection(connection_id);
    }

    pub async fn dispose(&self) {
        self.pool.dispose().await;
        self.acl.clear_cache();
        self.topics.reset();
    }
}
