//! Backend selection

use super::{NativeTopicService, RestFlavor, RestTopicService, TopicService};
use crate::admin::AdminConnectionPool;
use crate::cluster::{Cluster, ConnectionType, HostCapability};
use crate::config::HttpConfig;
use crate::error::Result;
use crate::store::{ConnectionStore, TokenProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which topic backend serves a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "backend", content = "flavor")]
pub enum BackendKind {
    Native,
    Rest(RestFlavor),
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Native => f.write_str("native"),
            BackendKind::Rest(flavor) => write!(f, "rest/{}", flavor),
        }
    }
}

/// Pick the backend for `cluster`.
///
/// Local clusters always go through their REST proxy, which is the only
/// source of authorized operations for local topics. Direct clusters use the
/// native protocol unless the host cannot open sockets.
pub fn select_backend(cluster: &Cluster) -> BackendKind {
    match (cluster.connection_type, cluster.capability) {
        (ConnectionType::CloudManaged, _) => BackendKind::Rest(RestFlavor::Cloud),
        (ConnectionType::SelfHostedLocal, _) => BackendKind::Rest(RestFlavor::Local),
        (ConnectionType::SelfHostedDirect, HostCapability::NativeSockets) => BackendKind::Native,
        (ConnectionType::SelfHostedDirect, HostCapability::HttpOnly) => BackendKind::Rest(RestFlavor::Cloud),
    }
}

/// Holds one instance of every backend and hands out the right one
pub struct TopicServiceFactory {
    native: Arc<NativeTopicService>,
    legacy: Arc<RestTopicService>,
    cloud: Arc<RestTopicService>,
    local: Arc<RestTopicService>,
}

impl TopicServiceFactory {
    pub fn new(
        pool: Arc<AdminConnectionPool>,
        http: &HttpConfig,
        store: Arc<dyn ConnectionStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let rest = |flavor| RestTopicService::new(flavor, http, store.clone(), tokens.clone()).map(Arc::new);
        Ok(Self {
            native: Arc::new(NativeTopicService::new(pool)),
            legacy: rest(RestFlavor::Legacy)?,
            cloud: rest(RestFlavor::Cloud)?,
            local: rest(RestFlavor::Local)?,
        })
    }

    /// Backend for `cluster` per [`select_backend`]
    pub fn for_cluster(&self, cluster: &Cluster) -> Arc<dyn TopicService> {
        let kind = select_backend(cluster);
        debug!(cluster = %cluster.key(), backend = %kind, "Selected topic backend");
        self.backend(kind)
    }

    pub fn backend(&self, kind: BackendKind) -> Arc<dyn TopicService> {
        match kind {
            BackendKind::Native => self.native.clone(),
            BackendKind::Rest(RestFlavor::Legacy) => self.legacy.clone(),
            BackendKind::Rest(RestFlavor::Cloud) => self.cloud.clone(),
            BackendKind::Rest(RestFlavor::Local) => self.local.clone(),
        }
    }

    /// Forget cached REST cluster ids
    pub fn reset(&self) {
        self.legacy.clear_cluster_ids();
        self.cloud.clear_cluster_ids();
        self.local.clear_cluster_ids();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_always_rest_cloud() {
        for capability in [HostCapability::NativeSockets, HostCapability::HttpOnly] {
            let cluster = Cluster::cloud("ccloud", "lkc-1", "https://rest").with_capability(capability);
            assert_eq!(select_backend(&cluster), BackendKind::Rest(RestFlavor::Cloud));
        }
    }

    #[test]
    fn test_local_always_rest_local() {
        for capability in [HostCapability::NativeSockets, HostCapability::HttpOnly] {
            let cluster = Cluster::local("local", "dev", "http://localhost:8082").with_capability(capability);
            assert_eq!(select_backend(&cluster), BackendKind::Rest(RestFlavor::Local));
        }
    }

    #[test]
    fn test_direct_depends_on_capability() {
        let cluster = Cluster::direct("conn", "c1", &["localhost:9092"]);
        assert_eq!(select_backend(&cluster), BackendKind::Native);
        let cluster = cluster.with_capability(HostCapability::HttpOnly);
        assert_eq!(select_backend(&cluster), BackendKind::Rest(RestFlavor::Cloud));
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Native.to_string(), "native");
        assert_eq!(BackendKind::Rest(RestFlavor::Local).to_string(), "rest/local");
    }
}
