//! ACL evaluation engine
//!
//! Answers "which topic operations may this credential perform on this
//! topic?" by querying every ACL that could apply to the topic (MATCH
//! filter), keeping the resources whose pattern covers the topic, and
//! folding the entries for the derived principal (or `User:*`) into allow
//! and deny sets. DENY wins. Results are cached per
//! `(connection_id, cluster_id, topic)` for a fixed TTL; failed and
//! unavailable outcomes are never cached.

use crate::admin::AdminConnectionPool;
use crate::auth::acl::{
    AclFilter, AclOperation, AclPermissionType, AclResource, TOPIC_OPERATIONS,
};
use crate::auth::credentials::Credential;
use crate::auth::principal::{derive_principal, WILDCARD_PRINCIPAL};
use crate::cluster::Cluster;
use crate::config::AclCacheConfig;
use crate::error::{KafkaAdminError, Result};
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Authorized operations for one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAclResult {
    /// Operation names, sorted
    pub authorized_operations: Vec<String>,
    pub acls_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TopicAclResult {
    pub fn available(authorized_operations: Vec<String>) -> Self {
        Self {
            authorized_operations,
            acls_available: true,
            error: None,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            authorized_operations: Vec::new(),
            acls_available: false,
            error: Some(error.into()),
        }
    }

    /// Every topic operation, as granted when no ACL applies
    pub fn open_access() -> Self {
        Self::available(open_access_operations())
    }

    pub fn is_authorized(&self, operation: AclOperation) -> bool {
        self.authorized_operations.iter().any(|op| op == operation.name())
    }
}

fn open_access_operations() -> Vec<String> {
    let mut ops: Vec<String> = TOPIC_OPERATIONS.iter().map(|op| op.name().to_string()).collect();
    ops.sort();
    ops
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Compute the operations `principal` may perform on `topic`.
///
/// Resources whose pattern does not cover the topic are skipped. When no
/// resource applies, every topic operation is authorized. Entries bound to a
/// specific host are skipped, as host restrictions cannot be checked here.
pub fn evaluate_topic_acls(topic: &str, principal: &str, resources: &[AclResource]) -> Vec<String> {
    let matched: Vec<&AclResource> = resources.iter().filter(|r| r.matches_topic(topic)).collect();
    if matched.is_empty() {
        return open_access_operations();
    }

    let mut allowed: BTreeSet<&'static str> = BTreeSet::new();
    let mut denied: BTreeSet<&'static str> = BTreeSet::new();

    let entries = matched
        .iter()
        .flat_map(|r| r.acls.iter())
        .filter(|acl| acl.principal == principal || acl.principal == WILDCARD_PRINCIPAL)
        .filter(|acl| acl.host == "*");

    for acl in entries {
        let target = match acl.permission {
            AclPermissionType::Allow => &mut allowed,
            AclPermissionType::Deny => &mut denied,
            AclPermissionType::Any | AclPermissionType::Unknown => continue,
        };
        match acl.operation {
            AclOperation::All => target.extend(TOPIC_OPERATIONS.iter().map(|op| op.name())),
            AclOperation::Any | AclOperation::Unknown => {}
            op => {
                target.insert(op.name());
            }
        }
    }

    // BTreeSet iteration is already lexicographic
    allowed
        .difference(&denied)
        .map(|op| op.to_string())
        .collect()
}

/// Whether a failed ACL query means ACLs cannot be read on this cluster
/// rather than a real error
fn is_acl_unavailable(err: &KafkaAdminError) -> bool {
    const NEEDLES: &[&str] = &[
        "security disabled",
        "security features are disabled",
        "no authorizer",
        "authorizer is not configured",
        "not authorized",
        "authorization failed",
        "not ready",
    ];
    let text = err.message().to_ascii_lowercase().replace(['_', '-'], " ");
    NEEDLES.iter().any(|needle| text.contains(needle))
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AclCacheKey {
    connection_id: String,
    cluster_id: String,
    topic: String,
}

impl AclCacheKey {
    fn new(cluster: &Cluster, topic: &str) -> Self {
        Self {
            connection_id: cluster.connection_id.clone(),
            cluster_id: cluster.cluster_id.clone(),
            topic: topic.to_string(),
        }
    }

    fn is_cluster(&self, cluster: &Cluster) -> bool {
        self.connection_id == cluster.connection_id && self.cluster_id == cluster.cluster_id
    }
}

#[derive(Debug, Clone)]
struct AclCacheEntry {
    result: TopicAclResult,
    timestamp: Instant,
}

/// Counters for cache and query activity
#[derive(Debug, Default)]
pub struct AclEngineStats {
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub queries: AtomicU64,
}

impl AclEngineStats {
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("streamline_admin_acl_cache_hits_total").increment(1);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("streamline_admin_acl_cache_misses_total").increment(1);
    }

    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("streamline_admin_acl_queries_total").increment(1);
    }
}

/// Serializable snapshot of [`AclEngineStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEngineStatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub queries: u64,
}

/// Outcome of one uncached lookup, and whether it may be cached
struct Evaluated {
    result: TopicAclResult,
    cacheable: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct AclEngine {
    pool: Arc<AdminConnectionPool>,
    cache: DashMap<AclCacheKey, AclCacheEntry>,
    cache_ttl: Duration,
    stats: AclEngineStats,
}

impl AclEngine {
    pub fn new(pool: Arc<AdminConnectionPool>, config: &AclCacheConfig) -> Self {
        Self {
            pool,
            cache: DashMap::new(),
            cache_ttl: config.cache_ttl(),
            stats: AclEngineStats::default(),
        }
    }

    /// Operations `credential` may perform on `topic`
    pub async fn get_authorized_operations(
        &self,
        cluster: &Cluster,
        topic: &str,
        credential: &Credential,
    ) -> Result<TopicAclResult> {
        let key = AclCacheKey::new(cluster, topic);
        if let Some(result) = self.cached(&key) {
            return Ok(result);
        }

        let derived = derive_principal(credential);
        let Some(principal) = derived.principal() else {
            let reason = derived.reason().unwrap_or("Principal cannot be derived");
            debug!(topic, reason, "Cannot evaluate ACLs without a principal");
            return Ok(TopicAclResult::unavailable(reason));
        };

        let evaluated = self.query_topic(cluster, topic, principal).await?;
        if evaluated.cacheable {
            self.store(key, &evaluated.result);
        }
        Ok(evaluated.result)
    }

    /// Batched [`get_authorized_operations`](Self::get_authorized_operations).
    ///
    /// Uncached topics are queried concurrently. If any query fails the first
    /// error is returned; results computed for other topics stay cached.
    pub async fn get_authorized_operations_many(
        &self,
        cluster: &Cluster,
        topics: &[String],
        credential: &Credential,
    ) -> Result<HashMap<String, TopicAclResult>> {
        let mut results = HashMap::with_capacity(topics.len());
        let mut uncached: Vec<&str> = Vec::new();
        for topic in topics {
            if results.contains_key(topic) || uncached.contains(&topic.as_str()) {
                continue;
            }
            match self.cached(&AclCacheKey::new(cluster, topic)) {
                Some(result) => {
                    results.insert(topic.clone(), result);
                }
                None => uncached.push(topic.as_str()),
            }
        }
        if uncached.is_empty() {
            return Ok(results);
        }

        let derived = derive_principal(credential);
        let Some(principal) = derived.principal() else {
            let reason = derived.reason().unwrap_or("Principal cannot be derived");
            for topic in uncached {
                results.insert(topic.to_string(), TopicAclResult::unavailable(reason));
            }
            return Ok(results);
        };

        debug!(
            cluster = %cluster.key(),
            uncached = uncached.len(),
            cached = results.len(),
            "Querying ACLs for uncached topics"
        );
        let outcomes = join_all(uncached.iter().map(|topic| self.query_topic(cluster, topic, principal))).await;

        let mut first_error = None;
        for (topic, outcome) in uncached.into_iter().zip(outcomes) {
            match outcome {
                Ok(evaluated) => {
                    if evaluated.cacheable {
                        self.store(AclCacheKey::new(cluster, topic), &evaluated.result);
                    }
                    results.insert(topic.to_string(), evaluated.result);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    async fn query_topic(&self, cluster: &Cluster, topic: &str, principal: &str) -> Result<Evaluated> {
        let handle = self
            .pool
            .get_handle(cluster)
            .await
            .map_err(|e| e.context("describe ACLs", topic))?;

        self.stats.record_query();
        let response = match handle.describe_acls(&AclFilter::topic_match(topic)).await {
            Ok(response) => response,
            Err(e) if is_acl_unavailable(&e) => {
                debug!(topic, error = %e, "ACLs unavailable on cluster");
                return Ok(Evaluated {
                    result: TopicAclResult::unavailable(e.message()),
                    cacheable: false,
                });
            }
            Err(e) => {
                if e.is_retryable() {
                    self.pool.mark_disconnected(cluster).await;
                }
                warn!(cluster = %cluster.key(), topic, error = %e, "ACL query failed");
                return Err(e.context("describe ACLs", topic));
            }
        };

        if let Some(err) = KafkaAdminError::from_kafka_code(response.error_code, response.error_message.as_deref()) {
            debug!(topic, error_code = response.error_code, "Broker reported ACL query error");
            return Ok(Evaluated {
                result: TopicAclResult::unavailable(err.message()),
                cacheable: false,
            });
        }

        let operations = evaluate_topic_acls(topic, principal, &response.resources);
        debug!(
            topic,
            principal,
            resources = response.resources.len(),
            authorized = operations.len(),
            "Evaluated topic ACLs"
        );
        Ok(Evaluated {
            result: TopicAclResult::available(operations),
            cacheable: true,
        })
    }

    fn cached(&self, key: &AclCacheKey) -> Option<TopicAclResult> {
        let fresh = self
            .cache
            .get(key)
            .filter(|entry| entry.timestamp.elapsed() < self.cache_ttl)
            .map(|entry| entry.result.clone());
        match &fresh {
            Some(_) => {
                self.stats.record_hit();
                debug!(topic = %key.topic, "ACL cache hit");
            }
            None => {
                self.stats.record_miss();
            }
        }
        fresh
    }

    fn store(&self, key: AclCacheKey, result: &TopicAclResult) {
        self.cache.insert(
            key,
            AclCacheEntry {
                result: result.clone(),
                timestamp: Instant::now(),
            },
        );
    }

    /// Drop cached results for one cluster
    pub fn clear_cache_for_cluster(&self, cluster: &Cluster) {
        self.cache.retain(|key, _| !key.is_cluster(cluster));
        debug!(cluster = %cluster.key(), "Cleared ACL cache for cluster");
    }

    /// Drop cached results for every cluster of a connection
    pub fn clear_cache_for_connection(&self, connection_id: &str) {
        self.cache.retain(|key, _| key.connection_id != connection_id);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cache entries, including expired ones not yet replaced
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> AclEngineStatsSnapshot {
        AclEngineStatsSnapshot {
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.stats.cache_misses.load(Ordering::Relaxed),
            queries: self.stats.queries.load(Ordering::Relaxed),
        }
    }
}
