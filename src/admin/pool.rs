//! Admin connection pool
//!
//! One admin handle per `(connection_id, cluster_id)`. Handles are reused
//! while connected, reconnected once when found disconnected, and closed by
//! a background reaper after sitting idle past the TTL. Each key has its own
//! async mutex, so concurrent callers for the same cluster share a single
//! open while different clusters proceed in parallel.

use super::{
    AdminClient, AdminConnectionConfig, AdminConnector, ClientCertificate, TlsSettings,
};
use crate::auth::credentials::Credential;
use crate::auth::sasl::to_sasl_config;
use crate::cluster::{Cluster, ClusterKey, ConnectionType};
use crate::config::PoolConfig;
use crate::error::{KafkaAdminError, Result};
use crate::store::ConnectionStore;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Pooled entries
// ---------------------------------------------------------------------------

struct PooledAdminHandle {
    handle: Arc<dyn AdminClient>,
    last_access: Instant,
    connected: bool,
}

impl PooledAdminHandle {
    fn new(handle: Arc<dyn AdminClient>) -> Self {
        Self {
            handle,
            last_access: Instant::now(),
            connected: true,
        }
    }

    fn touch(&mut self) -> Arc<dyn AdminClient> {
        self.last_access = Instant::now();
        self.handle.clone()
    }
}

type Slot = Arc<Mutex<Option<PooledAdminHandle>>>;

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Atomic counters for pool activity
#[derive(Debug, Default)]
pub struct PoolStats {
    pub opened: AtomicU64,
    pub reused: AtomicU64,
    pub reconnected: AtomicU64,
    pub evicted: AtomicU64,
    pub open_failures: AtomicU64,
}

/// Serializable snapshot of [`PoolStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatsSnapshot {
    pub opened: u64,
    pub reused: u64,
    pub reconnected: u64,
    pub evicted: u64,
    pub open_failures: u64,
    /// Keys currently tracked by the pool
    pub size: usize,
}

impl PoolStats {
    pub fn record_opened(&self) {
        self.opened.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("streamline_admin_pool_opened_total").increment(1);
    }

    pub fn record_reused(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("streamline_admin_pool_reused_total").increment(1);
    }

    pub fn record_reconnected(&self) {
        self.reconnected.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("streamline_admin_pool_reconnected_total").increment(1);
    }

    pub fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("streamline_admin_pool_evicted_total").increment(1);
    }

    pub fn record_open_failure(&self) {
        self.open_failures.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::counter!("streamline_admin_pool_open_failures_total").increment(1);
    }

    pub fn snapshot(&self, size: usize) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            opened: self.opened.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            reconnected: self.reconnected.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            open_failures: self.open_failures.load(Ordering::Relaxed),
            size,
        }
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

pub struct AdminConnectionPool {
    config: PoolConfig,
    connector: Arc<dyn AdminConnector>,
    store: Arc<dyn ConnectionStore>,
    entries: DashMap<ClusterKey, Slot>,
    stats: PoolStats,
    disposed: AtomicBool,
    reaper: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl AdminConnectionPool {
    /// Create a pool without a background reaper
    pub fn new(
        config: PoolConfig,
        connector: Arc<dyn AdminConnector>,
        store: Arc<dyn ConnectionStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            connector,
            store,
            entries: DashMap::new(),
            stats: PoolStats::default(),
            disposed: AtomicBool::new(false),
            reaper: parking_lot::Mutex::new(None),
        })
    }

    /// Create a pool and start its idle reaper. Must be called inside a Tokio runtime.
    pub fn start(
        config: PoolConfig,
        connector: Arc<dyn AdminConnector>,
        store: Arc<dyn ConnectionStore>,
    ) -> Arc<Self> {
        let pool = Self::new(config, connector, store);
        pool.start_reaper();
        pool
    }

    /// Spawn the fixed-interval reaper task if it is not running
    pub fn start_reaper(self: &Arc<Self>) {
        let mut reaper = self.reaper.lock();
        if reaper.is_some() || self.is_disposed() {
            return;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.reaper_interval();
        *reaper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(pool) = weak.upgrade() else {
                    break;
                };
                let evicted = pool.reap_idle().await;
                if evicted > 0 {
                    debug!(evicted, "Reaper closed idle admin handles");
                }
            }
        }));
        debug!(interval_secs = period.as_secs(), "Admin pool reaper started");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(KafkaAdminError::invalid("Admin connection pool has been disposed"));
        }
        Ok(())
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot(self.entries.len())
    }

    /// Lock the slot for `key`, creating it if needed.
    ///
    /// Retries if the slot was evicted from the map between lookup and lock,
    /// so the returned guard always belongs to the slot the map holds.
    async fn lock_slot(&self, key: &ClusterKey) -> (Slot, OwnedMutexGuard<Option<PooledAdminHandle>>) {
        loop {
            let slot: Slot = self
                .entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .clone();
            let guard = slot.clone().lock_owned().await;
            let current = self
                .entries
                .get(key)
                .map(|s| Arc::ptr_eq(s.value(), &slot))
                .unwrap_or(false);
            if current {
                return (slot, guard);
            }
        }
    }

    fn remove_slot(&self, key: &ClusterKey, slot: &Slot) {
        self.entries.remove_if(key, |_, current| Arc::ptr_eq(current, slot));
    }

    /// Get a live admin handle for `cluster`, opening one if needed
    pub async fn get_handle(&self, cluster: &Cluster) -> Result<Arc<dyn AdminClient>> {
        self.ensure_live()?;
        if cluster.connection_type == ConnectionType::CloudManaged {
            return Err(KafkaAdminError::invalid(format!(
                "Cluster {} is cloud-managed; use the REST proxy backend instead of a native admin connection",
                cluster.cluster_id
            )));
        }

        let key = cluster.key();
        let (_slot, mut guard) = self.lock_slot(&key).await;
        // dispose() may have run while this caller waited for the slot
        self.ensure_live()?;

        if let Some(entry) = guard.as_mut() {
            if entry.connected && entry.handle.is_connected() {
                self.stats.record_reused();
                return Ok(entry.touch());
            }

            entry.connected = false;
            debug!(
                connection_id = %key.connection_id,
                cluster_id = %key.cluster_id,
                "Pooled admin handle disconnected, attempting reconnect"
            );
            match entry.handle.reconnect().await {
                Ok(()) => {
                    entry.connected = true;
                    self.stats.record_reconnected();
                    info!(
                        connection_id = %key.connection_id,
                        cluster_id = %key.cluster_id,
                        "Reconnected pooled admin handle"
                    );
                    return Ok(entry.touch());
                }
                Err(e) => {
                    warn!(
                        connection_id = %key.connection_id,
                        cluster_id = %key.cluster_id,
                        error = %e,
                        "Reconnect failed, replacing admin handle"
                    );
                    entry.handle.close().await;
                    *guard = None;
                    self.stats.record_evicted();
                }
            }
        }

        let config = self.connection_config(cluster).await?;
        let handle = match self.connector.connect(&config).await {
            Ok(handle) => handle,
            Err(e) => {
                self.stats.record_open_failure();
                return Err(KafkaAdminError::from_error(e).context("open admin connection", &key.to_string()));
            }
        };
        *guard = Some(PooledAdminHandle::new(handle.clone()));
        self.stats.record_opened();
        info!(
            connection_id = %key.connection_id,
            cluster_id = %key.cluster_id,
            tls = config.tls.is_some(),
            sasl = ?config.sasl.as_ref().map(|s| s.mechanism),
            "Opened admin connection"
        );
        Ok(handle)
    }

    /// Build the connection parameters for a non-cloud cluster
    async fn connection_config(&self, cluster: &Cluster) -> Result<AdminConnectionConfig> {
        if cluster.bootstrap_servers.is_empty() {
            return Err(KafkaAdminError::invalid(format!(
                "Cluster {} has no bootstrap servers",
                cluster.key()
            )));
        }

        let mut config = AdminConnectionConfig {
            key: cluster.key(),
            bootstrap_servers: cluster.bootstrap_servers.clone(),
            sasl: None,
            tls: None,
        };
        if cluster.connection_type != ConnectionType::SelfHostedDirect {
            return Ok(config);
        }

        let record = self
            .store
            .get_direct_connection(&cluster.connection_id)
            .await
            .map_err(|e| e.context("load connection", &cluster.connection_id))?;
        let Some(record) = record else {
            debug!(connection_id = %cluster.connection_id, "No stored record, connecting without credentials");
            return Ok(config);
        };

        let credential = record.credential.resolved();
        config.sasl = to_sasl_config(&credential)?;
        let client_certificate = match credential.as_ref() {
            Credential::Mtls(mtls) => {
                if let Some(kind) = mtls.keystore_type.as_deref() {
                    if !kind.eq_ignore_ascii_case("PEM") {
                        return Err(KafkaAdminError::invalid(format!(
                            "{} keystores are not supported for native connections; convert the keystore to PEM",
                            kind
                        )));
                    }
                }
                Some(ClientCertificate {
                    certificate_path: mtls.keystore_path.clone(),
                    key_path: mtls.key_path.clone(),
                })
            }
            _ => None,
        };

        let use_tls = record
            .tls
            .unwrap_or(config.sasl.is_some() || client_certificate.is_some());
        if use_tls {
            let truststore_path = match credential.as_ref() {
                Credential::Mtls(mtls) if mtls.truststore_path.is_some() => mtls.truststore_path.clone(),
                _ => record.truststore_path.clone(),
            };
            config.tls = Some(TlsSettings {
                verify_server_certificate: record.verify_server_certificate,
                truststore_path,
                client_certificate,
            });
        }
        Ok(config)
    }

    /// Flag the handle for `cluster` as disconnected so the next
    /// [`get_handle`](Self::get_handle) goes through the reconnect path
    pub async fn mark_disconnected(&self, cluster: &Cluster) {
        let key = cluster.key();
        let Some(slot) = self.entries.get(&key).map(|s| s.value().clone()) else {
            return;
        };
        if let Some(entry) = slot.lock().await.as_mut() {
            entry.connected = false;
        };
    }

    /// Close and forget every handle of a connection
    pub async fn invalidate_connection(&self, connection_id: &str) {
        let keys: Vec<ClusterKey> = self
            .entries
            .iter()
            .filter(|e| e.key().connection_id == connection_id)
            .map(|e| e.key().clone())
            .collect();
        for key in keys {
            self.evict(&key).await;
        }
        debug!(connection_id, "Invalidated admin handles for connection");
    }

    /// Close and forget the handle of one cluster
    pub async fn invalidate_cluster(&self, cluster: &Cluster) {
        self.evict(&cluster.key()).await;
    }

    async fn evict(&self, key: &ClusterKey) {
        let Some(slot) = self.entries.get(key).map(|s| s.value().clone()) else {
            return;
        };
        let mut guard = slot.clone().lock_owned().await;
        if let Some(entry) = guard.take() {
            entry.handle.close().await;
            self.stats.record_evicted();
        }
        self.remove_slot(key, &slot);
    }

    /// Close handles idle longer than the TTL. Returns how many were closed.
    ///
    /// Slots busy with an open or reconnect are skipped.
    pub async fn reap_idle(&self) -> usize {
        let idle_ttl = self.config.idle_ttl();
        let slots: Vec<(ClusterKey, Slot)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut evicted = 0;
        for (key, slot) in slots {
            let Ok(mut guard) = slot.clone().try_lock_owned() else {
                continue;
            };
            let expired = match guard.as_ref() {
                Some(entry) => entry.last_access.elapsed() > idle_ttl,
                None => true,
            };
            if !expired {
                continue;
            }
            if let Some(entry) = guard.take() {
                debug!(
                    connection_id = %key.connection_id,
                    cluster_id = %key.cluster_id,
                    idle_secs = entry.last_access.elapsed().as_secs(),
                    "Closing idle admin handle"
                );
                entry.handle.close().await;
                self.stats.record_evicted();
                evicted += 1;
            }
            self.remove_slot(&key, &slot);
        }
        evicted
    }

    /// Number of open pooled handles
    pub async fn len(&self) -> usize {
        let slots: Vec<Slot> = self.entries.iter().map(|e| e.value().clone()).collect();
        let mut count = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop the reaper and close every handle. Later `get_handle` calls fail.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(reaper) = self.reaper.lock().take() {
            reaper.abort();
        }
        let keys: Vec<ClusterKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.evict(&key).await;
        }
        info!("Admin connection pool disposed");
    }
}

impl Drop for AdminConnectionPool {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.get_mut().take() {
            reaper.abort();
        }
    }
}
