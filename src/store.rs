//! Collaborators this layer reads from
//!
//! Connection records and cloud tokens are owned elsewhere; the pool and the
//! REST backend only read them through these traits.

use crate::auth::credentials::Credential;
use crate::cluster::Cluster;
use crate::error::{KafkaAdminError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stored configuration for a direct connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectConnectionRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub credential: Credential,
    /// Explicit TLS choice; when unset TLS follows the credential
    #[serde(default)]
    pub tls: Option<bool>,
    #[serde(default = "default_verify")]
    pub verify_server_certificate: bool,
    /// PEM bundle of trusted CA certificates
    #[serde(default)]
    pub truststore_path: Option<String>,
}

fn default_verify() -> bool {
    true
}

impl DirectConnectionRecord {
    pub fn new(id: impl Into<String>, credential: Credential) -> Self {
        Self {
            id: id.into(),
            credential,
            verify_server_certificate: true,
            ..Default::default()
        }
    }
}

/// Read-only access to direct connection records
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn get_direct_connection(&self, connection_id: &str) -> Result<Option<DirectConnectionRecord>>;
}

/// Source of short-lived bearer tokens for cloud-managed clusters
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self, cluster: &Cluster) -> Result<String>;
}

/// Map-backed [`ConnectionStore`]
#[derive(Debug, Default)]
pub struct InMemoryConnectionStore {
    records: RwLock<HashMap<String, DirectConnectionRecord>>,
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: DirectConnectionRecord) {
        self.records.write().insert(record.id.clone(), record);
    }

    pub fn remove(&self, connection_id: &str) -> Option<DirectConnectionRecord> {
        self.records.write().remove(connection_id)
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn get_direct_connection(&self, connection_id: &str) -> Result<Option<DirectConnectionRecord>> {
        Ok(self.records.read().get(connection_id).cloned())
    }
}

/// [`TokenProvider`] that always returns the same token, or fails when none is set
#[derive(Debug, Default, Clone)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Provider with no session; every request fails with AUTH
    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self, _cluster: &Cluster) -> Result<String> {
        self.token
            .clone()
            .ok_or_else(|| KafkaAdminError::auth("No cloud session; sign in to obtain an access token"))
    }
}
