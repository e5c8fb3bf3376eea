//! Native-protocol admin handles and their pool
//!
//! [`AdminClient`] is the surface the ACL engine and the native topic backend
//! use; [`AdminConnector`] opens one. The production implementation is the
//! Kafka wire client in [`crate::protocol`]; tests plug in fakes.

mod pool;

pub use pool::{AdminConnectionPool, PoolStats, PoolStatsSnapshot};

use crate::auth::acl::{AclFilter, DescribeAclsResult};
use crate::auth::sasl::SaslConfig;
use crate::cluster::ClusterKey;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Client certificate for mutual TLS (PEM files)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub certificate_path: String,
    /// Private key file; `None` reads the key from the certificate file
    pub key_path: Option<String>,
}

/// Transport security for a native connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub verify_server_certificate: bool,
    pub truststore_path: Option<String>,
    pub client_certificate: Option<ClientCertificate>,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            verify_server_certificate: true,
            truststore_path: None,
            client_certificate: None,
        }
    }
}

/// Everything needed to open one admin handle
#[derive(Debug, Clone)]
pub struct AdminConnectionConfig {
    pub key: ClusterKey,
    pub bootstrap_servers: Vec<String>,
    pub sasl: Option<SaslConfig>,
    pub tls: Option<TlsSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMetadata {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
    pub rack: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub partition_id: i32,
    pub error_code: i16,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
    pub offline_replicas: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    pub name: String,
    pub error_code: i16,
    pub is_internal: bool,
    pub partitions: Vec<PartitionMetadata>,
}

/// Decoded Metadata response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMetadata {
    pub cluster_id: Option<String>,
    pub controller_id: i32,
    pub brokers: Vec<BrokerMetadata>,
    pub topics: Vec<TopicMetadata>,
}

/// Topic to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub name: String,
    /// `-1` lets the broker apply its default
    pub num_partitions: i32,
    /// `-1` lets the broker apply its default
    pub replication_factor: i16,
    pub configs: BTreeMap<String, String>,
}

/// Per-topic outcome of CreateTopics/DeleteTopics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicOperationResult {
    pub name: String,
    pub error_code: i16,
    pub error_message: Option<String>,
}

/// Administrative operations on one cluster
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn describe_acls(&self, filter: &AclFilter) -> Result<DescribeAclsResult>;

    /// Metadata for the named topics, or for every topic when `None`
    async fn metadata(&self, topics: Option<&[String]>) -> Result<ClusterMetadata>;

    async fn create_topics(&self, topics: &[NewTopic], validate_only: bool) -> Result<Vec<TopicOperationResult>>;

    async fn delete_topics(&self, names: &[String]) -> Result<Vec<TopicOperationResult>>;

    /// Whether the underlying connection is believed usable
    fn is_connected(&self) -> bool;

    /// Re-establish the connection, including authentication
    async fn reconnect(&self) -> Result<()>;

    async fn close(&self);
}

/// Opens admin handles
#[async_trait]
pub trait AdminConnector: Send + Sync {
    async fn connect(&self, config: &AdminConnectionConfig) -> Result<Arc<dyn AdminClient>>;
}
