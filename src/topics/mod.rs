//! Topic administration
//!
//! [`TopicService`] is the common surface; the native backend talks to the
//! brokers through pooled admin handles and the REST backend talks to a
//! Kafka REST proxy. [`select_backend`] decides which one serves a cluster.

mod factory;
mod native;
mod rest;

pub use factory::{select_backend, BackendKind, TopicServiceFactory};
pub use native::NativeTopicService;
pub use rest::{status_category, RestFlavor, RestTopicService};

use crate::cluster::Cluster;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub id: i32,
    /// `None` while the partition has no leader
    pub leader: Option<i32>,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
    pub offline_replicas: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInfo {
    pub name: String,
    pub is_internal: bool,
    pub replication_factor: i32,
    pub partition_count: i32,
    #[serde(default)]
    pub partitions: Vec<PartitionInfo>,
    #[serde(default)]
    pub configs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_operations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListTopicsOptions {
    pub include_internal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTopicOptions {
    pub name: String,
    /// Broker default when unset
    pub partitions: Option<i32>,
    /// Broker default when unset
    pub replication_factor: Option<i16>,
    pub configs: BTreeMap<String, String>,
    /// Validate the request without creating the topic
    pub validate_only: bool,
}

impl CreateTopicOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: None,
            replication_factor: None,
            configs: BTreeMap::new(),
            validate_only: false,
        }
    }

    pub fn with_partitions(mut self, partitions: i32) -> Self {
        self.partitions = Some(partitions);
        self
    }

    pub fn with_replication_factor(mut self, replication_factor: i16) -> Self {
        self.replication_factor = Some(replication_factor);
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configs.insert(key.into(), value.into());
        self
    }

    pub fn validate_only(mut self) -> Self {
        self.validate_only = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTopicOptions {
    pub name: String,
}

impl DeleteTopicOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Topic operations every backend provides
#[async_trait]
pub trait TopicService: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Topics sorted by name
    async fn list_topics(&self, cluster: &Cluster, options: &ListTopicsOptions) -> Result<Vec<TopicInfo>>;

    /// Fails with NOT_FOUND when the topic does not exist
    async fn describe_topic(&self, cluster: &Cluster, name: &str) -> Result<TopicInfo>;

    async fn topic_exists(&self, cluster: &Cluster, name: &str) -> Result<bool> {
        match self.describe_topic(cluster, name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_topic(&self, cluster: &Cluster, options: &CreateTopicOptions) -> Result<()>;

    async fn delete_topic(&self, cluster: &Cluster, options: &DeleteTopicOptions) -> Result<()>;
}
