//! Native topic backend over pooled admin handles

use super::{BackendKind, CreateTopicOptions, DeleteTopicOptions, ListTopicsOptions, PartitionInfo, TopicInfo, TopicService};
use crate::admin::{AdminConnectionPool, NewTopic, TopicMetadata, TopicOperationResult};
use crate::cluster::Cluster;
use crate::error::{KafkaAdminError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct NativeTopicService {
    pool: Arc<AdminConnectionPool>,
}

impl NativeTopicService {
    pub fn new(pool: Arc<AdminConnectionPool>) -> Self {
        Self { pool }
    }

    /// Flag the pooled handle after a transport failure so the next call reconnects
    async fn note_failure(&self, cluster: &Cluster, err: &KafkaAdminError) {
        if err.is_retryable() {
            self.pool.mark_disconnected(cluster).await;
        }
    }

    async fn metadata(&self, cluster: &Cluster, topics: Option<&[String]>, op: &str, resource: &str) -> Result<Vec<TopicMetadata>> {
        let handle = self.pool.get_handle(cluster).await.map_err(|e| e.context(op, resource))?;
        match handle.metadata(topics).await {
            Ok(metadata) => Ok(metadata.topics),
            Err(e) => {
                self.note_failure(cluster, &e).await;
                Err(e.context(op, resource))
            }
        }
    }
}

fn to_topic_info(topic: TopicMetadata) -> TopicInfo {
    let partitions: Vec<PartitionInfo> = topic
        .partitions
        .into_iter()
        .map(|p| PartitionInfo {
            id: p.partition_id,
            leader: (p.leader >= 0).then_some(p.leader),
            replicas: p.replicas,
            isr: p.isr,
            offline_replicas: p.offline_replicas,
        })
        .collect();
    TopicInfo {
        name: topic.name,
        is_internal: topic.is_internal,
        replication_factor: partitions.first().map(|p| p.replicas.len() as i32).unwrap_or(0),
        partition_count: partitions.len() as i32,
        partitions,
        configs: BTreeMap::new(),
        authorized_operations: None,
    }
}

/// First per-topic failure in a CreateTopics/DeleteTopics response
fn first_failure(results: Vec<TopicOperationResult>) -> Option<KafkaAdminError> {
    results
        .into_iter()
        .find_map(|r| KafkaAdminError::from_kafka_code(r.error_code, r.error_message.as_deref()))
}

#[async_trait]
impl TopicService for NativeTopicService {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    async fn list_topics(&self, cluster: &Cluster, options: &ListTopicsOptions) -> Result<Vec<TopicInfo>> {
        let topics = self.metadata(cluster, None, "list topics", &cluster.cluster_id).await?;
        let mut infos: Vec<TopicInfo> = topics
            .into_iter()
            .filter(|t| t.error_code == 0)
            .filter(|t| options.include_internal || !t.is_internal)
            .map(to_topic_info)
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(cluster = %cluster.key(), count = infos.len(), "Listed topics");
        Ok(infos)
    }

    async fn describe_topic(&self, cluster: &Cluster, name: &str) -> Result<TopicInfo> {
        let names = [name.to_string()];
        let topics = self.metadata(cluster, Some(&names), "describe topic", name).await?;
        let Some(topic) = topics.into_iter().find(|t| t.name == name) else {
            return Err(KafkaAdminError::not_found(format!("Topic '{}' not found", name)));
        };

        // Brokers answer unknown topics with an entry that has no partitions
        if topic.partitions.is_empty() {
            return Err(KafkaAdminError::not_found(format!("Topic '{}' not found", name)));
        }
        if let Some(err) = KafkaAdminError::from_kafka_code(topic.error_code, None) {
            return Err(err.context("describe topic", name));
        }
        Ok(to_topic_info(topic))
    }

    async fn create_topic(&self, cluster: &Cluster, options: &CreateTopicOptions) -> Result<()> {
        let topic = NewTopic {
            name: options.name.clone(),
            num_partitions: options.partitions.unwrap_or(-1),
            replication_factor: options.replication_factor.unwrap_or(-1),
            configs: options.configs.clone(),
        };
        let handle = self
            .pool
            .get_handle(cluster)
            .await
            .map_err(|e| e.context("create topic", &options.name))?;
        let results = match handle.create_topics(&[topic], options.validate_only).await {
            Ok(results) => results,
            Err(e) => {
                self.note_failure(cluster, &e).await;
                return Err(e.context("create topic", &options.name));
            }
        };
        if let Some(err) = first_failure(results) {
            return Err(err.context("create topic", &options.name));
        }
        info!(
            cluster = %cluster.key(),
            topic = %options.name,
            validate_only = options.validate_only,
            "Created topic"
        );
        Ok(())
    }

    async fn delete_topic(&self, cluster: &Cluster, options: &DeleteTopicOptions) -> Result<()> {
        let handle = self
            .pool
            .get_handle(cluster)
            .await
            .map_err(|e| e.context("delete topic", &options.name))?;
        let results = match handle.delete_topics(&[options.name.clone()]).await {
            Ok(results) => results,
            Err(e) => {
                self.note_failure(cluster, &e).await;
                return Err(e.context("delete topic", &options.name));
            }
        };
        if let Some(err) = first_failure(results) {
            return Err(err.context("delete topic", &options.name));
        }
        info!(cluster = %cluster.key(), topic = %options.name, "Deleted topic");
        Ok(())
    }
}
