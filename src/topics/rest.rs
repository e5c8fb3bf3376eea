//! Kafka REST proxy topic backend
//!
//! Speaks the v3 topic API. The flavor decides the path prefix and whether
//! the logical cluster id must first be swapped for the proxy's own cluster
//! id (local development clusters).

use super::{BackendKind, CreateTopicOptions, DeleteTopicOptions, ListTopicsOptions, PartitionInfo, TopicInfo, TopicService};
use crate::auth::credentials::Credential;
use crate::cluster::{Cluster, ConnectionType};
use crate::config::HttpConfig;
use crate::error::{ErrorCategory, KafkaAdminError, Result};
use crate::store::{ConnectionStore, TokenProvider};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::future::try_join_all;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// REST API flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestFlavor {
    /// Standalone REST proxy
    Legacy,
    /// Cloud-hosted REST endpoint
    Cloud,
    /// REST proxy of a local development cluster
    Local,
}

impl RestFlavor {
    pub fn path_prefix(&self) -> &'static str {
        match self {
            RestFlavor::Legacy | RestFlavor::Local => "/v3",
            RestFlavor::Cloud => "/kafka/v3",
        }
    }

    /// Whether the logical cluster id differs from the proxy's cluster id
    pub fn discovers_cluster_id(&self) -> bool {
        matches!(self, RestFlavor::Local)
    }
}

impl fmt::Display for RestFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestFlavor::Legacy => "legacy",
            RestFlavor::Cloud => "cloud",
            RestFlavor::Local => "local",
        };
        f.write_str(name)
    }
}

/// Error category for an HTTP status
pub fn status_category(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        401 | 403 => ErrorCategory::Auth,
        404 => ErrorCategory::NotFound,
        409 => ErrorCategory::AlreadyExists,
        400 | 422 => ErrorCategory::Invalid,
        500..=599 => ErrorCategory::Transient,
        _ => ErrorCategory::Unknown,
    }
}

fn http_error(err: reqwest::Error) -> KafkaAdminError {
    let category = if err.is_timeout() || err.is_connect() || err.is_request() {
        ErrorCategory::Transient
    } else if err.is_decode() {
        ErrorCategory::Unknown
    } else {
        crate::error::classify_message(&err.to_string())
    };
    KafkaAdminError::new(category, format!("HTTP request failed: {}", err)).with_cause(err)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ClusterData {
    cluster_id: String,
}

#[derive(Debug, Deserialize)]
struct TopicData {
    topic_name: String,
    #[serde(default)]
    is_internal: bool,
    #[serde(default)]
    replication_factor: i32,
    #[serde(default)]
    partitions_count: i32,
    #[serde(default)]
    authorized_operations: Option<Vec<String>>,
}

impl TopicData {
    fn into_info(self) -> TopicInfo {
        TopicInfo {
            name: self.topic_name,
            is_internal: self.is_internal,
            replication_factor: self.replication_factor,
            partition_count: self.partitions_count,
            partitions: Vec::new(),
            configs: BTreeMap::new(),
            authorized_operations: self.authorized_operations,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PartitionData {
    partition_id: i32,
}

#[derive(Debug, Deserialize)]
struct ReplicaData {
    broker_id: i32,
    #[serde(default)]
    is_leader: bool,
    #[serde(default)]
    is_in_sync: bool,
}

#[derive(Debug, Deserialize)]
struct ConfigData {
    name: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConfigEntry<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateTopicRequest<'a> {
    topic_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    partitions_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replication_factor: Option<i16>,
    configs: Vec<ConfigEntry<'a>>,
    validate_only: bool,
}

enum Auth {
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct RestTopicService {
    flavor: RestFlavor,
    client: reqwest::Client,
    store: Arc<dyn ConnectionStore>,
    tokens: Arc<dyn TokenProvider>,
    /// Logical cluster id -> proxy cluster id
    cluster_ids: DashMap<String, String>,
}

impl RestTopicService {
    pub fn new(
        flavor: RestFlavor,
        config: &HttpConfig,
        store: Arc<dyn ConnectionStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| KafkaAdminError::invalid(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            flavor,
            client,
            store,
            tokens,
            cluster_ids: DashMap::new(),
        })
    }

    pub fn flavor(&self) -> RestFlavor {
        self.flavor
    }

    /// Forget discovered cluster ids
    pub fn clear_cluster_ids(&self) {
        self.cluster_ids.clear();
    }

    fn base_url(cluster: &Cluster) -> Result<&str> {
        cluster
            .rest_uri
            .as_deref()
            .map(|uri| uri.trim_end_matches('/'))
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| {
                KafkaAdminError::invalid(format!("Cluster {} has no REST endpoint configured", cluster.key()))
            })
    }

    async fn resolve_auth(&self, cluster: &Cluster) -> Result<Auth> {
        match cluster.connection_type {
            ConnectionType::CloudManaged => Ok(Auth::Bearer(self.tokens.bearer_token(cluster).await?)),
            ConnectionType::SelfHostedLocal => Ok(Auth::None),
            ConnectionType::SelfHostedDirect => {
                let Some(record) = self.store.get_direct_connection(&cluster.connection_id).await? else {
                    return Ok(Auth::None);
                };
                let auth = match record.credential.resolved().as_ref() {
                    Credential::Basic(basic) => Auth::Basic {
                        username: basic.username.clone(),
                        password: basic.password.clone(),
                    },
                    Credential::ApiKey(key) => Auth::Basic {
                        username: key.api_key.clone(),
                        password: key.api_secret.clone(),
                    },
                    Credential::Scram(scram) => Auth::Basic {
                        username: scram.username.clone(),
                        password: scram.password.clone(),
                    },
                    other => {
                        debug!(kind = %other.kind().as_str(), "Credential has no HTTP form, sending no authorization");
                        Auth::None
                    }
                };
                Ok(auth)
            }
        }
    }

    async fn cluster_path(&self, cluster: &Cluster) -> Result<String> {
        let base = Self::base_url(cluster)?;
        let cluster_id = if self.flavor.discovers_cluster_id() {
            self.discover_cluster_id(cluster, base).await?
        } else {
            cluster.cluster_id.clone()
        };
        Ok(format!("{}{}/clusters/{}", base, self.flavor.path_prefix(), cluster_id))
    }

    async fn discover_cluster_id(&self, cluster: &Cluster, base: &str) -> Result<String> {
        if let Some(id) = self.cluster_ids.get(&cluster.cluster_id) {
            return Ok(id.clone());
        }
        let url = format!("{}{}/clusters", base, self.flavor.path_prefix());
        let clusters: ListResponse<ClusterData> = self.get_json(cluster, &url).await?;
        let id = clusters
            .data
            .into_iter()
            .next()
            .map(|c| c.cluster_id)
            .ok_or_else(|| KafkaAdminError::not_found(format!("REST proxy at {} reports no clusters", base)))?;
        debug!(logical_id = %cluster.cluster_id, cluster_id = %id, "Discovered REST cluster id");
        self.cluster_ids.insert(cluster.cluster_id.clone(), id.clone());
        Ok(id)
    }

    async fn request(&self, cluster: &Cluster, method: Method, url: &str) -> Result<RequestBuilder> {
        let builder = self.client.request(method, url);
        let builder = match self.resolve_auth(cluster).await? {
            Auth::None => builder,
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        };
        Ok(builder)
    }

    async fn send(&self, method: &Method, url: &str, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(http_error)?;
        let status = response.status();
        debug!(method = %method, url, status = status.as_u16(), "REST request");
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                error_code: Some(code),
                message: Some(message),
            }) => format!("{} (error code {})", message, code),
            Ok(ErrorBody { message: Some(message), .. }) => message,
            _ if text.is_empty() => status.canonical_reason().unwrap_or("request failed").to_string(),
            _ => text,
        };
        Err(KafkaAdminError::new(
            status_category(status),
            format!("HTTP {}: {}", status.as_u16(), detail),
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, cluster: &Cluster, url: &str) -> Result<T> {
        let builder = self.request(cluster, Method::GET, url).await?;
        let response = self.send(&Method::GET, url, builder).await?;
        response.json::<T>().await.map_err(http_error)
    }

    async fn describe_partition(&self, cluster: &Cluster, topic_url: &str, partition_id: i32) -> Result<PartitionInfo> {
        let url = format!("{}/partitions/{}/replicas", topic_url, partition_id);
        let replicas: ListResponse<ReplicaData> = self.get_json(cluster, &url).await?;
        Ok(PartitionInfo {
            id: partition_id,
            leader: replicas.data.iter().find(|r| r.is_leader).map(|r| r.broker_id),
            replicas: replicas.data.iter().map(|r| r.broker_id).collect(),
            isr: replicas.data.iter().filter(|r| r.is_in_sync).map(|r| r.broker_id).collect(),
            offline_replicas: Vec::new(),
        })
    }
}

#[async_trait]
impl TopicService for RestTopicService {
    fn kind(&self) -> BackendKind {
        BackendKind::Rest(self.flavor)
    }

    async fn list_topics(&self, cluster: &Cluster, options: &ListTopicsOptions) -> Result<Vec<TopicInfo>> {
        let url = format!(
            "{}/topics?includeAuthorizedOperations=true",
            self.cluster_path(cluster).await.map_err(|e| e.context("list topics", &cluster.cluster_id))?
        );
        let topics: ListResponse<TopicData> = self
            .get_json(cluster, &url)
            .await
            .map_err(|e| e.context("list topics", &cluster.cluster_id))?;
        let mut infos: Vec<TopicInfo> = topics
            .data
            .into_iter()
            .filter(|t| options.include_internal || !t.is_internal)
            .map(TopicData::into_info)
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(cluster = %cluster.key(), flavor = %self.flavor, count = infos.len(), "Listed topics");
        Ok(infos)
    }

    async fn describe_topic(&self, cluster: &Cluster, name: &str) -> Result<TopicInfo> {
        let describe = async {
            let topic_url = format!("{}/topics/{}", self.cluster_path(cluster).await?, name);
            let topic_req = format!("{}?includeAuthorizedOperations=true", topic_url);
            let partitions_req = format!("{}/partitions", topic_url);
            let configs_req = format!("{}/configs", topic_url);

            let (topic, partitions, configs) = tokio::try_join!(
                self.get_json::<TopicData>(cluster, &topic_req),
                self.get_json::<ListResponse<PartitionData>>(cluster, &partitions_req),
                self.get_json::<ListResponse<ConfigData>>(cluster, &configs_req),
            )?;

            let mut details = try_join_all(
                partitions
                    .data
                    .iter()
                    .map(|p| self.describe_partition(cluster, &topic_url, p.partition_id)),
            )
            .await?;
            details.sort_by_key(|p| p.id);

            let mut info = topic.into_info();
            info.partitions = details;
            info.configs = configs
                .data
                .into_iter()
                .filter_map(|c| c.value.map(|v| (c.name, v)))
                .collect();
            Ok::<_, KafkaAdminError>(info)
        };
        describe.await.map_err(|e| e.context("describe topic", name))
    }

    async fn topic_exists(&self, cluster: &Cluster, name: &str) -> Result<bool> {
        let exists = async {
            let url = format!("{}/topics/{}", self.cluster_path(cluster).await?, name);
            let builder = self.request(cluster, Method::GET, &url).await?;
            self.send(&Method::GET, &url, builder).await?;
            Ok::<_, KafkaAdminError>(())
        };
        match exists.await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.context("check topic", name)),
        }
    }

    async fn create_topic(&self, cluster: &Cluster, options: &CreateTopicOptions) -> Result<()> {
        let create = async {
            let url = format!("{}/topics", self.cluster_path(cluster).await?);
            let body = CreateTopicRequest {
                topic_name: &options.name,
                partitions_count: options.partitions,
                replication_factor: options.replication_factor,
                configs: options
                    .configs
                    .iter()
                    .map(|(name, value)| ConfigEntry { name, value })
                    .collect(),
                validate_only: options.validate_only,
            };
            let builder = self.request(cluster, Method::POST, &url).await?.json(&body);
            self.send(&Method::POST, &url, builder).await?;
            Ok::<_, KafkaAdminError>(())
        };
        create.await.map_err(|e| e.context("create topic", &options.name))?;
        info!(cluster = %cluster.key(), flavor = %self.flavor, topic = %options.name, "Created topic");
        Ok(())
    }

    async fn delete_topic(&self, cluster: &Cluster, options: &DeleteTopicOptions) -> Result<()> {
        let delete = async {
            let url = format!("{}/topics/{}", self.cluster_path(cluster).await?, options.name);
            let builder = self.request(cluster, Method::DELETE, &url).await?;
            self.send(&Method::DELETE, &url, builder).await?;
            Ok::<_, KafkaAdminError>(())
        };
        delete.await.map_err(|e| e.context("delete topic", &options.name))?;
        info!(cluster = %cluster.key(), flavor = %self.flavor, topic = %options.name, "Deleted topic");
        Ok(())
    }
}
