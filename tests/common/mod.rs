//! Shared test utilities for integration tests
//!
//! Provides a scriptable in-memory admin client, a connector that hands it
//! out, and a fake broker that speaks enough of the Kafka wire protocol to
//! exercise the native client end to end.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use kafka_protocol::messages::create_topics_response::CreatableTopicResult;
use kafka_protocol::messages::delete_topics_response::DeletableTopicResult;
use kafka_protocol::messages::describe_acls_response::{AclDescription, DescribeAclsResource};
use kafka_protocol::messages::metadata_response::{
    MetadataResponseBroker, MetadataResponsePartition, MetadataResponseTopic,
};
use kafka_protocol::messages::{
    ApiKey, BrokerId, CreateTopicsRequest, CreateTopicsResponse, DeleteTopicsRequest,
    DeleteTopicsResponse, DescribeAclsRequest, DescribeAclsResponse, MetadataRequest,
    MetadataResponse, RequestHeader, ResponseHeader, SaslAuthenticateRequest,
    SaslAuthenticateResponse, SaslHandshakeRequest, SaslHandshakeResponse, TopicName,
};
use kafka_protocol::protocol::{Decodable, Encodable, StrBytes};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use streamline_admin::admin::{
    AdminConnectionConfig, ClusterMetadata, NewTopic, PartitionMetadata, TopicMetadata,
    TopicOperationResult,
};
use streamline_admin::auth::acl::{AclFilter, AclResource, DescribeAclsResult};
use streamline_admin::config::PoolConfig;
use streamline_admin::protocol::{request_header_version, response_header_version};
use streamline_admin::{
    AdminClient, AdminConnectionPool, AdminConnector, BasicCredential, Credential,
    InMemoryConnectionStore, KafkaAdminError, Result,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

// ============================================================================
// Credentials
// ============================================================================

pub fn basic(username: &str, password: &str) -> Credential {
    Credential::Basic(BasicCredential {
        username: username.to_string(),
        password: password.to_string(),
    })
}

// ============================================================================
// Fake admin client
// ============================================================================

/// Scriptable [`AdminClient`].
///
/// DescribeAcls answers come from `acl_script` first, then fall back to
/// `acl_default`. Topic metadata is served from `topics`.
pub struct FakeAdminClient {
    pub acl_script: Mutex<VecDeque<Result<DescribeAclsResult>>>,
    pub acl_default: Mutex<DescribeAclsResult>,
    pub topics: Mutex<BTreeMap<String, TopicMetadata>>,
    pub created: Mutex<Vec<(NewTopic, bool)>>,
    pub deleted: Mutex<Vec<String>>,
    pub acl_queries: AtomicUsize,
    pub acl_filters: Mutex<Vec<AclFilter>>,
    pub metadata_calls: AtomicUsize,
    pub reconnects: AtomicUsize,
    pub connected: AtomicBool,
}

impl FakeAdminClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            acl_script: Mutex::new(VecDeque::new()),
            acl_default: Mutex::new(DescribeAclsResult::default()),
            topics: Mutex::new(BTreeMap::new()),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            acl_queries: AtomicUsize::new(0),
            acl_filters: Mutex::new(Vec::new()),
            metadata_calls: AtomicUsize::new(0),
            reconnects: AtomicUsize::new(0),
            connected: AtomicBool::new(true),
        })
    }

    pub fn set_acls(&self, resources: Vec<AclResource>) {
        *self.acl_default.lock() = DescribeAclsResult {
            error_code: 0,
            error_message: None,
            resources,
        };
    }

    pub fn push_acl_result(&self, result: Result<DescribeAclsResult>) {
        self.acl_script.lock().push_back(result);
    }

    pub fn add_topic(&self, name: &str, partitions: i32, replicas: &[i32], internal: bool) {
        let partitions = (0..partitions)
            .map(|id| PartitionMetadata {
                partition_id: id,
                error_code: 0,
                leader: replicas.first().copied().unwrap_or(-1),
                replicas: replicas.to_vec(),
                isr: replicas.to_vec(),
                offline_replicas: vec![],
            })
            .collect();
        self.topics.lock().insert(
            name.to_string(),
            TopicMetadata {
                name: name.to_string(),
                error_code: 0,
                is_internal: internal,
                partitions,
            },
        );
    }

    pub fn acl_query_count(&self) -> usize {
        self.acl_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminClient for FakeAdminClient {
    async fn describe_acls(&self, filter: &AclFilter) -> Result<DescribeAclsResult> {
        self.acl_queries.fetch_add(1, Ordering::SeqCst);
        self.acl_filters.lock().push(filter.clone());
        if let Some(scripted) = self.acl_script.lock().pop_front() {
            return scripted;
        }
        Ok(self.acl_default.lock().clone())
    }

    async fn metadata(&self, topics: Option<&[String]>) -> Result<ClusterMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let known = self.topics.lock();
        let topics = match topics {
            None => known.values().cloned().collect(),
            Some(names) => names
                .iter()
                .map(|name| {
                    known.get(name).cloned().unwrap_or_else(|| TopicMetadata {
                        name: name.clone(),
                        error_code: 3,
                        is_internal: false,
                        partitions: vec![],
                    })
                })
                .collect(),
        };
        Ok(ClusterMetadata {
            cluster_id: Some("fake-cluster".to_string()),
            controller_id: 1,
            brokers: vec![],
            topics,
        })
    }

    async fn create_topics(&self, topics: &[NewTopic], validate_only: bool) -> Result<Vec<TopicOperationResult>> {
        let mut results = Vec::new();
        for topic in topics {
            self.created.lock().push((topic.clone(), validate_only));
            let exists = self.topics.lock().contains_key(&topic.name);
            if exists {
                results.push(TopicOperationResult {
                    name: topic.name.clone(),
                    error_code: 36,
                    error_message: Some(format!("Topic '{}' already exists.", topic.name)),
                });
                continue;
            }
            if !validate_only {
                let partitions = if topic.num_partitions > 0 { topic.num_partitions } else { 1 };
                self.add_topic(&topic.name, partitions, &[1], false);
            }
            results.push(TopicOperationResult {
                name: topic.name.clone(),
                error_code: 0,
                error_message: None,
            });
        }
        Ok(results)
    }

    async fn delete_topics(&self, names: &[String]) -> Result<Vec<TopicOperationResult>> {
        Ok(names
            .iter()
            .map(|name| {
                self.deleted.lock().push(name.clone());
                let removed = self.topics.lock().remove(name).is_some();
                TopicOperationResult {
                    name: name.clone(),
                    error_code: if removed { 0 } else { 3 },
                    error_message: None,
                }
            })
            .collect())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn reconnect(&self) -> Result<()> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Connector that always hands out the same [`FakeAdminClient`]
pub struct SharedConnector {
    pub client: Arc<FakeAdminClient>,
    pub opens: AtomicUsize,
    pub configs: Mutex<Vec<AdminConnectionConfig>>,
}

impl SharedConnector {
    pub fn new(client: Arc<FakeAdminClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            opens: AtomicUsize::new(0),
            configs: Mutex::new(Vec::new()),
        })
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminConnector for SharedConnector {
    async fn connect(&self, config: &AdminConnectionConfig) -> Result<Arc<dyn AdminClient>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().push(config.clone());
        self.client.connected.store(true, Ordering::SeqCst);
        Ok(self.client.clone())
    }
}

/// Pool over a [`SharedConnector`] with an empty connection store and no reaper
pub fn fake_pool(client: Arc<FakeAdminClient>) -> (Arc<AdminConnectionPool>, Arc<SharedConnector>) {
    let connector = SharedConnector::new(client);
    let pool = AdminConnectionPool::new(
        PoolConfig::default(),
        connector.clone(),
        Arc::new(InMemoryConnectionStore::new()),
    );
    (pool, connector)
}

/// Error shaped like a broker without an authorizer
pub fn security_disabled() -> KafkaAdminError {
    KafkaAdminError::invalid("SECURITY_DISABLED: Security features are disabled.")
}

// ============================================================================
// Fake broker
// ============================================================================

#[derive(Debug, Default)]
pub struct BrokerState {
    /// Topic name -> partition count
    pub topics: BTreeMap<String, i32>,
    pub acls: Vec<AclResource>,
    /// Error code and message returned by DescribeAcls, if set
    pub acl_error: Option<(i16, String)>,
    /// API keys received, in order
    pub requests: Vec<i16>,
    pub authenticated_users: Vec<String>,
}

/// In-process broker speaking the request versions the native client pins
pub struct FakeBroker {
    pub address: String,
    pub state: Arc<Mutex<BrokerState>>,
    handle: JoinHandle<()>,
}

impl FakeBroker {
    /// Start a broker. With `credentials` set, it requires SASL/PLAIN with
    /// that username and password.
    pub async fn start(credentials: Option<(&str, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let port = listener.local_addr().unwrap().port() as i32;
        let state = Arc::new(Mutex::new(BrokerState::default()));
        let credentials = credentials.map(|(u, p)| (u.to_string(), p.to_string()));

        let shared = state.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(serve_connection(stream, shared.clone(), credentials.clone(), port));
            }
        });
        Self { address, state, handle }
    }

    pub fn add_topic(&self, name: &str, partitions: i32) {
        self.state.lock().topics.insert(name.to_string(), partitions);
    }

    pub fn requests(&self) -> Vec<i16> {
        self.state.lock().requests.clone()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for FakeBroker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    state: Arc<Mutex<BrokerState>>,
    credentials: Option<(String, String)>,
    port: i32,
) {
    loop {
        let Ok(len) = stream.read_i32().await else {
            return;
        };
        let mut body = vec![0u8; len as usize];
        if stream.read_exact(&mut body).await.is_err() {
            return;
        }
        let raw_key = i16::from_be_bytes([body[0], body[1]]);
        let version = i16::from_be_bytes([body[2], body[3]]);
        let mut buf = Bytes::from(body);
        state.lock().requests.push(raw_key);

        let (frame, close) = if raw_key == ApiKey::SaslHandshake as i16 {
            let header = RequestHeader::decode(&mut buf, request_header_version(ApiKey::SaslHandshake, version)).unwrap();
            let request = SaslHandshakeRequest::decode(&mut buf, version).unwrap();
            let supported = &*request.mechanism == "PLAIN";
            let response = SaslHandshakeResponse::default()
                .with_error_code(if supported { 0 } else { 33 })
                .with_mechanisms(vec![StrBytes::from_static_str("PLAIN")]);
            (respond(ApiKey::SaslHandshake, version, header.correlation_id, &response), !supported)
        } else if raw_key == ApiKey::SaslAuthenticate as i16 {
            let header = RequestHeader::decode(&mut buf, request_header_version(ApiKey::SaslAuthenticate, version)).unwrap();
            let request = SaslAuthenticateRequest::decode(&mut buf, version).unwrap();
            let parts: Vec<&[u8]> = request.auth_bytes.split(|b| *b == 0).collect();
            let (user, pass) = match parts.as_slice() {
                [_, user, pass] => (String::from_utf8_lossy(user).to_string(), String::from_utf8_lossy(pass).to_string()),
                _ => (String::new(), String::new()),
            };
            let accepted = credentials.as_ref().is_some_and(|(u, p)| *u == user && *p == pass);
            let response = if accepted {
                state.lock().authenticated_users.push(user);
                SaslAuthenticateResponse::default().with_error_code(0)
            } else {
                SaslAuthenticateResponse::default()
                    .with_error_code(58)
                    .with_error_message(Some(StrBytes::from_static_str(
                        "Authentication failed: Invalid username or password",
                    )))
            };
            (respond(ApiKey::SaslAuthenticate, version, header.correlation_id, &response), !accepted)
        } else if raw_key == ApiKey::Metadata as i16 {
            let header = RequestHeader::decode(&mut buf, request_header_version(ApiKey::Metadata, version)).unwrap();
            let request = MetadataRequest::decode(&mut buf, version).unwrap();
            let topics = state.lock().topics.clone();
            let requested: Vec<String> = match request.topics {
                None => topics.keys().cloned().collect(),
                Some(list) => list.into_iter().filter_map(|t| t.name.map(|n| n.0.to_string())).collect(),
            };
            let response = MetadataResponse::default()
                .with_brokers(vec![MetadataResponseBroker::default()
                    .with_node_id(BrokerId(1))
                    .with_host(StrBytes::from_static_str("127.0.0.1"))
                    .with_port(port)])
                .with_cluster_id(Some(StrBytes::from_static_str("fake-cluster")))
                .with_controller_id(BrokerId(1))
                .with_topics(
                    requested
                        .into_iter()
                        .map(|name| {
                            let partitions = topics.get(&name).copied();
                            MetadataResponseTopic::default()
                                .with_error_code(if partitions.is_some() { 0 } else { 3 })
                                .with_name(Some(TopicName(StrBytes::from_string(name.clone()))))
                                .with_is_internal(name.starts_with("__"))
                                .with_partitions(
                                    (0..partitions.unwrap_or(0))
                                        .map(|id| {
                                            MetadataResponsePartition::default()
                                                .with_partition_index(id)
                                                .with_leader_id(BrokerId(1))
                                                .with_replica_nodes(vec![BrokerId(1)])
                                                .with_isr_nodes(vec![BrokerId(1)])
                                        })
                                        .collect(),
                                )
                        })
                        .collect(),
                );
            (respond(ApiKey::Metadata, version, header.correlation_id, &response), false)
        } else if raw_key == ApiKey::DescribeAcls as i16 {
            let header = RequestHeader::decode(&mut buf, request_header_version(ApiKey::DescribeAcls, version)).unwrap();
            let _request = DescribeAclsRequest::decode(&mut buf, version).unwrap();
            let guard = state.lock();
            let response = match &guard.acl_error {
                Some((code, message)) => DescribeAclsResponse::default()
                    .with_error_code(*code)
                    .with_error_message(Some(StrBytes::from_string(message.clone()))),
                None => DescribeAclsResponse::default().with_resources(
                    guard
                        .acls
                        .iter()
                        .map(|r| {
                            DescribeAclsResource::default()
                                .with_resource_type(r.resource_type.to_code())
                                .with_resource_name(StrBytes::from_string(r.name.clone()))
                                .with_pattern_type(r.pattern_type.to_code())
                                .with_acls(
                                    r.acls
                                        .iter()
                                        .map(|a| {
                                            AclDescription::default()
                                                .with_principal(StrBytes::from_string(a.principal.clone()))
                                                .with_host(StrBytes::from_string(a.host.clone()))
                                                .with_operation(a.operation.to_code())
                                                .with_permission_type(a.permission.to_code())
                                        })
                                        .collect(),
                                )
                        })
                        .collect(),
                ),
            };
            drop(guard);
            (respond(ApiKey::DescribeAcls, version, header.correlation_id, &response), false)
        } else if raw_key == ApiKey::CreateTopics as i16 {
            let header = RequestHeader::decode(&mut buf, request_header_version(ApiKey::CreateTopics, version)).unwrap();
            let request = CreateTopicsRequest::decode(&mut buf, version).unwrap();
            let validate_only = request.validate_only;
            let mut guard = state.lock();
            let results = request
                .topics
                .into_iter()
                .map(|topic| {
                    let name = topic.name.0.to_string();
                    let result = CreatableTopicResult::default().with_name(topic.name.clone());
                    if guard.topics.contains_key(&name) {
                        return result
                            .with_error_code(36)
                            .with_error_message(Some(StrBytes::from_string(format!("Topic '{}' already exists.", name))));
                    }
                    if !validate_only {
                        guard.topics.insert(name, topic.num_partitions.max(1));
                    }
                    result.with_error_code(0)
                })
                .collect();
            drop(guard);
            let response = CreateTopicsResponse::default().with_topics(results);
            (respond(ApiKey::CreateTopics, version, header.correlation_id, &response), false)
        } else if raw_key == ApiKey::DeleteTopics as i16 {
            let header = RequestHeader::decode(&mut buf, request_header_version(ApiKey::DeleteTopics, version)).unwrap();
            let request = DeleteTopicsRequest::decode(&mut buf, version).unwrap();
            let mut guard = state.lock();
            let responses = request
                .topic_names
                .into_iter()
                .map(|name| {
                    let removed = guard.topics.remove(&name.0.to_string()).is_some();
                    DeletableTopicResult::default()
                        .with_name(Some(name))
                        .with_error_code(if removed { 0 } else { 3 })
                })
                .collect();
            drop(guard);
            let response = DeleteTopicsResponse::default().with_responses(responses);
            (respond(ApiKey::DeleteTopics, version, header.correlation_id, &response), false)
        } else {
            return;
        };

        if stream.write_all(&frame).await.is_err() {
            return;
        }
        if close {
            return;
        }
    }
}

fn respond<R: Encodable>(api_key: ApiKey, version: i16, correlation_id: i32, response: &R) -> BytesMut {
    let mut body = BytesMut::new();
    ResponseHeader::default()
        .with_correlation_id(correlation_id)
        .encode(&mut body, response_header_version(api_key, version))
        .unwrap();
    response.encode(&mut body, version).unwrap();
    let mut frame = BytesMut::with_capacity(body.len() + 4);
    frame.put_i32(body.len() as i32);
    frame.extend_from_slice(&body);
    frame
}
