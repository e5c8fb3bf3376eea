//! Native admin client
//!
//! One broker connection per client, taken from the bootstrap list in order.
//! Requests are serialized over that connection. A transport failure drops
//! the connection and flips the client to disconnected; the pool then calls
//! [`AdminClient::reconnect`].

use super::tls::{build_tls_connector, server_name};
use super::{
    decode_response, encode_request, CREATE_TOPICS_VERSION, DELETE_TOPICS_VERSION,
    DESCRIBE_ACLS_VERSION, METADATA_VERSION, SASL_AUTHENTICATE_VERSION, SASL_HANDSHAKE_VERSION,
};
use crate::admin::{
    AdminClient, AdminConnectionConfig, AdminConnector, BrokerMetadata, ClusterMetadata,
    NewTopic, PartitionMetadata, TopicMetadata, TopicOperationResult,
};
use crate::auth::acl::{
    AclEntry, AclFilter, AclOperation, AclPermissionType, AclResource, DescribeAclsResult,
    PatternType, ResourceType,
};
use crate::auth::sasl::{SaslConfig, SaslMechanism};
use crate::auth::scram::ScramClient;
use crate::config::NativeClientConfig;
use crate::error::{KafkaAdminError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use kafka_protocol::messages::create_topics_request::{CreatableTopic, CreatableTopicConfig};
use kafka_protocol::messages::metadata_request::MetadataRequestTopic;
use kafka_protocol::messages::{
    ApiKey, CreateTopicsRequest, CreateTopicsResponse, DeleteTopicsRequest, DeleteTopicsResponse,
    DescribeAclsRequest, DescribeAclsResponse, MetadataRequest, MetadataResponse,
    SaslAuthenticateRequest, SaslAuthenticateResponse, SaslHandshakeRequest,
    SaslHandshakeResponse, TopicName,
};
use kafka_protocol::protocol::{Decodable, Encodable, StrBytes};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

enum BrokerStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for BrokerStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            BrokerStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            BrokerStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for BrokerStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            BrokerStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            BrokerStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            BrokerStream::Plain(s) => Pin::new(s).poll_flush(cx),
            BrokerStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            BrokerStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            BrokerStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

struct BrokerConnection {
    stream: BrokerStream,
    address: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct NativeAdminClient {
    config: AdminConnectionConfig,
    settings: NativeClientConfig,
    tls: Option<TlsConnector>,
    connection: Mutex<Option<BrokerConnection>>,
    connected: AtomicBool,
    closed: AtomicBool,
    correlation_id: AtomicI32,
}

impl NativeAdminClient {
    /// Connect to the first reachable bootstrap server and authenticate
    pub async fn connect(config: AdminConnectionConfig, settings: NativeClientConfig) -> Result<Self> {
        let tls = config.tls.as_ref().map(build_tls_connector).transpose()?;
        let client = Self {
            config,
            settings,
            tls,
            connection: Mutex::new(None),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            correlation_id: AtomicI32::new(0),
        };
        let connection = client.open().await?;
        *client.connection.lock().await = Some(connection);
        client.connected.store(true, Ordering::Release);
        Ok(client)
    }

    /// Address of the broker currently serving requests
    pub async fn broker_address(&self) -> Option<String> {
        self.connection.lock().await.as_ref().map(|c| c.address.clone())
    }

    async fn open(&self) -> Result<BrokerConnection> {
        let mut last_error = None;
        for address in &self.config.bootstrap_servers {
            match self.open_broker(address).await {
                Ok(connection) => return Ok(connection),
                // Credentials are shared by every broker; no point trying the rest
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(
                        cluster = %self.config.key,
                        broker = %address,
                        error = %e,
                        "Failed to connect to bootstrap server"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| KafkaAdminError::invalid("No bootstrap servers configured")))
    }

    async fn open_broker(&self, address: &str) -> Result<BrokerConnection> {
        let tcp = tokio::time::timeout(self.settings.connect_timeout(), TcpStream::connect(address))
            .await
            .map_err(|_| {
                KafkaAdminError::transient(format!(
                    "Connection to {} timed out after {}ms",
                    address, self.settings.connect_timeout_ms
                ))
            })?
            .map_err(|e| KafkaAdminError::from(e).context("connect", address))?;
        tcp.set_nodelay(true)
            .map_err(|e| KafkaAdminError::from(e).context("configure socket", address))?;

        let stream = match &self.tls {
            Some(connector) => {
                let tls = connector
                    .connect(server_name(address)?, tcp)
                    .await
                    .map_err(|e| KafkaAdminError::from(e).context("TLS handshake", address))?;
                BrokerStream::Tls(Box::new(tls))
            }
            None => BrokerStream::Plain(tcp),
        };

        let mut connection = BrokerConnection {
            stream,
            address: address.to_string(),
        };
        if let Some(sasl) = &self.config.sasl {
            self.authenticate(&mut connection, sasl).await?;
        }
        debug!(
            cluster = %self.config.key,
            broker = %address,
            tls = self.tls.is_some(),
            "Broker connection established"
        );
        Ok(connection)
    }

    // -----------------------------------------------------------------------
    // SASL
    // -----------------------------------------------------------------------

    async fn authenticate(&self, connection: &mut BrokerConnection, sasl: &SaslConfig) -> Result<()> {
        let handshake: SaslHandshakeResponse = self
            .round_trip(
                connection,
                ApiKey::SaslHandshake,
                SASL_HANDSHAKE_VERSION,
                &SaslHandshakeRequest::default()
                    .with_mechanism(StrBytes::from_static_str(sasl.mechanism.wire_name())),
            )
            .await?;
        if handshake.error_code != 0 {
            let enabled: Vec<String> = handshake.mechanisms.iter().map(|m| m.to_string()).collect();
            let message = format!(
                "{} is not enabled on the broker (enabled: {})",
                sasl.mechanism.wire_name(),
                enabled.join(", ")
            );
            return Err(sasl_error(handshake.error_code, &message));
        }

        match sasl.mechanism {
            SaslMechanism::Plain => {
                self.sasl_step(connection, sasl.plain_initial_response()).await?;
            }
            SaslMechanism::ScramSha256 | SaslMechanism::ScramSha512 => {
                let mut scram = ScramClient::new(sasl)?;
                let server_first = self.sasl_step(connection, scram.client_first()).await?;
                let client_final = scram.handle_server_first(&server_first)?;
                let server_final = self.sasl_step(connection, client_final).await?;
                scram.handle_server_final(&server_final)?;
            }
        }
        info!(
            cluster = %self.config.key,
            broker = %connection.address,
            mechanism = %sasl.mechanism,
            user = %sasl.username,
            "SASL authentication succeeded"
        );
        Ok(())
    }

    async fn sasl_step(&self, connection: &mut BrokerConnection, payload: Vec<u8>) -> Result<Bytes> {
        let response: SaslAuthenticateResponse = self
            .round_trip(
                connection,
                ApiKey::SaslAuthenticate,
                SASL_AUTHENTICATE_VERSION,
                &SaslAuthenticateRequest::default().with_auth_bytes(Bytes::from(payload)),
            )
            .await?;
        if response.error_code != 0 {
            let message = response
                .error_message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Authentication failed".to_string());
            return Err(sasl_error(response.error_code, &message));
        }
        Ok(response.auth_bytes)
    }

    // -----------------------------------------------------------------------
    // Request/response
    // -----------------------------------------------------------------------

    async fn round_trip<Req: Encodable, Resp: Decodable>(
        &self,
        connection: &mut BrokerConnection,
        api_key: ApiKey,
        api_version: i16,
        request: &Req,
    ) -> Result<Resp> {
        let correlation_id = self.correlation_id.fetch_add(1, Ordering::Relaxed);
        let frame = encode_request(api_key, api_version, correlation_id, &self.settings.client_id, request)?;
        let max_response_bytes = self.settings.max_response_bytes;
        let address = connection.address.clone();

        let exchange = async {
            connection.stream.write_all(&frame).await?;
            connection.stream.flush().await?;
            let len = connection.stream.read_i32().await?;
            if len < 0 || len as usize > max_response_bytes {
                return Err(KafkaAdminError::invalid(format!(
                    "Response size {} outside allowed range (max {})",
                    len, max_response_bytes
                )));
            }
            let mut body = vec![0u8; len as usize];
            connection.stream.read_exact(&mut body).await?;
            Ok(Bytes::from(body))
        };

        let body = tokio::time::timeout(self.settings.request_timeout(), exchange)
            .await
            .map_err(|_| {
                KafkaAdminError::transient(format!(
                    "{:?} request to {} timed out after {}ms",
                    api_key, address, self.settings.request_timeout_ms
                ))
            })??;
        decode_response(api_key, api_version, correlation_id, body)
    }

    /// A closed handle was evicted by the pool; the caller should re-acquire.
    fn closed_error(&self) -> KafkaAdminError {
        KafkaAdminError::transient(format!(
            "Admin client for {} has been closed",
            self.config.key
        ))
    }

    /// Send a request on the current connection.
    ///
    /// Any failure drops the connection, since a partial exchange leaves the
    /// stream out of sync.
    async fn send<Req: Encodable, Resp: Decodable>(
        &self,
        api_key: ApiKey,
        api_version: i16,
        request: &Req,
    ) -> Result<Resp> {
        if self.closed.load(Ordering::Acquire) {
            return Err(self.closed_error());
        }
        let mut guard = self.connection.lock().await;
        let Some(connection) = guard.as_mut() else {
            return Err(KafkaAdminError::transient(format!(
                "Not connected to cluster {}",
                self.config.key
            )));
        };
        match self.round_trip(connection, api_key, api_version, request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(
                    cluster = %self.config.key,
                    broker = %connection.address,
                    api_key = ?api_key,
                    error = %e,
                    "Request failed, dropping broker connection"
                );
                *guard = None;
                self.connected.store(false, Ordering::Release);
                Err(e)
            }
        }
    }
}

fn sasl_error(code: i16, message: &str) -> KafkaAdminError {
    KafkaAdminError::from_kafka_code(code, Some(message))
        .unwrap_or_else(|| KafkaAdminError::auth(message.to_string()))
}

fn topic_name(name: &str) -> TopicName {
    TopicName(StrBytes::from_string(name.to_string()))
}

fn optional_str(value: &Option<String>) -> Option<StrBytes> {
    value.clone().map(StrBytes::from_string)
}

#[async_trait]
impl AdminClient for NativeAdminClient {
    async fn describe_acls(&self, filter: &AclFilter) -> Result<DescribeAclsResult> {
        let request = DescribeAclsRequest::default()
            .with_resource_type_filter(filter.resource_type.to_code())
            .with_resource_name_filter(optional_str(&filter.resource_name))
            .with_pattern_type_filter(filter.pattern_type.to_code())
            .with_principal_filter(optional_str(&filter.principal))
            .with_host_filter(optional_str(&filter.host))
            .with_operation(filter.operation.to_code())
            .with_permission_type(filter.permission.to_code());
        let response: DescribeAclsResponse = self
            .send(ApiKey::DescribeAcls, DESCRIBE_ACLS_VERSION, &request)
            .await?;

        let resources = response
            .resources
            .into_iter()
            .map(|r| AclResource {
                resource_type: ResourceType::from_code(r.resource_type).unwrap_or(ResourceType::Unknown),
                name: r.resource_name.to_string(),
                pattern_type: PatternType::from_code(r.pattern_type).unwrap_or(PatternType::Unknown),
                acls: r
                    .acls
                    .into_iter()
                    .map(|a| AclEntry {
                        principal: a.principal.to_string(),
                        host: a.host.to_string(),
                        operation: AclOperation::from_code(a.operation).unwrap_or(AclOperation::Unknown),
                        permission: AclPermissionType::from_code(a.permission_type)
                            .unwrap_or(AclPermissionType::Unknown),
                    })
                    .collect(),
            })
            .collect();

        Ok(DescribeAclsResult {
            error_code: response.error_code,
            error_message: response.error_message.map(|m| m.to_string()),
            resources,
        })
    }

    async fn metadata(&self, topics: Option<&[String]>) -> Result<ClusterMetadata> {
        let request = MetadataRequest::default()
            .with_topics(topics.map(|names| {
                names
                    .iter()
                    .map(|n| MetadataRequestTopic::default().with_name(Some(topic_name(n))))
                    .collect()
            }))
            .with_allow_auto_topic_creation(false);
        let response: MetadataResponse = self.send(ApiKey::Metadata, METADATA_VERSION, &request).await?;

        Ok(ClusterMetadata {
            cluster_id: response.cluster_id.map(|c| c.to_string()),
            controller_id: response.controller_id.0,
            brokers: response
                .brokers
                .into_iter()
                .map(|b| BrokerMetadata {
                    node_id: b.node_id.0,
                    host: b.host.to_string(),
                    port: b.port,
                    rack: b.rack.map(|r| r.to_string()),
                })
                .collect(),
            topics: response
                .topics
                .into_iter()
                .map(|t| TopicMetadata {
                    name: t.name.map(|n| n.0.to_string()).unwrap_or_default(),
                    error_code: t.error_code,
                    is_internal: t.is_internal,
                    partitions: t
                        .partitions
                        .into_iter()
                        .map(|p| PartitionMetadata {
                            partition_id: p.partition_index,
                            error_code: p.error_code,
                            leader: p.leader_id.0,
                            replicas: p.replica_nodes.iter().map(|b| b.0).collect(),
                            isr: p.isr_nodes.iter().map(|b| b.0).collect(),
                            offline_replicas: p.offline_replicas.iter().map(|b| b.0).collect(),
                        })
                        .collect(),
                })
                .collect(),
        })
    }

    async fn create_topics(&self, topics: &[NewTopic], validate_only: bool) -> Result<Vec<TopicOperationResult>> {
        let request = CreateTopicsRequest::default()
            .with_topics(
                topics
                    .iter()
                    .map(|t| {
                        CreatableTopic::default()
                            .with_name(topic_name(&t.name))
                            .with_num_partitions(t.num_partitions)
                            .with_replication_factor(t.replication_factor)
                            .with_configs(
                                t.configs
                                    .iter()
                                    .map(|(k, v)| {
                                        CreatableTopicConfig::default()
                                            .with_name(StrBytes::from_string(k.clone()))
                                            .with_value(Some(StrBytes::from_string(v.clone())))
                                    })
                                    .collect(),
                            )
                    })
                    .collect(),
            )
            .with_timeout_ms(self.settings.topic_operation_timeout_ms)
            .with_validate_only(validate_only);
        let response: CreateTopicsResponse = self
            .send(ApiKey::CreateTopics, CREATE_TOPICS_VERSION, &request)
            .await?;

        Ok(response
            .topics
            .into_iter()
            .map(|t| TopicOperationResult {
                name: t.name.0.to_string(),
                error_code: t.error_code,
                error_message: t.error_message.map(|m| m.to_string()),
            })
            .collect())
    }

    async fn delete_topics(&self, names: &[String]) -> Result<Vec<TopicOperationResult>> {
        let request = DeleteTopicsRequest::default()
            .with_topic_names(names.iter().map(String::as_str).map(topic_name).collect())
            .with_timeout_ms(self.settings.topic_operation_timeout_ms);
        let response: DeleteTopicsResponse = self
            .send(ApiKey::DeleteTopics, DELETE_TOPICS_VERSION, &request)
            .await?;

        Ok(response
            .responses
            .into_iter()
            .map(|r| TopicOperationResult {
                name: r.name.map(|n| n.0.to_string()).unwrap_or_default(),
                error_code: r.error_code,
                error_message: r.error_message.map(|m| m.to_string()),
            })
            .collect())
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.connected.load(Ordering::Acquire)
    }

    async fn reconnect(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(self.closed_error());
        }
        let mut guard = self.connection.lock().await;
        if let Some(mut old) = guard.take() {
            let _ = old.stream.shutdown().await;
        }
        self.connected.store(false, Ordering::Release);
        let connection = self.open().await?;
        *guard = Some(connection);
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        if let Some(mut connection) = self.connection.lock().await.take() {
            let _ = connection.stream.shutdown().await;
            debug!(cluster = %self.config.key, broker = %connection.address, "Closed broker connection");
        }
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// [`AdminConnector`] producing [`NativeAdminClient`]s
#[derive(Debug, Clone, Default)]
pub struct NativeConnector {
    settings: NativeClientConfig,
}

impl NativeConnector {
    pub fn new(settings: NativeClientConfig) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl AdminConnector for NativeConnector {
    async fn connect(&self, config: &AdminConnectionConfig) -> Result<Arc<dyn AdminClient>> {
        let client = NativeAdminClient::connect(config.clone(), self.settings.clone()).await?;
        Ok(Arc::new(client))
    }
}
