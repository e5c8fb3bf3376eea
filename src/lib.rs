#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # Streamline Admin
//!
//! Kafka cluster administration and authorization for developer tooling.
//!
//! ## Features
//!
//! - **Credential decoding**: modern and legacy credential shapes decode into
//!   one [`Credential`] sum type and classify into an [`AuthKind`]
//! - **Principal derivation**: `User:<name>` principals for ACL evaluation
//! - **Pooled admin connections**: one native handle per
//!   `(connection, cluster)`, reconnected on demand and reaped when idle
//! - **ACL evaluation**: authorized topic operations with DENY-over-ALLOW
//!   precedence, prefix and wildcard resolution, and a TTL cache
//! - **Topic administration**: list, describe, create and delete through the
//!   native Kafka protocol or a REST proxy, selected per cluster
//! - **Error taxonomy**: every failure carries an [`ErrorCategory`] and a
//!   retryable flag
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use streamline_admin::{
//!     AdminConfig, AdminServices, BasicCredential, Cluster, Credential, InMemoryConnectionStore,
//!     ListTopicsOptions, StaticTokenProvider,
//! };
//!
//! # async fn run() -> streamline_admin::Result<()> {
//! let services = AdminServices::new(
//!     &AdminConfig::default(),
//!     Arc::new(InMemoryConnectionStore::new()),
//!     Arc::new(StaticTokenProvider::signed_out()),
//! )?;
//!
//! let cluster = Cluster::direct("dev", "cluster-1", &["localhost:9092"]);
//! let topics = services
//!     .topic_service(&cluster)
//!     .list_topics(&cluster, &ListTopicsOptions::default())
//!     .await?;
//!
//! let credential = Credential::Basic(BasicCredential {
//!     username: "alice".into(),
//!     password: "secret".into(),
//! });
//! for topic in &topics {
//!     let acl = services
//!         .acl()
//!         .get_authorized_operations(&cluster, &topic.name, &credential)
//!         .await?;
//!     println!("{}: {:?}", topic.name, acl.authorized_operations);
//! }
//! services.dispose().await;
//! # Ok(())
//! # }
//! ```

pub mod acl_engine;
pub mod admin;
pub mod auth;
pub mod cluster;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod services;
pub mod store;
pub mod topics;

pub use acl_engine::{evaluate_topic_acls, AclEngine, TopicAclResult};
pub use admin::{AdminClient, AdminConnectionPool, AdminConnector};
pub use auth::{
    classify, derive_principal, to_sasl_config, AuthKind, BasicCredential, Credential,
    PrincipalResult, SaslConfig, SaslMechanism,
};
pub use cluster::{Cluster, ClusterKey, ConnectionType, HostCapability};
pub use config::AdminConfig;
pub use error::{ErrorCategory, KafkaAdminError, Result};
pub use logging::init_logging;
pub use protocol::NativeConnector;
pub use services::AdminServices;
pub use store::{
    ConnectionStore, DirectConnectionRecord, InMemoryConnectionStore, StaticTokenProvider,
    TokenProvider,
};
pub use topics::{
    select_backend, BackendKind, CreateTopicOptions, DeleteTopicOptions, ListTopicsOptions,
    RestFlavor, TopicInfo, TopicService, TopicServiceFactory,
};
