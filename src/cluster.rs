//! Cluster descriptors
//!
//! A [`Cluster`] is addressed by `(connection_id, cluster_id)` and carries
//! everything needed to pick a backend and reach the cluster.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the cluster is reached and managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionType {
    /// Hosted cluster reached only through its REST proxy
    CloudManaged,
    /// Development cluster on the local machine
    SelfHostedLocal,
    /// User-configured cluster reached by bootstrap servers
    SelfHostedDirect,
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionType::CloudManaged => "cloud-managed",
            ConnectionType::SelfHostedLocal => "self-hosted-local",
            ConnectionType::SelfHostedDirect => "self-hosted-direct",
        };
        f.write_str(name)
    }
}

/// What the host process is able to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostCapability {
    /// Raw TCP sockets are available
    #[default]
    NativeSockets,
    /// Only HTTP requests can be made
    HttpOnly,
}

/// Pool and cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterKey {
    pub connection_id: String,
    pub cluster_id: String,
}

impl ClusterKey {
    pub fn new(connection_id: impl Into<String>, cluster_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            cluster_id: cluster_id.into(),
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connection_id, self.cluster_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub connection_id: String,
    pub cluster_id: String,
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub bootstrap_servers: Vec<String>,
    #[serde(default)]
    pub rest_uri: Option<String>,
    #[serde(default)]
    pub capability: HostCapability,
}

impl Cluster {
    pub fn new(
        connection_id: impl Into<String>,
        cluster_id: impl Into<String>,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            cluster_id: cluster_id.into(),
            connection_type,
            bootstrap_servers: Vec::new(),
            rest_uri: None,
            capability: HostCapability::default(),
        }
    }

    pub fn cloud(connection_id: &str, cluster_id: &str, rest_uri: &str) -> Self {
        Self::new(connection_id, cluster_id, ConnectionType::CloudManaged).with_rest_uri(rest_uri)
    }

    pub fn local(connection_id: &str, cluster_id: &str, rest_uri: &str) -> Self {
        Self::new(connection_id, cluster_id, ConnectionType::SelfHostedLocal).with_rest_uri(rest_uri)
    }

    pub fn direct(connection_id: &str, cluster_id: &str, bootstrap_servers: &[&str]) -> Self {
        Self::new(connection_id, cluster_id, ConnectionType::SelfHostedDirect)
            .with_bootstrap_servers(bootstrap_servers.iter().map(|s| s.to_string()).collect())
    }

    pub fn with_bootstrap_servers(mut self, servers: Vec<String>) -> Self {
        self.bootstrap_servers = servers;
        self
    }

    pub fn with_rest_uri(mut self, uri: impl Into<String>) -> Self {
        self.rest_uri = Some(uri.into());
        self
    }

    pub fn with_capability(mut self, capability: HostCapability) -> Self {
        self.capability = capability;
        self
    }

    pub fn key(&self) -> ClusterKey {
        ClusterKey::new(self.connection_id.clone(), self.cluster_id.clone())
    }
}
