//! Configuration for the administration layer
//!
//! All sections are optional in the TOML file; missing values fall back to
//! the constants in [`defaults`].
//!
//! ```toml
//! [pool]
//! idle_ttl_secs = 300
//! reaper_interval_secs = 60
//!
//! [acl]
//! cache_ttl_secs = 60
//!
//! [native]
//! client_id = "streamline-admin"
//! request_timeout_ms = 30000
//!
//! [http]
//! request_timeout_ms = 30000
//!
//! [logging]
//! filter = "info,streamline_admin=debug"
//! json = false
//! ```

pub mod defaults;
mod file;

use defaults::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub pool: PoolConfig,
    pub acl: AclCacheConfig,
    pub native: NativeClientConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Admin connection pool
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,

    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,
}

fn default_idle_ttl() -> u64 {
    DEFAULT_IDLE_TTL_SECS
}
fn default_reaper_interval() -> u64 {
    DEFAULT_REAPER_INTERVAL_SECS
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl(),
            reaper_interval_secs: default_reaper_interval(),
        }
    }
}

impl PoolConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    /// Reaper period; never zero
    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs.max(1))
    }
}

// ---------------------------------------------------------------------------
// ACL evaluation cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclCacheConfig {
    #[serde(default = "default_acl_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_acl_cache_ttl() -> u64 {
    DEFAULT_ACL_CACHE_TTL_SECS
}

impl Default for AclCacheConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_acl_cache_ttl(),
        }
    }
}

impl AclCacheConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// ---------------------------------------------------------------------------
// Native wire client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeClientConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Broker-side timeout passed in CreateTopics/DeleteTopics
    #[serde(default = "default_topic_operation_timeout")]
    pub topic_operation_timeout_ms: i32,

    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}
fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}
fn default_topic_operation_timeout() -> i32 {
    DEFAULT_TOPIC_OPERATION_TIMEOUT_MS
}
fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

impl Default for NativeClientConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            topic_operation_timeout_ms: default_topic_operation_timeout(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl NativeClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// REST proxy client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}
fn default_user_agent() -> String {
    format!("streamline-admin/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}
