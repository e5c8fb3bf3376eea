//! Default constants for the administration layer
//!
//! Used when a configuration section omits a value.

/// Interval between idle-handle reaper passes, in seconds
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;

/// Idle time after which a pooled admin handle is closed, in seconds
pub const DEFAULT_IDLE_TTL_SECS: u64 = 5 * 60;

/// Age after which a cached ACL evaluation is treated as absent, in seconds
pub const DEFAULT_ACL_CACHE_TTL_SECS: u64 = 60;

/// Client id sent in every native request header
pub const DEFAULT_CLIENT_ID: &str = "streamline-admin";

/// TCP connect timeout for the native client, in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Per-request timeout for the native client, in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Broker-side timeout for CreateTopics/DeleteTopics, in milliseconds
pub const DEFAULT_TOPIC_OPERATION_TIMEOUT_MS: i32 = 30_000;

/// Largest response frame the native client accepts
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 100 * 1024 * 1024;

/// Timeout for REST proxy requests, in milliseconds
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,streamline_admin=debug";
