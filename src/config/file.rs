//! TOML file loading for [`AdminConfig`]

use super::AdminConfig;
use crate::error::{KafkaAdminError, Result};
use std::path::Path;

impl AdminConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            KafkaAdminError::invalid(format!("Failed to read config file {:?}: {}", path, e))
                .with_cause(e)
        })?;
        Self::from_toml_str(&contents).map_err(|e| e.context("load config", &path.display().to_string()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| {
            KafkaAdminError::invalid(format!("Failed to parse config: {}", e)).with_cause(e)
        })
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            KafkaAdminError::invalid(format!("Failed to serialize config: {}", e)).with_cause(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AdminConfig::from_toml_str("").unwrap();
        assert_eq!(config, AdminConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = AdminConfig::from_toml_str(
            r#"
            [pool]
            idle_ttl_secs = 30

            [acl]
            cache_ttl_secs = 5

            [native]
            client_id = "ops-console"
            "#,
        )
        .unwrap();
        assert_eq!(config.pool.idle_ttl(), Duration::from_secs(30));
        // Unset key in a present section still gets its default
        assert_eq!(config.pool.reaper_interval_secs, 60);
        assert_eq!(config.acl.cache_ttl_secs, 5);
        assert_eq!(config.native.client_id, "ops-console");
        assert_eq!(config.native.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_parse_error_is_invalid() {
        let err = AdminConfig::from_toml_str("[pool]\nidle_ttl_secs = \"soon\"").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Invalid);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nrequest_timeout_ms = 1500").unwrap();
        let config = AdminConfig::from_file(file.path()).unwrap();
        assert_eq!(config.http.request_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = AdminConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Invalid);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AdminConfig::default();
        config.logging.json = true;
        let text = config.to_toml_string().unwrap();
        assert_eq!(AdminConfig::from_toml_str(&text).unwrap(), config);
    }
}
