//! Error types for the administration layer
//!
//! Every fallible operation outside the credential classifier and the
//! principal deriver returns a [`KafkaAdminError`]. Each error carries an
//! [`ErrorCategory`] from a closed taxonomy plus a retryable flag, which is
//! all a caller needs to decide between retrying, prompting for new
//! credentials, or surfacing the failure as terminal.
//!
//! Lower layers produce errors either directly (a Kafka error code, an HTTP
//! status) or through the heuristic rule table in [`classify_message`].
//! Upper layers add context with [`KafkaAdminError::context`], which keeps the
//! inner category and retryable flag untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod classify;
mod kafka_error_code;

pub use classify::{classify_error, classify_message, classify_named, ClassifierRule, CLASSIFIER_RULES};
pub use kafka_error_code::KafkaErrorCode;

/// Result type alias for administration operations
pub type Result<T> = std::result::Result<T, KafkaAdminError>;

/// Boxed underlying cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Closed error taxonomy used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Network, broker or timeout failure; retrying may help
    Transient,
    /// Authentication or authorization failure
    Auth,
    /// Malformed request or configuration, including unsupported credential kinds
    Invalid,
    /// The addressed resource does not exist
    NotFound,
    /// The resource being created already exists
    AlreadyExists,
    /// Anything the classifier could not place
    Unknown,
}

impl ErrorCategory {
    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "TRANSIENT",
            ErrorCategory::Auth => "AUTH",
            ErrorCategory::Invalid => "INVALID",
            ErrorCategory::NotFound => "NOT_FOUND",
            ErrorCategory::AlreadyExists => "ALREADY_EXISTS",
            ErrorCategory::Unknown => "UNKNOWN",
        }
    }

    /// Default value of the retryable flag for this category
    pub fn is_retryable_by_default(&self) -> bool {
        matches!(self, ErrorCategory::Transient)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorized administration error
#[derive(Error, Debug)]
#[error("{message}")]
pub struct KafkaAdminError {
    message: String,
    category: ErrorCategory,
    retryable: bool,
    #[source]
    cause: Option<BoxError>,
}

impl KafkaAdminError {
    /// Create an error; `retryable` follows the category default
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category,
            retryable: category.is_retryable_by_default(),
            cause: None,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Transient, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Auth, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Invalid, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::AlreadyExists, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unknown, message)
    }

    /// Override the category default for the retryable flag
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attach the underlying cause
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Convert any error into a categorized one.
    ///
    /// A `KafkaAdminError` passes through unchanged; anything else is run
    /// through the classifier rule table and kept as the cause.
    pub fn from_error(err: impl Into<BoxError>) -> Self {
        let boxed: BoxError = err.into();
        match boxed.downcast::<KafkaAdminError>() {
            Ok(admin) => *admin,
            Err(other) => {
                let category = classify_error(other.as_ref());
                Self::new(category, other.to_string()).with_cause(other)
            }
        }
    }

    /// Wrap with operation and resource context.
    ///
    /// The wrapper keeps this error's category and retryable flag and holds
    /// it as the source, so the original cause stays reachable.
    pub fn context(self, operation: &str, resource: &str) -> Self {
        let message = if resource.is_empty() {
            format!("{}: {}", operation, self.message)
        } else {
            format!("{} '{}': {}", operation, resource, self.message)
        };
        Self {
            message,
            category: self.category,
            retryable: self.retryable,
            cause: Some(Box::new(self)),
        }
    }

    /// Classify a foreign error and add context in one step
    pub fn wrap(err: impl Into<BoxError>, operation: &str, resource: &str) -> Self {
        Self::from_error(err).context(operation, resource)
    }

    /// Build an error from a Kafka protocol error code.
    ///
    /// Returns `None` for code 0. Codes outside the known table fall back to
    /// classifying the broker-supplied message.
    pub fn from_kafka_code(code: i16, message: Option<&str>) -> Option<Self> {
        if code == 0 {
            return None;
        }
        let err = match KafkaErrorCode::from_i16(code) {
            Some(known) => {
                let text = match message {
                    Some(m) if !m.is_empty() => format!("{}: {}", known.name(), m),
                    _ => format!("{}: {}", known.name(), known.description()),
                };
                Self::new(known.category(), text).with_retryable(
                    known.category().is_retryable_by_default() || known.is_retriable(),
                )
            }
            None => {
                let text = message
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Kafka error code {}", code));
                Self::new(classify_message(&text), text)
            }
        };
        Some(err)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.category == ErrorCategory::NotFound
    }

    pub fn is_auth(&self) -> bool {
        self.category == ErrorCategory::Auth
    }
}

impl From<std::io::Error> for KafkaAdminError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let category = match err.kind() {
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::TimedOut
            | ErrorKind::UnexpectedEof
            | ErrorKind::AddrNotAvailable
            | ErrorKind::Interrupted => ErrorCategory::Transient,
            ErrorKind::PermissionDenied => ErrorCategory::Auth,
            ErrorKind::NotFound => ErrorCategory::NotFound,
            ErrorKind::InvalidInput | ErrorKind::InvalidData => ErrorCategory::Invalid,
            _ => classify_message(&err.to_string()),
        };
        Self::new(category, format!("I/O error: {}", err)).with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_retryable_defaults_follow_category() {
        assert!(KafkaAdminError::transient("x").is_retryable());
        assert!(!KafkaAdminError::auth("x").is_retryable());
        assert!(!KafkaAdminError::invalid("x").is_retryable());
        assert!(!KafkaAdminError::not_found("x").is_retryable());
        assert!(!KafkaAdminError::already_exists("x").is_retryable());
        assert!(!KafkaAdminError::unknown("x").is_retryable());
    }

    #[test]
    fn test_retryable_override() {
        let err = KafkaAdminError::transient("broker busy").with_retryable(false);
        assert_eq!(err.category(), ErrorCategory::Transient);
        assert!(!err.is_retryable());

        let err = KafkaAdminError::unknown("flaky").with_retryable(true);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_display_is_message() {
        let err = KafkaAdminError::not_found("topic 'orders' does not exist");
        assert_eq!(err.to_string(), "topic 'orders' does not exist");
    }

    #[test]
    fn test_context_preserves_category_and_cause() {
        let inner = KafkaAdminError::already_exists("TOPIC_ALREADY_EXISTS: orders")
            .with_retryable(true);
        let wrapped = inner.context("create topic", "orders");

        assert_eq!(wrapped.category(), ErrorCategory::AlreadyExists);
        assert!(wrapped.is_retryable());
        assert_eq!(
            wrapped.message(),
            "create topic 'orders': TOPIC_ALREADY_EXISTS: orders"
        );
        let source = wrapped.source().unwrap();
        assert_eq!(source.to_string(), "TOPIC_ALREADY_EXISTS: orders");
    }

    #[test]
    fn test_from_error_passes_admin_error_through() {
        let original = KafkaAdminError::auth("SASL handshake rejected");
        let converted = KafkaAdminError::from_error(original);
        assert_eq!(converted.category(), ErrorCategory::Auth);
        assert_eq!(converted.message(), "SASL handshake rejected");
    }

    #[test]
    fn test_from_error_classifies_foreign_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "request timed out after 30s");
        let err = KafkaAdminError::from_error(io);
        assert_eq!(err.category(), ErrorCategory::Transient);
        assert!(err.is_retryable());
        assert!(err.cause().is_some());
    }

    #[test]
    fn test_wrap_keeps_inner_category() {
        let err = KafkaAdminError::wrap(KafkaAdminError::not_found("missing"), "describe topic", "t1");
        assert!(err.is_not_found());
        assert_eq!(err.message(), "describe topic 't1': missing");
    }

    #[test]
    fn test_from_kafka_code() {
        assert!(KafkaAdminError::from_kafka_code(0, None).is_none());

        let err = KafkaAdminError::from_kafka_code(36, Some("Topic 'a' already exists.")).unwrap();
        assert_eq!(err.category(), ErrorCategory::AlreadyExists);
        assert_eq!(err.message(), "TOPIC_ALREADY_EXISTS: Topic 'a' already exists.");

        let err = KafkaAdminError::from_kafka_code(3, None).unwrap();
        assert!(err.is_not_found());
        // Kafka treats unknown-topic as retriable metadata staleness
        assert!(err.is_retryable());

        let err = KafkaAdminError::from_kafka_code(29, None).unwrap();
        assert!(err.is_auth());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_unknown_kafka_code_uses_message() {
        let err = KafkaAdminError::from_kafka_code(999, Some("connection to node 2 lost")).unwrap();
        assert_eq!(err.category(), ErrorCategory::Transient);

        let err = KafkaAdminError::from_kafka_code(999, None).unwrap();
        assert_eq!(err.category(), ErrorCategory::Unknown);
        assert_eq!(err.message(), "Kafka error code 999");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: KafkaAdminError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();
        assert_eq!(err.category(), ErrorCategory::Transient);

        let err: KafkaAdminError =
            std::io::Error::new(std::io::ErrorKind::InvalidData, "bad frame").into();
        assert_eq!(err.category(), ErrorCategory::Invalid);
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&ErrorCategory::AlreadyExists).unwrap();
        assert_eq!(json, "\"ALREADY_EXISTS\"");
        assert_eq!(ErrorCategory::NotFound.to_string(), "NOT_FOUND");
    }
}
