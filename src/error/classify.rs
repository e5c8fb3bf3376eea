//! Heuristic error classification
//!
//! Failures coming from sockets, TLS, HTTP clients and brokers arrive as free
//! text. They are mapped onto [`ErrorCategory`] by an ordered rule table: the
//! first rule with a matching needle wins, so the order of
//! [`CLASSIFIER_RULES`] is part of the contract.
//!
//! Text is normalized before matching: camel case is split into words,
//! `_`, `-` and `.` become spaces, and everything is lower-cased. A needle
//! only matches at the start of a word, which keeps `acl` from firing inside
//! unrelated words.

use super::{ErrorCategory, KafkaAdminError};

/// One row of the classifier table
#[derive(Debug, Clone, Copy)]
pub struct ClassifierRule {
    pub category: ErrorCategory,
    pub needles: &'static [&'static str],
}

/// Ordered rule table; first match wins.
pub const CLASSIFIER_RULES: &[ClassifierRule] = &[
    ClassifierRule {
        category: ErrorCategory::Auth,
        needles: &[
            "authenticat",
            "authoriz",
            "unauthorized",
            "unauthenticated",
            "sasl",
            "acl",
            "access denied",
            "forbidden",
            "permission denied",
            "invalid credentials",
            "bad credentials",
        ],
    },
    ClassifierRule {
        category: ErrorCategory::NotFound,
        needles: &[
            "unknown topic",
            "not found",
            "not exist",
            "no such",
            "unknown resource",
        ],
    },
    ClassifierRule {
        category: ErrorCategory::AlreadyExists,
        needles: &["already exist", "exists already", "duplicate"],
    },
    ClassifierRule {
        category: ErrorCategory::Invalid,
        needles: &[
            "invalid",
            "illegal",
            "bad request",
            "malformed",
            "unsupported",
            "policy violation",
        ],
    },
    ClassifierRule {
        category: ErrorCategory::Transient,
        needles: &[
            "connect",
            "disconnect",
            "timeout",
            "timed out",
            "etimedout",
            "econnrefused",
            "econnreset",
            "broker",
            "network",
            "not available",
            "unavailable",
            "leader",
            "not controller",
            "socket",
            "reset by peer",
            "broken pipe",
            "closed",
            "temporar",
            "retriable",
        ],
    },
];

/// Normalize free text for matching
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev_lower = false;
    for c in text.chars() {
        if c.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        match c {
            '_' | '-' | '.' => out.push(' '),
            c => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// True if `needle` occurs in `haystack` starting at a word boundary
fn matches_at_word_start(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn classify_normalized(text: &str) -> Option<ErrorCategory> {
    CLASSIFIER_RULES
        .iter()
        .find(|rule| {
            rule.needles
                .iter()
                .any(|needle| matches_at_word_start(text, needle))
        })
        .map(|rule| rule.category)
}

/// Classify a raw error message
pub fn classify_message(message: &str) -> ErrorCategory {
    classify_normalized(&normalize(message)).unwrap_or(ErrorCategory::Unknown)
}

/// Classify using a structured error name (e.g. `TopicAuthorizationFailedException`)
/// together with its message. The name is consulted first.
pub fn classify_named(name: Option<&str>, message: &str) -> ErrorCategory {
    name.and_then(|n| classify_normalized(&normalize(n)))
        .or_else(|| classify_normalized(&normalize(message)))
        .unwrap_or(ErrorCategory::Unknown)
}

/// Classify an error by walking its source chain.
///
/// An already-categorized [`KafkaAdminError`] anywhere in the chain keeps its
/// category.
pub fn classify_error(err: &(dyn std::error::Error + 'static)) -> ErrorCategory {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(admin) = e.downcast_ref::<KafkaAdminError>() {
            return admin.category();
        }
        if let Some(category) = classify_normalized(&normalize(&e.to_string())) {
            return category;
        }
        current = e.source();
    }
    ErrorCategory::Unknown
}
