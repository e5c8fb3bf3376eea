//! SASL configuration for the native admin client
//!
//! Maps a credential onto the mechanism and identity the wire client uses
//! during the SaslHandshake/SaslAuthenticate exchange.

use crate::auth::credentials::Credential;
use crate::error::{KafkaAdminError, Result};
use std::fmt;
use zeroize::Zeroizing;

/// SASL mechanisms the native admin client can negotiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaslMechanism {
    Plain,
    ScramSha256,
    ScramSha512,
}

impl SaslMechanism {
    /// Configuration name (`plain`, `scram-sha-256`, `scram-sha-512`)
    pub fn as_str(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "plain",
            SaslMechanism::ScramSha256 => "scram-sha-256",
            SaslMechanism::ScramSha512 => "scram-sha-512",
        }
    }

    /// Mechanism name sent in SaslHandshake
    pub fn wire_name(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
            SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
        }
    }

    /// SCRAM variant for a declared hash algorithm.
    ///
    /// Accepts `SCRAM_SHA_512`, `scram-sha-512`, `SHA512` and friends; anything
    /// unrecognized selects SHA-256.
    pub fn scram_from_hash_algorithm(hash_algorithm: &str) -> Self {
        let normalized: String = hash_algorithm
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if normalized.ends_with("SHA512") {
            SaslMechanism::ScramSha512
        } else {
            SaslMechanism::ScramSha256
        }
    }

    pub fn is_scram(&self) -> bool {
        matches!(self, SaslMechanism::ScramSha256 | SaslMechanism::ScramSha512)
    }
}

impl fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mechanism plus identity for a SASL exchange
#[derive(Clone, PartialEq, Eq)]
pub struct SaslConfig {
    pub mechanism: SaslMechanism,
    pub username: String,
    pub password: Zeroizing<String>,
}

impl SaslConfig {
    pub fn new(mechanism: SaslMechanism, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mechanism,
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// SASL/PLAIN initial response: `\0username\0password`
    pub fn plain_initial_response(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.username.len() + self.password.len() + 2);
        bytes.push(0);
        bytes.extend_from_slice(self.username.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(self.password.as_bytes());
        bytes
    }
}

impl fmt::Debug for SaslConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslConfig")
            .field("mechanism", &self.mechanism)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Build the SASL configuration for a credential.
///
/// `Ok(None)` means no SASL layer: no authentication, or mTLS which
/// authenticates at the transport. Kerberos and OAuth are not supported by the
/// native client and fail with an INVALID error so callers can fall back to
/// the REST backend.
pub fn to_sasl_config(credential: &Credential) -> Result<Option<SaslConfig>> {
    match credential.resolved().as_ref() {
        Credential::None | Credential::Legacy(_) | Credential::Mtls(_) => Ok(None),
        Credential::Basic(basic) => Ok(Some(SaslConfig::new(
            SaslMechanism::Plain,
            basic.username.clone(),
            basic.password.clone(),
        ))),
        Credential::ApiKey(api) => Ok(Some(SaslConfig::new(
            SaslMechanism::Plain,
            api.api_key.clone(),
            api.api_secret.clone(),
        ))),
        Credential::Scram(scram) => Ok(Some(SaslConfig::new(
            SaslMechanism::scram_from_hash_algorithm(&scram.hash_algorithm),
            scram.username.clone(),
            scram.password.clone(),
        ))),
        Credential::Kerberos(_) => Err(KafkaAdminError::invalid(
            "Kerberos (GSSAPI) authentication is not supported by the native admin client; use the REST proxy backend",
        )),
        Credential::OAuth(_) => Err(KafkaAdminError::invalid(
            "OAuth (OAUTHBEARER) authentication is not supported by the native admin client; use the REST proxy backend",
        )),
    }
}
