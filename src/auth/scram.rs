//! Client side of the SCRAM-SHA-256/512 exchange (RFC 5802, RFC 7677)
//!
//! Drives the three messages the native client sends inside
//! SaslAuthenticate: client-first, client-final, and verification of the
//! server-final signature. Channel binding is not used (`n,,`).

use crate::auth::sasl::{SaslConfig, SaslMechanism};
use crate::error::{KafkaAdminError, Result};
use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD},
    Engine,
};
use hmac::{digest::KeyInit, Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

const GS2_HEADER: &str = "n,,";

enum ExchangeState {
    Initial,
    FirstSent { client_first_bare: String },
    FinalSent { server_signature: Vec<u8> },
    Complete,
}

/// Stateful SCRAM client for one authentication attempt
pub struct ScramClient {
    mechanism: SaslMechanism,
    username: String,
    password: Zeroizing<String>,
    client_nonce: String,
    state: ExchangeState,
}

impl ScramClient {
    pub fn new(config: &SaslConfig) -> Result<Self> {
        Self::with_nonce(config, generate_nonce())
    }

    /// Use a fixed client nonce
    pub fn with_nonce(config: &SaslConfig, client_nonce: impl Into<String>) -> Result<Self> {
        if !config.mechanism.is_scram() {
            return Err(KafkaAdminError::invalid(format!(
                "{} is not a SCRAM mechanism",
                config.mechanism.wire_name()
            )));
        }
        Ok(Self {
            mechanism: config.mechanism,
            username: config.username.clone(),
            password: config.password.clone(),
            client_nonce: client_nonce.into(),
            state: ExchangeState::Initial,
        })
    }

    /// client-first-message
    pub fn client_first(&mut self) -> Vec<u8> {
        let client_first_bare = format!("n={},r={}", escape_username(&self.username), self.client_nonce);
        let message = format!("{}{}", GS2_HEADER, client_first_bare);
        self.state = ExchangeState::FirstSent { client_first_bare };
        message.into_bytes()
    }

    /// Consume server-first-message and produce client-final-message
    pub fn handle_server_first(&mut self, server_first: &[u8]) -> Result<Vec<u8>> {
        let ExchangeState::FirstSent { client_first_bare } = &self.state else {
            return Err(KafkaAdminError::auth("SCRAM server-first received out of order"));
        };
        let server_first = std::str::from_utf8(server_first)
            .map_err(|_| KafkaAdminError::auth("SCRAM server-first is not valid UTF-8"))?;

        let mut nonce = None;
        let mut salt = None;
        let mut iterations = None;
        for attribute in server_first.split(',') {
            match attribute.split_once('=') {
                Some(("r", v)) => nonce = Some(v),
                Some(("s", v)) => salt = Some(v),
                Some(("i", v)) => iterations = Some(v),
                Some(("e", v)) => {
                    return Err(KafkaAdminError::auth(format!("SCRAM server error: {}", v)))
                }
                Some(("m", _)) => {
                    return Err(KafkaAdminError::auth("SCRAM mandatory extension not supported"))
                }
                _ => {}
            }
        }

        let nonce = nonce.ok_or_else(|| KafkaAdminError::auth("SCRAM server-first missing nonce"))?;
        if !nonce.starts_with(&self.client_nonce) || nonce.len() == self.client_nonce.len() {
            return Err(KafkaAdminError::auth("SCRAM server nonce does not extend the client nonce"));
        }
        let salt = salt
            .and_then(|s| BASE64.decode(s).ok())
            .ok_or_else(|| KafkaAdminError::auth("SCRAM server-first has a missing or invalid salt"))?;
        let iterations: u32 = iterations
            .and_then(|i| i.parse().ok())
            .filter(|i| *i > 0)
            .ok_or_else(|| KafkaAdminError::auth("SCRAM server-first has a missing or invalid iteration count"))?;

        let client_final_without_proof = format!("c={},r={}", BASE64.encode(GS2_HEADER), nonce);
        let auth_message = format!("{},{},{}", client_first_bare, server_first, client_final_without_proof);

        let salted = salted_password(self.mechanism, self.password.as_bytes(), &salt, iterations);
        let client_key = Zeroizing::new(hmac(self.mechanism, &salted, b"Client Key")?);
        let stored_key = hash(self.mechanism, &client_key);
        let client_signature = hmac(self.mechanism, &stored_key, auth_message.as_bytes())?;
        let proof: Vec<u8> = client_key
            .iter()
            .zip(client_signature.iter())
            .map(|(a, b)| a ^ b)
            .collect();

        let server_key = Zeroizing::new(hmac(self.mechanism, &salted, b"Server Key")?);
        let server_signature = hmac(self.mechanism, &server_key, auth_message.as_bytes())?;

        self.state = ExchangeState::FinalSent { server_signature };
        Ok(format!("{},p={}", client_final_without_proof, BASE64.encode(proof)).into_bytes())
    }

    /// Verify server-final-message
    pub fn handle_server_final(&mut self, server_final: &[u8]) -> Result<()> {
        let ExchangeState::FinalSent { server_signature } = &self.state else {
            return Err(KafkaAdminError::auth("SCRAM server-final received out of order"));
        };
        let server_final = std::str::from_utf8(server_final)
            .map_err(|_| KafkaAdminError::auth("SCRAM server-final is not valid UTF-8"))?;

        if let Some(error) = server_final.strip_prefix("e=") {
            return Err(KafkaAdminError::auth(format!("SCRAM server error: {}", error)));
        }
        let verifier = server_final
            .split(',')
            .find_map(|a| a.strip_prefix("v="))
            .and_then(|v| BASE64.decode(v).ok())
            .ok_or_else(|| KafkaAdminError::auth("SCRAM server-final missing verifier"))?;

        if !constant_time_eq(&verifier, server_signature) {
            return Err(KafkaAdminError::auth("SCRAM server signature mismatch"));
        }
        self.state = ExchangeState::Complete;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, ExchangeState::Complete)
    }
}

fn escape_username(username: &str) -> String {
    username.replace('=', "=3D").replace(',', "=2C")
}

fn generate_nonce() -> String {
    let mut nonce_bytes = [0u8; 24];
    rand::thread_rng().fill(&mut nonce_bytes);
    URL_SAFE_NO_PAD.encode(nonce_bytes)
}

fn salted_password(
    mechanism: SaslMechanism,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Zeroizing<Vec<u8>> {
    match mechanism {
        SaslMechanism::ScramSha512 => {
            let mut out = Zeroizing::new(vec![0u8; 64]);
            pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut out);
            out
        }
        _ => {
            let mut out = Zeroizing::new(vec![0u8; 32]);
            pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
            out
        }
    }
}

fn hmac(mechanism: SaslMechanism, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    match mechanism {
        SaslMechanism::ScramSha512 => {
            let mut mac = <Hmac<Sha512> as KeyInit>::new_from_slice(key)
                .map_err(|e| KafkaAdminError::auth(format!("SCRAM HMAC setup failed: {}", e)))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        _ => {
            let mut mac = <Hmac<Sha256> as KeyInit>::new_from_slice(key)
                .map_err(|e| KafkaAdminError::auth(format!("SCRAM HMAC setup failed: {}", e)))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
    }
}

fn hash(mechanism: SaslMechanism, data: &[u8]) -> Vec<u8> {
    match mechanism {
        SaslMechanism::ScramSha512 => Sha512::digest(data).to_vec(),
        _ => Sha256::digest(data).to_vec(),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    // RFC 7677 section 3 test vector
    const CLIENT_NONCE: &str = "rOprNGfwEbeRWgbNEkqO";
    const SERVER_FIRST: &str =
        "r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096";
    const CLIENT_FINAL: &str = "c=biws,r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,p=dHzbZapWIk4jUhN+Ute9ytag9zjfMHgsqmmiz7AndVQ=";
    const SERVER_FINAL: &str = "v=6rriTRBi23WpRR/wtup+mMhUZUn/dB5nLTJRsjl95G4=";

    fn rfc_client() -> ScramClient {
        let config = SaslConfig::new(SaslMechanism::ScramSha256, "user", "pencil");
        ScramClient::with_nonce(&config, CLIENT_NONCE).unwrap()
    }

    #[test]
    fn test_rfc7677_exchange() {
        let mut client = rfc_client();
        assert_eq!(client.client_first(), b"n,,n=user,r=rOprNGfwEbeRWgbNEkqO".to_vec());

        let client_final = client.handle_server_first(SERVER_FIRST.as_bytes()).unwrap();
        assert_eq!(String::from_utf8(client_final).unwrap(), CLIENT_FINAL);

        client.handle_server_final(SERVER_FINAL.as_bytes()).unwrap();
        assert!(client.is_complete());
    }

    #[test]
    fn test_bad_server_signature_is_auth_error() {
        let mut client = rfc_client();
        client.client_first();
        client.handle_server_first(SERVER_FIRST.as_bytes()).unwrap();
        let err = client
            .handle_server_final(b"v=AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=")
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert!(!client.is_complete());
    }

    #[test]
    fn test_server_nonce_must_extend_client_nonce() {
        let mut client = rfc_client();
        client.client_first();
        let err = client
            .handle_server_first(b"r=somethingelse,s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096")
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[test]
    fn test_server_error_attribute() {
        let mut client = rfc_client();
        client.client_first();
        let err = client.handle_server_first(b"e=unknown-user").unwrap_err();
        assert!(err.message().contains("unknown-user"));
    }

    #[test]
    fn test_out_of_order_messages_rejected() {
        let mut client = rfc_client();
        assert!(client.handle_server_first(SERVER_FIRST.as_bytes()).is_err());
        assert!(client.handle_server_final(SERVER_FINAL.as_bytes()).is_err());
    }

    #[test]
    fn test_username_escaping() {
        let config = SaslConfig::new(SaslMechanism::ScramSha512, "a=b,c", "pw");
        let mut client = ScramClient::with_nonce(&config, "nonce").unwrap();
        assert_eq!(client.client_first(), b"n,,n=a=3Db=2Cc,r=nonce".to_vec());
    }

    #[test]
    fn test_plain_mechanism_rejected() {
        let config = SaslConfig::new(SaslMechanism::Plain, "u", "p");
        assert!(ScramClient::new(&config).is_err());
    }

    #[test]
    fn test_generated_nonce_is_url_safe() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), 32);
        assert!(!nonce.contains(','));
        assert!(!nonce.contains('='));
    }
}
