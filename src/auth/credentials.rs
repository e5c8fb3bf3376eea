//! Credential shapes and the credential classifier
//!
//! Credentials reach this layer in two physical encodings:
//!
//! - the current form, with an explicit `type` discriminator and camelCase
//!   fields (`{"type": "SCRAM", "hashAlgorithm": "SCRAM_SHA_512", ...}`)
//! - an imported form without a discriminator, using camelCase or snake_case
//!   field names (`{"api_key": "...", "api_secret": "..."}`)
//!
//! Both decode into [`Credential`]. Discriminated input becomes a typed
//! variant; everything else is kept as [`Credential::Legacy`] and resolved
//! through [`LegacyCredential::to_typed`] when a consumer needs fields.
//! Classification never fails: anything unrecognizable is [`AuthKind::None`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// Authentication kind a credential resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthKind {
    None,
    Basic,
    ApiKey,
    Scram,
    Mtls,
    OAuth,
    Kerberos,
}

impl AuthKind {
    /// Discriminator value used by the current credential encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthKind::None => "None",
            AuthKind::Basic => "Basic",
            AuthKind::ApiKey => "API",
            AuthKind::Scram => "SCRAM",
            AuthKind::Mtls => "mTLS",
            AuthKind::OAuth => "OAuth",
            AuthKind::Kerberos => "Kerberos",
        }
    }

    /// Parse a discriminator value, case-insensitively
    pub fn from_discriminator(value: &str) -> Option<Self> {
        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "none" => Some(AuthKind::None),
            "basic" | "plain" => Some(AuthKind::Basic),
            "api" | "apikey" => Some(AuthKind::ApiKey),
            "scram" => Some(AuthKind::Scram),
            "mtls" => Some(AuthKind::Mtls),
            "oauth" | "oauth2" | "oauthbearer" => Some(AuthKind::OAuth),
            "kerberos" | "gssapi" => Some(AuthKind::Kerberos),
            _ => None,
        }
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Typed credential payloads
// ---------------------------------------------------------------------------

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicCredential {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiKeyCredential {
    #[serde(alias = "api_key")]
    pub api_key: String,
    #[serde(alias = "api_secret")]
    pub api_secret: String,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScramCredential {
    #[serde(alias = "hash_algorithm")]
    pub hash_algorithm: String,
    #[serde(alias = "scramUsername", alias = "scram_username")]
    pub username: String,
    #[serde(alias = "scramPassword", alias = "scram_password")]
    pub password: String,
}

/// Keystore reference for mutual TLS
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MtlsCredential {
    #[serde(alias = "keystore_path")]
    pub keystore_path: String,
    #[serde(alias = "keystore_password", skip_serializing_if = "Option::is_none")]
    pub keystore_password: Option<String>,
    /// `PEM`, `PKCS12` or `JKS`; only PEM is usable by the native client
    #[serde(alias = "keystore_type", skip_serializing_if = "Option::is_none")]
    pub keystore_type: Option<String>,
    /// Separate PEM private key; when absent the key is read from the keystore file
    #[serde(alias = "key_path", skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
    #[serde(alias = "truststore_path", skip_serializing_if = "Option::is_none")]
    pub truststore_path: Option<String>,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OAuthCredential {
    #[serde(alias = "tokens_url", alias = "tokenEndpoint", alias = "token_endpoint")]
    pub tokens_url: String,
    #[serde(alias = "client_id")]
    pub client_id: String,
    #[serde(alias = "client_secret", skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KerberosCredential {
    pub principal: String,
    #[serde(alias = "keytab_path")]
    pub keytab_path: String,
    #[serde(alias = "service_name", skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for BasicCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredential")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for ApiKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyCredential")
            .field("api_key", &self.api_key)
            .field("api_secret", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for ScramCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScramCredential")
            .field("hash_algorithm", &self.hash_algorithm)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

impl fmt::Debug for MtlsCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MtlsCredential")
            .field("keystore_path", &self.keystore_path)
            .field("keystore_type", &self.keystore_type)
            .field("key_path", &self.key_path)
            .field("truststore_path", &self.truststore_path)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("tokens_url", &self.tokens_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for KerberosCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KerberosCredential")
            .field("principal", &self.principal)
            .field("keytab_path", &self.keytab_path)
            .field("service_name", &self.service_name)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Legacy (untyped) credentials
// ---------------------------------------------------------------------------

const API_KEY_FIELDS: &[&str] = &["apiKey", "api_key"];
const API_SECRET_FIELDS: &[&str] = &["apiSecret", "api_secret"];
const HASH_ALGORITHM_FIELDS: &[&str] = &["hashAlgorithm", "hash_algorithm"];
const SCRAM_USERNAME_FIELDS: &[&str] = &["username", "scramUsername", "scram_username"];
const SCRAM_PASSWORD_FIELDS: &[&str] = &["password", "scramPassword", "scram_password"];
const SCRAM_ONLY_FIELDS: &[&str] = &[
    "scramUsername",
    "scram_username",
    "scramPassword",
    "scram_password",
];
const TOKEN_URL_FIELDS: &[&str] = &["tokensUrl", "tokens_url", "tokenEndpoint", "token_endpoint"];
const CLIENT_ID_FIELDS: &[&str] = &["clientId", "client_id"];
const KEYTAB_FIELDS: &[&str] = &["keytabPath", "keytab_path"];

/// Raw string-keyed credential record without a trusted shape
#[derive(Clone, Default, PartialEq)]
pub struct LegacyCredential {
    fields: Map<String, Value>,
}

impl LegacyCredential {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn has(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|v| !v.is_null())
    }

    fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.has(n))
    }

    /// First non-empty string among `names`, in order
    pub fn string_field(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|n| self.fields.get(*n).and_then(Value::as_str))
            .find(|s| !s.is_empty())
    }

    fn owned(&self, names: &[&str]) -> String {
        self.string_field(names).unwrap_or_default().to_string()
    }

    fn optional(&self, names: &[&str]) -> Option<String> {
        self.string_field(names).map(str::to_string)
    }

    fn discriminator(&self) -> Option<AuthKind> {
        self.fields
            .get("type")
            .and_then(Value::as_str)
            .and_then(AuthKind::from_discriminator)
    }

    /// Classify by discriminator when present, otherwise by field presence
    pub fn kind(&self) -> AuthKind {
        if let Some(kind) = self.discriminator() {
            return kind;
        }
        if self.has_any(API_KEY_FIELDS) && self.has_any(API_SECRET_FIELDS) {
            return AuthKind::ApiKey;
        }
        let has_hash = self.has_any(HASH_ALGORITHM_FIELDS);
        if self.has("username") && self.has("password") && !has_hash {
            return AuthKind::Basic;
        }
        if has_hash || self.has_any(SCRAM_ONLY_FIELDS) {
            return AuthKind::Scram;
        }
        if self.has_any(TOKEN_URL_FIELDS) && self.has_any(CLIENT_ID_FIELDS) {
            return AuthKind::OAuth;
        }
        if self.has("principal") && self.has_any(KEYTAB_FIELDS) {
            return AuthKind::Kerberos;
        }
        AuthKind::None
    }

    /// Resolve into a typed credential using the field fallback order of each kind
    pub fn to_typed(&self) -> Credential {
        match self.kind() {
            AuthKind::None => Credential::None,
            AuthKind::Basic => Credential::Basic(BasicCredential {
                username: self.owned(&["username"]),
                password: self.owned(&["password"]),
            }),
            AuthKind::ApiKey => Credential::ApiKey(ApiKeyCredential {
                api_key: self.owned(API_KEY_FIELDS),
                api_secret: self.owned(API_SECRET_FIELDS),
            }),
            AuthKind::Scram => Credential::Scram(ScramCredential {
                hash_algorithm: self.owned(HASH_ALGORITHM_FIELDS),
                username: self.owned(SCRAM_USERNAME_FIELDS),
                password: self.owned(SCRAM_PASSWORD_FIELDS),
            }),
            AuthKind::Mtls => Credential::Mtls(MtlsCredential {
                keystore_path: self.owned(&["keystorePath", "keystore_path"]),
                keystore_password: self.optional(&["keystorePassword", "keystore_password"]),
                keystore_type: self.optional(&["keystoreType", "keystore_type"]),
                key_path: self.optional(&["keyPath", "key_path"]),
                truststore_path: self.optional(&["truststorePath", "truststore_path"]),
            }),
            AuthKind::OAuth => Credential::OAuth(OAuthCredential {
                tokens_url: self.owned(TOKEN_URL_FIELDS),
                client_id: self.owned(CLIENT_ID_FIELDS),
                client_secret: self.optional(&["clientSecret", "client_secret"]),
                scope: self.optional(&["scope"]),
            }),
            AuthKind::Kerberos => Credential::Kerberos(KerberosCredential {
                principal: self.owned(&["principal"]),
                keytab_path: self.owned(KEYTAB_FIELDS),
                service_name: self.optional(&["serviceName", "service_name"]),
            }),
        }
    }
}

impl fmt::Debug for LegacyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Field names only; values may hold secrets
        f.debug_struct("LegacyCredential")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A credential in any supported encoding
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Credential {
    #[default]
    None,
    Basic(BasicCredential),
    ApiKey(ApiKeyCredential),
    Scram(ScramCredential),
    Mtls(MtlsCredential),
    OAuth(OAuthCredential),
    Kerberos(KerberosCredential),
    /// Imported record without a discriminator
    Legacy(LegacyCredential),
}

impl Credential {
    /// Decode from an arbitrary JSON value. Never fails.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(fields) = value else {
            return Credential::None;
        };
        if fields.is_empty() {
            return Credential::None;
        }
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .and_then(AuthKind::from_discriminator);
        let Some(kind) = kind else {
            return Credential::Legacy(LegacyCredential::new(fields));
        };

        let typed = match kind {
            AuthKind::None => Ok(Credential::None),
            AuthKind::Basic => decode_typed(&fields).map(Credential::Basic),
            AuthKind::ApiKey => decode_typed(&fields).map(Credential::ApiKey),
            AuthKind::Scram => decode_typed(&fields).map(Credential::Scram),
            AuthKind::Mtls => decode_typed(&fields).map(Credential::Mtls),
            AuthKind::OAuth => decode_typed(&fields).map(Credential::OAuth),
            AuthKind::Kerberos => decode_typed(&fields).map(Credential::Kerberos),
        };
        // A discriminated record with conflicting aliases still classifies by
        // its discriminator through the legacy path
        typed.unwrap_or_else(|_| Credential::Legacy(LegacyCredential::new(fields)))
    }

    /// Encode in the discriminated form; legacy records are written back as-is
    pub fn to_value(&self) -> Value {
        fn tagged<T: Serialize>(kind: AuthKind, payload: &T) -> Value {
            let mut fields = match serde_json::to_value(payload) {
                Ok(Value::Object(fields)) => fields,
                _ => Map::new(),
            };
            fields.insert("type".to_string(), Value::String(kind.as_str().to_string()));
            Value::Object(fields)
        }

        match self {
            Credential::None => {
                let mut fields = Map::new();
                fields.insert("type".to_string(), Value::String(AuthKind::None.as_str().to_string()));
                Value::Object(fields)
            }
            Credential::Basic(c) => tagged(AuthKind::Basic, c),
            Credential::ApiKey(c) => tagged(AuthKind::ApiKey, c),
            Credential::Scram(c) => tagged(AuthKind::Scram, c),
            Credential::Mtls(c) => tagged(AuthKind::Mtls, c),
            Credential::OAuth(c) => tagged(AuthKind::OAuth, c),
            Credential::Kerberos(c) => tagged(AuthKind::Kerberos, c),
            Credential::Legacy(legacy) => Value::Object(legacy.fields.clone()),
        }
    }

    /// Authentication kind of this credential
    pub fn kind(&self) -> AuthKind {
        match self {
            Credential::None => AuthKind::None,
            Credential::Basic(_) => AuthKind::Basic,
            Credential::ApiKey(_) => AuthKind::ApiKey,
            Credential::Scram(_) => AuthKind::Scram,
            Credential::Mtls(_) => AuthKind::Mtls,
            Credential::OAuth(_) => AuthKind::OAuth,
            Credential::Kerberos(_) => AuthKind::Kerberos,
            Credential::Legacy(legacy) => legacy.kind(),
        }
    }

    /// View as a typed credential, resolving legacy records
    pub fn resolved(&self) -> Cow<'_, Credential> {
        match self {
            Credential::Legacy(legacy) => Cow::Owned(legacy.to_typed()),
            typed => Cow::Borrowed(typed),
        }
    }
}

fn decode_typed<T: serde::de::DeserializeOwned>(fields: &Map<String, Value>) -> serde_json::Result<T> {
    let mut payload = fields.clone();
    payload.remove("type");
    serde_json::from_value(Value::Object(payload))
}

impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Credential::from_value(value))
    }
}

/// Classify an arbitrary JSON value. `null` and non-objects are `None`.
pub fn classify(value: &Value) -> AuthKind {
    match value {
        Value::Object(fields) => LegacyCredential::new(fields.clone()).kind(),
        _ => AuthKind::None,
    }
}
