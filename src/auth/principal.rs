//! Authorization principal derivation
//!
//! Maps a credential to the `User:<name>` principal that broker ACLs are
//! written against. The name is used verbatim; no escaping or trimming.

use crate::auth::credentials::Credential;
use serde::Serialize;
use std::fmt;

/// Prefix of every user principal
pub const USER_PRINCIPAL_PREFIX: &str = "User:";

/// Wildcard principal that matches any user
pub const WILDCARD_PRINCIPAL: &str = "User:*";

/// Outcome of principal derivation.
///
/// Exactly one of `principal` and `reason` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResult {
    principal: Option<String>,
    can_derive: bool,
    reason: Option<String>,
}

impl PrincipalResult {
    pub fn derived(principal: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            can_derive: true,
            reason: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            principal: None,
            can_derive: false,
            reason: Some(reason.into()),
        }
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn can_derive(&self) -> bool {
        self.can_derive
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl fmt::Display for PrincipalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.principal, &self.reason) {
            (Some(p), _) => f.write_str(p),
            (None, Some(r)) => write!(f, "<underivable: {}>", r),
            (None, None) => f.write_str("<underivable>"),
        }
    }
}

fn user_principal(name: &str, missing: &str) -> PrincipalResult {
    if name.is_empty() {
        PrincipalResult::unavailable(missing)
    } else {
        PrincipalResult::derived(format!("{}{}", USER_PRINCIPAL_PREFIX, name))
    }
}

/// Derive the ACL principal for a credential. Never fails; failure is in the result.
pub fn derive_principal(credential: &Credential) -> PrincipalResult {
    match credential.resolved().as_ref() {
        Credential::None | Credential::Legacy(_) => {
            PrincipalResult::unavailable("No authentication configured for this connection")
        }
        Credential::Basic(basic) => {
            user_principal(&basic.username, "Username is missing from the credentials")
        }
        Credential::ApiKey(api) => {
            user_principal(&api.api_key, "API key is missing from the credentials")
        }
        Credential::Scram(scram) => {
            user_principal(&scram.username, "SCRAM username is missing from the credentials")
        }
        Credential::Kerberos(kerberos) => user_principal(
            &kerberos.principal,
            "Kerberos principal is missing from the credentials",
        ),
        Credential::Mtls(_) => PrincipalResult::unavailable(
            "mTLS principals come from the client certificate subject, which is not accessible here",
        ),
        Credential::OAuth(_) => PrincipalResult::unavailable(
            "OAuth principals come from access token claims, which are not accessible here",
        ),
    }
}
