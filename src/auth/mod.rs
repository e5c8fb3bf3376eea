//! Credentials, principals, SASL and the ACL model
//!
//! ## Flow
//!
//! - [`credentials`]: decode any credential encoding into [`Credential`] and
//!   classify it into an [`AuthKind`]
//! - [`principal`]: derive the `User:<name>` principal ACLs are evaluated against
//! - [`sasl`]: map the credential onto a SASL mechanism for the native client
//! - [`scram`]: client side of the SCRAM exchange
//! - [`acl`]: the ACL bindings DescribeAcls returns

pub mod acl;
pub mod credentials;
pub mod principal;
pub mod sasl;
pub mod scram;

pub use acl::{
    AclEntry, AclFilter, AclOperation, AclPermissionType, AclResource, DescribeAclsResult,
    PatternType, ResourceType, TOPIC_OPERATIONS,
};
pub use credentials::{
    classify, ApiKeyCredential, AuthKind, BasicCredential, Credential, KerberosCredential,
    LegacyCredential, MtlsCredential, OAuthCredential, ScramCredential,
};
pub use principal::{derive_principal, PrincipalResult, USER_PRINCIPAL_PREFIX, WILDCARD_PRINCIPAL};
pub use sasl::{to_sasl_config, SaslConfig, SaslMechanism};
pub use scram::ScramClient;
