//! Kafka ACL model as reported by DescribeAcls
//!
//! Enum codes follow the Kafka protocol (`ResourceType`, `PatternType`,
//! `AclOperation`, `AclPermissionType`). Resources carry the ACL entries the
//! broker bound to them; [`AclResource::matches_topic`] decides whether a
//! returned resource pattern applies to a concrete topic name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource types that ACLs can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Unknown,
    Any,
    Topic,
    Group,
    Cluster,
    TransactionalId,
    DelegationToken,
    User,
}

impl ResourceType {
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(ResourceType::Unknown),
            1 => Some(ResourceType::Any),
            2 => Some(ResourceType::Topic),
            3 => Some(ResourceType::Group),
            4 => Some(ResourceType::Cluster),
            5 => Some(ResourceType::TransactionalId),
            6 => Some(ResourceType::DelegationToken),
            7 => Some(ResourceType::User),
            _ => None,
        }
    }

    pub fn to_code(self) -> i8 {
        match self {
            ResourceType::Unknown => 0,
            ResourceType::Any => 1,
            ResourceType::Topic => 2,
            ResourceType::Group => 3,
            ResourceType::Cluster => 4,
            ResourceType::TransactionalId => 5,
            ResourceType::DelegationToken => 6,
            ResourceType::User => 7,
        }
    }
}

/// How a resource name in an ACL binding is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternType {
    Unknown,
    /// Filter-only: any pattern type
    Any,
    /// Filter-only: every binding that could apply to the named resource
    Match,
    /// Exact name, or the literal wildcard `*`
    Literal,
    /// Name prefix
    Prefixed,
}

impl PatternType {
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(PatternType::Unknown),
            1 => Some(PatternType::Any),
            2 => Some(PatternType::Match),
            3 => Some(PatternType::Literal),
            4 => Some(PatternType::Prefixed),
            _ => None,
        }
    }

    pub fn to_code(self) -> i8 {
        match self {
            PatternType::Unknown => 0,
            PatternType::Any => 1,
            PatternType::Match => 2,
            PatternType::Literal => 3,
            PatternType::Prefixed => 4,
        }
    }
}

/// Operations an ACL can grant or deny
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclOperation {
    Unknown,
    Any,
    All,
    Read,
    Write,
    Create,
    Delete,
    Alter,
    Describe,
    ClusterAction,
    DescribeConfigs,
    AlterConfigs,
    IdempotentWrite,
    CreateTokens,
    DescribeTokens,
}

/// The operation set `ALL` expands to on a topic
pub const TOPIC_OPERATIONS: [AclOperation; 8] = [
    AclOperation::Read,
    AclOperation::Write,
    AclOperation::Create,
    AclOperation::Delete,
    AclOperation::Alter,
    AclOperation::Describe,
    AclOperation::DescribeConfigs,
    AclOperation::AlterConfigs,
];

impl AclOperation {
    pub fn from_code(code: i8) -> Option<Self> {
        use AclOperation::*;
        let op = match code {
            0 => Unknown,
            1 => Any,
            2 => All,
            3 => Read,
            4 => Write,
            5 => Create,
            6 => Delete,
            7 => Alter,
            8 => Describe,
            9 => ClusterAction,
            10 => DescribeConfigs,
            11 => AlterConfigs,
            12 => IdempotentWrite,
            13 => CreateTokens,
            14 => DescribeTokens,
            _ => return None,
        };
        Some(op)
    }

    pub fn to_code(self) -> i8 {
        use AclOperation::*;
        match self {
            Unknown => 0,
            Any => 1,
            All => 2,
            Read => 3,
            Write => 4,
            Create => 5,
            Delete => 6,
            Alter => 7,
            Describe => 8,
            ClusterAction => 9,
            DescribeConfigs => 10,
            AlterConfigs => 11,
            IdempotentWrite => 12,
            CreateTokens => 13,
            DescribeTokens => 14,
        }
    }

    /// Upper snake case name, as reported in authorized-operation lists
    pub fn name(self) -> &'static str {
        use AclOperation::*;
        match self {
            Unknown => "UNKNOWN",
            Any => "ANY",
            All => "ALL",
            Read => "READ",
            Write => "WRITE",
            Create => "CREATE",
            Delete => "DELETE",
            Alter => "ALTER",
            Describe => "DESCRIBE",
            ClusterAction => "CLUSTER_ACTION",
            DescribeConfigs => "DESCRIBE_CONFIGS",
            AlterConfigs => "ALTER_CONFIGS",
            IdempotentWrite => "IDEMPOTENT_WRITE",
            CreateTokens => "CREATE_TOKENS",
            DescribeTokens => "DESCRIBE_TOKENS",
        }
    }

    /// Parse an upper snake case name (`DESCRIBE_CONFIGS`), case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        use AclOperation::*;
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "ANY" => Some(Any),
            "ALL" => Some(All),
            "READ" => Some(Read),
            "WRITE" => Some(Write),
            "CREATE" => Some(Create),
            "DELETE" => Some(Delete),
            "ALTER" => Some(Alter),
            "DESCRIBE" => Some(Describe),
            "CLUSTER_ACTION" => Some(ClusterAction),
            "DESCRIBE_CONFIGS" => Some(DescribeConfigs),
            "ALTER_CONFIGS" => Some(AlterConfigs),
            "IDEMPOTENT_WRITE" => Some(IdempotentWrite),
            "CREATE_TOKENS" => Some(CreateTokens),
            "DESCRIBE_TOKENS" => Some(DescribeTokens),
            _ => None,
        }
    }
}

impl fmt::Display for AclOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ALLOW or DENY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclPermissionType {
    Unknown,
    /// Filter-only
    Any,
    Deny,
    Allow,
}

impl AclPermissionType {
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(AclPermissionType::Unknown),
            1 => Some(AclPermissionType::Any),
            2 => Some(AclPermissionType::Deny),
            3 => Some(AclPermissionType::Allow),
            _ => None,
        }
    }

    pub fn to_code(self) -> i8 {
        match self {
            AclPermissionType::Unknown => 0,
            AclPermissionType::Any => 1,
            AclPermissionType::Deny => 2,
            AclPermissionType::Allow => 3,
        }
    }
}

/// One ACL bound to a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub principal: String,
    pub host: String,
    pub operation: AclOperation,
    pub permission: AclPermissionType,
}

impl AclEntry {
    pub fn new(
        principal: impl Into<String>,
        host: impl Into<String>,
        operation: AclOperation,
        permission: AclPermissionType,
    ) -> Self {
        Self {
            principal: principal.into(),
            host: host.into(),
            operation,
            permission,
        }
    }

    pub fn allow(principal: &str, operation: AclOperation) -> Self {
        Self::new(principal, "*", operation, AclPermissionType::Allow)
    }

    pub fn deny(principal: &str, operation: AclOperation) -> Self {
        Self::new(principal, "*", operation, AclPermissionType::Deny)
    }
}

impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(principal={}, host={}, operation={}, permission={:?})",
            self.principal, self.host, self.operation, self.permission
        )
    }
}

/// A resource pattern and the ACLs bound to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclResource {
    pub resource_type: ResourceType,
    pub name: String,
    pub pattern_type: PatternType,
    pub acls: Vec<AclEntry>,
}

impl AclResource {
    pub fn topic(name: impl Into<String>, pattern_type: PatternType, acls: Vec<AclEntry>) -> Self {
        Self {
            resource_type: ResourceType::Topic,
            name: name.into(),
            pattern_type,
            acls,
        }
    }

    /// Whether this resource pattern covers `topic`
    pub fn matches_topic(&self, topic: &str) -> bool {
        match self.pattern_type {
            PatternType::Literal => self.name == topic || self.name == "*",
            PatternType::Prefixed => topic.starts_with(&self.name),
            PatternType::Any | PatternType::Match => true,
            PatternType::Unknown => false,
        }
    }
}

/// DescribeAcls query filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclFilter {
    pub resource_type: ResourceType,
    pub resource_name: Option<String>,
    pub pattern_type: PatternType,
    pub principal: Option<String>,
    pub host: Option<String>,
    pub operation: AclOperation,
    pub permission: AclPermissionType,
}

impl AclFilter {
    /// Every ACL that could apply to `topic`, regardless of principal or operation
    pub fn topic_match(topic: &str) -> Self {
        Self {
            resource_type: ResourceType::Topic,
            resource_name: Some(topic.to_string()),
            pattern_type: PatternType::Match,
            principal: None,
            host: None,
            operation: AclOperation::Any,
            permission: AclPermissionType::Any,
        }
    }
}

/// Decoded DescribeAcls response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeAclsResult {
    pub error_code: i16,
    pub error_message: Option<String>,
    pub resources: Vec<AclResource>,
}
