//! Kafka protocol error codes seen on the admin path
//!
//! Only the codes that Metadata, CreateTopics, DeleteTopics, DescribeAcls and
//! the SASL exchange can return are listed. Anything else is classified from
//! the broker's message text.
//!
//! See: <https://kafka.apache.org/protocol.html#protocol_error_codes>

use super::ErrorCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum KafkaErrorCode {
    UnknownServerError = -1,
    UnknownTopicOrPartition = 3,
    LeaderNotAvailable = 5,
    NotLeaderOrFollower = 6,
    RequestTimedOut = 7,
    BrokerNotAvailable = 8,
    ReplicaNotAvailable = 9,
    NetworkException = 13,
    CoordinatorNotAvailable = 15,
    InvalidTopicException = 17,
    NotEnoughReplicas = 19,
    TopicAuthorizationFailed = 29,
    GroupAuthorizationFailed = 30,
    ClusterAuthorizationFailed = 31,
    UnsupportedSaslMechanism = 33,
    IllegalSaslState = 34,
    UnsupportedVersion = 35,
    TopicAlreadyExists = 36,
    InvalidPartitions = 37,
    InvalidReplicationFactor = 38,
    InvalidReplicaAssignment = 39,
    InvalidConfig = 40,
    NotController = 41,
    InvalidRequest = 42,
    PolicyViolation = 44,
    SecurityDisabled = 54,
    KafkaStorageError = 56,
    SaslAuthenticationFailed = 58,
    ReassignmentInProgress = 60,
    InvalidPrincipalType = 67,
    TopicDeletionDisabled = 73,
    ThrottlingQuotaExceeded = 89,
    ResourceNotFound = 91,
    DuplicateResource = 92,
    UnknownTopicId = 100,
}

impl KafkaErrorCode {
    /// Look up a wire error code. Returns `None` for 0 and for codes not in the table.
    pub fn from_i16(code: i16) -> Option<Self> {
        use KafkaErrorCode::*;
        let known = match code {
            -1 => UnknownServerError,
            3 => UnknownTopicOrPartition,
            5 => LeaderNotAvailable,
            6 => NotLeaderOrFollower,
            7 => RequestTimedOut,
            8 => BrokerNotAvailable,
            9 => ReplicaNotAvailable,
            13 => NetworkException,
            15 => CoordinatorNotAvailable,
            17 => InvalidTopicException,
            19 => NotEnoughReplicas,
            29 => TopicAuthorizationFailed,
            30 => GroupAuthorizationFailed,
            31 => ClusterAuthorizationFailed,
            33 => UnsupportedSaslMechanism,
            34 => IllegalSaslState,
            35 => UnsupportedVersion,
            36 => TopicAlreadyExists,
            37 => InvalidPartitions,
            38 => InvalidReplicationFactor,
            39 => InvalidReplicaAssignment,
            40 => InvalidConfig,
            41 => NotController,
            42 => InvalidRequest,
            44 => PolicyViolation,
            54 => SecurityDisabled,
            56 => KafkaStorageError,
            58 => SaslAuthenticationFailed,
            60 => ReassignmentInProgress,
            67 => InvalidPrincipalType,
            73 => TopicDeletionDisabled,
            89 => ThrottlingQuotaExceeded,
            91 => ResourceNotFound,
            92 => DuplicateResource,
            100 => UnknownTopicId,
            _ => return None,
        };
        Some(known)
    }

    pub fn as_i16(&self) -> i16 {
        *self as i16
    }

    /// Upper snake case name as used in broker logs
    pub fn name(&self) -> &'static str {
        use KafkaErrorCode::*;
        match self {
            UnknownServerError => "UNKNOWN_SERVER_ERROR",
            UnknownTopicOrPartition => "UNKNOWN_TOPIC_OR_PARTITION",
            LeaderNotAvailable => "LEADER_NOT_AVAILABLE",
            NotLeaderOrFollower => "NOT_LEADER_OR_FOLLOWER",
            RequestTimedOut => "REQUEST_TIMED_OUT",
            BrokerNotAvailable => "BROKER_NOT_AVAILABLE",
            ReplicaNotAvailable => "REPLICA_NOT_AVAILABLE",
            NetworkException => "NETWORK_EXCEPTION",
            CoordinatorNotAvailable => "COORDINATOR_NOT_AVAILABLE",
            InvalidTopicException => "INVALID_TOPIC_EXCEPTION",
            NotEnoughReplicas => "NOT_ENOUGH_REPLICAS",
            TopicAuthorizationFailed => "TOPIC_AUTHORIZATION_FAILED",
            GroupAuthorizationFailed => "GROUP_AUTHORIZATION_FAILED",
            ClusterAuthorizationFailed => "CLUSTER_AUTHORIZATION_FAILED",
            UnsupportedSaslMechanism => "UNSUPPORTED_SASL_MECHANISM",
            IllegalSaslState => "ILLEGAL_SASL_STATE",
            UnsupportedVersion => "UNSUPPORTED_VERSION",
            TopicAlreadyExists => "TOPIC_ALREADY_EXISTS",
            InvalidPartitions => "INVALID_PARTITIONS",
            InvalidReplicationFactor => "INVALID_REPLICATION_FACTOR",
            InvalidReplicaAssignment => "INVALID_REPLICA_ASSIGNMENT",
            InvalidConfig => "INVALID_CONFIG",
            NotController => "NOT_CONTROLLER",
            InvalidRequest => "INVALID_REQUEST",
            PolicyViolation => "POLICY_VIOLATION",
            SecurityDisabled => "SECURITY_DISABLED",
            KafkaStorageError => "KAFKA_STORAGE_ERROR",
            SaslAuthenticationFailed => "SASL_AUTHENTICATION_FAILED",
            ReassignmentInProgress => "REASSIGNMENT_IN_PROGRESS",
            InvalidPrincipalType => "INVALID_PRINCIPAL_TYPE",
            TopicDeletionDisabled => "TOPIC_DELETION_DISABLED",
            ThrottlingQuotaExceeded => "THROTTLING_QUOTA_EXCEEDED",
            ResourceNotFound => "RESOURCE_NOT_FOUND",
            DuplicateResource => "DUPLICATE_RESOURCE",
            UnknownTopicId => "UNKNOWN_TOPIC_ID",
        }
    }

    /// Short human description used when the broker sends no message
    pub fn description(&self) -> &'static str {
        use KafkaErrorCode::*;
        match self {
            UnknownServerError => "unexpected server error",
            UnknownTopicOrPartition | UnknownTopicId => "topic does not exist on this broker",
            LeaderNotAvailable | NotLeaderOrFollower => "partition leadership is changing",
            RequestTimedOut => "request timed out on the broker",
            BrokerNotAvailable | ReplicaNotAvailable => "broker not available",
            NetworkException => "network error while talking to the broker",
            CoordinatorNotAvailable => "coordinator not available",
            InvalidTopicException => "topic name is invalid",
            NotEnoughReplicas => "not enough in-sync replicas",
            TopicAuthorizationFailed => "not authorized to access the topic",
            GroupAuthorizationFailed => "not authorized to access the group",
            ClusterAuthorizationFailed => "not authorized to perform cluster operations",
            UnsupportedSaslMechanism => "SASL mechanism not enabled on the broker",
            IllegalSaslState => "unexpected SASL request for the current state",
            UnsupportedVersion => "API version not supported by the broker",
            TopicAlreadyExists => "topic already exists",
            InvalidPartitions => "partition count is invalid",
            InvalidReplicationFactor => "replication factor is invalid",
            InvalidReplicaAssignment => "replica assignment is invalid",
            InvalidConfig => "topic configuration is invalid",
            NotController => "broker is not the active controller",
            InvalidRequest => "request is malformed",
            PolicyViolation => "request violates a broker policy",
            SecurityDisabled => "security features are disabled",
            KafkaStorageError => "broker storage error",
            SaslAuthenticationFailed => "SASL authentication failed",
            ReassignmentInProgress => "partition reassignment in progress",
            InvalidPrincipalType => "principal type is not supported",
            TopicDeletionDisabled => "topic deletion is disabled",
            ThrottlingQuotaExceeded => "throttling quota exceeded",
            ResourceNotFound => "resource not found",
            DuplicateResource => "resource already exists",
        }
    }

    /// Category this code maps to without consulting any message text
    pub fn category(&self) -> ErrorCategory {
        use KafkaErrorCode::*;
        match self {
            UnknownTopicOrPartition | ResourceNotFound | UnknownTopicId => ErrorCategory::NotFound,
            TopicAlreadyExists | DuplicateResource => ErrorCategory::AlreadyExists,
            TopicAuthorizationFailed
            | GroupAuthorizationFailed
            | ClusterAuthorizationFailed
            | UnsupportedSaslMechanism
            | IllegalSaslState
            | SaslAuthenticationFailed => ErrorCategory::Auth,
            InvalidTopicException
            | UnsupportedVersion
            | InvalidPartitions
            | InvalidReplicationFactor
            | InvalidReplicaAssignment
            | InvalidConfig
            | InvalidRequest
            | PolicyViolation
            | SecurityDisabled
            | InvalidPrincipalType
            | TopicDeletionDisabled => ErrorCategory::Invalid,
            LeaderNotAvailable
            | NotLeaderOrFollower
            | RequestTimedOut
            | BrokerNotAvailable
            | ReplicaNotAvailable
            | NetworkException
            | CoordinatorNotAvailable
            | NotEnoughReplicas
            | NotController
            | KafkaStorageError
            | ReassignmentInProgress
            | ThrottlingQuotaExceeded => ErrorCategory::Transient,
            UnknownServerError => ErrorCategory::Unknown,
        }
    }

    /// Whether Kafka clients treat this code as retriable
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            KafkaErrorCode::UnknownTopicOrPartition
                | KafkaErrorCode::LeaderNotAvailable
                | KafkaErrorCode::NotLeaderOrFollower
                | KafkaErrorCode::RequestTimedOut
                | KafkaErrorCode::ReplicaNotAvailable
                | KafkaErrorCode::NetworkException
                | KafkaErrorCode::CoordinatorNotAvailable
                | KafkaErrorCode::NotEnoughReplicas
                | KafkaErrorCode::NotController
                | KafkaErrorCode::KafkaStorageError
                | KafkaErrorCode::ThrottlingQuotaExceeded
        )
    }
}
