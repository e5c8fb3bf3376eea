//! Kafka wire client
//!
//! A minimal admin client speaking the Kafka protocol over TCP or TLS with
//! SASL PLAIN/SCRAM authentication. Each request is framed as a 4-byte
//! big-endian length followed by the request header and body; API versions
//! are pinned per request type.

mod client;
mod tls;

pub use client::{NativeAdminClient, NativeConnector};
pub use tls::build_tls_connector;

use crate::error::{KafkaAdminError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use kafka_protocol::messages::{ApiKey, RequestHeader, ResponseHeader};
use kafka_protocol::protocol::{Decodable, Encodable, StrBytes};

// ---------------------------------------------------------------------------
// Pinned API versions
// ---------------------------------------------------------------------------

pub const METADATA_VERSION: i16 = 8;
pub const DESCRIBE_ACLS_VERSION: i16 = 1;
pub const CREATE_TOPICS_VERSION: i16 = 4;
pub const DELETE_TOPICS_VERSION: i16 = 3;
pub const SASL_HANDSHAKE_VERSION: i16 = 1;
pub const SASL_AUTHENTICATE_VERSION: i16 = 1;

/// Whether `version` of `api_key` uses the flexible (tagged field) encoding
pub fn is_flexible(api_key: ApiKey, version: i16) -> bool {
    match api_key {
        ApiKey::Metadata => version >= 9,
        ApiKey::CreateTopics => version >= 5,
        ApiKey::DeleteTopics => version >= 4,
        ApiKey::DescribeAcls => version >= 2,
        ApiKey::SaslAuthenticate => version >= 2,
        ApiKey::ApiVersions => version >= 3,
        _ => false,
    }
}

pub fn request_header_version(api_key: ApiKey, version: i16) -> i16 {
    if is_flexible(api_key, version) {
        2
    } else {
        1
    }
}

pub fn response_header_version(api_key: ApiKey, version: i16) -> i16 {
    // ApiVersions responses always use header v0 so old clients can parse them
    if api_key != ApiKey::ApiVersions && is_flexible(api_key, version) {
        1
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// Encode a complete length-prefixed request frame
pub fn encode_request<Req: Encodable>(
    api_key: ApiKey,
    api_version: i16,
    correlation_id: i32,
    client_id: &str,
    request: &Req,
) -> Result<BytesMut> {
    let header = RequestHeader::default()
        .with_request_api_key(api_key as i16)
        .with_request_api_version(api_version)
        .with_correlation_id(correlation_id)
        .with_client_id(Some(StrBytes::from_string(client_id.to_string())));

    let mut body = BytesMut::new();
    header
        .encode(&mut body, request_header_version(api_key, api_version))
        .map_err(|e| KafkaAdminError::invalid(format!("encode {:?} header: {}", api_key, e)))?;
    request
        .encode(&mut body, api_version)
        .map_err(|e| KafkaAdminError::invalid(format!("encode {:?} request: {}", api_key, e)))?;

    let mut frame = BytesMut::with_capacity(4 + body.len());
    frame.put_i32(body.len() as i32);
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode a response body (without the length prefix)
///
/// Fails if the correlation id does not match the request's.
pub fn decode_response<Resp: Decodable>(
    api_key: ApiKey,
    api_version: i16,
    expected_correlation_id: i32,
    mut body: Bytes,
) -> Result<Resp> {
    let header = ResponseHeader::decode(&mut body, response_header_version(api_key, api_version))
        .map_err(|e| KafkaAdminError::invalid(format!("decode {:?} response header: {}", api_key, e)))?;
    if header.correlation_id != expected_correlation_id {
        return Err(KafkaAdminError::transient(format!(
            "Correlation id mismatch for {:?}: expected {}, got {}",
            api_key, expected_correlation_id, header.correlation_id
        )));
    }
    let response = Resp::decode(&mut body, api_version)
        .map_err(|e| KafkaAdminError::invalid(format!("decode {:?} response: {}", api_key, e)))?;
    if body.has_remaining() {
        tracing::debug!(
            api_key = ?api_key,
            trailing = body.remaining(),
            "Ignoring trailing bytes in response"
        );
    }
    Ok(response)
}
