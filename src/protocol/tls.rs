//! TLS setup for broker connections
//!
//! Trust comes from a PEM truststore when one is configured, otherwise from
//! the bundled web PKI roots. Client certificates for mutual TLS are read
//! from PEM files.

use crate::admin::{ClientCertificate, TlsSettings};
use crate::error::{KafkaAdminError, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig as RustlsClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Build a connector for the given settings
pub fn build_tls_connector(settings: &TlsSettings) -> Result<TlsConnector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = RustlsClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| KafkaAdminError::invalid(format!("Invalid TLS protocol configuration: {}", e)))?;

    let builder = if settings.verify_server_certificate {
        builder.with_root_certificates(root_store(settings.truststore_path.as_deref())?)
    } else {
        debug!("Server certificate verification disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoServerVerification))
    };

    let config = match &settings.client_certificate {
        Some(client) => {
            let (certs, key) = load_client_certificate(client)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| KafkaAdminError::invalid(format!("Invalid client certificate: {}", e)))?
        }
        None => builder.with_no_client_auth(),
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// TLS server name for a `host:port` bootstrap address
pub fn server_name(address: &str) -> Result<ServerName<'static>> {
    let host = match address.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() => host,
        _ => address,
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    ServerName::try_from(host.to_string())
        .map_err(|e| KafkaAdminError::invalid(format!("Invalid TLS server name '{}': {}", host, e)))
}

fn root_store(truststore_path: Option<&str>) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    match truststore_path {
        Some(path) => {
            for cert in load_certs(Path::new(path))? {
                roots.add(cert).map_err(|e| {
                    KafkaAdminError::invalid(format!("Invalid CA certificate in {}: {}", path, e))
                })?;
            }
        }
        None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }
    Ok(roots)
}

fn load_client_certificate(
    client: &ClientCertificate,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let cert_path = Path::new(&client.certificate_path);
    let certs = load_certs(cert_path)?;
    let key_path = client.key_path.as_deref().map(Path::new).unwrap_or(cert_path);
    let key = load_private_key(key_path)?;
    Ok((certs, key))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|e| {
        KafkaAdminError::from(e).context("open TLS file", &path.display().to_string())
    })?;
    Ok(BufReader::new(file))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            KafkaAdminError::invalid(format!("Failed to parse certificates from {}: {}", path.display(), e))
        })?;
    if certs.is_empty() {
        return Err(KafkaAdminError::invalid(format!(
            "No PEM certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| {
            KafkaAdminError::invalid(format!("Failed to parse private key from {}: {}", path.display(), e))
        })?
        .ok_or_else(|| KafkaAdminError::invalid(format!("No PEM private key found in {}", path.display())))
}

/// Accepts any server certificate
#[derive(Debug)]
struct NoServerVerification;

impl ServerCertVerifier for NoServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}
