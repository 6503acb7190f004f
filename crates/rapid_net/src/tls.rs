use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::net::TcpStream;
use tokio_rustls::rustls::client::{ServerCertVerified, ServerCertVerifier};
use tokio_rustls::rustls::{
    Certificate, ClientConfig, Error as RustlsError, OwnedTrustAnchor, RootCertStore, ServerName,
};
use tokio_rustls::TlsConnector;

use crate::transport::Connection;

/// ALPN identifier for HTTP/2 over TLS.
pub const ALPN_H2: &[u8] = b"h2";

/// rustls client offering only `h2`.
///
/// Probe targets are usually test servers with self-signed certificates,
/// so verification is off unless explicitly requested.
pub struct TlsProvider {
    config: Arc<ClientConfig>,
}

impl TlsProvider {
    pub fn new(verify: bool) -> Self {
        let mut config = if verify {
            let mut root_store = RootCertStore::empty();
            root_store.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
                OwnedTrustAnchor::from_subject_spki_name_constraints(
                    ta.subject,
                    ta.spki,
                    ta.name_constraints,
                )
            }));
            ClientConfig::builder()
                .with_safe_defaults()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        } else {
            ClientConfig::builder()
                .with_safe_defaults()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
                .with_no_client_auth()
        };
        config.alpn_protocols = vec![ALPN_H2.to_vec()];

        Self {
            config: Arc::new(config),
        }
    }

    pub async fn handshake(&self, server_name: &str, stream: TcpStream) -> Result<Connection> {
        let connector = TlsConnector::from(self.config.clone());
        let domain = ServerName::try_from(server_name)
            .with_context(|| format!("invalid TLS server name '{}'", server_name))?;

        let tls_stream = connector
            .connect(domain, stream)
            .await
            .context("TLS handshake failed")?;

        let alpn = tls_stream.get_ref().1.alpn_protocol().map(|p| p.to_vec());
        Ok(Connection::new(Box::new(tls_stream), alpn))
    }
}

struct AcceptAnyCert;

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }
}
