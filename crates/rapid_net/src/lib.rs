pub mod codec;
pub mod hpack;
pub mod tls;
pub mod transport;

use anyhow::Result;
use rapid_traits::{Scheme, Target};
use tls::TlsProvider;
use transport::{Connection, TransportBuilder};

pub use codec::{FramedRead, FramedWrite};
pub use hpack::HpackEncoder;

/// Dials the target and negotiates the application protocol.
///
/// `https` targets go through TLS with ALPN `h2`; `http` targets get a raw
/// TCP stream and speak HTTP/2 with prior knowledge.
pub async fn dial(target: &Target, verify_tls: bool) -> Result<Connection> {
    let tcp = TransportBuilder::connect(target).await?;

    let conn = match target.scheme {
        Scheme::Https => TlsProvider::new(verify_tls).handshake(&target.host, tcp).await?,
        Scheme::Http => Connection::plain(tcp),
    };

    match conn.alpn_protocol() {
        Some(proto) if proto.as_bytes() == tls::ALPN_H2 => {
            tracing::debug!("Negotiated application protocol: {}", proto)
        }
        Some(proto) => tracing::warn!("Server negotiated '{}' instead of h2", proto),
        None if target.scheme == Scheme::Https => {
            tracing::warn!("Server did not negotiate an application protocol")
        }
        None => {}
    }

    Ok(conn)
}
