use anyhow::{anyhow, Context, Result};
use rapid_traits::Target;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::{TcpSocket, TcpStream};

use crate::codec::{FramedRead, FramedWrite};

/// Byte stream the frame codec runs over: raw TCP or TLS.
pub type BoxedStream = Box<dyn RawStream>;

pub trait RawStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> RawStream for T {}

/// The one connection a run owns, plus what ALPN settled on.
pub struct Connection {
    pub stream: BoxedStream,
    pub alpn: Option<Vec<u8>>,
}

impl Connection {
    pub fn new(stream: BoxedStream, alpn: Option<Vec<u8>>) -> Self {
        Self { stream, alpn }
    }

    /// Wraps an already-established stream with no ALPN result, e.g. h2c or a test pipe.
    pub fn plain<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::new(Box::new(stream), None)
    }

    pub fn alpn_protocol(&self) -> Option<String> {
        self.alpn.as_ref().map(|p| String::from_utf8_lossy(p).into_owned())
    }

    /// Splits into an exclusively owned reader and a writer half.
    pub fn into_framed(
        self,
    ) -> (
        FramedRead<ReadHalf<BoxedStream>>,
        FramedWrite<WriteHalf<BoxedStream>>,
    ) {
        let (read, write) = tokio::io::split(self.stream);
        (FramedRead::new(read), FramedWrite::new(write))
    }
}

pub struct TransportBuilder;

impl TransportBuilder {
    /// Resolves the target and connects to the first address that accepts.
    pub async fn connect(target: &Target) -> Result<TcpStream> {
        let dial_addr = target.dial_addr();
        let addrs = tokio::net::lookup_host(&dial_addr)
            .await
            .with_context(|| format!("failed to resolve {}", dial_addr))?;

        let mut last_err = None;
        for addr in addrs {
            match Self::connect_addr(addr).await {
                Ok(stream) => {
                    tracing::debug!("TCP connected to {}", addr);
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("TCP connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("no addresses resolved for {}", dial_addr)))
    }

    /// Configures the socket before connecting so the first frame is not held back by Nagle.
    async fn connect_addr(addr: SocketAddr) -> Result<TcpStream> {
        let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

        socket.set_nodelay(true)?;
        socket.set_keepalive(true)?;
        socket.set_nonblocking(true)?;

        let std_stream: std::net::TcpStream = socket.into();
        let stream = TcpSocket::from_std_stream(std_stream).connect(addr).await?;
        Ok(stream)
    }
}
