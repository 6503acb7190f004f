use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use rapid_traits::{
    Flags, Frame, FrameKind, FrameSink, FrameSource, ReadError, StreamId, CONNECTION_PREFACE,
    DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_LEN,
};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest length the 24-bit frame length field can express.
const MAX_ENCODABLE_PAYLOAD: usize = (1 << 24) - 1;

/// Appends the wire form of `frame` to `dst`.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) {
    let len = frame.payload().len();
    dst.reserve(FRAME_HEADER_LEN + len);
    dst.put_uint(len as u64, 3);
    dst.put_u8(frame.kind().as_u8());
    dst.put_u8(frame.flags().bits());
    dst.put_u32(frame.stream_id().get());
    dst.put_slice(frame.payload());
}

/// Writes whole frames to an async byte sink.
///
/// Each frame is encoded into one buffer and handed to the transport in a
/// single `write_all`, then flushed, so a frame never sits half-written
/// once the call returns.
pub struct FramedWrite<W> {
    inner: W,
    buf: BytesMut,
}

impl<W> FramedWrite<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(1024),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for FramedWrite<W> {
    async fn write_preface(&mut self) -> io::Result<()> {
        self.inner.write_all(CONNECTION_PREFACE).await?;
        self.inner.flush().await
    }

    async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        if frame.payload().len() > MAX_ENCODABLE_PAYLOAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{} payload of {} bytes cannot be framed",
                    frame.kind(),
                    frame.payload().len()
                ),
            ));
        }
        self.buf.clear();
        encode_frame(frame, &mut self.buf);
        self.inner.write_all(&self.buf).await?;
        self.inner.flush().await
    }
}

/// Reads whole frames from an async byte source.
pub struct FramedRead<R> {
    inner: R,
    max_frame_size: u32,
}

impl<R> FramedRead<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, max: u32) -> Self {
        self.max_frame_size = max;
        self
    }
}

impl<R: AsyncRead + Unpin> FramedRead<R> {
    /// Consumes and drops `len` payload bytes so the next read starts on a frame boundary.
    async fn discard(&mut self, len: u32) -> io::Result<()> {
        let mut payload = (&mut self.inner).take(u64::from(len));
        let copied = tokio::io::copy(&mut payload, &mut tokio::io::sink()).await?;
        if copied < u64::from(len) {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(())
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FrameSource for FramedRead<R> {
    async fn read_frame(&mut self) -> Result<Frame, ReadError> {
        let mut head = [0u8; FRAME_HEADER_LEN];

        // EOF on a frame boundary is a clean close, anywhere else it is truncation
        let n = self.inner.read(&mut head).await?;
        if n == 0 {
            return Err(ReadError::Closed);
        }
        if n < FRAME_HEADER_LEN {
            self.inner.read_exact(&mut head[n..]).await?;
        }

        let len = u32::from_be_bytes([0, head[0], head[1], head[2]]);
        let kind = FrameKind::from(head[3]);
        let flags = Flags::from_bits(head[4]);
        let stream_id = StreamId::new(u32::from_be_bytes([head[5], head[6], head[7], head[8]]));

        if len > self.max_frame_size {
            self.discard(len).await?;
            return Err(ReadError::FrameTooLarge {
                len,
                max: self.max_frame_size,
            });
        }

        let mut payload = vec![0u8; len as usize];
        self.inner.read_exact(&mut payload).await?;

        let frame = Frame::new(kind, flags, stream_id, Bytes::from(payload));
        frame.validate()?;
        Ok(frame)
    }
}
