use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use std::fmt;
use std::ops::BitOr;
use thiserror::Error;

/// Stream identifier with the reserved high bit cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct StreamId(u32);

impl StreamId {
    /// Connection-level frames (SETTINGS, PING, GOAWAY) use stream 0.
    pub const ZERO: StreamId = StreamId(0);

    pub const MAX: u32 = (1 << 31) - 1;

    pub const fn new(id: u32) -> Self {
        StreamId(id & Self::MAX)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Client-initiated streams carry odd identifiers.
    pub const fn is_client_initiated(self) -> bool {
        self.0 % 2 == 1
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Data,
    Headers,
    Priority,
    RstStream,
    Settings,
    PushPromise,
    Ping,
    GoAway,
    WindowUpdate,
    Continuation,
    Unknown(u8),
}

impl FrameKind {
    pub fn as_u8(self) -> u8 {
        match self {
            FrameKind::Data => 0x0,
            FrameKind::Headers => 0x1,
            FrameKind::Priority => 0x2,
            FrameKind::RstStream => 0x3,
            FrameKind::Settings => 0x4,
            FrameKind::PushPromise => 0x5,
            FrameKind::Ping => 0x6,
            FrameKind::GoAway => 0x7,
            FrameKind::WindowUpdate => 0x8,
            FrameKind::Continuation => 0x9,
            FrameKind::Unknown(b) => b,
        }
    }
}

impl From<u8> for FrameKind {
    fn from(b: u8) -> Self {
        match b {
            0x0 => FrameKind::Data,
            0x1 => FrameKind::Headers,
            0x2 => FrameKind::Priority,
            0x3 => FrameKind::RstStream,
            0x4 => FrameKind::Settings,
            0x5 => FrameKind::PushPromise,
            0x6 => FrameKind::Ping,
            0x7 => FrameKind::GoAway,
            0x8 => FrameKind::WindowUpdate,
            0x9 => FrameKind::Continuation,
            other => FrameKind::Unknown(other),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::Data => "DATA",
            FrameKind::Headers => "HEADERS",
            FrameKind::Priority => "PRIORITY",
            FrameKind::RstStream => "RST_STREAM",
            FrameKind::Settings => "SETTINGS",
            FrameKind::PushPromise => "PUSH_PROMISE",
            FrameKind::Ping => "PING",
            FrameKind::GoAway => "GOAWAY",
            FrameKind::WindowUpdate => "WINDOW_UPDATE",
            FrameKind::Continuation => "CONTINUATION",
            FrameKind::Unknown(b) => return write!(f, "UNKNOWN_FRAME_TYPE_{}", b),
        };
        f.write_str(name)
    }
}

/// Frame flag bits. Meaning depends on the frame kind, so END_STREAM and ACK share a bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
    pub const NONE: Flags = Flags(0);
    pub const END_STREAM: Flags = Flags(0x1);
    pub const ACK: Flags = Flags(0x1);
    pub const END_HEADERS: Flags = Flags(0x4);
    pub const PADDED: Flags = Flags(0x8);
    pub const PRIORITY: Flags = Flags(0x20);

    pub const fn from_bits(bits: u8) -> Self {
        Flags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Error code carried by RST_STREAM and GOAWAY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Reason(u32);

impl Reason {
    pub const NO_ERROR: Reason = Reason(0x0);
    pub const PROTOCOL_ERROR: Reason = Reason(0x1);
    pub const INTERNAL_ERROR: Reason = Reason(0x2);
    pub const FLOW_CONTROL_ERROR: Reason = Reason(0x3);
    pub const SETTINGS_TIMEOUT: Reason = Reason(0x4);
    pub const STREAM_CLOSED: Reason = Reason(0x5);
    pub const FRAME_SIZE_ERROR: Reason = Reason(0x6);
    pub const REFUSED_STREAM: Reason = Reason(0x7);
    pub const CANCEL: Reason = Reason(0x8);
    pub const COMPRESSION_ERROR: Reason = Reason(0x9);
    pub const CONNECT_ERROR: Reason = Reason(0xa);
    pub const ENHANCE_YOUR_CALM: Reason = Reason(0xb);
    pub const INADEQUATE_SECURITY: Reason = Reason(0xc);
    pub const HTTP_1_1_REQUIRED: Reason = Reason(0xd);

    pub const fn new(code: u32) -> Self {
        Reason(code)
    }

    pub const fn code(self) -> u32 {
        self.0
    }

    fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0x0 => "NO_ERROR",
            0x1 => "PROTOCOL_ERROR",
            0x2 => "INTERNAL_ERROR",
            0x3 => "FLOW_CONTROL_ERROR",
            0x4 => "SETTINGS_TIMEOUT",
            0x5 => "STREAM_CLOSED",
            0x6 => "FRAME_SIZE_ERROR",
            0x7 => "REFUSED_STREAM",
            0x8 => "CANCEL",
            0x9 => "COMPRESSION_ERROR",
            0xa => "CONNECT_ERROR",
            0xb => "ENHANCE_YOUR_CALM",
            0xc => "INADEQUATE_SECURITY",
            0xd => "HTTP_1_1_REQUIRED",
            _ => return None,
        })
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "UNKNOWN_ERROR_{:#x}", self.0),
        }
    }
}

/// One SETTINGS parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub id: u16,
    pub value: u32,
}

impl Setting {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;

    pub const fn new(id: u16, value: u32) -> Self {
        Setting { id, value }
    }

    fn name(&self) -> Option<&'static str> {
        Some(match self.id {
            Self::HEADER_TABLE_SIZE => "HEADER_TABLE_SIZE",
            Self::ENABLE_PUSH => "ENABLE_PUSH",
            Self::MAX_CONCURRENT_STREAMS => "MAX_CONCURRENT_STREAMS",
            Self::INITIAL_WINDOW_SIZE => "INITIAL_WINDOW_SIZE",
            Self::MAX_FRAME_SIZE => "MAX_FRAME_SIZE",
            Self::MAX_HEADER_LIST_SIZE => "MAX_HEADER_LIST_SIZE",
            _ => return None,
        })
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}={}", name, self.value),
            None => write!(f, "UNKNOWN_SETTING_{}={}", self.id, self.value),
        }
    }
}

/// Decoded GOAWAY payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoAway {
    pub last_stream_id: StreamId,
    pub reason: Reason,
    pub debug_data: Bytes,
}

/// A payload whose length contradicts its frame kind.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{kind} frame with invalid payload length {len}")]
pub struct FrameError {
    pub kind: FrameKind,
    pub len: usize,
}

/// A single protocol frame, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    flags: Flags,
    stream_id: StreamId,
    payload: Bytes,
}

impl Frame {
    pub fn new(kind: FrameKind, flags: Flags, stream_id: StreamId, payload: Bytes) -> Self {
        Frame {
            kind,
            flags,
            stream_id,
            payload,
        }
    }

    pub fn settings(params: &[Setting]) -> Self {
        let mut buf = BytesMut::with_capacity(params.len() * 6);
        for setting in params {
            buf.put_u16(setting.id);
            buf.put_u32(setting.value);
        }
        Frame::new(FrameKind::Settings, Flags::NONE, StreamId::ZERO, buf.freeze())
    }

    pub fn settings_ack() -> Self {
        Frame::new(FrameKind::Settings, Flags::ACK, StreamId::ZERO, Bytes::new())
    }

    /// Opens a stream with a complete header block.
    pub fn headers(stream_id: StreamId, block: Bytes, end_stream: bool, end_headers: bool) -> Self {
        let mut flags = Flags::NONE;
        if end_stream {
            flags = flags | Flags::END_STREAM;
        }
        if end_headers {
            flags = flags | Flags::END_HEADERS;
        }
        Frame::new(FrameKind::Headers, flags, stream_id, block)
    }

    pub fn rst_stream(stream_id: StreamId, reason: Reason) -> Self {
        let payload = Bytes::copy_from_slice(&reason.code().to_be_bytes());
        Frame::new(FrameKind::RstStream, Flags::NONE, stream_id, payload)
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn is_ack(&self) -> bool {
        matches!(self.kind, FrameKind::Settings | FrameKind::Ping)
            && self.flags.contains(Flags::ACK)
    }

    /// Checks the fixed payload sizes RFC 9113 mandates per frame kind.
    pub fn validate(&self) -> Result<(), FrameError> {
        let len = self.payload.len();
        let ok = match self.kind {
            FrameKind::RstStream | FrameKind::WindowUpdate => len == 4,
            FrameKind::Priority => len == 5,
            FrameKind::Ping => len == 8,
            FrameKind::GoAway => len >= 8,
            FrameKind::Settings if self.is_ack() => len == 0,
            FrameKind::Settings => len % 6 == 0,
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(FrameError { kind: self.kind, len })
        }
    }

    /// Parameters of a SETTINGS frame; empty for any other kind.
    pub fn settings_params(&self) -> Vec<Setting> {
        if self.kind != FrameKind::Settings {
            return Vec::new();
        }
        self.payload
            .chunks_exact(6)
            .map(|mut chunk| Setting::new(chunk.get_u16(), chunk.get_u32()))
            .collect()
    }

    /// Error code of a RST_STREAM or GOAWAY frame.
    pub fn reason(&self) -> Option<Reason> {
        match self.kind {
            FrameKind::RstStream if self.payload.len() >= 4 => {
                Some(Reason::new((&self.payload[..4]).get_u32()))
            }
            FrameKind::GoAway => self.goaway().map(|g| g.reason),
            _ => None,
        }
    }

    pub fn goaway(&self) -> Option<GoAway> {
        if self.kind != FrameKind::GoAway || self.payload.len() < 8 {
            return None;
        }
        let mut head = &self.payload[..8];
        Some(GoAway {
            last_stream_id: StreamId::new(head.get_u32()),
            reason: Reason::new(head.get_u32()),
            debug_data: self.payload.slice(8..),
        })
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stream={} flags={:#x} len={}",
            self.kind,
            self.stream_id,
            self.flags.bits(),
            self.payload.len()
        )?;
        match self.kind {
            FrameKind::Settings if self.is_ack() => f.write_str(" ACK"),
            FrameKind::Settings => {
                let params: Vec<String> = self
                    .settings_params()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                write!(f, " [{}]", params.join(", "))
            }
            FrameKind::RstStream => match self.reason() {
                Some(reason) => write!(f, " reason={}", reason),
                None => Ok(()),
            },
            FrameKind::GoAway => match self.goaway() {
                Some(g) => write!(f, " last_stream={} reason={}", g.last_stream_id, g.reason),
                None => Ok(()),
            },
            FrameKind::Ping if self.is_ack() => f.write_str(" ACK"),
            _ => Ok(()),
        }
    }
}
