//! The compression transport: inner message frames carried inside outer
//! `COMPRESSION` envelopes.
//!
//! `DEFLATE_STREAM` keeps one zlib stream per direction for the lifetime
//! of the connection (each envelope is SYNC-flushed so the dictionary
//! carries over); `LZ4_MESSAGE` is a self-contained LZ4 frame per
//! envelope.

use std::io::{Read, Write};

use flate2::{Compress, Decompress, FlushCompress, FlushDecompress, Status};

use crate::constant::ClientMessageId;
use crate::error::{Error, Result, code};
use crate::protocol::frame::WireMessage;

const ER_TEXT_COMPRESSION_NOT_CONFIGURED: &str =
    "Compression is disabled or required compression style was not selected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionAlgorithm {
    #[default]
    None,
    DeflateStream,
    Lz4Message,
}

impl CompressionAlgorithm {
    /// The identifier used on the capability wire.
    pub fn mysql_name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::DeflateStream => "DEFLATE_STREAM",
            Self::Lz4Message => "LZ4_MESSAGE",
        }
    }

    /// Accepts both the wire identifier and the short alias.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "DEFLATE_STREAM" | "DEFLATE" => Some(Self::DeflateStream),
            "LZ4_MESSAGE" | "LZ4" => Some(Self::Lz4Message),
            _ => None,
        }
    }
}

/// Per-connection compression state for both directions.
pub struct Compression {
    algorithm: CompressionAlgorithm,
    level: Option<u32>,
    deflate_up: Option<Compress>,
    deflate_down: Option<Decompress>,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            algorithm: CompressionAlgorithm::None,
            level: None,
            deflate_up: None,
            deflate_down: None,
        }
    }
}

impl Compression {
    /// Arm the transport with the negotiated algorithm. Until this is
    /// called every compressed operation fails.
    pub fn reinitialize(&mut self, algorithm: CompressionAlgorithm, level: Option<i64>) {
        self.algorithm = algorithm;
        self.level = level.and_then(|l| u32::try_from(l).ok());
        self.deflate_up = None;
        self.deflate_down = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.algorithm != CompressionAlgorithm::None
    }

    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    /// Compress one envelope worth of inner frames.
    pub fn uplink(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        match self.algorithm {
            CompressionAlgorithm::None => Err(Error::new(
                code::COMPRESSION_NOT_CONFIGURED,
                ER_TEXT_COMPRESSION_NOT_CONFIGURED,
            )),
            CompressionAlgorithm::DeflateStream => {
                let level = flate2::Compression::new(self.level.unwrap_or(6).min(9));
                let stream = self
                    .deflate_up
                    .get_or_insert_with(|| Compress::new(level, true));
                deflate_sync(stream, input)
            }
            CompressionAlgorithm::Lz4Message => {
                let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
                encoder
                    .write_all(input)
                    .and_then(|()| encoder.finish().map_err(std::io::Error::other))
                    .map_err(|e| Error::fatal(code::UNKNOWN_ERROR, e.to_string()))
            }
        }
    }

    /// Decompress the payload of one received envelope.
    pub fn downlink(&mut self, input: &[u8], uncompressed_hint: Option<u64>) -> Result<Vec<u8>> {
        match self.algorithm {
            CompressionAlgorithm::None => Err(Error::new(
                code::COMPRESSION_NOT_CONFIGURED,
                ER_TEXT_COMPRESSION_NOT_CONFIGURED,
            )),
            CompressionAlgorithm::DeflateStream => {
                let stream = self.deflate_down.get_or_insert_with(|| Decompress::new(true));
                inflate_sync(stream, input, uncompressed_hint)
            }
            CompressionAlgorithm::Lz4Message => {
                let mut out =
                    Vec::with_capacity(uncompressed_hint.unwrap_or(0).min(1 << 24) as usize);
                lz4_flex::frame::FrameDecoder::new(input)
                    .read_to_end(&mut out)
                    .map_err(|e| Error::fatal(code::MALFORMED_PACKET, e.to_string()))?;
                Ok(out)
            }
        }
    }
}

fn deflate_sync(stream: &mut Compress, mut input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() / 2 + 64);
    loop {
        let before = stream.total_in();
        let status = stream
            .compress_vec(input, &mut out, FlushCompress::Sync)
            .map_err(|e| Error::fatal(code::UNKNOWN_ERROR, e.to_string()))?;
        let consumed = (stream.total_in() - before) as usize;
        input = &input[consumed..];

        if input.is_empty() && out.len() < out.capacity() {
            return Ok(out);
        }
        if status == Status::StreamEnd {
            return Ok(out);
        }
        out.reserve((input.len() / 2).max(128));
    }
}

fn inflate_sync(
    stream: &mut Decompress,
    mut input: &[u8],
    uncompressed_hint: Option<u64>,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(uncompressed_hint.unwrap_or(256).min(1 << 24) as usize + 16);
    loop {
        let before = stream.total_in();
        let status = stream
            .decompress_vec(input, &mut out, FlushDecompress::Sync)
            .map_err(|e| Error::fatal(code::MALFORMED_PACKET, e.to_string()))?;
        let consumed = (stream.total_in() - before) as usize;
        input = &input[consumed..];

        if input.is_empty() && out.len() < out.capacity() {
            return Ok(out);
        }
        if status == Status::StreamEnd {
            return Ok(out);
        }
        out.reserve(256.max(out.len() / 2));
    }
}

/// Append one inner frame `(len, type, payload)` to an envelope buffer.
pub(crate) fn write_inner_frame(
    out: &mut Vec<u8>,
    mid: ClientMessageId,
    msg: &dyn WireMessage,
) -> Result<()> {
    let payload_len = msg.encoded_len();
    let frame_len = payload_len as u64 + 1;
    if frame_len > u64::from(u32::MAX) {
        return Err(Error::new(
            code::MALFORMED_PACKET,
            "Messages payload size exceeded the value that message header can hold",
        ));
    }
    out.extend_from_slice(&(frame_len as u32).to_le_bytes());
    out.push(mid as u8);
    msg.encode_raw_to(out);
    Ok(())
}

/// Reader over the decompressed payload of one envelope: a sequence of
/// inner frames, none of which may itself be a compression envelope.
pub(crate) struct InnerMessageStream {
    buffer: Vec<u8>,
    pos: usize,
}

impl InnerMessageStream {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self { buffer, pos: 0 }
    }

    pub fn has_data(&self) -> bool {
        self.pos < self.buffer.len()
    }

    /// The next inner frame as `(type, payload)`.
    pub fn next_frame(&mut self) -> Result<(u8, &[u8])> {
        let remaining = self.buffer.len() - self.pos;
        if remaining < 5 {
            return Err(malformed_inner());
        }
        let length = u32::from_le_bytes([
            self.buffer[self.pos],
            self.buffer[self.pos + 1],
            self.buffer[self.pos + 2],
            self.buffer[self.pos + 3],
        ]) as usize;
        let mid = self.buffer[self.pos + 4];
        if length == 0 || remaining < 4 + length {
            return Err(malformed_inner());
        }
        if mid == crate::constant::ServerMessageId::Compression as u8 {
            return Err(Error::new(
                code::MALFORMED_PACKET,
                "Compression frame nested inside a compression frame",
            ));
        }
        let payload = &self.buffer[self.pos + 5..self.pos + 4 + length];
        self.pos += 4 + length;
        Ok((mid, payload))
    }
}

fn malformed_inner() -> Error {
    Error::new(
        code::MALFORMED_PACKET,
        "Truncated frame inside a compression envelope",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto;

    #[test]
    fn algorithm_names() {
        assert_eq!(
            CompressionAlgorithm::from_name("deflate"),
            Some(CompressionAlgorithm::DeflateStream)
        );
        assert_eq!(
            CompressionAlgorithm::from_name("LZ4_MESSAGE"),
            Some(CompressionAlgorithm::Lz4Message)
        );
        assert_eq!(CompressionAlgorithm::from_name("zstd"), None);
    }

    #[test]
    fn deflate_round_trip_keeps_stream_state() {
        let mut up = Compression::default();
        up.reinitialize(CompressionAlgorithm::DeflateStream, None);
        let mut down = Compression::default();
        down.reinitialize(CompressionAlgorithm::DeflateStream, None);

        // Two envelopes through the same stream pair; the second depends
        // on the dictionary carried over from the first.
        for payload in [&b"hello world hello world"[..], &b"hello world again"[..]] {
            let compressed = up.uplink(payload).unwrap();
            let restored = down.downlink(&compressed, Some(payload.len() as u64)).unwrap();
            assert_eq!(restored, payload);
        }
    }

    #[test]
    fn lz4_round_trip() {
        let mut c = Compression::default();
        c.reinitialize(CompressionAlgorithm::Lz4Message, None);
        let payload = vec![7_u8; 4096];
        let compressed = c.uplink(&payload).unwrap();
        assert!(compressed.len() < payload.len());
        assert_eq!(c.downlink(&compressed, None).unwrap(), payload);
    }

    #[test]
    fn unconfigured_transport_refuses() {
        let mut c = Compression::default();
        let err = c.uplink(b"x").unwrap_err();
        assert_eq!(err.code, code::COMPRESSION_NOT_CONFIGURED);
    }

    #[test]
    fn inner_stream_walks_frames_and_rejects_nesting() {
        let mut buffer = Vec::new();
        write_inner_frame(
            &mut buffer,
            ClientMessageId::SqlStmtExecute,
            &proto::sql::StmtExecute::new("SELECT 1"),
        )
        .unwrap();
        write_inner_frame(&mut buffer, ClientMessageId::SessClose, &proto::session::Close {})
            .unwrap();

        let mut stream = InnerMessageStream::new(buffer);
        let (mid, _) = stream.next_frame().unwrap();
        assert_eq!(mid, ClientMessageId::SqlStmtExecute as u8);
        let (mid, payload) = stream.next_frame().unwrap();
        assert_eq!(mid, ClientMessageId::SessClose as u8);
        assert!(payload.is_empty());
        assert!(!stream.has_data());

        // An inner COMPRESSION frame is forbidden.
        let nested = vec![2, 0, 0, 0, 19, 0];
        let mut stream = InnerMessageStream::new(nested);
        let err = stream.next_frame().unwrap_err();
        assert_eq!(err.code, code::MALFORMED_PACKET);
    }
}
