use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::frame_crc;
use crate::error::{FrameError, Result};

/// Opcode + length.
pub const HEADER_SIZE: usize = 2;

/// Trailing little-endian checksum.
pub const CHECKSUM_SIZE: usize = 2;

/// Shortest frame on the wire: header, one payload word, checksum.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + 2 + CHECKSUM_SIZE;

/// Largest payload the length byte can describe (256 words).
pub const MAX_PAYLOAD: usize = 2 * (u8::MAX as usize + 1);

/// Default receive buffer capacity, matching EPOS host libraries.
pub const DEFAULT_MAX_FRAME: usize = 256;

/// Handshake ack byte.
pub const ACK: u8 = b'O';

/// Handshake nack byte.
pub const NACK: u8 = b'F';

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Operation selector (`0x10` read, `0x11` write, `0x00` response).
    pub opcode: u8,
    /// Payload, always a whole number of 16-bit words.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(opcode: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Value of the on-wire length byte: payload words minus one.
    ///
    /// Meaningless for an empty payload, which [`encode_frame`] rejects.
    pub fn length_field(&self) -> u8 {
        (self.payload.len() / 2).saturating_sub(1) as u8
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE
    }
}

/// Wire size of a frame whose length byte is `length_field`.
pub fn wire_size_for(length_field: u8) -> usize {
    HEADER_SIZE + 2 * (usize::from(length_field) + 1) + CHECKSUM_SIZE
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬──────────────────────┬──────────────┐
/// │ Opcode   │ Length   │ Payload              │ Checksum     │
/// │ (1B)     │ (1B)     │ 2*(Length+1) bytes   │ (2B LE)      │
/// └──────────┴──────────┴──────────────────────┴──────────────┘
/// ```
pub fn encode_frame(opcode: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.is_empty() || payload.len() % 2 != 0 {
        return Err(FrameError::Malformed {
            len: HEADER_SIZE + payload.len() + CHECKSUM_SIZE,
        });
    }
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::TooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let start = dst.len();
    dst.reserve(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    dst.put_u8(opcode);
    dst.put_u8((payload.len() / 2 - 1) as u8);
    dst.put_slice(payload);
    dst.put_u16_le(0);
    embed_checksum(&mut dst[start..])?;
    Ok(())
}

/// Compute the checksum of `frame` and store it in its last two bytes.
pub fn embed_checksum(frame: &mut [u8]) -> Result<u16> {
    if frame.len() < MIN_FRAME_SIZE || frame.len() % 2 != 0 {
        return Err(FrameError::Malformed { len: frame.len() });
    }
    let crc = frame_crc(frame);
    let n = frame.len();
    frame[n - CHECKSUM_SIZE..].copy_from_slice(&crc.to_le_bytes());
    Ok(crc)
}

/// The checksum carried in the last two bytes of `frame`.
pub fn stored_checksum(frame: &[u8]) -> u16 {
    match frame {
        [.., lo, hi] => u16::from_le_bytes([*lo, *hi]),
        _ => 0,
    }
}

/// Decode one complete frame.
///
/// The length byte must agree with the buffer size and the checksum must
/// match. Payload semantics are left to the caller.
pub fn decode_frame(src: &[u8]) -> Result<Frame> {
    if src.len() < MIN_FRAME_SIZE {
        return Err(FrameError::Malformed { len: src.len() });
    }
    if wire_size_for(src[1]) != src.len() {
        return Err(FrameError::Malformed { len: src.len() });
    }

    let expected = frame_crc(src);
    let received = stored_checksum(src);
    if expected != received {
        return Err(FrameError::BadChecksum { expected, received });
    }

    Ok(frame_from_wire(src))
}

/// Split a verified wire buffer into opcode and payload.
pub(crate) fn frame_from_wire(src: &[u8]) -> Frame {
    Frame {
        opcode: src[0],
        payload: Bytes::copy_from_slice(&src[HEADER_SIZE..src.len() - CHECKSUM_SIZE]),
    }
}

/// Configuration for a framed link.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Receive buffer capacity in bytes. Default: 256.
    pub max_frame_size: usize,
    /// Read timeout for blocking operations. Default: none.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations. Default: none.
    pub write_timeout: Option<std::time::Duration>,
    /// Read timeout while waiting for the opcode of the next frame.
    /// Default: none.
    ///
    /// Once the opcode arrives the link falls back to `read_timeout` for the
    /// rest of the frame. Only applied to links built with
    /// `FrameLink::with_config_serial`.
    pub idle_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
            read_timeout: None,
            write_timeout: None,
            idle_timeout: None,
        }
    }
}
