//! EPOS RS232 framing with a per-byte acknowledgment handshake.
//!
//! Every message on the wire is:
//! - a 1-byte opcode
//! - a 1-byte length (payload words minus one)
//! - the payload, a whole number of 16-bit words
//! - a 2-byte little-endian CRC-CCITT checksum
//!
//! The opcode and the rest of the frame are acked separately, so a framing
//! error surfaces on the exchange that caused it.

pub mod codec;
pub mod crc;
pub mod error;
pub mod link;
pub mod receiver;
pub mod transmitter;
mod wire;

pub use codec::{
    decode_frame, embed_checksum, encode_frame, stored_checksum, wire_size_for, Frame,
    FrameConfig, ACK, CHECKSUM_SIZE, DEFAULT_MAX_FRAME, HEADER_SIZE, MAX_PAYLOAD,
    MIN_FRAME_SIZE, NACK,
};
pub use crc::{crc_step, frame_crc, MALFORMED_CRC};
pub use error::{FrameError, Result};
pub use link::FrameLink;
pub use receiver::{receive_frame, ReceiveState, Receiver};
pub use transmitter::{transmit_frame, TransmitState, Transmitter};
