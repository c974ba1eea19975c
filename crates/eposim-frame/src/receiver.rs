use std::fmt;
use std::io::{Error, ErrorKind, Read, Write};

use tracing::{debug, trace, warn};

use crate::codec::{stored_checksum, wire_size_for, ACK, HEADER_SIZE, NACK};
use crate::crc::frame_crc;
use crate::error::{FrameError, Result};
use crate::wire::{read_byte, write_byte};

/// Position of the receive side of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    AwaitOpcode,
    AckOpcode,
    AwaitLength,
    AwaitPayload,
    VerifyChecksum,
    AckOrNack,
    Done,
}

impl fmt::Display for ReceiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReceiveState::AwaitOpcode => "awaiting opcode",
            ReceiveState::AckOpcode => "acking opcode",
            ReceiveState::AwaitLength => "awaiting length",
            ReceiveState::AwaitPayload => "awaiting payload",
            ReceiveState::VerifyChecksum => "verifying checksum",
            ReceiveState::AckOrNack => "answering frame",
            ReceiveState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Receive side of the per-byte ack handshake.
///
/// ```text
/// peer ──opcode──▶        ◀──'O'──
/// peer ──length, payload, checksum──▶
///                          ◀──'O' (checksum ok) / 'F' (mismatch)──
/// ```
///
/// Each [`step`](Receiver::step) performs one blocking transition, so a
/// caller can interleave its own bookkeeping between transitions.
///
/// A failed step never advances: the state stays at the step that failed,
/// and a [`FrameError::Receive`] carries that same state. In particular a
/// failure reported at [`ReceiveState::AwaitOpcode`] means no byte of a
/// frame was consumed.
pub struct Receiver<'a, T> {
    io: &'a mut T,
    buf: &'a mut [u8],
    state: ReceiveState,
    frame_len: usize,
    expected: u16,
    received: u16,
}

impl<'a, T: Read + Write> Receiver<'a, T> {
    /// Prepare to receive one frame from `io` into `buf`.
    pub fn new(io: &'a mut T, buf: &'a mut [u8]) -> Self {
        Self {
            io,
            buf,
            state: ReceiveState::AwaitOpcode,
            frame_len: 0,
            expected: 0,
            received: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ReceiveState {
        self.state
    }

    /// Perform one transition and return the new state.
    ///
    /// Errors leave the receiver in the state that failed.
    pub fn step(&mut self) -> Result<ReceiveState> {
        let next = match self.state {
            ReceiveState::AwaitOpcode => {
                if self.buf.len() < HEADER_SIZE {
                    return Err(self.fail(Error::new(
                        ErrorKind::InvalidInput,
                        "receive buffer cannot hold a frame header",
                    )));
                }
                let opcode = read_byte(&mut *self.io).map_err(|e| self.fail(e))?;
                self.buf[0] = opcode;
                ReceiveState::AckOpcode
            }
            ReceiveState::AckOpcode => {
                write_byte(&mut *self.io, ACK).map_err(|e| self.fail(e))?;
                ReceiveState::AwaitLength
            }
            ReceiveState::AwaitLength => {
                let length = read_byte(&mut *self.io).map_err(|e| self.fail(e))?;
                self.buf[1] = length;
                let total = wire_size_for(length);
                if total > self.buf.len() {
                    return Err(self.fail(Error::new(
                        ErrorKind::InvalidData,
                        format!(
                            "frame of {total} bytes exceeds buffer of {} bytes",
                            self.buf.len()
                        ),
                    )));
                }
                self.frame_len = total;
                ReceiveState::AwaitPayload
            }
            ReceiveState::AwaitPayload => {
                let end = self.frame_len;
                if let Err(e) = self.io.read_exact(&mut self.buf[HEADER_SIZE..end]) {
                    return Err(self.fail(e));
                }
                ReceiveState::VerifyChecksum
            }
            ReceiveState::VerifyChecksum => {
                let frame = &self.buf[..self.frame_len];
                self.expected = frame_crc(frame);
                self.received = stored_checksum(frame);
                ReceiveState::AckOrNack
            }
            ReceiveState::AckOrNack => {
                if self.expected != self.received {
                    // The checksum mismatch is the reported cause even if
                    // the nack cannot be delivered.
                    if let Err(err) = write_byte(&mut *self.io, NACK) {
                        debug!(error = %err, "failed to send nack");
                    }
                    warn!(
                        opcode = self.buf[0],
                        expected = self.expected,
                        received = self.received,
                        "bad frame checksum, sent nack"
                    );
                    return Err(FrameError::BadChecksum {
                        expected: self.expected,
                        received: self.received,
                    });
                }
                write_byte(&mut *self.io, ACK).map_err(|e| self.fail(e))?;
                ReceiveState::Done
            }
            ReceiveState::Done => ReceiveState::Done,
        };

        trace!(from = %self.state, to = %next, "receive transition");
        self.state = next;
        Ok(next)
    }

    /// Drive the handshake to completion and return the frame length.
    pub fn run(mut self) -> Result<usize> {
        while self.step()? != ReceiveState::Done {}
        Ok(self.frame_len)
    }

    fn fail(&self, source: std::io::Error) -> FrameError {
        FrameError::Receive {
            state: self.state,
            source,
        }
    }
}

/// Receive one frame from `io` into `buf` and return its length.
///
/// The frame occupies `buf[..len]` and its checksum has been verified.
pub fn receive_frame<T: Read + Write>(io: &mut T, buf: &mut [u8]) -> Result<usize> {
    Receiver::new(io, buf).run()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{decode_frame, DEFAULT_MAX_FRAME};

    const READ_SERIAL: [u8; 8] = [0x10, 0x01, 0x18, 0x10, 0x04, 0x01, 0x05, 0x32];

    /// Duplex double: reads come from a script, writes are recorded.
    struct ScriptedPort {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
        fail_writes_after: Option<usize>,
    }

    impl ScriptedPort {
        fn new(input: &[u8]) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                output: Vec::new(),
                fail_writes_after: None,
            }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(limit) = self.fail_writes_after {
                if self.output.len() >= limit {
                    return Err(Error::from(ErrorKind::BrokenPipe));
                }
            }
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn receives_valid_frame_and_acks_twice() {
        let mut port = ScriptedPort::new(&READ_SERIAL);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];

        let len = receive_frame(&mut port, &mut buf).unwrap();

        assert_eq!(len, READ_SERIAL.len());
        assert_eq!(&buf[..len], &READ_SERIAL);
        assert_eq!(port.output, b"OO");
    }

    #[test]
    fn walks_every_state_in_order() {
        let mut port = ScriptedPort::new(&READ_SERIAL);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];
        let mut rx = Receiver::new(&mut port, &mut buf);

        let mut seen = vec![rx.state()];
        while rx.state() != ReceiveState::Done {
            seen.push(rx.step().unwrap());
        }

        assert_eq!(
            seen,
            vec![
                ReceiveState::AwaitOpcode,
                ReceiveState::AckOpcode,
                ReceiveState::AwaitLength,
                ReceiveState::AwaitPayload,
                ReceiveState::VerifyChecksum,
                ReceiveState::AckOrNack,
                ReceiveState::Done,
            ]
        );
    }

    #[test]
    fn opcode_is_acked_before_length_arrives() {
        let mut port = ScriptedPort::new(&[0x10]);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];

        let err = receive_frame(&mut port, &mut buf).unwrap_err();

        assert_eq!(port.output, b"O");
        assert!(matches!(
            err,
            FrameError::Receive {
                state: ReceiveState::AwaitLength,
                ..
            }
        ));
    }

    #[test]
    fn failed_step_keeps_its_state() {
        let mut port = ScriptedPort::new(&[0x10]);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];
        let mut rx = Receiver::new(&mut port, &mut buf);

        rx.step().unwrap();
        rx.step().unwrap();
        let err = rx.step().unwrap_err();

        assert_eq!(rx.state(), ReceiveState::AwaitLength);
        assert!(matches!(
            err,
            FrameError::Receive {
                state: ReceiveState::AwaitLength,
                ..
            }
        ));

        let mut port = ScriptedPort::new(&[]);
        let mut rx = Receiver::new(&mut port, &mut buf);
        assert!(rx.step().is_err());
        assert_eq!(rx.state(), ReceiveState::AwaitOpcode);
    }

    #[test]
    fn closed_channel_before_opcode() {
        let mut port = ScriptedPort::new(&[]);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];

        let err = receive_frame(&mut port, &mut buf).unwrap_err();

        assert!(port.output.is_empty());
        assert!(matches!(
            err,
            FrameError::Receive {
                state: ReceiveState::AwaitOpcode,
                ref source,
            } if source.kind() == ErrorKind::UnexpectedEof
        ));
    }

    #[test]
    fn truncated_payload_is_a_receive_error() {
        let mut port = ScriptedPort::new(&READ_SERIAL[..5]);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];

        let err = receive_frame(&mut port, &mut buf).unwrap_err();

        assert!(matches!(
            err,
            FrameError::Receive {
                state: ReceiveState::AwaitPayload,
                ..
            }
        ));
    }

    #[test]
    fn frame_larger_than_buffer_rejected() {
        // Length 3 announces a 12-byte frame.
        let mut port = ScriptedPort::new(&[0x00, 0x03]);
        let mut buf = [0u8; 8];

        let err = receive_frame(&mut port, &mut buf).unwrap_err();

        assert!(matches!(
            err,
            FrameError::Receive {
                state: ReceiveState::AwaitLength,
                ref source,
            } if source.kind() == ErrorKind::InvalidData
        ));
    }

    #[test]
    fn bad_checksum_sends_nack() {
        let mut corrupted = READ_SERIAL;
        corrupted[7] ^= 0x01;
        let mut port = ScriptedPort::new(&corrupted);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];

        let err = receive_frame(&mut port, &mut buf).unwrap_err();

        assert_eq!(port.output, b"OF");
        assert!(matches!(
            err,
            FrameError::BadChecksum {
                expected: 0x3205,
                received: 0x3305
            }
        ));
    }

    #[test]
    fn failed_nack_still_reports_bad_checksum() {
        let mut corrupted = READ_SERIAL;
        corrupted[6] = 0;
        let mut port = ScriptedPort::new(&corrupted);
        port.fail_writes_after = Some(1);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];

        let err = receive_frame(&mut port, &mut buf).unwrap_err();

        assert_eq!(port.output, b"O");
        assert!(matches!(err, FrameError::BadChecksum { .. }));
    }

    #[test]
    fn failed_final_ack_is_a_receive_error() {
        let mut port = ScriptedPort::new(&READ_SERIAL);
        port.fail_writes_after = Some(1);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];

        let err = receive_frame(&mut port, &mut buf).unwrap_err();

        assert!(matches!(
            err,
            FrameError::Receive {
                state: ReceiveState::AckOrNack,
                ..
            }
        ));
    }

    #[test]
    fn failed_opcode_ack_is_a_receive_error() {
        let mut port = ScriptedPort::new(&READ_SERIAL);
        port.fail_writes_after = Some(0);
        let mut buf = [0u8; DEFAULT_MAX_FRAME];

        let err = receive_frame(&mut port, &mut buf).unwrap_err();

        assert!(matches!(
            err,
            FrameError::Receive {
                state: ReceiveState::AckOpcode,
                ..
            }
        ));
    }

    #[test]
    fn checksum_read_from_frame_end_not_buffer_end() {
        // Both checksum bytes must come from the received frame itself, not
        // from stale bytes further along the caller's buffer.
        let mut port = ScriptedPort::new(&READ_SERIAL);
        let mut buf = [0xEEu8; DEFAULT_MAX_FRAME];

        let len = receive_frame(&mut port, &mut buf).unwrap();

        assert_eq!(len, 8);
        assert_eq!(&buf[6..8], &[0x05, 0x32]);
        assert_eq!(buf[8], 0xEE);
        assert_eq!(port.output, b"OO");
    }

    #[test]
    fn byte_at_a_time_channel() {
        let mut port = ByteByBytePort {
            bytes: READ_SERIAL.to_vec(),
            pos: 0,
            output: Vec::new(),
        };
        let mut buf = [0u8; DEFAULT_MAX_FRAME];

        let len = receive_frame(&mut port, &mut buf).unwrap();

        let frame = decode_frame(&buf[..len]).unwrap();
        assert_eq!(frame.opcode, 0x10);
        assert_eq!(port.output, b"OO");
    }

    struct ByteByBytePort {
        bytes: Vec<u8>,
        pos: usize,
        output: Vec<u8>,
    }

    impl Read for ByteByBytePort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    impl Write for ByteByBytePort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
