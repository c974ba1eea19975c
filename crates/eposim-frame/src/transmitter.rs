use std::fmt;
use std::io::{Read, Write};

use tracing::trace;

use crate::codec::{embed_checksum, ACK};
use crate::error::{FrameError, Result};
use crate::wire::{read_byte, write_once};

/// Position of the transmit side of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitState {
    SendOpcode,
    AwaitReadyAck,
    SendBody,
    AwaitDoneAck,
    Done,
}

impl fmt::Display for TransmitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransmitState::SendOpcode => "sending opcode",
            TransmitState::AwaitReadyAck => "awaiting ready ack",
            TransmitState::SendBody => "sending frame body",
            TransmitState::AwaitDoneAck => "awaiting frame ack",
            TransmitState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Transmit side of the per-byte ack handshake.
///
/// The opcode goes out alone and must be acked before the length, payload
/// and checksum follow in one write, which must be acked in turn.
pub struct Transmitter<'a, T> {
    io: &'a mut T,
    frame: &'a [u8],
    state: TransmitState,
}

impl<'a, T: Read + Write> Transmitter<'a, T> {
    /// Checksum `frame` in place and prepare to send it over `io`.
    ///
    /// The last two bytes of `frame` are overwritten with the checksum.
    pub fn new(io: &'a mut T, frame: &'a mut [u8]) -> Result<Self> {
        embed_checksum(frame)?;
        Ok(Self {
            io,
            frame,
            state: TransmitState::SendOpcode,
        })
    }

    /// Current state.
    pub fn state(&self) -> TransmitState {
        self.state
    }

    /// Perform one transition and return the new state.
    pub fn step(&mut self) -> Result<TransmitState> {
        let next = match self.state {
            TransmitState::SendOpcode => {
                write_once(&mut *self.io, &self.frame[..1]).map_err(|e| self.fail(e))?;
                TransmitState::AwaitReadyAck
            }
            TransmitState::AwaitReadyAck => {
                self.expect_ack()?;
                TransmitState::SendBody
            }
            TransmitState::SendBody => {
                write_once(&mut *self.io, &self.frame[1..]).map_err(|e| self.fail(e))?;
                TransmitState::AwaitDoneAck
            }
            TransmitState::AwaitDoneAck => {
                self.expect_ack()?;
                TransmitState::Done
            }
            TransmitState::Done => TransmitState::Done,
        };

        trace!(from = %self.state, to = %next, "transmit transition");
        self.state = next;
        Ok(next)
    }

    /// Drive the handshake to completion.
    pub fn run(mut self) -> Result<()> {
        while self.step()? != TransmitState::Done {}
        Ok(())
    }

    fn expect_ack(&mut self) -> Result<()> {
        let reply = read_byte(&mut *self.io).map_err(|e| self.fail(e))?;
        if reply != ACK {
            return Err(FrameError::Nacked {
                state: self.state,
                reply,
            });
        }
        Ok(())
    }

    fn fail(&self, source: std::io::Error) -> FrameError {
        FrameError::Transmit {
            state: self.state,
            source,
        }
    }
}

/// Checksum `frame` in place and send it over `io`.
pub fn transmit_frame<T: Read + Write>(io: &mut T, frame: &mut [u8]) -> Result<()> {
    Transmitter::new(io, frame)?.run()
}
