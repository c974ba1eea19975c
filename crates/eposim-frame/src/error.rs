use crate::receiver::ReceiveState;
use crate::transmitter::TransmitState;

/// Link-level failure codes reported by EPOS host libraries.
pub const LINK_BAD_RESPONSE: u32 = 0x0810_0010;
pub const LINK_NACK: u32 = 0x0810_0020;
pub const LINK_RECV: u32 = 0x0810_0030;
pub const LINK_XMIT: u32 = 0x0810_0040;
pub const LINK_BAD_CRC: u32 = 0x0810_0050;
pub const LINK_TIMEOUT: u32 = 0x0810_0060;

/// Errors that can occur while framing or exchanging frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Short read, closed channel, oversized frame or failed ack write while
    /// receiving.
    #[error("receive error while {state}: {source}")]
    Receive {
        state: ReceiveState,
        #[source]
        source: std::io::Error,
    },

    /// Failed or partial write, or failed ack read, while transmitting.
    #[error("transmit error while {state}: {source}")]
    Transmit {
        state: TransmitState,
        #[source]
        source: std::io::Error,
    },

    /// The peer answered a transmit step with something other than an ack.
    #[error("transmit error while {state}: peer replied {reply:#04x} instead of ack")]
    Nacked { state: TransmitState, reply: u8 },

    /// The received checksum does not match the frame contents.
    #[error("bad frame checksum (expected {expected:#06x}, received {received:#06x})")]
    BadChecksum { expected: u16, received: u16 },

    /// The bytes do not form a valid frame layout.
    #[error("malformed frame ({len} bytes)")]
    Malformed { len: usize },

    /// The frame does not fit the configured buffer.
    #[error("frame too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    /// An I/O error outside the handshake, e.g. while configuring a channel.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// True for every failure on the transmit side of the handshake.
    pub fn is_transmit_error(&self) -> bool {
        matches!(self, FrameError::Transmit { .. } | FrameError::Nacked { .. })
    }

    /// True when the underlying channel timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            FrameError::Receive { source, .. }
            | FrameError::Transmit { source, .. }
            | FrameError::Io(source) => matches!(
                source.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Map the failure onto the link-level code an EPOS host library reports.
    pub fn link_code(&self) -> u32 {
        if self.is_timeout() {
            return LINK_TIMEOUT;
        }
        match self {
            FrameError::Receive { .. } => LINK_RECV,
            FrameError::Transmit { .. } | FrameError::Io(_) => LINK_XMIT,
            FrameError::Nacked { .. } => LINK_NACK,
            FrameError::BadChecksum { .. } => LINK_BAD_CRC,
            FrameError::Malformed { .. } | FrameError::TooLarge { .. } => LINK_BAD_RESPONSE,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
