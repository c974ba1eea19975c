use eposim_device::RequestError;
use eposim_frame::{FrameError, ReceiveState};
use eposim_transport::TransportError;

/// Errors that end a simulator link.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Handshake or framing error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The request could not be interpreted.
    #[error("request error: {0}")]
    Request(#[from] RequestError),
}

impl SimError {
    /// True when the peer closed the channel between frames.
    ///
    /// Relies on [`eposim_frame::Receiver`] reporting a failure at the step
    /// that failed, so `AwaitOpcode` means no frame byte was read.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            SimError::Frame(FrameError::Receive {
                state: ReceiveState::AwaitOpcode,
                source,
            }) if source.kind() == std::io::ErrorKind::UnexpectedEof
        )
    }

    /// True when a read timed out before any byte of a frame arrived.
    pub fn is_idle(&self) -> bool {
        match self {
            SimError::Frame(
                err @ FrameError::Receive {
                    state: ReceiveState::AwaitOpcode,
                    ..
                },
            ) => err.is_timeout(),
            _ => false,
        }
    }
}

/// Errors returned by a [`crate::Master`].
#[derive(Debug, thiserror::Error)]
pub enum MasterError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Handshake or framing error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The response did not match the request.
    #[error("request error: {0}")]
    Request(#[from] RequestError),

    /// The device answered with a non-zero error code.
    #[error("device error {code:#010x}: {}", eposim_device::describe(*code))]
    Device { code: u32 },
}

impl MasterError {
    /// The EPOS error code this failure corresponds to.
    ///
    /// Device errors carry their own code; link failures map onto the
    /// `0x081000xx` range.
    pub fn code(&self) -> u32 {
        match self {
            MasterError::Device { code } => *code,
            MasterError::Frame(err) => err.link_code(),
            MasterError::Request(_) => eposim_device::codes::LINK_BAD_RESPONSE,
            MasterError::Transport(_) => eposim_device::codes::LINK_XMIT,
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
