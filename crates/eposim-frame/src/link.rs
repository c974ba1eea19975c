use std::io::{Read, Write};
use std::time::Duration;

use bytes::BytesMut;
use eposim_transport::SerialStream;
use tracing::debug;

use crate::codec::{encode_frame, frame_from_wire, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::receiver::Receiver;
use crate::transmitter::Transmitter;

const INITIAL_TX_CAPACITY: usize = 64;

/// Exchanges complete frames over any duplex byte channel.
///
/// Owns the channel plus a receive and a transmit buffer, so callers deal in
/// [`Frame`] values and never see acks or checksums.
pub struct FrameLink<T> {
    inner: T,
    rx_buf: BytesMut,
    tx_buf: BytesMut,
    config: FrameConfig,
    idle: Option<IdleTimeout>,
}

/// Swaps a serial channel between its idle and in-frame read timeouts.
///
/// Holds a clone of the channel; socket options and termios settings are
/// shared by every descriptor of the same channel.
struct IdleTimeout {
    handle: SerialStream,
    idle: Duration,
    in_frame: Option<Duration>,
}

impl IdleTimeout {
    fn apply(&self, timeout: Option<Duration>) -> Result<()> {
        self.handle
            .set_read_timeout(timeout)
            .map_err(transport_to_frame_error)
    }
}

impl<T: Read + Write> FrameLink<T> {
    /// Create a new link with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new link with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            rx_buf: BytesMut::zeroed(config.max_frame_size),
            tx_buf: BytesMut::with_capacity(INITIAL_TX_CAPACITY),
            config,
            idle: None,
        }
    }

    /// Receive the next frame (blocking), acking it to the peer.
    pub fn receive(&mut self) -> Result<Frame> {
        let len = self.receive_raw()?.len();
        Ok(frame_from_wire(&self.rx_buf[..len]))
    }

    /// Receive the next frame and return its raw wire bytes.
    ///
    /// With an idle timeout configured, only the wait for the opcode is
    /// bounded by it; the rest of the frame uses the regular read timeout.
    pub fn receive_raw(&mut self) -> Result<&[u8]> {
        if let Some(idle) = &self.idle {
            idle.apply(Some(idle.idle))?;
        }
        let mut receiver = Receiver::new(&mut self.inner, &mut self.rx_buf[..]);
        let opcode = receiver.step();
        let restored = match &self.idle {
            Some(idle) => idle.apply(idle.in_frame),
            None => Ok(()),
        };
        opcode?;
        restored?;
        let len = receiver.run()?;
        debug!(opcode = self.rx_buf[0], len, "received frame");
        Ok(&self.rx_buf[..len])
    }

    /// Transmit a frame (blocking), waiting for both peer acks.
    pub fn transmit(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.opcode, frame.payload.as_ref())
    }

    /// Encode and transmit a payload under `opcode`.
    pub fn send(&mut self, opcode: u8, payload: &[u8]) -> Result<()> {
        self.tx_buf.clear();
        encode_frame(opcode, payload, &mut self.tx_buf)?;
        Transmitter::new(&mut self.inner, &mut self.tx_buf[..])?.run()?;
        debug!(opcode, len = self.tx_buf.len(), "transmitted frame");
        Ok(())
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the link and return the inner channel.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Resize the receive buffer for subsequent frames.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
        self.rx_buf = BytesMut::zeroed(max_frame_size);
    }

    /// Current link configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameLink<SerialStream> {
    /// Create a link over a `SerialStream` and apply timeouts from config.
    pub fn with_config_serial(inner: SerialStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        let idle = match config.idle_timeout {
            Some(idle) => Some(IdleTimeout {
                handle: inner.try_clone().map_err(transport_to_frame_error)?,
                idle,
                in_frame: config.read_timeout,
            }),
            None => None,
        };
        let mut link = Self::with_config(inner, config);
        link.idle = idle;
        Ok(link)
    }
}

fn transport_to_frame_error(err: eposim_transport::TransportError) -> FrameError {
    match err {
        eposim_transport::TransportError::Io(io) => FrameError::Io(io),
        eposim_transport::TransportError::Configure { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
