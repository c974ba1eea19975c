//! Byte-channel endpoints for the EPOS link simulator.
//!
//! The protocol layers above only need a blocking duplex stream. This crate
//! provides one over:
//! - serial devices and pseudo-terminals (switched to raw 8N1 mode)
//! - Unix domain sockets (Linux/macOS)
//!
//! Everything else builds on the [`SerialStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod device;
#[cfg(unix)]
pub mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use stream::SerialStream;

#[cfg(unix)]
pub use device::{open_device, DEFAULT_BAUD_RATE};
#[cfg(unix)]
pub use uds::UnixDomainSocket;
