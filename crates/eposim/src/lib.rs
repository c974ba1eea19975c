//! Maxon EPOS RS232 link simulator.
//!
//! Emulates one or more EPOS positioning controllers on a serial line, so
//! controller software can be exercised without hardware, and provides the
//! matching controller-side client.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte channels (serial devices, pseudo-terminals, Unix sockets)
//! - [`frame`]: CRC-CCITT framing and the per-byte ack handshake
//! - [`device`]: Read/Write Object requests and virtual controller registers
//! - [`node`]: the simulator loop and the master client (behind `node` feature)

/// Re-export transport types.
pub mod transport {
    pub use eposim_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use eposim_frame::*;
}

/// Re-export device types.
pub mod device {
    pub use eposim_device::*;
}

/// Re-export simulator and master types (requires `node` feature).
#[cfg(feature = "node")]
pub mod node {
    pub use eposim_node::*;
}
