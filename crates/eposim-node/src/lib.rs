//! Both ends of an EPOS link.
//!
//! - [`Simulator`]: the device side, answering requests from an
//!   [`eposim_device::ObjectStore`] with a configurable turnaround delay.
//! - [`Master`]: the controller side, issuing Read/Write Object requests
//!   and validating the replies.

pub mod error;
pub mod master;
pub mod simulator;

pub use error::{MasterError, Result, SimError};
pub use master::{Master, MasterConfig, DEFAULT_MASTER_TIMEOUT};
pub use simulator::{
    ChecksumPolicy, Exchange, SimStats, Simulator, SimulatorConfig, DEFAULT_RESPONSE_DELAY,
};
