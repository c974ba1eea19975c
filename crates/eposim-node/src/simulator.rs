use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eposim_device::{ObjectStore, Request, Response};
use eposim_frame::{FrameConfig, FrameError, FrameLink};
use eposim_transport::SerialStream;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;

/// Default turnaround between a request and its response.
pub const DEFAULT_RESPONSE_DELAY: Duration = Duration::from_millis(50);

/// What to do after nacking a frame with a bad checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumPolicy {
    /// End the link with [`FrameError::BadChecksum`].
    #[default]
    FailFast,
    /// Keep serving; the peer may retransmit.
    Resume,
}

/// Simulator behavior.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Sleep between handling a request and transmitting the response.
    pub response_delay: Duration,
    pub checksum_policy: ChecksumPolicy,
    pub frame: FrameConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            response_delay: DEFAULT_RESPONSE_DELAY,
            checksum_policy: ChecksumPolicy::default(),
            frame: FrameConfig::default(),
        }
    }
}

/// Counters for one simulator link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub reads: u64,
    pub writes: u64,
    pub nacks: u64,
}

impl SimStats {
    /// Requests answered.
    pub fn served(&self) -> u64 {
        self.reads + self.writes
    }

    pub fn merge(&mut self, other: &SimStats) {
        self.reads += other.reads;
        self.writes += other.writes;
        self.nacks += other.nacks;
    }
}

/// Result of one request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// A request was answered.
    Served { request: Request, response: Response },
    /// A frame failed its checksum and was nacked; nothing was answered.
    Nacked { expected: u16, received: u16 },
}

/// Device side of one link: receives requests, answers them from an
/// [`ObjectStore`], and sends the responses back.
///
/// Every cycle completes, delay included, before the next receive starts.
pub struct Simulator<T, S> {
    link: FrameLink<T>,
    store: S,
    config: SimulatorConfig,
    stats: SimStats,
}

impl<T: Read + Write, S: ObjectStore> Simulator<T, S> {
    /// Create a simulator with default configuration.
    pub fn new(io: T, store: S) -> Self {
        Self::with_config(io, store, SimulatorConfig::default())
    }

    pub fn with_config(io: T, store: S, config: SimulatorConfig) -> Self {
        Self {
            link: FrameLink::with_config(io, config.frame.clone()),
            store,
            config,
            stats: SimStats::default(),
        }
    }

    /// Serve exactly one request (blocking).
    ///
    /// A bad checksum is returned as an error under
    /// [`ChecksumPolicy::FailFast`] and as [`Exchange::Nacked`] under
    /// [`ChecksumPolicy::Resume`]. The store is never touched for a nacked
    /// frame.
    pub fn serve_one(&mut self) -> Result<Exchange> {
        let frame = match self.link.receive() {
            Ok(frame) => frame,
            Err(FrameError::BadChecksum { expected, received }) => {
                self.stats.nacks += 1;
                if self.config.checksum_policy == ChecksumPolicy::Resume {
                    return Ok(Exchange::Nacked { expected, received });
                }
                return Err(FrameError::BadChecksum { expected, received }.into());
            }
            Err(err) => return Err(err.into()),
        };

        let request = Request::parse(&frame)?;
        let response = self.store.handle(&request);
        let kind = match request {
            Request::ReadObject { .. } => {
                self.stats.reads += 1;
                "read"
            }
            Request::WriteObject { .. } => {
                self.stats.writes += 1;
                "write"
            }
        };
        let value = match request {
            Request::WriteObject { value, .. } => Some(value),
            Request::ReadObject { .. } => response.value(),
        };
        info!(
            node = request.node(),
            address = %request.address(),
            value = ?value,
            error = response.error(),
            "{kind} object"
        );

        if !self.config.response_delay.is_zero() {
            std::thread::sleep(self.config.response_delay);
        }
        self.link.transmit(&response.to_frame())?;

        Ok(Exchange::Served { request, response })
    }

    /// Serve requests until the link fails.
    ///
    /// Only returns on error.
    pub fn run(&mut self) -> Result<()> {
        self.run_until(&AtomicBool::new(false))
    }

    /// Serve requests until `stop` is set or the link fails.
    ///
    /// `stop` is checked between cycles. With an idle timeout configured
    /// (see [`FrameConfig::idle_timeout`]), a link waiting for the next
    /// opcode wakes up to check it. A frame that has started is read under
    /// the regular read timeout, so a slow peer is still served.
    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::SeqCst) {
            match self.serve_one() {
                Ok(_) => {}
                Err(err) if err.is_idle() => continue,
                Err(err) => {
                    debug!(error = %err, stats = ?self.stats, "simulator link ended");
                    return Err(err);
                }
            }
        }
        debug!(stats = ?self.stats, "simulator stopped");
        Ok(())
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        self.link.get_ref()
    }

    /// Consume the simulator, returning the channel and the store.
    pub fn into_parts(self) -> (T, S) {
        (self.link.into_inner(), self.store)
    }
}

impl<S: ObjectStore> Simulator<SerialStream, S> {
    /// Create a simulator over a `SerialStream` and apply timeouts from config.
    pub fn with_config_serial(
        stream: SerialStream,
        store: S,
        config: SimulatorConfig,
    ) -> Result<Self> {
        let link = FrameLink::with_config_serial(stream, config.frame.clone())?;
        debug!(kind = link.get_ref().kind(), "simulator link ready");
        Ok(Self {
            link,
            store,
            config,
            stats: SimStats::default(),
        })
    }
}
