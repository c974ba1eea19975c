use std::io::{Read, Write};
use std::time::Duration;

use eposim_device::registers::SERIAL_NUMBER;
use eposim_device::{ObjectAddress, Request, Response};
use eposim_frame::{FrameConfig, FrameLink};
use eposim_transport::{Endpoint, SerialStream};
use tracing::debug;

use crate::error::MasterError;

/// Default time to wait for each byte of a device reply.
pub const DEFAULT_MASTER_TIMEOUT: Duration = Duration::from_millis(500);

/// Master behavior.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub frame: FrameConfig,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig {
                read_timeout: Some(DEFAULT_MASTER_TIMEOUT),
                write_timeout: Some(DEFAULT_MASTER_TIMEOUT),
                ..FrameConfig::default()
            },
        }
    }
}

impl MasterConfig {
    /// Default configuration with a different reply timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let mut config = Self::default();
        config.frame.read_timeout = Some(timeout);
        config.frame.write_timeout = Some(timeout);
        config
    }
}

/// Controller side of a link: sends object requests and checks the replies.
pub struct Master<T> {
    link: FrameLink<T>,
}

impl<T: Read + Write> Master<T> {
    /// Create a master over an already configured channel.
    pub fn new(io: T) -> Self {
        Self::with_config(io, MasterConfig::default())
    }

    /// Create a master with explicit configuration.
    ///
    /// Timeouts in `config` are not applied to `io`; see
    /// [`Master::connect`] for channels that support them.
    pub fn with_config(io: T, config: MasterConfig) -> Self {
        Self {
            link: FrameLink::with_config(io, config.frame),
        }
    }

    /// Send `request` and return the validated response.
    ///
    /// A non-zero error code in the response is not an error here.
    pub fn request(&mut self, request: &Request) -> Result<Response, MasterError> {
        self.link.transmit(&request.to_frame())?;
        let frame = self.link.receive()?;
        let response = Response::parse_for(request, &frame)?;
        debug!(
            node = request.node(),
            address = %request.address(),
            error = response.error(),
            "object response"
        );
        Ok(response)
    }

    /// Read one object from `node`.
    pub fn read_object(&mut self, node: u8, address: ObjectAddress) -> Result<u32, MasterError> {
        let response = self.request(&Request::ReadObject { node, address })?;
        match response {
            Response::ReadObject { error: 0, value } => Ok(value),
            other => Err(MasterError::Device {
                code: other.error(),
            }),
        }
    }

    /// Write one object on `node`.
    pub fn write_object(
        &mut self,
        node: u8,
        address: ObjectAddress,
        value: u32,
    ) -> Result<(), MasterError> {
        let response = self.request(&Request::WriteObject {
            node,
            address,
            value,
        })?;
        match response.error() {
            0 => Ok(()),
            code => Err(MasterError::Device { code }),
        }
    }

    /// Read the serial number of `node`.
    pub fn probe(&mut self, node: u8) -> Result<u32, MasterError> {
        self.read_object(node, SERIAL_NUMBER)
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        self.link.get_ref()
    }

    /// Consume the master and return the inner channel.
    pub fn into_inner(self) -> T {
        self.link.into_inner()
    }
}

impl Master<SerialStream> {
    /// Open `endpoint` from the controller side and apply timeouts.
    #[cfg(unix)]
    pub fn connect(endpoint: &Endpoint, config: MasterConfig) -> Result<Self, MasterError> {
        let stream = endpoint.connect()?;
        debug!(%endpoint, kind = stream.kind(), "master connected");
        let link = FrameLink::with_config_serial(stream, config.frame)?;
        Ok(Self { link })
    }
}
