use std::fmt;
use std::io;

use eposim_device::{ConfigError, RequestError};
use eposim_frame::FrameError;
use eposim_node::{MasterError, SimError};
use eposim_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
/// The device answered with a non-zero error code.
pub const DEVICE_ERROR: i32 = 40;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotFound
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. }
        | TransportError::Bind { ref source, .. }
        | TransportError::Connect { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::Accept(source) | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidEndpoint(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    if err.is_timeout() {
        return CliError::new(TIMEOUT, format!("{context}: {err}"));
    }
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::BadChecksum { .. } | FrameError::Malformed { .. } | FrameError::TooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn request_error(context: &str, err: RequestError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn config_error(context: &str, err: ConfigError) -> CliError {
    match err {
        ConfigError::Io { source, path } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn sim_error(context: &str, err: SimError) -> CliError {
    match err {
        SimError::Transport(err) => transport_error(context, err),
        SimError::Frame(err) => frame_error(context, err),
        SimError::Request(err) => request_error(context, err),
    }
}

pub fn master_error(context: &str, err: MasterError) -> CliError {
    match err {
        MasterError::Transport(err) => transport_error(context, err),
        MasterError::Frame(err) => frame_error(context, err),
        MasterError::Request(err) => request_error(context, err),
        MasterError::Device { .. } => CliError::new(DEVICE_ERROR, format!("{context}: {err}")),
    }
}
