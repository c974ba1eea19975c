use std::path::PathBuf;

/// Errors that can occur while interpreting request or response payloads.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The opcode is neither Read Object nor Write Object.
    #[error("opcode {0:#04x} not supported")]
    UnsupportedOpcode(u8),

    /// The payload is too short for the operation.
    #[error("opcode {opcode:#04x} payload too short ({len} bytes, need {min})")]
    ShortPayload { opcode: u8, len: usize, min: usize },

    /// A response frame does not have the expected shape.
    #[error("bad response frame: {0}")]
    BadResponse(String),
}

/// Errors that can occur while loading device configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file exceeds the size limit.
    #[error("configuration file {path} too large ({size} bytes, max {max})")]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    /// The configuration is not valid JSON for the expected layout.
    #[error("invalid device configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The node identifier does not fit the device table.
    #[error("node {node} out of range (max {max})")]
    NodeOutOfRange { node: u8, max: u8 },

    /// The same node identifier is configured twice.
    #[error("node {0} configured more than once")]
    DuplicateNode(u8),
}

pub type Result<T> = std::result::Result<T, RequestError>;
