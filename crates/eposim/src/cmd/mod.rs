use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use eposim_transport::Endpoint;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod explain;
pub mod probe;
pub mod read;
pub mod serve;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate EPOS controllers on a serial device or Unix socket.
    Serve(ServeArgs),
    /// Read one object from a controller.
    Read(ReadArgs),
    /// Write one object on a controller.
    Write(WriteArgs),
    /// Read the serial number of each node.
    Probe(ProbeArgs),
    /// Describe an EPOS error code.
    Explain(ExplainArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::Explain(args) => explain::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Device path, or unix:<path> to listen on a socket.
    pub endpoint: Endpoint,
    /// Delay between request and response (e.g. 50ms, 0).
    #[arg(long, default_value = "50ms")]
    pub delay: String,
    /// Simulate the right rudder controller (node 1).
    #[arg(long)]
    pub right: bool,
    /// Simulate the left rudder controller (node 3).
    #[arg(long)]
    pub left: bool,
    /// Simulate the sail controllers (nodes 2 and 8).
    #[arg(long)]
    pub sail: bool,
    /// JSON device configuration file.
    #[arg(long, value_name = "FILE")]
    pub devices: Option<PathBuf>,
    /// Keep serving after nacking a frame with a bad checksum.
    #[arg(long)]
    pub resume_on_bad_checksum: bool,
}

/// Object selection shared by read and write.
#[derive(Args, Debug)]
pub struct ObjectArgs {
    /// Controller endpoint: device path or unix:<path>.
    pub endpoint: Endpoint,
    /// Node identifier.
    #[arg(long, value_parser = parse_u8)]
    pub node: u8,
    /// Object index (decimal or 0x hex).
    #[arg(long, value_parser = parse_u16)]
    pub index: u16,
    /// Object subindex.
    #[arg(long, value_parser = parse_u8, default_value = "0")]
    pub subindex: u8,
    /// Time to wait for each reply byte (e.g. 500ms, 2s).
    #[arg(long, default_value = "500ms")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub object: ObjectArgs,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    #[command(flatten)]
    pub object: ObjectArgs,
    /// Value to write (decimal or 0x hex).
    #[arg(long, value_parser = parse_u32)]
    pub value: u32,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Controller endpoint: device path or unix:<path>.
    pub endpoint: Endpoint,
    /// Nodes to probe (comma-separated).
    #[arg(long, value_delimiter = ',', value_parser = parse_u8, default_value = "1,2,3,8")]
    pub nodes: Vec<u8>,
    /// Time to wait for each reply byte (e.g. 500ms, 2s).
    #[arg(long, default_value = "500ms")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Error code (decimal or 0x hex).
    #[arg(value_parser = parse_u32)]
    pub code: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_number(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid number: {input}"))
}

fn parse_bounded<T: TryFrom<u64>>(input: &str) -> Result<T, String> {
    let value = parse_number(input)?;
    T::try_from(value).map_err(|_| format!("{input} is out of range"))
}

pub fn parse_u8(input: &str) -> Result<u8, String> {
    parse_bounded(input)
}

pub fn parse_u16(input: &str) -> Result<u16, String> {
    parse_bounded(input)
}

pub fn parse_u32(input: &str) -> Result<u32, String> {
    parse_bounded(input)
}

/// Parse `150ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str, allow_zero: bool) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 && !allow_zero {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_hex_and_decimal() {
        assert_eq!(parse_u16("0x6041"), Ok(0x6041));
        assert_eq!(parse_u16("24641"), Ok(0x6041));
        assert_eq!(parse_u32("0X0F00FFB9"), Ok(0x0F00_FFB9));
    }

    #[test]
    fn numbers_reject_overflow_and_garbage() {
        assert!(parse_u8("0x100").is_err());
        assert!(parse_u16("65536").is_err());
        assert!(parse_u32("node").is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(
            parse_duration("150ms", false).unwrap(),
            Duration::from_millis(150)
        );
        assert_eq!(parse_duration("2", false).unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("0ms", true).unwrap(), Duration::ZERO);
        assert!(parse_duration("0s", false).is_err());
        assert!(parse_duration("soon", false).is_err());
    }
}
