use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::SerialStream;

/// Line speed used by EPOS controllers on RS232.
pub const DEFAULT_BAUD_RATE: libc::speed_t = libc::B38400;

/// Open a serial device or pseudo-terminal for reading and writing.
///
/// Terminals are switched to raw 8N1 mode at [`DEFAULT_BAUD_RATE`] with
/// modem control lines ignored. Other files (FIFOs, plain files used in
/// tests) are opened as-is.
pub fn open_device(path: impl AsRef<Path>) -> Result<SerialStream> {
    let path = path.as_ref().to_path_buf();

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(&path)
        .map_err(|e| TransportError::Open {
            path: path.clone(),
            source: e,
        })?;

    let is_terminal = file.is_terminal();
    if is_terminal {
        configure_raw(&file, DEFAULT_BAUD_RATE).map_err(|e| TransportError::Configure {
            path: path.clone(),
            source: e,
        })?;
        info!(?path, "opened terminal device in raw mode");
    } else {
        debug!(?path, "opened non-terminal device");
    }

    Ok(SerialStream::from_device(file, path, is_terminal))
}

fn configure_raw(file: &File, baud: libc::speed_t) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: an all-zero termios is a valid starting point for cfmakeraw,
    // which overwrites every mode field it cares about.
    let mut t: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `t` is a valid, exclusively borrowed termios struct.
    unsafe { libc::cfmakeraw(&mut t) };
    t.c_cflag |= libc::CLOCAL | libc::CREAD;

    // SAFETY: `t` is a valid termios struct and `baud` is a libc speed constant.
    if unsafe { libc::cfsetspeed(&mut t, baud) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `fd` is an open terminal descriptor owned by `file`.
    unsafe { libc::tcflush(fd, libc::TCIFLUSH) };

    // SAFETY: `fd` is open and `t` is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &t) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Apply a read timeout to a raw terminal through `VMIN`/`VTIME`.
pub(crate) fn set_read_timeout(file: &File, path: &Path, timeout: Option<Duration>) -> Result<()> {
    let fd = file.as_raw_fd();
    let configure = |source| TransportError::Configure {
        path: path.to_path_buf(),
        source,
    };

    // SAFETY: tcgetattr fully initializes `t` on success.
    let mut t: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `fd` is an open terminal descriptor and `t` is writable.
    if unsafe { libc::tcgetattr(fd, &mut t) } != 0 {
        return Err(configure(std::io::Error::last_os_error()));
    }

    match timeout {
        Some(timeout) => {
            t.c_cc[libc::VMIN] = 0;
            t.c_cc[libc::VTIME] = deciseconds(timeout);
        }
        None => {
            t.c_cc[libc::VMIN] = 1;
            t.c_cc[libc::VTIME] = 0;
        }
    }

    // SAFETY: `fd` is open and `t` was initialized by tcgetattr.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &t) } != 0 {
        return Err(configure(std::io::Error::last_os_error()));
    }
    debug!(?path, ?timeout, "applied terminal read timeout");
    Ok(())
}

fn deciseconds(timeout: Duration) -> libc::cc_t {
    let tenths = timeout.as_millis().div_ceil(100).clamp(1, 255);
    tenths as libc::cc_t
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn deciseconds_rounds_up_and_clamps() {
        assert_eq!(deciseconds(Duration::from_millis(1)), 1);
        assert_eq!(deciseconds(Duration::from_millis(500)), 5);
        assert_eq!(deciseconds(Duration::from_millis(501)), 6);
        assert_eq!(deciseconds(Duration::from_secs(60)), 255);
    }

    #[test]
    fn open_missing_device_fails() {
        let result = open_device("/nonexistent/eposim/tty");
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    fn open_plain_file_as_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.bin");
        std::fs::write(&path, b"").unwrap();

        let mut stream = open_device(&path).unwrap();
        assert_eq!(stream.kind(), "file");
        stream.write_all(&[0x10, 0x01]).unwrap();
        stream.set_read_timeout(Some(Duration::from_millis(100))).unwrap();

        let mut reopened = open_device(&path).unwrap();
        let mut buf = Vec::new();
        reopened.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![0x10, 0x01]);
    }
}
