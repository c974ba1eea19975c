use std::io::{Read, Write};
#[cfg(unix)]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(unix)]
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// A connected byte channel implementing `Read` and `Write`.
///
/// This is the fundamental I/O type handed to the handshake layer.
/// It wraps either a Unix domain socket stream or an open serial/pty device.
/// Reads and writes block unless a timeout has been set.
pub struct SerialStream {
    inner: SerialStreamInner,
}

enum SerialStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    #[cfg(unix)]
    Device(DeviceHandle),
}

#[cfg(unix)]
struct DeviceHandle {
    file: std::fs::File,
    path: std::path::PathBuf,
    is_terminal: bool,
    /// Set while `VTIME` bounds reads. Shared by clones, as termios is.
    timed_reads: Arc<AtomicBool>,
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => stream.read(buf),
            #[cfg(unix)]
            SerialStreamInner::Device(device) => {
                let n = device.file.read(buf)?;
                if n == 0 && !buf.is_empty() && device.timed_reads.load(Ordering::Relaxed) {
                    return Err(std::io::Error::from(std::io::ErrorKind::TimedOut));
                }
                Ok(n)
            }
        }
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => stream.write(buf),
            #[cfg(unix)]
            SerialStreamInner::Device(device) => device.file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => stream.flush(),
            #[cfg(unix)]
            SerialStreamInner::Device(device) => device.file.flush(),
        }
    }
}

impl SerialStream {
    /// Create a SerialStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: SerialStreamInner::Unix(stream),
        }
    }

    /// Create a SerialStream from an opened device file.
    #[cfg(unix)]
    pub(crate) fn from_device(
        file: std::fs::File,
        path: std::path::PathBuf,
        is_terminal: bool,
    ) -> Self {
        Self {
            inner: SerialStreamInner::Device(DeviceHandle {
                file,
                path,
                is_terminal,
                timed_reads: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Create a connected in-process pair of streams.
    ///
    /// Whatever is written on one end is read on the other, which makes the
    /// pair a stand-in for a null-modem cable between a master and a device.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying channel.
    ///
    /// Terminal devices express the timeout through `VMIN`/`VTIME`, which
    /// has a resolution of 100 ms and a ceiling of 25.5 s. A timed-out
    /// device read fails with `TimedOut`, as a socket read does.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            SerialStreamInner::Device(device) => {
                if !device.is_terminal {
                    tracing::debug!(path = ?device.path, "read timeout ignored for non-terminal device");
                    return Ok(());
                }
                crate::device::set_read_timeout(&device.file, &device.path, timeout)?;
                device
                    .timed_reads
                    .store(timeout.is_some(), Ordering::Relaxed);
                Ok(())
            }
        }
    }

    /// Set write timeout on the underlying channel.
    ///
    /// Device writes cannot time out; the call is a no-op for them.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
            #[cfg(unix)]
            SerialStreamInner::Device(device) => {
                tracing::debug!(path = ?device.path, "write timeout not supported on devices");
                Ok(())
            }
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            #[cfg(unix)]
            SerialStreamInner::Device(device) => Ok(Self {
                inner: SerialStreamInner::Device(DeviceHandle {
                    file: device.file.try_clone()?,
                    path: device.path.clone(),
                    is_terminal: device.is_terminal,
                    timed_reads: Arc::clone(&device.timed_reads),
                }),
            }),
        }
    }

    /// Channel kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(_) => "unix",
            #[cfg(unix)]
            SerialStreamInner::Device(device) if device.is_terminal => "tty",
            #[cfg(unix)]
            SerialStreamInner::Device(_) => "file",
        }
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(_) => f.debug_struct("SerialStream").field("type", &"unix").finish(),
            #[cfg(unix)]
            SerialStreamInner::Device(device) => f
                .debug_struct("SerialStream")
                .field("type", &self.kind())
                .field("path", &device.path)
                .finish(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn pair_is_duplex() {
        let (mut left, mut right) = SerialStream::pair().unwrap();

        left.write_all(b"\x10").unwrap();
        let mut byte = [0u8; 1];
        right.read_exact(&mut byte).unwrap();
        assert_eq!(byte, [0x10]);

        right.write_all(b"O").unwrap();
        left.read_exact(&mut byte).unwrap();
        assert_eq!(&byte, b"O");
    }

    #[test]
    fn read_timeout_applies_to_sockets() {
        let (left, _right) = SerialStream::pair().unwrap();
        left.set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();

        let mut left = left;
        let mut byte = [0u8; 1];
        let err = left.read(&mut byte).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn clone_shares_the_channel() {
        let (left, mut right) = SerialStream::pair().unwrap();
        let mut clone = left.try_clone().unwrap();

        clone.write_all(b"F").unwrap();
        let mut byte = [0u8; 1];
        right.read_exact(&mut byte).unwrap();
        assert_eq!(&byte, b"F");
        assert_eq!(left.kind(), "unix");
    }
}
