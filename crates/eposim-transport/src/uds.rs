use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::SerialStream;

const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Unix domain socket endpoint.
///
/// Lets a simulator stand in for a serial port when the controller software
/// can talk to a socket instead of a tty. Each accepted connection is one
/// independent link. The socket file is removed on drop, unless something
/// else has replaced it in the meantime.
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
    inode: (u64, u64),
}

impl UnixDomainSocket {
    /// Permission mode applied to the socket file.
    pub const SOCKET_MODE: u32 = 0o600;

    /// `sockaddr_un.sun_path` capacity.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on `path`.
    ///
    /// A stale socket left at `path` is removed first. Any other kind of
    /// file at `path` is an error.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len,
                max: Self::MAX_PATH_LEN,
            });
        }

        let bind_err = |source| TransportError::Bind {
            path: path.clone(),
            source,
        };

        if let Ok(existing) = std::fs::symlink_metadata(&path) {
            if !existing.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(Self::SOCKET_MODE))
            .map_err(bind_err)?;
        let created = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, "simulator socket listening");

        Ok(Self {
            listener,
            path,
            inode: (created.dev(), created.ino()),
        })
    }

    /// Accept the next link.
    ///
    /// Blocks unless the listener is non-blocking, in which case a missing
    /// peer fails with `WouldBlock`. Accepted links always block.
    pub fn accept(&self) -> Result<SerialStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nonblocking(false)?;
        debug!(path = ?self.path, "accepted link");
        Ok(SerialStream::from_unix(stream))
    }

    /// Accept the next link, giving up after `timeout`.
    ///
    /// Returns `Ok(None)` when nobody connected in time. The listener is
    /// left blocking afterwards.
    pub fn accept_timeout(&self, timeout: Duration) -> Result<Option<SerialStream>> {
        self.listener.set_nonblocking(true)?;
        let deadline = Instant::now() + timeout;
        let accepted = loop {
            match self.accept() {
                Ok(stream) => break Ok(Some(stream)),
                Err(TransportError::Accept(err)) if err.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        break Ok(None);
                    }
                    std::thread::sleep(ACCEPT_POLL);
                }
                Err(err) => break Err(err),
            }
        };
        self.listener.set_nonblocking(false)?;
        accepted
    }

    /// Connect to a listening simulator socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<SerialStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to simulator socket");
        Ok(SerialStream::from_unix(stream))
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if metadata.file_type().is_socket() && (metadata.dev(), metadata.ino()) == self.inode {
            debug!(path = ?self.path, "removing socket file");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(path = ?self.path, "socket path replaced; leaving it in place");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn bind_accept_connect() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("sim.sock");

        let listener = UnixDomainSocket::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let path_clone = sock_path.clone();
        let handle = std::thread::spawn(move || {
            let mut client = UnixDomainSocket::connect(&path_clone).unwrap();
            client.write_all(&[0x10]).unwrap();
            let mut ack = [0u8; 1];
            client.read_exact(&mut ack).unwrap();
            ack[0]
        });

        let mut server = listener.accept().unwrap();
        let mut opcode = [0u8; 1];
        server.read_exact(&mut opcode).unwrap();
        assert_eq!(opcode, [0x10]);
        server.write_all(b"O").unwrap();

        assert_eq!(handle.join().unwrap(), b'O');

        drop(listener);
        assert!(!sock_path.exists(), "socket file should be removed on drop");
    }

    #[test]
    fn accept_timeout_without_peer() {
        let dir = tempfile::tempdir().unwrap();
        let socket = UnixDomainSocket::bind(dir.path().join("idle.sock")).unwrap();

        let accepted = socket.accept_timeout(Duration::from_millis(30)).unwrap();
        assert!(accepted.is_none());

        let _client = UnixDomainSocket::connect(socket.path()).unwrap();
        let accepted = socket.accept_timeout(Duration::from_secs(2)).unwrap();
        assert!(accepted.is_some());
    }

    #[test]
    fn socket_mode_is_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("mode.sock");

        let _listener = UnixDomainSocket::bind(&sock_path).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn path_too_long_rejected() {
        let long_path = "/tmp/".to_string() + &"e".repeat(200) + ".sock";
        let result = UnixDomainSocket::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn regular_file_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("not-a-socket");
        std::fs::write(&sock_path, b"keep me").unwrap();

        let result = UnixDomainSocket::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
        assert_eq!(std::fs::read(&sock_path).unwrap(), b"keep me");
    }

    #[test]
    fn stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let sock_path = dir.path().join("stale.sock");

        let first = UnixDomainSocket::bind(&sock_path).unwrap();
        std::mem::forget(first);
        assert!(sock_path.exists());

        let second = UnixDomainSocket::bind(&sock_path);
        assert!(second.is_ok());
    }

    #[test]
    fn connect_without_listener_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = UnixDomainSocket::connect(dir.path().join("absent.sock"));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
