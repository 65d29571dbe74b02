use std::net::Shutdown;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{flush_fully, write_fully, Transport};

/// Host-side listening socket the rendering engine connects to.
///
/// The socket file is removed on drop, unless the path was replaced by
/// something else in the meantime.
pub struct EngineListener {
    listener: UnixListener,
    path: PathBuf,
    created_inode: (u64, u64),
}

impl EngineListener {
    /// Default permission mode for the socket path.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind a Unix socket at `path`, replacing a stale socket file.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bind_err = |source: std::io::Error| TransportError::Bind {
            path: path.clone(),
            source,
        };

        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len,
                max: Self::MAX_PATH_LEN,
            });
        }

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_SOCKET_MODE),
        )
        .map_err(bind_err)?;
        let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, "waiting for engine connection");
        Ok(Self {
            created_inode: (metadata.dev(), metadata.ino()),
            listener,
            path,
        })
    }

    /// Accept the engine connection (blocking).
    pub fn accept(&self) -> Result<EngineConnection> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        let connection = EngineConnection { stream: Some(stream) };
        match connection.peer_pid() {
            Some(pid) => info!(pid, "engine connected"),
            None => info!("engine connected"),
        }
        Ok(connection)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EngineListener {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if metadata.file_type().is_socket()
            && (metadata.dev(), metadata.ino()) == self.created_inode
        {
            debug!(path = ?self.path, "cleaning up socket file");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
        }
    }
}

/// An accepted engine connection used as the encoder's output.
pub struct EngineConnection {
    stream: Option<UnixStream>,
}

impl EngineConnection {
    /// Wrap an already connected stream.
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Process id of the connected engine (Linux only).
    #[cfg(target_os = "linux")]
    pub fn peer_pid(&self) -> Option<u32> {
        use std::os::fd::AsRawFd;

        let fd = self.stream.as_ref()?.as_raw_fd();
        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

        // SAFETY: `cred` and `len` are valid writable pointers for the provided sizes,
        // and `fd` is an open Unix socket descriptor owned by this connection.
        let rc = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                (&mut cred as *mut libc::ucred).cast::<libc::c_void>(),
                &mut len,
            )
        };

        if rc == 0 && len as usize == std::mem::size_of::<libc::ucred>() {
            Some(cred.pid as u32)
        } else {
            None
        }
    }

    /// Process id of the connected engine.
    ///
    /// Returns `None` on platforms that do not expose peer credentials.
    #[cfg(not(target_os = "linux"))]
    pub fn peer_pid(&self) -> Option<u32> {
        None
    }

    fn stream_mut(&mut self) -> Result<&mut UnixStream> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for EngineConnection {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        write_fully(self.stream_mut()?, bytes)
    }

    fn flush(&mut self) -> Result<()> {
        flush_fully(self.stream_mut()?)
    }

    fn close_without_flush(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone.
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "unix-domain-socket"
    }
}
