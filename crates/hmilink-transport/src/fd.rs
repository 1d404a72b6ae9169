use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

/// Byte channel over an already-open file descriptor.
///
/// Works with anything that exposes a raw fd and supports `FIONREAD`: a tty
/// opened and configured by the caller, a Unix socket bridged to the serial
/// device, a pipe.
pub struct FdChannel<T> {
    inner: T,
}

impl<T: AsRawFd + Read + Write> FdChannel<T> {
    /// Wrap an open stream.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the channel and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FdChannel<UnixStream> {
    /// Connect to a Unix socket, e.g. one exposed by a serial bridge.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to unix socket channel");
        Ok(Self::new(stream))
    }
}

impl<T: AsRawFd + Read + Write> ByteChannel for FdChannel<T> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let fd = self.inner.as_raw_fd();
        let mut available: libc::c_int = 0;

        // SAFETY: `fd` is an open descriptor owned by `self.inner` and
        // `available` is a valid writable c_int for FIONREAD.
        let rc = unsafe { libc::ioctl(fd, libc::FIONREAD as _, &mut available as *mut libc::c_int) };
        if rc < 0 {
            return Err(TransportError::Io(std::io::Error::last_os_error()));
        }
        Ok(available.max(0) as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.bytes_available()?;
        if available == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = available.min(buf.len());
        loop {
            match self.inner.read(&mut buf[..want]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn discard_output(&mut self) -> Result<()> {
        let fd = self.inner.as_raw_fd();

        // SAFETY: `fd` is an open descriptor owned by `self.inner`.
        let rc = unsafe { libc::tcflush(fd, libc::TCOFLUSH) };
        if rc == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        match err.raw_os_error() {
            // Sockets and pipes have no terminal output queue.
            Some(code) if code == libc::ENOTTY || code == libc::EINVAL => Ok(()),
            _ => Err(TransportError::Io(err)),
        }
    }
}

impl<T> std::fmt::Debug for FdChannel<T>
where
    T: AsRawFd,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdChannel")
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}
