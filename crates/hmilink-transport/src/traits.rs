use crate::error::Result;

/// A duplex byte link to the controller.
///
/// The protocol is strictly half-duplex request/response, so a channel is
/// owned by one in-flight request at a time. Implementations must never block
/// indefinitely in [`ByteChannel::read_available`].
pub trait ByteChannel {
    /// Write all of `bytes` to the channel.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Number of bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read up to `buf.len()` bytes that are already available.
    ///
    /// Returns `Ok(0)` when nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Drop output that was queued but not yet transmitted.
    ///
    /// Channels without an output queue keep the default no-op.
    fn discard_output(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf)
    }

    fn discard_output(&mut self) -> Result<()> {
        (**self).discard_output()
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf)
    }

    fn discard_output(&mut self) -> Result<()> {
        (**self).discard_output()
    }
}
