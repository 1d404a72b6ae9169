use std::collections::VecDeque;
use std::fmt;

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Bytes> + Send>;

/// In-memory scripted channel.
///
/// Inbound data is queued as chunks. Each chunk becomes visible to
/// [`ByteChannel::bytes_available`] only after the previous one has been fully
/// read, so a frame pushed in many small chunks arrives across many polls the
/// way a slow serial line delivers it.
///
/// An optional responder is called for every write and may queue reply chunks,
/// which turns the channel into a minimal controller simulator.
pub struct MemoryChannel {
    inbound: VecDeque<Bytes>,
    written: BytesMut,
    responder: Option<Responder>,
    discards: usize,
    closed: bool,
}

impl MemoryChannel {
    /// Create an empty channel that never produces data.
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            written: BytesMut::new(),
            responder: None,
            discards: 0,
            closed: false,
        }
    }

    /// Create a channel whose responder is invoked with every written buffer.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<Bytes> + Send + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Queue `data` as a single inbound chunk.
    pub fn push_inbound(&mut self, data: impl Into<Bytes>) {
        let data = data.into();
        if !data.is_empty() {
            self.inbound.push_back(data);
        }
    }

    /// Queue `data` split into chunks of at most `chunk_size` bytes.
    pub fn push_inbound_chunked(&mut self, data: &[u8], chunk_size: usize) {
        for chunk in data.chunks(chunk_size.max(1)) {
            self.push_inbound(Bytes::copy_from_slice(chunk));
        }
    }

    /// Bytes queued for reading that have not been consumed yet.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.iter().map(Bytes::len).sum()
    }

    /// Everything written to the channel so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Take everything written so far, leaving the write log empty.
    pub fn take_written(&mut self) -> Bytes {
        self.written.split().freeze()
    }

    /// How many times output was discarded.
    pub fn discard_count(&self) -> usize {
        self.discards
    }

    /// Close the channel; every subsequent operation fails.
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteChannel for MemoryChannel {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        trace!(len = bytes.len(), "memory channel write");
        self.written.extend_from_slice(bytes);
        if let Some(responder) = self.responder.as_mut() {
            let replies = responder(bytes);
            for reply in replies {
                if !reply.is_empty() {
                    self.inbound.push_back(reply);
                }
            }
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.inbound.front().map_or(0, Bytes::len))
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let Some(front) = self.inbound.front_mut() else {
            return Ok(0);
        };

        let n = front.len().min(buf.len());
        buf[..n].copy_from_slice(&front[..n]);
        front.advance(n);
        if front.is_empty() {
            self.inbound.pop_front();
        }
        Ok(n)
    }

    fn discard_output(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.discards += 1;
        Ok(())
    }
}

impl fmt::Debug for MemoryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryChannel")
            .field("pending_inbound", &self.pending_inbound())
            .field("written", &self.written.len())
            .field("responder", &self.responder.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}
