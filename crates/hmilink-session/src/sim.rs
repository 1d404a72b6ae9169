use std::sync::Arc;

use bytes::Bytes;
use hmilink_frame::{
    verify_bytes, Frame, FrameCodec, FrameError, FrameReceiver, Opcode, CHECKSUM_SIZE, HEADER,
    MAX_READ_WORDS, MIN_LENGTH, PREFIX_SIZE,
};
use hmilink_mirror::MemoryMirror;
use hmilink_transport::{ByteChannel, MemoryChannel};
use tracing::{debug, warn};

use crate::error::Result;

/// Answers command frames the way a controller does, backed by its own
/// register mirror.
#[derive(Debug, Clone)]
pub struct ControllerSim {
    mirror: Arc<MemoryMirror>,
    codec: FrameCodec,
}

impl ControllerSim {
    /// Simulator with zeroed registers.
    pub fn new() -> Self {
        Self::with_mirror(Arc::new(MemoryMirror::new()))
    }

    /// Simulator over an existing register image.
    pub fn with_mirror(mirror: Arc<MemoryMirror>) -> Self {
        Self {
            mirror,
            codec: FrameCodec::new(),
        }
    }

    /// The simulated controller's registers.
    pub fn mirror(&self) -> &Arc<MemoryMirror> {
        &self.mirror
    }

    /// Apply one command frame and build the reply.
    pub fn handle(&self, request: &[u8]) -> Result<Frame> {
        let min = PREFIX_SIZE + MIN_LENGTH;
        if request.len() < min {
            return Err(FrameError::InvalidInput {
                len: request.len(),
                min,
            }
            .into());
        }
        if request[..2] != HEADER {
            return Err(FrameError::Malformed("request does not start with a header".to_string()).into());
        }

        let total = PREFIX_SIZE + usize::from(request[2]);
        if total < min || request.len() < total {
            return Err(FrameError::Malformed(format!(
                "request declares {total} bytes, {} present",
                request.len()
            ))
            .into());
        }

        let body = &request[PREFIX_SIZE..total - CHECKSUM_SIZE];
        if !verify_bytes(body, &request[total - CHECKSUM_SIZE..total])? {
            return Err(FrameError::Malformed("request checksum mismatch".to_string()).into());
        }

        let address = u16::from_be_bytes([body[1], body[2]]);
        match Opcode::from_byte(body[0]) {
            Some(Opcode::Write) => {
                self.mirror.write_raw(address, &body[3..])?;
                debug!(address, len = body.len() - 3, "simulated write");
                Ok(self.codec.build_write_ack())
            }
            Some(Opcode::Read) => {
                let byte_count = *body.get(3).ok_or_else(|| {
                    FrameError::Malformed("read request without byte count".to_string())
                })?;
                let words = match byte_count {
                    0 => usize::from(MAX_READ_WORDS),
                    n => usize::from(n) / 2,
                };
                let data = self.mirror.read_bytes(address, words)?;
                debug!(address, words, "simulated read");
                Ok(self.codec.build_read_reply(address, &data)?)
            }
            None => Err(FrameError::UnknownCommand(body[0]).into()),
        }
    }

    /// Receive one request from `channel`, apply it and write the reply.
    pub fn serve_one<C: ByteChannel + ?Sized>(
        &self,
        channel: &mut C,
        receiver: &mut FrameReceiver,
    ) -> Result<()> {
        let request = receiver.receive_frame(channel)?;
        let reply = self.handle(request.as_bytes())?;
        channel.write_bytes(reply.as_bytes())?;
        Ok(())
    }

    /// A scripted channel that answers every write through this simulator,
    /// delivering each reply in chunks of `chunk_size` bytes.
    pub fn into_channel(self, chunk_size: usize) -> MemoryChannel {
        let chunk_size = chunk_size.max(1);
        MemoryChannel::with_responder(move |request| match self.handle(request) {
            Ok(reply) => reply
                .as_bytes()
                .chunks(chunk_size)
                .map(Bytes::copy_from_slice)
                .collect(),
            Err(err) => {
                warn!(error = %err, "simulator dropped request");
                Vec::new()
            }
        })
    }
}

impl Default for ControllerSim {
    fn default() -> Self {
        Self::new()
    }
}
