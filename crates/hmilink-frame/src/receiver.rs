use std::time::{Duration, Instant};

use hmilink_transport::ByteChannel;
use tracing::{debug, trace, warn};

use crate::arena::RxArena;
use crate::codec::{Frame, FrameConfig, PREFIX_SIZE};
use crate::error::{FrameError, Result};
use crate::framing::{DgusFraming, Framing};

/// Where the receiver is in assembling the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    /// Scanning for the header pattern.
    SearchingHeader,
    /// Header found at `offset`; the length byte has not arrived yet.
    AwaitingLength { offset: usize },
    /// Length known; waiting until `total` bytes are buffered from `offset`.
    AccumulatingBody { offset: usize, total: usize },
    /// A full frame occupies `[offset, offset + total)`.
    Complete { offset: usize, total: usize },
}

/// Reassembles frames from bytes trickling in over a [`ByteChannel`].
///
/// Blocks the calling thread, polling the channel without blocking and
/// sleeping briefly between polls, until a frame is complete or every attempt
/// has timed out.
#[derive(Debug)]
pub struct FrameReceiver<F = DgusFraming> {
    framing: F,
    config: FrameConfig,
    arena: RxArena,
    state: ReceiveState,
    scan_from: usize,
}

impl FrameReceiver {
    /// Receiver for the default framing with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Receiver for the default framing with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self::with_framing(DgusFraming, config)
    }
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Framing> FrameReceiver<F> {
    /// Receiver for an explicit framing variant.
    pub fn with_framing(framing: F, config: FrameConfig) -> Self {
        Self {
            framing,
            config,
            arena: RxArena::new(),
            state: ReceiveState::SearchingHeader,
            scan_from: 0,
        }
    }

    /// Current receiver configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Replace the receiver configuration for subsequent receives.
    pub fn set_config(&mut self, config: FrameConfig) {
        self.config = config;
    }

    /// State reached by the most recent receive.
    pub fn state(&self) -> ReceiveState {
        self.state
    }

    /// Wait for one frame using the configured timeout and retry budget.
    pub fn receive_frame<C: ByteChannel + ?Sized>(&mut self, channel: &mut C) -> Result<Frame> {
        let timeout = self.config.timeout;
        let max_retries = self.config.max_retries;
        self.receive_frame_with(channel, timeout, max_retries)
    }

    /// Wait for one frame.
    ///
    /// Each attempt gets a fresh `timeout` window and an empty buffer. After
    /// `1 + max_retries` attempts without a complete frame this fails with
    /// [`FrameError::Timeout`].
    pub fn receive_frame_with<C: ByteChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Frame> {
        let attempts = max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            self.reset();
            let deadline = Instant::now() + timeout;

            loop {
                let appended = self.arena.fill_from(channel)?;
                if appended > 0 {
                    trace!(appended, buffered = self.arena.len(), "bytes received");
                }

                if let Some(frame) = self.advance() {
                    debug!(attempt, len = frame.len(), "frame received");
                    return Ok(frame);
                }

                if Instant::now() >= deadline {
                    break;
                }
                std::thread::sleep(self.config.poll_interval);
            }

            debug!(
                attempt,
                attempts,
                state = ?self.state,
                buffered = self.arena.len(),
                "receive attempt timed out"
            );
        }

        warn!(attempts, ?timeout, "no frame received");
        Err(FrameError::Timeout { attempts })
    }

    fn reset(&mut self) {
        self.arena.reset();
        self.state = ReceiveState::SearchingHeader;
        self.scan_from = 0;
    }

    /// Run the state machine over everything buffered so far.
    fn advance(&mut self) -> Option<Frame> {
        loop {
            match self.state {
                ReceiveState::SearchingHeader => {
                    match self.arena.find(self.framing.header(), self.scan_from) {
                        Some(offset) => {
                            self.state = ReceiveState::AwaitingLength { offset };
                        }
                        None => {
                            // Keep one byte of overlap for a header split across reads.
                            self.scan_from = self.arena.len().saturating_sub(1);
                            return None;
                        }
                    }
                }
                ReceiveState::AwaitingLength { offset } => {
                    let length = usize::from(self.arena.get(offset + 2)?);
                    if length < self.framing.min_length() {
                        debug!(offset, length, "abandoning header with invalid length");
                        self.scan_from = offset + 1;
                        self.state = ReceiveState::SearchingHeader;
                        continue;
                    }
                    self.state = ReceiveState::AccumulatingBody {
                        offset,
                        total: PREFIX_SIZE + length,
                    };
                }
                ReceiveState::AccumulatingBody { offset, total } => {
                    if self.arena.len() - offset < total {
                        return None;
                    }
                    self.state = ReceiveState::Complete { offset, total };
                }
                ReceiveState::Complete { offset, total } => {
                    return self.arena.copy_window(offset, total).map(Frame::from_raw);
                }
            }
        }
    }
}
