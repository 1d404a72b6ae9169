use std::sync::Arc;

use hmilink_frame::{
    Answer, AnswerProcessor, Frame, FrameCodec, FrameConfig, FrameError, FrameReceiver,
    MAX_REPLY_WORDS,
};
use hmilink_mirror::{encode_text, MemoryMirror, MirrorError, TextEncoding};
use hmilink_transport::ByteChannel;
use tracing::debug;

use crate::error::{Result, SessionError};

/// Configuration for a panel session.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Receive timeout and retry budget.
    pub frame: FrameConfig,
    /// Drop queued-but-unsent output before each request. Default: true.
    pub discard_output_before_write: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            discard_output_before_write: true,
        }
    }
}

/// A half-duplex session with one controller.
///
/// Every request borrows the panel mutably, so round trips on one channel are
/// serialized by construction. The register mirror is shared and may be read
/// from other threads at any time.
pub struct Panel<C> {
    channel: C,
    codec: FrameCodec,
    receiver: FrameReceiver,
    processor: AnswerProcessor,
    mirror: Arc<MemoryMirror>,
    config: PanelConfig,
}

impl<C: ByteChannel> Panel<C> {
    /// Session with default configuration and a fresh mirror.
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, PanelConfig::default())
    }

    /// Session with explicit configuration and a fresh mirror.
    pub fn with_config(channel: C, config: PanelConfig) -> Self {
        Self::with_mirror(channel, config, Arc::new(MemoryMirror::new()))
    }

    /// Session that keeps `mirror` up to date.
    pub fn with_mirror(channel: C, config: PanelConfig, mirror: Arc<MemoryMirror>) -> Self {
        Self {
            channel,
            codec: FrameCodec::new(),
            receiver: FrameReceiver::with_config(config.frame.clone()),
            processor: AnswerProcessor::new(),
            mirror,
            config,
        }
    }

    /// The local register image.
    pub fn mirror(&self) -> &Arc<MemoryMirror> {
        &self.mirror
    }

    /// Current session configuration.
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consume the session and return the channel.
    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Write raw register bytes (wire order) and mirror them once acknowledged.
    pub fn write_bytes(&mut self, address: u16, data: &[u8]) -> Result<()> {
        if data.len() % 2 != 0 {
            return Err(MirrorError::InvalidArgument(format!(
                "register data must be whole words, got {} bytes",
                data.len()
            ))
            .into());
        }
        self.mirror.check_range(address, data.len() / 2)?;

        self.send_write(address, data)?;
        self.mirror.write_raw(address, data)?;
        Ok(())
    }

    /// Write one host-order word.
    pub fn write_word(&mut self, address: u16, value: u16) -> Result<()> {
        self.write_words(address, &[value])
    }

    /// Write host-order words.
    pub fn write_words(&mut self, address: u16, values: &[u16]) -> Result<()> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_bytes(address, &data)
    }

    /// Write text, followed by a zero terminator word when the text is shorter
    /// than the mirror's text cap. Only the registers actually sent are
    /// updated in the mirror.
    pub fn write_text(&mut self, address: u16, text: &str, encoding: TextEncoding) -> Result<()> {
        let limit = self.mirror.max_text_len() & !1;
        let mut data = encode_text(text, encoding, limit);
        if data.len() + 2 <= limit || data.is_empty() {
            data.extend_from_slice(&[0, 0]);
        }
        self.mirror.check_range(address, data.len() / 2)?;

        self.send_write(address, &data)?;
        self.mirror.write_raw(address, &data)?;
        Ok(())
    }

    /// Fetch `words` registers into the mirror.
    ///
    /// A reply frame holds at most [`MAX_REPLY_WORDS`] words, so larger
    /// requests are refused before anything is sent.
    pub fn refresh(&mut self, address: u16, words: u8) -> Result<()> {
        if words > MAX_REPLY_WORDS {
            return Err(FrameError::OutOfRange {
                what: "read word count",
                value: usize::from(words),
                max: usize::from(MAX_REPLY_WORDS),
            }
            .into());
        }
        self.mirror.check_range(address, usize::from(words))?;

        let command = self.codec.build_read_command(address, words)?;
        let reply = self.transact(&command)?;

        let mut delivered: Option<(u16, Vec<u8>)> = None;
        let answer = self
            .processor
            .process(reply.as_bytes(), |addr, data| delivered = Some((addr, data.to_vec())))?;

        match (answer, delivered) {
            (
                Answer::ReadData {
                    address: echoed,
                    word_count,
                },
                Some((_, data)),
            ) if echoed == address && word_count == words => {
                self.mirror.write_raw(address, &data)?;
                debug!(address, words, "registers refreshed");
                Ok(())
            }
            (answer, _) => Err(SessionError::UnexpectedReply { address, answer }),
        }
    }

    /// Read registers as raw wire-order bytes.
    pub fn read_bytes(&mut self, address: u16, words: u8) -> Result<Vec<u8>> {
        self.refresh(address, words)?;
        Ok(self.mirror.read_bytes(address, usize::from(words))?)
    }

    /// Read one host-order word.
    pub fn read_word(&mut self, address: u16) -> Result<u16> {
        self.refresh(address, 1)?;
        Ok(self.mirror.read_word(address)?)
    }

    /// Read host-order words.
    pub fn read_words(&mut self, address: u16, words: u8) -> Result<Vec<u16>> {
        self.refresh(address, words)?;
        Ok(self.mirror.read_words(address, usize::from(words))?)
    }

    /// Read `words` registers and decode them as text.
    pub fn read_text(&mut self, address: u16, words: u8, encoding: TextEncoding) -> Result<String> {
        self.refresh(address, words)?;
        Ok(self
            .mirror
            .read_text(address, usize::from(words) * 2, encoding)?)
    }

    fn send_write(&mut self, address: u16, data: &[u8]) -> Result<()> {
        let command = self.codec.build_write_command(address, data)?;
        let reply = self.transact(&command)?;

        match self.processor.process(reply.as_bytes(), |_, _| {})? {
            Answer::WriteAck => {
                debug!(address, len = data.len(), "write acknowledged");
                Ok(())
            }
            answer => Err(SessionError::UnexpectedReply { address, answer }),
        }
    }

    /// Send one command and wait for its reply.
    fn transact(&mut self, command: &Frame) -> Result<Frame> {
        // Half-duplex: anything still queued from an earlier request is stale.
        if self.config.discard_output_before_write {
            self.channel.discard_output()?;
        }
        self.channel.write_bytes(command.as_bytes())?;
        Ok(self.receiver.receive_frame(&mut self.channel)?)
    }
}

impl<C> std::fmt::Debug for Panel<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel")
            .field("config", &self.config)
            .field("mirror", &self.mirror)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use hmilink_frame::append_checksum;
    use hmilink_transport::MemoryChannel;

    use super::*;
    use crate::sim::ControllerSim;

    fn fast_config() -> PanelConfig {
        PanelConfig {
            frame: FrameConfig {
                timeout: Duration::from_millis(50),
                max_retries: 1,
                poll_interval: Duration::from_millis(1),
            },
            ..PanelConfig::default()
        }
    }

    fn panel_with_sim(chunk_size: usize) -> (Panel<MemoryChannel>, ControllerSim) {
        let sim = ControllerSim::new();
        let channel = sim.clone().into_channel(chunk_size);
        (Panel::with_config(channel, fast_config()), sim)
    }

    #[test]
    fn write_words_updates_controller_and_mirror() {
        let (mut panel, sim) = panel_with_sim(64);
        panel.write_words(0x5000, &[0x1234, 0xABCD]).unwrap();

        assert_eq!(sim.mirror().read_words(0x5000, 2).unwrap(), vec![0x1234, 0xABCD]);
        assert_eq!(panel.mirror().read_words(0x5000, 2).unwrap(), vec![0x1234, 0xABCD]);
        assert_eq!(panel.get_ref().discard_count(), 1);
    }

    #[test]
    fn read_words_stores_delivered_bytes_verbatim() {
        let (mut panel, sim) = panel_with_sim(1);
        sim.mirror().write_raw(0x1000, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

        let words = panel.read_words(0x1000, 2).unwrap();
        assert_eq!(words, vec![0xDEAD, 0xBEEF]);
        assert_eq!(
            panel.mirror().read_bytes(0x1000, 2).unwrap(),
            vec![0xDE, 0xAD, 0xBE, 0xEF]
        );
    }

    #[test]
    fn text_roundtrip_through_controller() {
        let (mut panel, sim) = panel_with_sim(3);
        panel
            .write_text(0x2000, "LONGER TEXT", TextEncoding::Ascii)
            .unwrap();
        panel.write_text(0x2000, "AB", TextEncoding::Ascii).unwrap();

        assert_eq!(sim.mirror().read_word(0x2001).unwrap(), 0);
        assert_eq!(
            panel.read_text(0x2000, 2, TextEncoding::Ascii).unwrap(),
            "AB"
        );
    }

    #[test]
    fn text_write_keeps_neighbouring_registers_in_sync() {
        let (mut panel, sim) = panel_with_sim(16);
        panel.write_words(0x2010, &[0xBEEF]).unwrap();
        panel.write_text(0x2000, "AB", TextEncoding::Ascii).unwrap();

        assert_eq!(sim.mirror().read_word(0x2010).unwrap(), 0xBEEF);
        assert_eq!(panel.mirror().read_word(0x2010).unwrap(), 0xBEEF);
        assert_eq!(
            panel.mirror().read_bytes(0x2000, 2).unwrap(),
            sim.mirror().read_bytes(0x2000, 2).unwrap()
        );
    }

    #[test]
    fn reads_beyond_one_reply_are_refused_before_sending() {
        let (mut panel, _sim) = panel_with_sim(64);
        let err = panel.read_words(0x0000, 128).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::OutOfRange {
                value: 128,
                max: 124,
                ..
            })
        ));
        assert!(panel.get_ref().written().is_empty());

        assert_eq!(panel.read_words(0x0000, MAX_REPLY_WORDS).unwrap().len(), 124);
    }

    #[test]
    fn utf16_text_roundtrip() {
        let (mut panel, _sim) = panel_with_sim(4);
        panel
            .write_text(0x3000, "温度", TextEncoding::Utf16Be)
            .unwrap();
        assert_eq!(
            panel.read_text(0x3000, 2, TextEncoding::Utf16Be).unwrap(),
            "温度"
        );
    }

    #[test]
    fn odd_write_is_rejected_before_sending() {
        let (mut panel, _sim) = panel_with_sim(64);
        let err = panel.write_bytes(0x0000, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, SessionError::Mirror(MirrorError::InvalidArgument(_))));
        assert!(panel.get_ref().written().is_empty());
    }

    #[test]
    fn out_of_range_read_is_rejected_before_sending() {
        let (mut panel, _sim) = panel_with_sim(64);
        let err = panel.read_words(0xFFFF, 2).unwrap_err();
        assert!(matches!(err, SessionError::Mirror(MirrorError::OutOfRange { .. })));
        assert!(panel.get_ref().written().is_empty());
    }

    #[test]
    fn silent_controller_times_out() {
        let mut panel = Panel::with_config(MemoryChannel::new(), fast_config());
        let err = panel.read_word(0x0000).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::Timeout { attempts: 2 })
        ));
    }

    #[test]
    fn reply_for_other_address_is_rejected() {
        let codec = FrameCodec::new();
        let wrong = codec.build_read_reply(0x0002, &[0x00, 0x01]).unwrap();
        let channel = MemoryChannel::with_responder(move |_| vec![wrong.clone().into_bytes()]);
        let mut panel = Panel::with_config(channel, fast_config());

        let err = panel.read_word(0x0001).unwrap_err();
        assert!(matches!(
            err,
            SessionError::UnexpectedReply {
                address: 0x0001,
                ..
            }
        ));
        assert_eq!(panel.mirror().read_word(0x0002).unwrap(), 0);
    }

    #[test]
    fn read_reply_to_write_is_rejected() {
        let codec = FrameCodec::new();
        let reply = codec.build_read_reply(0x0001, &[0x00, 0x01]).unwrap();
        let channel = MemoryChannel::with_responder(move |_| vec![reply.clone().into_bytes()]);
        let mut panel = Panel::with_config(channel, fast_config());

        let err = panel.write_word(0x0001, 5).unwrap_err();
        assert!(matches!(err, SessionError::UnexpectedReply { .. }));
        assert_eq!(panel.mirror().read_word(0x0001).unwrap(), 0);
    }

    #[test]
    fn nack_leaves_mirror_untouched() {
        let mut wire = vec![0x5A, 0xA5, 0x05];
        wire.extend_from_slice(&append_checksum(&[0x82, b'N', b'O']));
        let nack = Bytes::from(wire);
        let channel = MemoryChannel::with_responder(move |_| vec![nack.clone()]);
        let mut panel = Panel::with_config(channel, fast_config());

        let err = panel.write_word(0x0001, 5).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::WriteNotAcknowledged)
        ));
        assert_eq!(panel.mirror().read_word(0x0001).unwrap(), 0);
    }

    #[test]
    fn discard_can_be_disabled() {
        let sim = ControllerSim::new();
        let config = PanelConfig {
            discard_output_before_write: false,
            ..fast_config()
        };
        let mut panel = Panel::with_config(sim.into_channel(8), config);
        panel.write_word(0x0010, 1).unwrap();
        assert_eq!(panel.get_ref().discard_count(), 0);
    }
}
