use clap::{Args, Subcommand};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use hmilink_frame::FrameConfig;
use hmilink_mirror::TextEncoding;
use hmilink_session::{Panel, PanelConfig};
use hmilink_transport::FdChannel;

use crate::exit::{transport_error, CliError, CliResult};
use crate::output::OutputFormat;
use crate::parse::{parse_duration, parse_hex, parse_words};

pub mod crc;
pub mod decode;
pub mod encode;
pub mod read;
pub mod simulate;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a command frame without sending it.
    Encode(EncodeArgs),
    /// Validate a reply frame and print what it carries.
    Decode(DecodeArgs),
    /// Compute the CRC-16/Modbus checksum of some bytes.
    Crc(CrcArgs),
    /// Read registers from a controller.
    Read(ReadArgs),
    /// Write registers on a controller.
    Write(WriteArgs),
    /// Serve a simulated controller on a socket.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Crc(args) => crc::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Simulate(args) => simulate::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(subcommand)]
    pub kind: EncodeKind,
}

#[derive(Subcommand, Debug)]
pub enum EncodeKind {
    /// Register write command.
    Write(EncodeWriteArgs),
    /// Register read command.
    Read(EncodeReadArgs),
}

#[derive(Args, Debug)]
pub struct EncodeWriteArgs {
    /// First register address (hex with 0x prefix, or decimal).
    pub address: String,
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args, Debug)]
pub struct EncodeReadArgs {
    /// First register address (hex with 0x prefix, or decimal).
    pub address: String,
    /// Number of registers to read (1-128).
    #[arg(long, short = 'n', default_value = "1")]
    pub words: u8,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Reply frame as hex bytes.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct CrcArgs {
    /// Input bytes as hex.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// First register address (hex with 0x prefix, or decimal).
    pub address: String,
    /// Number of registers to read (1-124, the most one reply carries).
    #[arg(long, short = 'n', default_value = "1")]
    pub words: u8,
    /// Decode the registers as text.
    #[arg(long)]
    pub text: bool,
    /// Text encoding (ascii, utf8, utf16be, utf16le).
    #[arg(long, default_value = "ascii")]
    pub encoding: String,
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// First register address (hex with 0x prefix, or decimal).
    pub address: String,
    #[command(flatten)]
    pub data: DataArgs,
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Preset a register before serving (ADDRESS=VALUE, repeatable).
    #[arg(long = "set", value_name = "ADDRESS=VALUE")]
    pub presets: Vec<String>,
    /// Drop a connection after this long without a request (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub idle_timeout: String,
    /// Exit after serving N requests.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Register payload, given as words, raw bytes or text.
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Register values (comma-separated, hex with 0x prefix, or decimal).
    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with_all = ["hex", "text"],
        required_unless_present_any = ["hex", "text"]
    )]
    pub words: Option<Vec<String>>,
    /// Raw register bytes as hex (whole words).
    #[arg(long, conflicts_with_all = ["words", "text"])]
    pub hex: Option<String>,
    /// Text to store.
    #[arg(long, conflicts_with_all = ["words", "hex"])]
    pub text: Option<String>,
    /// Text encoding (ascii, utf8, utf16be, utf16le). Default: ascii.
    #[arg(long, requires = "text")]
    pub encoding: Option<String>,
}

pub enum Payload {
    Words(Vec<u16>),
    Bytes(Vec<u8>),
    Text(String, TextEncoding),
}

impl DataArgs {
    pub fn payload(&self) -> CliResult<Payload> {
        if let Some(words) = &self.words {
            return Ok(Payload::Words(parse_words(words)?));
        }
        if let Some(hex) = &self.hex {
            return Ok(Payload::Bytes(parse_hex(hex)?));
        }
        match &self.text {
            Some(text) => {
                let encoding = match &self.encoding {
                    Some(name) => parse_encoding(name)?,
                    None => TextEncoding::default(),
                };
                Ok(Payload::Text(text.clone(), encoding))
            }
            None => Err(CliError::usage("one of --words, --hex or --text is required")),
        }
    }
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Time to wait for each reply attempt (e.g. 200ms, 1s).
    #[arg(long, default_value = "200ms")]
    pub timeout: String,
    /// Additional attempts after the first reply timeout.
    #[arg(long, default_value = "2")]
    pub retries: u32,
}

impl LinkArgs {
    pub fn panel_config(&self) -> CliResult<PanelConfig> {
        Ok(PanelConfig {
            frame: FrameConfig {
                timeout: parse_duration(&self.timeout)?,
                max_retries: self.retries,
                ..FrameConfig::default()
            },
            ..PanelConfig::default()
        })
    }
}

pub fn parse_encoding(name: &str) -> CliResult<TextEncoding> {
    TextEncoding::from_name(name)
        .ok_or_else(|| CliError::usage(format!("unknown text encoding: {name}")))
}

pub fn open_panel(path: &Path, link: &LinkArgs) -> CliResult<Panel<FdChannel<UnixStream>>> {
    let config = link.panel_config()?;
    let channel =
        FdChannel::connect(path).map_err(|err| transport_error("connect failed", err))?;
    Ok(Panel::with_config(channel, config))
}
