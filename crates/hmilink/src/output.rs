use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use hmilink_frame::{Answer, Frame, Opcode};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: &'a str,
    opcode: String,
    address: String,
    length: usize,
    bytes: String,
}

pub fn print_frame(kind: &str, frame: &Frame, format: OutputFormat) {
    let opcode = frame
        .opcode()
        .map(opcode_name)
        .unwrap_or("unknown")
        .to_string();
    let address = hex_word(frame.address());
    let bytes = to_hex(frame.as_bytes());

    match format {
        OutputFormat::Json => print_json(&FrameOutput {
            kind,
            opcode,
            address,
            length: frame.len(),
            bytes,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["KIND", "OPCODE", "ADDRESS", "LEN", "BYTES"]);
            table.add_row(vec![
                kind.to_string(),
                opcode,
                address,
                frame.len().to_string(),
                bytes,
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{kind} opcode={opcode} address={address} len={} bytes={bytes}",
                frame.len()
            );
        }
        OutputFormat::Raw => print_raw(frame.as_bytes()),
    }
}

#[derive(Serialize)]
struct RegistersOutput {
    address: String,
    words: Vec<u16>,
    hex: Vec<String>,
}

pub fn print_registers(address: u16, words: &[u16], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&RegistersOutput {
            address: hex_word(address),
            words: words.to_vec(),
            hex: words.iter().map(|&w| hex_word(w)).collect(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ADDRESS", "HEX", "DEC"]);
            for (offset, &word) in words.iter().enumerate() {
                table.add_row(vec![
                    hex_word(address.wrapping_add(offset as u16)),
                    hex_word(word),
                    word.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (offset, &word) in words.iter().enumerate() {
                println!(
                    "{} = {} ({word})",
                    hex_word(address.wrapping_add(offset as u16)),
                    hex_word(word)
                );
            }
        }
        OutputFormat::Raw => {
            let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
            print_raw(&bytes);
        }
    }
}

#[derive(Serialize)]
struct TextOutput<'a> {
    address: String,
    text: &'a str,
}

pub fn print_text(address: u16, text: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&TextOutput {
            address: hex_word(address),
            text,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ADDRESS", "TEXT"]);
            table.add_row(vec![hex_word(address), text.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{} = {text:?}", hex_word(address)),
        OutputFormat::Raw => print_raw(text.as_bytes()),
    }
}

#[derive(Serialize)]
struct AnswerOutput {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    word_count: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

/// Print a validated reply. `data` is the register payload delivered for a
/// read reply.
pub fn print_answer(answer: &Answer, data: &[u8], format: OutputFormat) {
    let out = match *answer {
        Answer::WriteAck => AnswerOutput {
            kind: "write_ack",
            address: None,
            word_count: None,
            data: None,
        },
        Answer::ReadData {
            address,
            word_count,
        } => AnswerOutput {
            kind: "read_data",
            address: Some(hex_word(address)),
            word_count: Some(word_count),
            data: Some(to_hex(data)),
        },
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["KIND", "ADDRESS", "WORDS", "DATA"]);
            table.add_row(vec![
                out.kind.to_string(),
                out.address.unwrap_or_default(),
                out.word_count.map(|n| n.to_string()).unwrap_or_default(),
                out.data.unwrap_or_default(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match (out.address, out.word_count, out.data) {
            (Some(address), Some(words), Some(data)) => {
                println!("{} address={address} words={words} data={data}", out.kind)
            }
            _ => println!("{}", out.kind),
        },
        OutputFormat::Raw => print_raw(data),
    }
}

#[derive(Serialize)]
struct ChecksumOutput {
    checksum: String,
    wire: String,
}

pub fn print_checksum(crc: u16, format: OutputFormat) {
    let out = ChecksumOutput {
        checksum: hex_word(crc),
        wire: to_hex(&crc.to_le_bytes()),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CHECKSUM", "WIRE"]);
            table.add_row(vec![out.checksum, out.wire]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("checksum={} wire={}", out.checksum, out.wire),
        OutputFormat::Raw => print_raw(&crc.to_le_bytes()),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Space-separated uppercase hex, the way frames are usually quoted.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn hex_word(value: u16) -> String {
    format!("0x{value:04X}")
}

fn opcode_name(opcode: Opcode) -> &'static str {
    match opcode {
        Opcode::Write => "write",
        Opcode::Read => "read",
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
