use tracing::debug;

use crate::cmd::{open_panel, Payload, WriteArgs};
use crate::exit::{mirror_error, session_error, CliResult, SUCCESS};
use crate::output::{print_registers, print_text, OutputFormat};
use crate::parse::parse_address;

pub fn run(args: WriteArgs, format: OutputFormat) -> CliResult<i32> {
    let address = parse_address(&args.address)?;
    let payload = args.data.payload()?;
    let mut panel = open_panel(&args.path, &args.link)?;
    debug!(path = %args.path.display(), address, "writing registers");

    match payload {
        Payload::Words(words) => {
            panel
                .write_words(address, &words)
                .map_err(|err| session_error("write failed", err))?;
            print_registers(address, &words, format);
        }
        Payload::Bytes(bytes) => {
            panel
                .write_bytes(address, &bytes)
                .map_err(|err| session_error("write failed", err))?;
            let words = panel
                .mirror()
                .read_words(address, bytes.len() / 2)
                .map_err(|err| mirror_error("write failed", err))?;
            print_registers(address, &words, format);
        }
        Payload::Text(text, encoding) => {
            panel
                .write_text(address, &text, encoding)
                .map_err(|err| session_error("write failed", err))?;
            print_text(address, &text, format);
        }
    }

    Ok(SUCCESS)
}
