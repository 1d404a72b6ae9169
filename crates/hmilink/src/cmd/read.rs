use tracing::debug;

use crate::cmd::{open_panel, parse_encoding, ReadArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_registers, print_text, OutputFormat};
use crate::parse::parse_address;

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let address = parse_address(&args.address)?;
    let encoding = parse_encoding(&args.encoding)?;
    let mut panel = open_panel(&args.path, &args.link)?;
    debug!(path = %args.path.display(), address, words = args.words, "reading registers");

    if args.text {
        let text = panel
            .read_text(address, args.words, encoding)
            .map_err(|err| session_error("read failed", err))?;
        print_text(address, &text, format);
    } else {
        let words = panel
            .read_words(address, args.words)
            .map_err(|err| session_error("read failed", err))?;
        print_registers(address, &words, format);
    }

    Ok(SUCCESS)
}
