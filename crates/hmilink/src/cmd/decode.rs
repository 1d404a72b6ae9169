use hmilink_frame::process_answer;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_answer, OutputFormat};
use crate::parse::parse_hex;

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;

    let mut data = Vec::new();
    let answer = process_answer(&bytes, |_, chunk| data.extend_from_slice(chunk))
        .map_err(|err| frame_error("decode failed", err))?;

    print_answer(&answer, &data, format);
    Ok(SUCCESS)
}
