use hmilink_frame::checksum;

use crate::cmd::CrcArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_checksum, OutputFormat};
use crate::parse::parse_hex;

pub fn run(args: CrcArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    print_checksum(checksum(&bytes), format);
    Ok(SUCCESS)
}
