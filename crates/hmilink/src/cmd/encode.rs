use hmilink_frame::FrameCodec;
use hmilink_mirror::{encode_text, DEFAULT_MAX_TEXT_LEN};

use crate::cmd::{EncodeArgs, EncodeKind, Payload};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};
use crate::parse::parse_address;

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let codec = FrameCodec::new();

    let (kind, frame) = match args.kind {
        EncodeKind::Write(args) => {
            let address = parse_address(&args.address)?;
            let data = match args.data.payload()? {
                Payload::Words(words) => words.iter().flat_map(|w| w.to_be_bytes()).collect(),
                Payload::Bytes(bytes) => bytes,
                Payload::Text(text, encoding) => encode_text(&text, encoding, DEFAULT_MAX_TEXT_LEN),
            };
            let frame = codec
                .build_write_command(address, &data)
                .map_err(|err| frame_error("encode failed", err))?;
            ("write_command", frame)
        }
        EncodeKind::Read(args) => {
            let address = parse_address(&args.address)?;
            let frame = codec
                .build_read_command(address, args.words)
                .map_err(|err| frame_error("encode failed", err))?;
            ("read_command", frame)
        }
    };

    print_frame(kind, &frame, format);
    Ok(SUCCESS)
}
