//! Write and read back registers against an in-process controller simulator
//! whose replies trickle in three bytes at a time.
//!
//! Run with:
//!   cargo run --example register-roundtrip

use hmilink::mirror::TextEncoding;
use hmilink::session::{ControllerSim, Panel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sim = ControllerSim::new();
    let controller = sim.mirror().clone();
    let mut panel = Panel::new(sim.into_channel(3));

    panel.write_words(0x5000, &[0x1234, 0xABCD])?;
    panel.write_text(0x6000, "READY", TextEncoding::Ascii)?;

    let words = panel.read_words(0x5000, 2)?;
    let text = panel.read_text(0x6000, 4, TextEncoding::Ascii)?;
    eprintln!("0x5000 = {words:04X?}");
    eprintln!("0x6000 = {text:?}");

    assert_eq!(controller.read_words(0x5000, 2)?, words);
    eprintln!(
        "{} bytes sent to the controller",
        panel.get_ref().written().len()
    );
    Ok(())
}
