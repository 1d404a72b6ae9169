use std::time::Duration;

use crate::exit::{CliError, CliResult};

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Parse a 16-bit value written as `0x`-prefixed hex or decimal.
pub fn parse_u16(what: &str, input: &str) -> CliResult<u16> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| CliError::usage(format!("invalid {what}: {input}")))
}

pub fn parse_address(input: &str) -> CliResult<u16> {
    parse_u16("address", input)
}

pub fn parse_words(inputs: &[String]) -> CliResult<Vec<u16>> {
    inputs.iter().map(|w| parse_u16("word", w)).collect()
}

/// Parse `ADDRESS=VALUE`.
pub fn parse_assignment(input: &str) -> CliResult<(u16, u16)> {
    let (address, value) = input
        .split_once('=')
        .ok_or_else(|| CliError::usage(format!("expected ADDRESS=VALUE, got {input}")))?;
    Ok((parse_address(address)?, parse_u16("word", value)?))
}

/// Parse hex bytes. Whitespace, `:` and `,` separators and `0x` prefixes
/// are accepted.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || c == ':' || c == ',') {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        digits.push_str(token);
    }

    if digits.len() % 2 != 0 {
        return Err(CliError::usage(format!(
            "hex input has an odd number of digits: {input}"
        )));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CliError::usage(format!("invalid hex input: {input}")))
        })
        .collect()
}
