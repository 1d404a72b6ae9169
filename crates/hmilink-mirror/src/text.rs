/// Character encodings for text stored in registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// One byte per character; anything outside ASCII becomes `?`.
    #[default]
    Ascii,
    /// UTF-8.
    Utf8,
    /// UTF-16, big-endian code units.
    Utf16Be,
    /// UTF-16, little-endian code units.
    Utf16Le,
}

impl TextEncoding {
    /// Parse a user-facing encoding name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ascii" => Some(Self::Ascii),
            "utf8" | "utf-8" => Some(Self::Utf8),
            "utf16be" | "utf-16be" | "unicode" => Some(Self::Utf16Be),
            "utf16le" | "utf-16le" => Some(Self::Utf16Le),
            _ => None,
        }
    }
}

/// Encode `text`, truncated to at most `max_len` bytes (rounded down to whole
/// words) without splitting a character, then padded with one zero byte if the
/// result has odd length.
pub fn encode_text(text: &str, encoding: TextEncoding, max_len: usize) -> Vec<u8> {
    let limit = max_len & !1;
    let mut out = Vec::with_capacity(limit.min(text.len() * 2));
    let mut unit = [0u8; 4];

    for ch in text.chars() {
        let encoded: &[u8] = match encoding {
            TextEncoding::Ascii => {
                unit[0] = if ch.is_ascii() { ch as u8 } else { b'?' };
                &unit[..1]
            }
            TextEncoding::Utf8 => ch.encode_utf8(&mut unit).as_bytes(),
            TextEncoding::Utf16Be | TextEncoding::Utf16Le => {
                let mut units = [0u16; 2];
                let units = ch.encode_utf16(&mut units);
                let mut n = 0;
                for u in units.iter() {
                    let bytes = match encoding {
                        TextEncoding::Utf16Le => u.to_le_bytes(),
                        _ => u.to_be_bytes(),
                    };
                    unit[n..n + 2].copy_from_slice(&bytes);
                    n += 2;
                }
                &unit[..n]
            }
        };

        if out.len() + encoded.len() > limit {
            break;
        }
        out.extend_from_slice(encoded);
    }

    if out.len() % 2 != 0 {
        out.push(0);
    }
    out
}

/// Decode `bytes`, dropping trailing zero padding. Invalid sequences decode
/// to U+FFFD.
pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> String {
    let decoded: String = match encoding {
        TextEncoding::Ascii => bytes
            .iter()
            .map(|&b| {
                if b.is_ascii() {
                    char::from(b)
                } else {
                    char::REPLACEMENT_CHARACTER
                }
            })
            .collect(),
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Utf16Be | TextEncoding::Utf16Le => {
            let units = bytes.chunks_exact(2).map(|pair| match encoding {
                TextEncoding::Utf16Le => u16::from_le_bytes([pair[0], pair[1]]),
                _ => u16::from_be_bytes([pair[0], pair[1]]),
            });
            char::decode_utf16(units)
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
    };

    decoded.trim_end_matches('\0').to_string()
}
