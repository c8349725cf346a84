#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Latin1,
    Utf16Bom,
    Utf16Be,
    Utf8,
}

impl TextEncoding {
    /// Unknown encoding bytes fall back to Latin-1.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Self::Utf16Bom,
            2 => Self::Utf16Be,
            3 => Self::Utf8,
            _ => Self::Latin1,
        }
    }

    pub fn is_wide(self) -> bool {
        matches!(self, Self::Utf16Bom | Self::Utf16Be)
    }
}

/// Decodes a tag text payload, removes every NUL and trims surrounding whitespace.
///
/// Single-byte payloads are kept as UTF-8 when they already are valid UTF-8 and
/// reinterpreted as Latin-1 otherwise, so this never fails.
pub fn decode_text(encoding: TextEncoding, bytes: &[u8]) -> String {
    match encoding {
        TextEncoding::Utf16Bom => normalize(&decode_utf16_with_bom(bytes)),
        TextEncoding::Utf16Be => normalize(&decode_utf16(bytes, true)),
        TextEncoding::Latin1 | TextEncoding::Utf8 => {
            let stripped: Vec<u8> = bytes.iter().copied().filter(|byte| *byte != 0).collect();
            let text = match String::from_utf8(stripped) {
                Ok(text) => text,
                Err(err) => latin1_to_string(err.as_bytes()),
            };
            text.trim().to_string()
        }
    }
}

/// A text frame body: one encoding byte followed by the encoded text.
/// Blank results count as absent.
pub fn decode_text_frame(payload: &[u8]) -> Option<String> {
    let (&encoding, text) = payload.split_first()?;
    if text.is_empty() {
        return None;
    }
    non_empty(decode_text(TextEncoding::from_byte(encoding), text))
}

/// Fixed-width single-byte field, as found in the legacy trailer.
pub fn decode_latin1_field(bytes: &[u8]) -> Option<String> {
    non_empty(decode_text(TextEncoding::Latin1, bytes))
}

pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| char::from(*byte)).collect()
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn normalize(text: &str) -> String {
    text.replace('\0', "").trim().to_string()
}

fn decode_utf16_with_bom(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, true),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, false),
        _ => decode_utf16(bytes, true),
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}
