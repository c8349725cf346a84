use super::{parse_length_ms, parse_track_number, parse_year, picture};
use crate::cursor::{ByteCursor, DecodeError};
use crate::genre;
use crate::model::TrackMetadata;
use crate::text::decode_text_frame;
use std::io::Read;

const HEADER_LEN: usize = 10;

#[derive(Debug, Clone, Copy)]
struct FrameLayout {
    id_len: usize,
    header_len: usize,
}

impl FrameLayout {
    fn for_version(major: u8) -> Self {
        if major == 2 {
            Self {
                id_len: 3,
                header_len: 6,
            }
        } else {
            Self {
                id_len: 4,
                header_len: 10,
            }
        }
    }
}

/// Reads the header-first tag from the start of `reader` into `metadata`.
///
/// A missing `ID3` marker is not an error. A short body or a corrupt frame halts the
/// stage and leaves whatever frames were already applied.
pub(crate) fn read_modern_tag<R: Read>(
    reader: &mut R,
    metadata: &mut TrackMetadata,
) -> Result<(), DecodeError> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    reader
        .by_ref()
        .take(HEADER_LEN as u64)
        .read_to_end(&mut header)?;
    if header.len() < HEADER_LEN || !header.starts_with(b"ID3") {
        return Ok(());
    }

    let mut cursor = ByteCursor::new(&header);
    cursor.skip(3)?;
    let major = cursor.read_u8()?;
    let _revision = cursor.read_u8()?;
    let _flags = cursor.read_u8()?;
    let size = cursor.read_syncsafe_u32()? as usize;

    // Grown by what the stream actually holds, not by the declared size.
    let mut body = Vec::new();
    reader.by_ref().take(size as u64).read_to_end(&mut body)?;
    if body.len() < size {
        return Err(DecodeError::Truncated {
            declared: size,
            available: body.len(),
        });
    }

    read_frames(&body, major, metadata)
}

pub(crate) fn read_frames(
    body: &[u8],
    major: u8,
    metadata: &mut TrackMetadata,
) -> Result<(), DecodeError> {
    let layout = FrameLayout::for_version(major);
    let mut cursor = ByteCursor::new(body);

    while cursor.remaining() > layout.header_len {
        let id = cursor.read_bytes(layout.id_len)?;
        if id.iter().all(|byte| *byte == 0) {
            // padding
            return Ok(());
        }
        if !id
            .iter()
            .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit())
        {
            return Err(DecodeError::Malformed("frame identifier"));
        }

        let size = match major {
            2 => cursor.read_u24_be()?,
            3 => cursor.read_u32_be()?,
            _ if major >= 4 => cursor.read_syncsafe_u32()?,
            _ => cursor.read_u32_be()?,
        } as usize;
        if layout.id_len == 4 {
            let _flags = cursor.read_bytes(2)?;
        }

        if size == 0 {
            return Err(DecodeError::Malformed("zero-length frame"));
        }
        if size > cursor.remaining() {
            return Err(DecodeError::Truncated {
                declared: size,
                available: cursor.remaining(),
            });
        }

        let payload = cursor.read_bytes(size)?;
        // Identifier bytes were checked to be ASCII above.
        let id = std::str::from_utf8(id).unwrap_or_default();
        apply_frame(id, payload, metadata);
    }

    Ok(())
}

fn apply_frame(id: &str, payload: &[u8], metadata: &mut TrackMetadata) {
    if id.starts_with('T') {
        if let Some(value) = decode_text_frame(payload) {
            apply_text_frame(id, value, metadata);
        }
        return;
    }

    if metadata.artwork.is_some() {
        return;
    }
    let decoded = match id {
        "APIC" => picture::decode_picture(payload),
        "PIC" => picture::decode_legacy_picture(payload),
        _ => return,
    };
    match decoded {
        Ok(artwork) => metadata.artwork = Some(artwork),
        Err(err) => tracing::debug!("skipping {id} frame: {err}"),
    }
}

fn apply_text_frame(id: &str, value: String, metadata: &mut TrackMetadata) {
    match id {
        "TIT2" | "TT2" => metadata.title = Some(value),
        "TPE1" | "TP1" => metadata.artist = Some(value),
        "TALB" | "TAL" => metadata.album = Some(value),
        "TYER" | "TDRC" | "TYE" => metadata.year = parse_year(&value),
        "TRCK" | "TRK" => metadata.track_number = parse_track_number(&value),
        "TCON" | "TCO" => {
            let genre = genre::resolve_string(&value);
            metadata.genre = (!genre.is_empty()).then_some(genre);
        }
        "TLEN" | "TLE" => metadata.duration_seconds = parse_length_ms(&value).map(|ms| ms / 1000),
        _ => {}
    }
}
