use crate::cursor::{ByteCursor, DecodeError};
use std::io::{Read, Seek, SeekFrom};

const SCAN_WINDOW: u64 = 16 * 1024;
const DEFAULT_BITRATE_KBPS: u64 = 128;

/// MPEG-1 Layer III bitrates in kbit/s; 0 marks a free or invalid index.
static BITRATES_KBPS: [u64; 16] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
];

/// Estimates playback length from the first audio frame header found in the
/// first 16 KiB. Returns `None` when no frame sync shows up in that window.
pub(crate) fn estimate_duration<R: Read + Seek>(
    reader: &mut R,
    filesize: u64,
) -> Result<Option<u64>, DecodeError> {
    reader.seek(SeekFrom::Start(0))?;
    let mut window = Vec::new();
    reader.by_ref().take(SCAN_WINDOW).read_to_end(&mut window)?;

    Ok(first_frame_bitrate(&window)
        .map(|kbps| filesize.saturating_mul(8) / (kbps * 1000)))
}

/// Bitrate of the first frame header in `window`, in kbit/s. Reserved bitrate
/// indexes fall back to 128.
pub fn first_frame_bitrate(window: &[u8]) -> Option<u64> {
    let offset = window
        .windows(4)
        .position(|bytes| bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)?;
    let header = ByteCursor::new(window).peek_at(offset, 4).ok()?;
    let word = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let index = ((word >> 12) & 0x0F) as usize;

    Some(
        BITRATES_KBPS
            .get(index)
            .copied()
            .filter(|kbps| *kbps > 0)
            .unwrap_or(DEFAULT_BITRATE_KBPS),
    )
}
