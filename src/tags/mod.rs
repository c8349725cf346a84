//! Tag extraction for MP3 files.
//!
//! Decoding runs in a fixed order: the header-first tag, then the 128-byte trailer
//! (which only fills fields still unset), then a bitrate-based duration estimate when
//! neither tag declared a length. Each stage can halt on corrupt input without
//! affecting the others, so extraction always produces a record.

mod duration;
mod legacy;
mod modern;
mod picture;

pub use duration::first_frame_bitrate;
pub use picture::{decode_legacy_picture, decode_picture, sniff_mime};

use crate::cursor::DecodeError;
use crate::model::TrackMetadata;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Best-effort record plus the reason each halted stage stopped.
#[derive(Debug, Default)]
pub struct Extraction {
    pub metadata: TrackMetadata,
    pub issues: Vec<DecodeError>,
}

pub fn extract(path: &Path) -> TrackMetadata {
    extract_report(path).metadata
}

pub fn extract_report(path: &Path) -> Extraction {
    let stripped = crate::config::strip_windows_verbatim_prefix(path);
    let opened = File::open(&stripped).and_then(|file| {
        let len = file.metadata()?.len();
        Ok((file, len))
    });
    match opened {
        Ok((file, len)) => extract_from_reader(file, len),
        Err(err) => {
            tracing::debug!("cannot read {}: {err}", stripped.display());
            Extraction {
                metadata: TrackMetadata::default(),
                issues: vec![DecodeError::Unreadable(err)],
            }
        }
    }
}

pub fn extract_from_bytes(bytes: &[u8]) -> Extraction {
    extract_from_reader(Cursor::new(bytes), bytes.len() as u64)
}

pub fn extract_from_reader<R: Read + Seek>(mut reader: R, len: u64) -> Extraction {
    let mut report = Extraction::default();

    let modern = reader
        .seek(SeekFrom::Start(0))
        .map_err(DecodeError::from)
        .and_then(|_| modern::read_modern_tag(&mut reader, &mut report.metadata));
    report.note(modern);

    let legacy = legacy::read_legacy_tag(&mut reader, len, &mut report.metadata);
    report.note(legacy);

    if report.metadata.duration_seconds.is_none() {
        match duration::estimate_duration(&mut reader, len) {
            Ok(seconds) => report.metadata.duration_seconds = seconds,
            Err(err) => report.issues.push(err),
        }
    }

    report
}

impl Extraction {
    fn note(&mut self, stage: Result<(), DecodeError>) {
        if let Err(err) = stage {
            tracing::debug!("tag stage halted: {err}");
            self.issues.push(err);
        }
    }
}

/// Up to four leading characters, all digits.
pub(crate) fn parse_year(value: &str) -> Option<i32> {
    let prefix: String = value.chars().take(4).collect();
    if prefix.is_empty() || !prefix.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// `N` or `N/total`; the leading integer of the first segment.
pub(crate) fn parse_track_number(value: &str) -> Option<u32> {
    let segment = value.split('/').next().unwrap_or_default().trim();
    let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

pub(crate) fn parse_length_ms(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}
