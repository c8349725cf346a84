use std::fs;
use tempfile::tempdir;
use tunelib::cursor::DecodeError;
use tunelib::model::TrackMetadata;
use tunelib::tags::{self, extract_from_bytes};

struct TagBuilder {
    major: u8,
    frames: Vec<u8>,
}

impl TagBuilder {
    fn new(major: u8) -> Self {
        Self {
            major,
            frames: Vec::new(),
        }
    }

    fn frame(mut self, id: &[u8; 4], payload: &[u8]) -> Self {
        let size = payload.len() as u32;
        self.frames.extend_from_slice(id);
        if self.major >= 4 {
            self.frames.extend_from_slice(&syncsafe(size));
        } else {
            self.frames.extend_from_slice(&size.to_be_bytes());
        }
        self.frames.extend_from_slice(&[0, 0]);
        self.frames.extend_from_slice(payload);
        self
    }

    fn text(self, id: &[u8; 4], value: &str) -> Self {
        let mut payload = vec![3u8];
        payload.extend_from_slice(value.as_bytes());
        self.frame(id, &payload)
    }

    fn padding(mut self, len: usize) -> Self {
        self.frames.extend(std::iter::repeat_n(0u8, len));
        self
    }

    fn build(self) -> Vec<u8> {
        let mut out = vec![b'I', b'D', b'3', self.major, 0, 0];
        out.extend_from_slice(&syncsafe(self.frames.len() as u32));
        out.extend(self.frames);
        out
    }
}

fn syncsafe(value: u32) -> [u8; 4] {
    [
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ]
}

fn trailer(title: &str, artist: &str, album: &str, year: &str, track: u8, genre: u8) -> Vec<u8> {
    let mut out = vec![0u8; 128];
    out[..3].copy_from_slice(b"TAG");
    for (offset, width, value) in [
        (3, 30, title),
        (33, 30, artist),
        (63, 30, album),
        (93, 4, year),
    ] {
        let bytes = value.as_bytes();
        let len = bytes.len().min(width);
        out[offset..offset + len].copy_from_slice(&bytes[..len]);
    }
    out[97 + 29] = track;
    out[127] = genre;
    out
}

fn jpeg(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(len, 0x10);
    data
}

fn apic(mime: &str, image: &[u8]) -> Vec<u8> {
    let mut payload = vec![0u8];
    payload.extend_from_slice(mime.as_bytes());
    payload.push(0);
    payload.push(3);
    payload.extend_from_slice(b"cover\0");
    payload.extend_from_slice(image);
    payload
}

#[test]
fn legacy_only_file_reads_trailer_fields() {
    let mut bytes = vec![0x00; 300];
    bytes.extend(trailer("  Old Title ", "Old Artist", "Old Album", "1988", 9, 17));

    let metadata = extract_from_bytes(&bytes).metadata;
    assert_eq!(metadata.title.as_deref(), Some("Old Title"));
    assert_eq!(metadata.artist.as_deref(), Some("Old Artist"));
    assert_eq!(metadata.album.as_deref(), Some("Old Album"));
    assert_eq!(metadata.year, Some(1988));
    assert_eq!(metadata.track_number, Some(9));
    assert_eq!(metadata.genre.as_deref(), Some("Rock"));
}

#[test]
fn modern_values_win_over_legacy_ones() {
    let mut bytes = TagBuilder::new(3)
        .text(b"TIT2", "New Title")
        .text(b"TCON", "(8)")
        .padding(32)
        .build();
    bytes.extend(vec![0x00; 200]);
    bytes.extend(trailer("Old Title", "Old Artist", "", "19xx", 0, 255));

    let report = extract_from_bytes(&bytes);
    assert!(report.issues.is_empty());
    let metadata = report.metadata;
    assert_eq!(metadata.title.as_deref(), Some("New Title"));
    assert_eq!(metadata.genre.as_deref(), Some("Jazz"));
    assert_eq!(metadata.artist.as_deref(), Some("Old Artist"));
    assert_eq!(metadata.album, None);
    assert_eq!(metadata.year, None);
    assert_eq!(metadata.track_number, None);
}

#[test]
fn blank_modern_frame_leaves_room_for_legacy_value() {
    let mut bytes = TagBuilder::new(4).text(b"TPE1", "   ").build();
    bytes.extend(trailer("", "Trailer Artist", "", "", 0, 255));

    let metadata = extract_from_bytes(&bytes).metadata;
    assert_eq!(metadata.artist.as_deref(), Some("Trailer Artist"));
}

#[test]
fn version_four_uses_syncsafe_frame_sizes() {
    let long_title = "x".repeat(200);
    let bytes = TagBuilder::new(4)
        .text(b"TIT2", &long_title)
        .text(b"TRCK", "11/12")
        .build();

    let metadata = extract_from_bytes(&bytes).metadata;
    assert_eq!(metadata.title.as_deref(), Some(long_title.as_str()));
    assert_eq!(metadata.track_number, Some(11));
}

#[test]
fn utf16_text_frames_decode() {
    let mut payload = vec![1u8, 0xFF, 0xFE];
    for unit in "Café".encode_utf16() {
        payload.extend_from_slice(&unit.to_le_bytes());
    }
    payload.extend_from_slice(&[0, 0]);
    let bytes = TagBuilder::new(3).frame(b"TALB", &payload).build();

    let metadata = extract_from_bytes(&bytes).metadata;
    assert_eq!(metadata.album.as_deref(), Some("Café"));
}

#[test]
fn picture_round_trips_and_small_pictures_are_dropped() {
    let image = jpeg(150);
    let bytes = TagBuilder::new(3)
        .frame(b"APIC", &apic("image/jpeg", &image))
        .build();
    let artwork = extract_from_bytes(&bytes).metadata.artwork.expect("artwork");
    assert_eq!(artwork.mime, "image/jpeg");
    assert_eq!(artwork.data, image);

    let bytes = TagBuilder::new(3)
        .frame(b"APIC", &apic("image/jpeg", &jpeg(50)))
        .build();
    assert_eq!(extract_from_bytes(&bytes).metadata.artwork, None);
}

#[test]
fn unknown_picture_mime_is_sniffed() {
    let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    png.resize(120, 0);
    let bytes = TagBuilder::new(3).frame(b"APIC", &apic("image/", &png)).build();
    let artwork = extract_from_bytes(&bytes).metadata.artwork.expect("artwork");
    assert_eq!(artwork.mime, "image/png");
}

#[test]
fn no_frame_sync_means_no_duration() {
    let metadata = extract_from_bytes(&vec![0x20; 32 * 1024]).metadata;
    assert_eq!(metadata.duration_seconds, None);
}

#[test]
fn duration_is_estimated_from_first_frame() {
    // 128 kbit/s header after some leading junk.
    let mut bytes = vec![0x00; 100];
    bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    bytes.resize(160_000, 0x00);

    let metadata = extract_from_bytes(&bytes).metadata;
    assert_eq!(metadata.duration_seconds, Some(10));
}

#[test]
fn declared_length_beats_estimate() {
    let mut bytes = TagBuilder::new(3).text(b"TLEN", "61500").build();
    bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    bytes.resize(160_000, 0x00);

    let metadata = extract_from_bytes(&bytes).metadata;
    assert_eq!(metadata.duration_seconds, Some(61));
}

#[test]
fn truncated_tag_keeps_legacy_and_reports_issue() {
    let mut bytes = TagBuilder::new(3).text(b"TIT2", "Lost").build();
    // Claim a far larger tag than the file holds.
    bytes[6..10].copy_from_slice(&syncsafe(1 << 20));
    bytes.extend(vec![0x00; 200]);
    bytes.extend(trailer("Kept", "", "", "", 0, 255));

    let report = extract_from_bytes(&bytes);
    assert_eq!(report.metadata.title.as_deref(), Some("Kept"));
    assert!(matches!(
        report.issues.as_slice(),
        [DecodeError::Truncated { .. }]
    ));
}

#[test]
fn corrupt_frame_keeps_earlier_frames() {
    let bytes = TagBuilder::new(3)
        .text(b"TIT2", "First")
        .frame(b"tit2", b"\x00bad")
        .text(b"TPE1", "Never")
        .build();

    let report = extract_from_bytes(&bytes);
    assert_eq!(report.metadata.title.as_deref(), Some("First"));
    assert_eq!(report.metadata.artist, None);
    assert!(matches!(
        report.issues.as_slice(),
        [DecodeError::Malformed(_)]
    ));
}

#[test]
fn version_two_two_frames_decode() {
    let mut frames = Vec::new();
    for (id, value) in [(b"TT2", "Short Title"), (b"TP1", "Short Artist")] {
        frames.extend_from_slice(id);
        let size = (value.len() + 1) as u32;
        frames.extend_from_slice(&size.to_be_bytes()[1..]);
        frames.push(0);
        frames.extend_from_slice(value.as_bytes());
    }
    let mut bytes = vec![b'I', b'D', b'3', 2, 0, 0];
    bytes.extend_from_slice(&syncsafe(frames.len() as u32));
    bytes.extend(frames);

    let metadata = extract_from_bytes(&bytes).metadata;
    assert_eq!(metadata.title.as_deref(), Some("Short Title"));
    assert_eq!(metadata.artist.as_deref(), Some("Short Artist"));
}

#[test]
fn extraction_from_disk_matches_bytes() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("song.mp3");
    let mut bytes = TagBuilder::new(3).text(b"TIT2", "Disk").build();
    bytes.extend(trailer("", "Disk Artist", "", "2020", 2, 0));
    fs::write(&path, &bytes).expect("write");

    let from_disk = tags::extract(&path);
    assert_eq!(from_disk, extract_from_bytes(&bytes).metadata);
    assert_eq!(from_disk.title.as_deref(), Some("Disk"));
    assert_eq!(from_disk.year, Some(2020));
    assert_eq!(from_disk.genre.as_deref(), Some("Blues"));
}

#[test]
fn unreadable_path_gives_empty_record() {
    let dir = tempdir().expect("tempdir");
    let report = tags::extract_report(&dir.path().join("absent.mp3"));
    assert_eq!(report.metadata, TrackMetadata::default());
    assert!(matches!(
        report.issues.as_slice(),
        [DecodeError::Unreadable(_)]
    ));
}

proptest::proptest! {
    #[test]
    fn garbage_after_valid_header_never_panics(
        tail in proptest::collection::vec(proptest::num::u8::ANY, 0..2048),
        major in 2u8..=4,
    ) {
        let mut bytes = vec![b'I', b'D', b'3', major, 0, 0];
        bytes.extend_from_slice(&syncsafe(tail.len() as u32));
        bytes.extend(tail);
        let report = extract_from_bytes(&bytes);
        if let Some(title) = report.metadata.title {
            proptest::prop_assert!(!title.is_empty());
        }
    }

    #[test]
    fn legacy_title_is_trimmed(title in "[A-Za-z0-9 ]{0,30}") {
        let mut bytes = vec![0u8; 10];
        bytes.extend(trailer(&title, "", "", "", 0, 255));
        let metadata = extract_from_bytes(&bytes).metadata;
        let expected = title.trim();
        if expected.is_empty() {
            proptest::prop_assert_eq!(metadata.title, None);
        } else {
            proptest::prop_assert_eq!(metadata.title.as_deref(), Some(expected));
        }
    }
}
