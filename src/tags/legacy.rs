use super::parse_year;
use crate::cursor::{ByteCursor, DecodeError};
use crate::genre;
use crate::model::TrackMetadata;
use crate::text::decode_latin1_field;
use std::io::{Read, Seek, SeekFrom};

pub(crate) const TRAILER_LEN: usize = 128;

/// Reads the fixed trailer from the last 128 bytes of a `len`-byte stream.
pub(crate) fn read_legacy_tag<R: Read + Seek>(
    reader: &mut R,
    len: u64,
    metadata: &mut TrackMetadata,
) -> Result<(), DecodeError> {
    if len < TRAILER_LEN as u64 {
        return Ok(());
    }
    reader.seek(SeekFrom::Start(len - TRAILER_LEN as u64))?;
    let mut trailer = [0u8; TRAILER_LEN];
    reader.read_exact(&mut trailer)?;
    apply_trailer(&trailer, metadata)
}

/// Fills only the fields the header-first tag left unset.
pub(crate) fn apply_trailer(
    trailer: &[u8; TRAILER_LEN],
    metadata: &mut TrackMetadata,
) -> Result<(), DecodeError> {
    let cursor = ByteCursor::new(trailer);
    if cursor.peek_at(0, 3)? != b"TAG" {
        return Ok(());
    }

    let title = decode_latin1_field(cursor.peek_at(3, 30)?);
    let artist = decode_latin1_field(cursor.peek_at(33, 30)?);
    let album = decode_latin1_field(cursor.peek_at(63, 30)?);
    let year = decode_latin1_field(cursor.peek_at(93, 4)?).and_then(|year| parse_year(&year));
    let comment = cursor.peek_at(97, 30)?;
    let genre_index = cursor.peek_at(127, 1)?[0];

    // 1.1 extension: a zero byte followed by the track number at the end of the comment.
    if comment[28] == 0 && comment[29] != 0 {
        fill(&mut metadata.track_number, Some(u32::from(comment[29])));
    }

    fill(&mut metadata.title, title);
    fill(&mut metadata.artist, artist);
    fill(&mut metadata.album, album);
    fill(&mut metadata.year, year);
    fill(
        &mut metadata.genre,
        genre::resolve_index(usize::from(genre_index)).map(String::from),
    );
    Ok(())
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}
