use crate::cursor::{ByteCursor, DecodeError};
use crate::model::Artwork;
use crate::text::{TextEncoding, latin1_to_string};

const MIN_PICTURE_BYTES: usize = 100;
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Decodes an `APIC` body: encoding, MIME type, picture type, description, image bytes.
pub fn decode_picture(payload: &[u8]) -> Result<Artwork, DecodeError> {
    let mut cursor = ByteCursor::new(payload);
    let encoding = TextEncoding::from_byte(cursor.read_u8()?);
    let mime = latin1_to_string(read_terminated(&mut cursor, false)?);
    let _picture_type = cursor.read_u8()?;
    read_terminated(&mut cursor, encoding.is_wide())?;
    finish(mime.trim(), cursor.rest())
}

/// Decodes a version 2.2 `PIC` body, which names a three-letter image format instead
/// of a MIME type.
pub fn decode_legacy_picture(payload: &[u8]) -> Result<Artwork, DecodeError> {
    let mut cursor = ByteCursor::new(payload);
    let encoding = TextEncoding::from_byte(cursor.read_u8()?);
    let format = cursor.read_bytes(3)?;
    let mime = if format.eq_ignore_ascii_case(b"JPG") {
        "image/jpeg"
    } else if format.eq_ignore_ascii_case(b"PNG") {
        "image/png"
    } else {
        ""
    };
    let _picture_type = cursor.read_u8()?;
    read_terminated(&mut cursor, encoding.is_wide())?;
    finish(mime, cursor.rest())
}

pub fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&PNG_SIGNATURE) {
        "image/png"
    } else {
        "image/jpeg"
    }
}

fn finish(mime: &str, data: &[u8]) -> Result<Artwork, DecodeError> {
    if data.len() < MIN_PICTURE_BYTES {
        return Err(DecodeError::Malformed("picture shorter than 100 bytes"));
    }
    let mime = if mime.is_empty() || mime == "image/" {
        sniff_mime(data)
    } else {
        mime
    };
    Ok(Artwork {
        mime: mime.to_string(),
        data: data.to_vec(),
    })
}

/// Consumes a terminated string and its terminator. Wide strings end on an aligned
/// pair of NULs.
fn read_terminated<'a>(cursor: &mut ByteCursor<'a>, wide: bool) -> Result<&'a [u8], DecodeError> {
    let rest = cursor.peek_at(cursor.position(), cursor.remaining())?;
    let found = if wide {
        rest.chunks_exact(2)
            .position(|pair| pair == [0, 0])
            .map(|index| (index * 2, 2))
    } else {
        rest.iter().position(|byte| *byte == 0).map(|index| (index, 1))
    };
    let (len, terminator) = found.ok_or(DecodeError::Malformed("unterminated string"))?;
    let text = cursor.read_bytes(len)?;
    cursor.skip(terminator)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

    fn jpeg(len: usize) -> Vec<u8> {
        let mut data = JPEG_SIGNATURE.to_vec();
        data.resize(len, 0x42);
        data
    }

    fn apic(encoding: u8, mime: &[u8], description: &[u8], image: &[u8]) -> Vec<u8> {
        let mut out = vec![encoding];
        out.extend_from_slice(mime);
        out.push(0);
        out.push(3);
        out.extend_from_slice(description);
        out.extend_from_slice(image);
        out
    }

    #[test]
    fn declared_mime_is_kept() {
        let image = jpeg(150);
        let artwork = decode_picture(&apic(0, b"image/jpeg", b"cover\0", &image)).expect("picture");
        assert_eq!(artwork.mime, "image/jpeg");
        assert_eq!(artwork.data, image);
    }

    #[test]
    fn short_payload_is_rejected() {
        let err = decode_picture(&apic(0, b"image/jpeg", b"\0", &jpeg(50))).expect_err("too small");
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn missing_mime_is_sniffed() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.resize(120, 1);
        let artwork = decode_picture(&apic(3, b"image/", b"\0", &png)).expect("picture");
        assert_eq!(artwork.mime, "image/png");

        let artwork = decode_picture(&apic(3, b"", b"\0", &[7u8; 120])).expect("picture");
        assert_eq!(artwork.mime, "image/jpeg");
    }

    #[test]
    fn wide_description_ends_on_aligned_double_null() {
        // "A" little endian, then the terminator. The unaligned 00 00 at offsets 3 and 4
        // must not end the description early.
        let description = [0xFF, 0xFE, b'A', 0x00, 0x00, 0x00];
        let image = jpeg(128);
        let artwork = decode_picture(&apic(1, b"image/jpeg", &description, &image)).expect("picture");
        assert_eq!(artwork.data, image);
    }

    #[test]
    fn legacy_picture_maps_format() {
        let mut payload = vec![0u8];
        payload.extend_from_slice(b"PNG");
        payload.push(3);
        payload.push(0);
        payload.extend_from_slice(&jpeg(100));
        let artwork = decode_legacy_picture(&payload).expect("picture");
        assert_eq!(artwork.mime, "image/png");
        assert_eq!(artwork.data.len(), 100);
    }

    #[test]
    fn unterminated_mime_is_malformed() {
        assert!(decode_picture(b"\x00image/jpeg").is_err());
        assert!(decode_picture(b"").is_err());
    }
}
