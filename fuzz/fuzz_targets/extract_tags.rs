#![no_main]

use libfuzzer_sys::fuzz_target;
use tunelib::tags;

fuzz_target!(|data: &[u8]| {
    let report = tags::extract_from_bytes(data);
    if let Some(artwork) = &report.metadata.artwork {
        assert!(artwork.data.len() >= 100);
        assert!(!artwork.mime.is_empty());
    }
    if let Some(year) = report.metadata.year {
        assert!((0..=9999).contains(&year));
    }
    for text in [
        &report.metadata.title,
        &report.metadata.artist,
        &report.metadata.album,
        &report.metadata.genre,
    ]
    .into_iter()
    .flatten()
    {
        assert!(!text.is_empty());
        assert_eq!(text.trim(), text);
    }
});
