use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Metadata decoded from a single audio file. Every field is optional: `None` means
/// no tag source supplied a usable value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub duration_seconds: Option<u64>,
    #[serde(skip)]
    pub artwork: Option<Artwork>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub mime: String,
    pub data: Vec<u8>,
}

impl Artwork {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }
}

/// A row to be inserted by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrack {
    pub path: String,
    pub filename: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub duration_seconds: Option<u64>,
    pub filesize: u64,
}

/// Minimal projection used by the removal pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i64,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    pub path: String,
    pub filename: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub duration_seconds: Option<u64>,
    pub filesize: u64,
    pub added_at: i64,
    pub play_count: u64,
    pub last_played_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub added: Vec<String>,
    pub removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFilter {
    pub search: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistSummary {
    pub artist: Option<String>,
    pub track_count: u64,
    pub album_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumSummary {
    pub album: Option<String>,
    pub artist: Option<String>,
    pub year: Option<i32>,
    pub track_count: u64,
    pub total_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreSummary {
    pub genre: String,
    pub track_count: u64,
    pub artist_count: u64,
}
