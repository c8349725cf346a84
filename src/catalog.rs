use crate::model::{
    AlbumSummary, ArtistSummary, CatalogEntry, CatalogRecord, GenreSummary, NewTrack, TrackFilter,
};
use crate::stats::LibraryStats;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::fs;
use std::path::Path;
use time::OffsetDateTime;

/// Operations the scanner needs from a persistent track store.
pub trait Catalog {
    fn exists(&self, path: &str) -> Result<bool>;

    /// Inserts unless a record with the same path is present. Returns whether a row
    /// was created.
    fn insert_if_absent(&mut self, track: &NewTrack) -> Result<bool>;

    fn delete_by_id(&mut self, id: i64) -> Result<()>;

    fn list_all(&self) -> Result<Vec<CatalogEntry>>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tracks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT UNIQUE NOT NULL,
        filename TEXT NOT NULL,
        title TEXT,
        artist TEXT,
        album TEXT,
        year INTEGER,
        genre TEXT,
        track_number INTEGER,
        duration INTEGER,
        filesize INTEGER NOT NULL DEFAULT 0,
        added_at INTEGER NOT NULL,
        play_count INTEGER NOT NULL DEFAULT 0,
        last_played_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_tracks_artist ON tracks(artist);
    CREATE INDEX IF NOT EXISTS idx_tracks_album ON tracks(album);
    CREATE INDEX IF NOT EXISTS idx_tracks_genre ON tracks(genre);
    CREATE INDEX IF NOT EXISTS idx_tracks_year ON tracks(year);
";

const RECORD_COLUMNS: &str = "id, path, filename, title, artist, album, year, genre, \
     track_number, duration, filesize, added_at, play_count, last_played_at";

pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open catalog {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory catalog")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("failed to initialize catalog schema")?;
        Ok(Self { conn })
    }

    pub fn track(&self, id: i64) -> Result<Option<CatalogRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM tracks WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], record_from_row)
            .optional()
            .with_context(|| format!("failed to load track {id}"))
    }

    pub fn track_by_path(&self, path: &str) -> Result<Option<CatalogRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM tracks WHERE path = ?1");
        self.conn
            .query_row(&sql, params![path], record_from_row)
            .optional()
            .with_context(|| format!("failed to load track {path}"))
    }

    pub fn tracks(&self, filter: &TrackFilter) -> Result<Vec<CatalogRecord>> {
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(search) = filter.search.as_deref().filter(|search| !search.is_empty()) {
            values.push(format!("%{search}%"));
            let n = values.len();
            conditions.push(format!(
                "(title LIKE ?{n} OR artist LIKE ?{n} OR album LIKE ?{n} \
                 OR genre LIKE ?{n} OR CAST(year AS TEXT) LIKE ?{n})"
            ));
        }
        for (column, value) in [
            ("artist", &filter.artist),
            ("album", &filter.album),
            ("genre", &filter.genre),
        ] {
            if let Some(value) = value {
                values.push(value.clone());
                conditions.push(format!("{column} = ?{}", values.len()));
            }
        }

        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM tracks");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY artist, album, track_number, title");

        let mut stmt = self.conn.prepare(&sql).context("failed to prepare track query")?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), record_from_row)
            .context("failed to query tracks")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read tracks")
    }

    pub fn artists(&self) -> Result<Vec<ArtistSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT artist, COUNT(*), COUNT(DISTINCT album)
             FROM tracks GROUP BY artist ORDER BY artist",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ArtistSummary {
                artist: row.get(0)?,
                track_count: row.get(1)?,
                album_count: row.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to list artists")
    }

    pub fn albums(&self) -> Result<Vec<AlbumSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT album, artist, MAX(year), COUNT(*), COALESCE(SUM(duration), 0)
             FROM tracks GROUP BY album, artist ORDER BY artist, MAX(year), album",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AlbumSummary {
                album: row.get(0)?,
                artist: row.get(1)?,
                year: row.get(2)?,
                track_count: row.get(3)?,
                total_duration: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to list albums")
    }

    pub fn genres(&self) -> Result<Vec<GenreSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT genre, COUNT(*), COUNT(DISTINCT artist)
             FROM tracks WHERE genre IS NOT NULL AND genre != ''
             GROUP BY genre ORDER BY genre",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(GenreSummary {
                genre: row.get(0)?,
                track_count: row.get(1)?,
                artist_count: row.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to list genres")
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        self.conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(filesize), 0), COALESCE(SUM(play_count), 0),
                        COALESCE(SUM(duration), 0), COUNT(DISTINCT artist),
                        COUNT(DISTINCT album), COUNT(DISTINCT genre)
                 FROM tracks",
                [],
                |row| {
                    Ok(LibraryStats {
                        total_tracks: row.get(0)?,
                        total_size: row.get(1)?,
                        total_plays: row.get(2)?,
                        total_duration: row.get(3)?,
                        total_artists: row.get(4)?,
                        total_albums: row.get(5)?,
                        total_genres: row.get(6)?,
                    })
                },
            )
            .context("failed to compute library stats")
    }

    /// Replaces an estimated duration once the real one is known.
    pub fn update_duration(&mut self, id: i64, seconds: u64) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE tracks SET duration = ?1 WHERE id = ?2",
                params![seconds, id],
            )
            .with_context(|| format!("failed to update duration of track {id}"))?;
        Ok(changed > 0)
    }
}

impl Catalog for SqliteCatalog {
    fn exists(&self, path: &str) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM tracks WHERE path = ?1)",
                params![path],
                |row| row.get(0),
            )
            .with_context(|| format!("failed to look up {path}"))
    }

    fn insert_if_absent(&mut self, track: &NewTrack) -> Result<bool> {
        let added_at = OffsetDateTime::now_utc().unix_timestamp();
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO tracks
                    (path, filename, title, artist, album, year, genre, track_number,
                     duration, filesize, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    track.path,
                    track.filename,
                    track.title,
                    track.artist,
                    track.album,
                    track.year,
                    track.genre,
                    track.track_number,
                    track.duration_seconds,
                    track.filesize,
                    added_at,
                ],
            )
            .with_context(|| format!("failed to insert {}", track.path))?;
        Ok(inserted > 0)
    }

    fn delete_by_id(&mut self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM tracks WHERE id = ?1", params![id])
            .with_context(|| format!("failed to delete track {id}"))?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<CatalogEntry>> {
        let mut stmt = self.conn.prepare("SELECT id, path FROM tracks ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(CatalogEntry {
                id: row.get(0)?,
                path: row.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to list catalog")
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogRecord> {
    Ok(CatalogRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        filename: row.get(2)?,
        title: row.get(3)?,
        artist: row.get(4)?,
        album: row.get(5)?,
        year: row.get(6)?,
        genre: row.get(7)?,
        track_number: row.get(8)?,
        duration_seconds: row.get(9)?,
        filesize: row.get(10)?,
        added_at: row.get(11)?,
        play_count: row.get(12)?,
        last_played_at: row.get(13)?,
    })
}
