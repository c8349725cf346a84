use crate::catalog::{Catalog, SqliteCatalog};
use crate::model::{Artwork, NewTrack, ScanSummary, TrackFilter};
use crate::tags;
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path};
use walkdir::{DirEntry, WalkDir};

const LIBRARY_EXTENSIONS: &[&str] = &["mp3"];
const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Reconciles `catalog` with the files under `root`.
///
/// Records whose file disappeared are deleted before any new file is inserted, and
/// existing records are never rewritten. A missing root is created and treated as an
/// empty library. Only catalog failures abort the scan.
pub fn scan_library(root: &Path, catalog: &mut dyn Catalog) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();

    if !root.exists() {
        fs::create_dir_all(root)
            .with_context(|| format!("failed to create {}", root.display()))?;
        tracing::info!("created empty library at {}", root.display());
        return Ok(summary);
    }
    if !root.is_dir() {
        anyhow::bail!("library root {} is not a directory", root.display());
    }

    for entry in catalog.list_all()? {
        if !root.join(&entry.path).exists() {
            catalog.delete_by_id(entry.id)?;
            tracing::debug!("removed {} from catalog", entry.path);
            summary.removed += 1;
        }
    }

    let root_name = root.file_name();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                None
            }
        })
    {
        if !entry.file_type().is_file() || !is_library_file(entry.path()) {
            continue;
        }

        let Some(relative) = relative_key(root, entry.path()) else {
            tracing::warn!("skipping non-UTF-8 path {}", entry.path().display());
            continue;
        };
        if catalog.exists(&relative)? {
            continue;
        }

        let track = new_track(&entry, relative, root_name);
        if catalog.insert_if_absent(&track)? {
            tracing::debug!("added {}", track.path);
            summary.added.push(track.path);
        }
    }

    tracing::info!(
        "scan of {} finished: {} added, {} removed",
        root.display(),
        summary.added.len(),
        summary.removed
    );
    Ok(summary)
}

/// Re-reads artwork for a cataloged file; artwork itself is never stored.
pub fn track_artwork(root: &Path, relative_path: &str) -> Option<Artwork> {
    let path = root.join(relative_path);
    if !path.is_file() {
        return None;
    }
    tags::extract(&path).artwork
}

/// Fills durations the catalog does not know yet, for files that have since gained
/// a length frame or a readable frame header. Returns how many records changed.
pub fn refresh_durations(root: &Path, catalog: &mut SqliteCatalog) -> Result<usize> {
    let mut updated = 0;
    for record in catalog.tracks(&TrackFilter::default())? {
        if record.duration_seconds.is_some() {
            continue;
        }
        let path = root.join(&record.path);
        if !path.is_file() {
            continue;
        }
        let Some(seconds) = tags::extract(&path).duration_seconds else {
            continue;
        };
        if catalog.update_duration(record.id, seconds)? {
            tracing::debug!("{} is {seconds}s long", record.path);
            updated += 1;
        }
    }
    tracing::info!("filled {updated} missing durations");
    Ok(updated)
}

fn new_track(entry: &DirEntry, path: String, root_name: Option<&OsStr>) -> NewTrack {
    let file = entry.path();
    let metadata = tags::extract(file);
    let filename = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let filesize = entry.metadata().map(|meta| meta.len()).unwrap_or(0);

    let title = metadata.title.unwrap_or_else(|| filename.clone());
    let artist = metadata
        .artist
        .unwrap_or_else(|| String::from(UNKNOWN_ARTIST));
    let album = metadata
        .album
        .unwrap_or_else(|| folder_album(file, root_name));

    NewTrack {
        path,
        filename,
        title,
        artist,
        album,
        year: metadata.year,
        genre: metadata.genre,
        track_number: metadata.track_number,
        duration_seconds: metadata.duration_seconds,
        filesize,
    }
}

/// The parent folder's name, unless it is named like the library root.
fn folder_album(file: &Path, root_name: Option<&OsStr>) -> String {
    match file.parent().and_then(Path::file_name) {
        Some(parent) if Some(parent) != root_name => parent.to_string_lossy().into_owned(),
        _ => String::from(UNKNOWN_ALBUM),
    }
}

/// Path relative to `root`, `/`-separated regardless of platform.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn is_library_file(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    LIBRARY_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}
