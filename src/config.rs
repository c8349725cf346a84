use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tunelib";
const SETTINGS_FILE: &str = "settings.json";
const MUSIC_DIR: &str = "music";
const CATALOG_FILE: &str = "library.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LibrarySettings {
    #[serde(default)]
    pub music_dir: Option<PathBuf>,
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

/// Settings with every default and override applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub music_dir: PathBuf,
    pub catalog_path: PathBuf,
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("TUNELIB_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn load_settings() -> Result<LibrarySettings> {
    load_settings_from_path(&settings_path()?)
}

pub fn save_settings(settings: &LibrarySettings) -> Result<()> {
    ensure_config_dir()?;
    let path = settings_path()?;
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn load_settings_from_path(path: &Path) -> Result<LibrarySettings> {
    if !path.exists() {
        return Ok(LibrarySettings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: LibrarySettings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

/// Environment beats the settings file; unset values fall back to the config directory.
pub fn resolve(settings: &LibrarySettings) -> Result<ResolvedSettings> {
    let music_dir = env::var_os("TUNELIB_MUSIC_DIR")
        .map(PathBuf::from)
        .or_else(|| settings.music_dir.clone());
    let catalog_path = env::var_os("TUNELIB_CATALOG")
        .map(PathBuf::from)
        .or_else(|| settings.catalog_path.clone());

    let root = config_root()?;
    Ok(ResolvedSettings {
        music_dir: music_dir.unwrap_or_else(|| root.join(MUSIC_DIR)),
        catalog_path: catalog_path.unwrap_or_else(|| root.join(CATALOG_FILE)),
    })
}

pub fn normalize_path(path: &Path) -> PathBuf {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    strip_windows_verbatim_prefix(&canonical)
}

pub fn strip_windows_verbatim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();

    if let Some(trimmed) = raw.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{trimmed}"));
    }

    if let Some(trimmed) = raw.strip_prefix(r"\\?\") {
        return PathBuf::from(trimmed);
    }

    path.to_path_buf()
}
