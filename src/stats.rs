use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub total_tracks: u64,
    pub total_size: u64,
    pub total_plays: u64,
    pub total_duration: u64,
    pub total_artists: u64,
    pub total_albums: u64,
    pub total_genres: u64,
}

impl LibraryStats {
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Tracks:   {}", self.total_tracks),
            format!("Artists:  {}", self.total_artists),
            format!("Albums:   {}", self.total_albums),
            format!("Genres:   {}", self.total_genres),
            format!("Duration: {}", format_duration(self.total_duration)),
            format!("Size:     {}", format_bytes(self.total_size)),
            format!("Plays:    {}", self.total_plays),
        ]
    }
}

/// `1h 5m` style; sub-minute remainders are dropped.
pub fn format_duration(total_seconds: u64) -> String {
    if total_seconds == 0 {
        return String::from("0m");
    }
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// `m:ss` for a single track.
pub fn format_track_length(seconds: Option<u64>) -> String {
    seconds
        .map(|seconds| format!("{}:{:02}", seconds / 60, seconds % 60))
        .unwrap_or_else(|| String::from("--:--"))
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "0m");
        assert_eq!(format_duration(59), "0m");
        assert_eq!(format_duration(125), "2m");
        assert_eq!(format_duration(3_900), "1h 5m");
    }

    #[test]
    fn track_lengths() {
        assert_eq!(format_track_length(Some(65)), "1:05");
        assert_eq!(format_track_length(None), "--:--");
    }

    #[test]
    fn byte_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 * 1024), "3072 GB");
    }
}
