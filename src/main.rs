use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tunelib::catalog::SqliteCatalog;
use tunelib::config::{self, ResolvedSettings};
use tunelib::model::{CatalogRecord, TrackFilter};
use tunelib::stats::format_track_length;
use tunelib::{library, tags};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Scan,
    Durations,
    Config,
    Tracks,
    Artists,
    Albums,
    Genres,
    Stats,
    Inspect(PathBuf),
    Artwork(String),
}

#[derive(Debug, Default)]
struct CliArgs {
    music_dir: Option<PathBuf>,
    catalog: Option<PathBuf>,
    json: bool,
    verbose: bool,
    filter: TrackFilter,
    command: Option<Command>,
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    init_logging(args.verbose);

    let Some(command) = args.command.clone() else {
        print_help();
        return Ok(());
    };

    let settings = || resolve_settings(&args);
    match command {
        Command::Scan => {
            let settings = settings()?;
            let mut catalog = SqliteCatalog::open(&settings.catalog_path)?;
            let summary = library::scan_library(&settings.music_dir, &mut catalog)?;
            if args.json {
                return print_json(&summary);
            }
            for path in &summary.added {
                println!("+ {path}");
            }
            println!(
                "{} added, {} removed",
                summary.added.len(),
                summary.removed
            );
        }
        Command::Durations => {
            let settings = settings()?;
            let mut catalog = SqliteCatalog::open(&settings.catalog_path)?;
            let updated = library::refresh_durations(&settings.music_dir, &mut catalog)?;
            if args.json {
                return print_json(&serde_json::json!({ "updated": updated }));
            }
            println!("{updated} durations filled");
        }
        Command::Config => {
            if args.music_dir.is_some() || args.catalog.is_some() {
                let mut stored = config::load_settings()?;
                if let Some(dir) = &args.music_dir {
                    stored.music_dir = Some(config::normalize_path(dir));
                }
                if let Some(path) = &args.catalog {
                    stored.catalog_path = Some(path.clone());
                }
                config::save_settings(&stored)?;
            }
            let settings_file = config::settings_path()?;
            let settings = settings()?;
            if args.json {
                return print_json(&serde_json::json!({
                    "settings_file": settings_file,
                    "music_dir": settings.music_dir,
                    "catalog_path": settings.catalog_path,
                }));
            }
            println!("settings:  {}", settings_file.display());
            println!("music dir: {}", settings.music_dir.display());
            println!("catalog:   {}", settings.catalog_path.display());
        }
        Command::Tracks => {
            let catalog = SqliteCatalog::open(&settings()?.catalog_path)?;
            let tracks = catalog.tracks(&args.filter)?;
            if args.json {
                return print_json(&tracks);
            }
            for track in &tracks {
                println!("{}", track_line(track));
            }
        }
        Command::Artists => {
            let artists = SqliteCatalog::open(&settings()?.catalog_path)?.artists()?;
            if args.json {
                return print_json(&artists);
            }
            for row in &artists {
                println!(
                    "{}  ({} tracks, {} albums)",
                    row.artist.as_deref().unwrap_or("-"),
                    row.track_count,
                    row.album_count
                );
            }
        }
        Command::Albums => {
            let albums = SqliteCatalog::open(&settings()?.catalog_path)?.albums()?;
            if args.json {
                return print_json(&albums);
            }
            for row in &albums {
                let year = row.year.map(|year| format!(" ({year})")).unwrap_or_default();
                println!(
                    "{} - {}{year}  {} tracks",
                    row.artist.as_deref().unwrap_or("-"),
                    row.album.as_deref().unwrap_or("-"),
                    row.track_count
                );
            }
        }
        Command::Genres => {
            let genres = SqliteCatalog::open(&settings()?.catalog_path)?.genres()?;
            if args.json {
                return print_json(&genres);
            }
            for row in &genres {
                println!(
                    "{}  ({} tracks, {} artists)",
                    row.genre, row.track_count, row.artist_count
                );
            }
        }
        Command::Stats => {
            let stats = SqliteCatalog::open(&settings()?.catalog_path)?.stats()?;
            if args.json {
                return print_json(&stats);
            }
            for line in stats.summary_lines() {
                println!("{line}");
            }
        }
        Command::Artwork(path) => {
            let Some(artwork) = library::track_artwork(&settings()?.music_dir, &path) else {
                anyhow::bail!("no artwork found for {path}");
            };
            if args.json {
                return print_json(&serde_json::json!({
                    "mime": artwork.mime,
                    "size": artwork.data.len(),
                    "data_uri": artwork.to_data_uri(),
                }));
            }
            println!("{}", artwork.to_data_uri());
        }
        Command::Inspect(path) => return inspect(&path, args.json),
    }
    Ok(())
}

fn inspect(path: &Path, json: bool) -> Result<()> {
    let report = tags::extract_report(path);
    let issues: Vec<String> = report.issues.iter().map(ToString::to_string).collect();
    let artwork = report
        .metadata
        .artwork
        .as_ref()
        .map(|artwork| (artwork.mime.clone(), artwork.data.len()));

    if json {
        return print_json(&serde_json::json!({
            "metadata": report.metadata,
            "artwork": artwork.map(|(mime, size)| serde_json::json!({ "mime": mime, "size": size })),
            "issues": issues,
        }));
    }

    let metadata = &report.metadata;
    let field = |value: Option<String>| value.unwrap_or_else(|| String::from("-"));
    println!("title:    {}", field(metadata.title.clone()));
    println!("artist:   {}", field(metadata.artist.clone()));
    println!("album:    {}", field(metadata.album.clone()));
    println!("year:     {}", field(metadata.year.map(|year| year.to_string())));
    println!("genre:    {}", field(metadata.genre.clone()));
    println!(
        "track:    {}",
        field(metadata.track_number.map(|number| number.to_string()))
    );
    println!("length:   {}", format_track_length(metadata.duration_seconds));
    println!(
        "artwork:  {}",
        field(artwork.map(|(mime, size)| format!("{mime}, {size} bytes")))
    );
    for issue in issues {
        println!("issue:    {issue}");
    }
    Ok(())
}

fn track_line(track: &CatalogRecord) -> String {
    let number = track
        .track_number
        .map(|number| format!("{number:>2}"))
        .unwrap_or_else(|| String::from(" -"));
    format!(
        "{:>5}  {number}  {} - {} - {}  [{}]",
        track.id,
        track.artist.as_deref().unwrap_or("-"),
        track.album.as_deref().unwrap_or("-"),
        track.title.as_deref().unwrap_or(&track.filename),
        format_track_length(track.duration_seconds)
    )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{json}");
    Ok(())
}

fn resolve_settings(args: &CliArgs) -> Result<ResolvedSettings> {
    let mut settings = config::resolve(&config::load_settings()?)?;
    if let Some(dir) = &args.music_dir {
        settings.music_dir = dir.clone();
    }
    if let Some(path) = &args.catalog {
        settings.catalog_path = path.clone();
    }
    settings.music_dir = config::normalize_path(&settings.music_dir);
    Ok(settings)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TUNELIB_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_args(args: Vec<String>) -> Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--music-dir" => out.music_dir = Some(PathBuf::from(value(&args, &mut index)?)),
            "--catalog" => out.catalog = Some(PathBuf::from(value(&args, &mut index)?)),
            "--json" => out.json = true,
            "-v" | "--verbose" => out.verbose = true,
            "--search" => out.filter.search = Some(value(&args, &mut index)?),
            "--artist" => out.filter.artist = Some(value(&args, &mut index)?),
            "--album" => out.filter.album = Some(value(&args, &mut index)?),
            "--genre" => out.filter.genre = Some(value(&args, &mut index)?),
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other if out.command.is_none() => {
                let command = match other {
                    "scan" => Command::Scan,
                    "durations" => Command::Durations,
                    "config" => Command::Config,
                    "tracks" => Command::Tracks,
                    "artists" => Command::Artists,
                    "albums" => Command::Albums,
                    "genres" => Command::Genres,
                    "stats" => Command::Stats,
                    "inspect" => Command::Inspect(PathBuf::from(value(&args, &mut index)?)),
                    "artwork" => Command::Artwork(value(&args, &mut index)?),
                    _ => anyhow::bail!("unknown argument {other}"),
                };
                out.command = Some(command);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }

    if out.filter != TrackFilter::default() && out.command != Some(Command::Tracks) {
        anyhow::bail!("--search, --artist, --album and --genre only apply to tracks");
    }
    Ok(out)
}

fn value(args: &[String], index: &mut usize) -> Result<String> {
    let flag = &args[*index];
    *index += 1;
    let Some(value) = args.get(*index) else {
        anyhow::bail!("{flag} requires a value");
    };
    if value.trim().is_empty() {
        anyhow::bail!("{flag} cannot be empty");
    }
    Ok(value.trim().to_string())
}

fn print_help() {
    println!("tunelib");
    println!("  scan                 Sync the catalog with the music directory");
    println!("  durations            Fill in missing track durations");
    println!("  config               Show settings; with --music-dir/--catalog, save them");
    println!("  tracks               List tracks (--search Q, --artist A, --album A, --genre G)");
    println!("  artists | albums | genres | stats");
    println!("  inspect FILE         Show tags decoded from any file");
    println!("  artwork PATH         Print a cataloged track's artwork as a data URI");
    println!("  --music-dir DIR      Library root");
    println!("  --catalog FILE       SQLite catalog file");
    println!("  --json               Machine-readable output");
    println!("  -v                   Debug logging");
}
