//! asterix: CLI for decoding ASTERIX radar recordings and exporting
//! landing/departing tracks.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufWriter};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, Table};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use asterix_core::batch::{Batch, BatchStats};
use asterix_core::config::{self, Config};
use asterix_core::export::{export, CAT034_COLUMNS, CAT048_TRACK_COLUMNS};
use asterix_core::tracker::Track;
use asterix_core::types::{address_to_string, Result};
use asterix_core::{get_category, Decoder, DecodedReport, RawMessage};

mod db;
mod sink;

use sink::{CsvSink, TableSink};

/// Suffixes of the datasets written per input file.
const DEPARTING: &str = "take";
const LANDING: &str = "land";
const SERVICE: &str = "cat034";

#[derive(Parser)]
#[command(name = "asterix", version, about = "ASTERIX CAT048/CAT034 decoder and track classifier")]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a recording and print every report
    Decode {
        /// Recording with `<timestamp> <hex>` lines, or `-` for stdin
        file: PathBuf,

        /// Print one JSON object per report instead of a table
        #[arg(long)]
        json: bool,

        /// Only show this category (48 or 34)
        #[arg(long)]
        category: Option<u8>,
    },

    /// Classify tracks per recording and export landing/departing reports
    Tracks {
        /// Recordings or directories of recordings
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Drop tracks whose lowest flight level is above this (metres)
        #[arg(long, env = "ASTERIX_CEILING_M")]
        ceiling: Option<f64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Directory for CSV output (default: next to each recording)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// SQLite database path for `--format sqlite`
        #[arg(long, env = "ASTERIX_DB")]
        db: Option<String>,
    },

    /// Print the category of every message without decoding it
    Category {
        /// Recording with `<timestamp> <hex>` lines, or `-` for stdin
        file: PathBuf,
    },

    /// Show or initialise the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Csv,
    Sqlite,
    Table,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = config::load_config();

    match cli.command {
        Commands::Decode {
            file,
            json,
            category,
        } => cmd_decode(&file, json, category, &config),
        Commands::Tracks {
            paths,
            ceiling,
            format,
            out_dir,
            db,
        } => {
            let ceiling_m = ceiling.unwrap_or(config.tracks.ceiling_m);
            let out_dir = out_dir.or_else(|| config.export.dir.as_ref().map(PathBuf::from));
            let db_path = db.unwrap_or_else(|| config.export.database.clone());
            cmd_tracks(&paths, ceiling_m, format, out_dir, &db_path, &config);
        }
        Commands::Category { file } => cmd_category(&file),
        Commands::Config { action } => cmd_config(action, &config),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

fn open_input(file: &Path) -> io::Result<Box<dyn BufRead>> {
    if file.to_str() == Some("-") {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(io::BufReader::new(File::open(file)?)))
    }
}

fn open_or_exit(file: &Path) -> Box<dyn BufRead> {
    open_input(file).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", file.display());
        std::process::exit(1);
    })
}

/// Files written by `tracks`, never read back as recordings.
fn is_generated_output(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if matches!(ext.as_deref(), Some("csv" | "db" | "xlsx")) {
        return true;
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    [DEPARTING, LANDING, SERVICE]
        .iter()
        .any(|suffix| stem.ends_with(&format!("-{suffix}")))
}

/// Expand directories to their recordings, sorted by name.
fn expand_inputs(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && !is_generated_output(p))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    if path.to_str() == Some("-") {
        return "stdin".into();
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".into())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Where exported datasets go.
enum Target {
    Csv { out_dir: Option<PathBuf> },
    Sqlite(db::Database),
    Table,
}

impl Target {
    /// Write one dataset for `input`. Returns where it went.
    fn write(
        &mut self,
        input: &Path,
        suffix: &str,
        columns: &[&str],
        records: &[&DecodedReport],
    ) -> Result<String> {
        let name = format!("{}-{suffix}", file_stem(input));
        match self {
            Target::Csv { out_dir } => {
                let dir = match out_dir {
                    Some(dir) => dir.clone(),
                    None => input
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from(".")),
                };
                std::fs::create_dir_all(&dir)?;
                let path = dir.join(format!("{name}.csv"));
                let mut sink = CsvSink::new(BufWriter::new(File::create(&path)?));
                export(&mut sink, columns, records.iter().copied())?;
                Ok(path.display().to_string())
            }
            Target::Sqlite(database) => {
                let mut sink = database.sink(&name)?;
                export(&mut sink, columns, records.iter().copied())?;
                Ok(format!("table {}", db::table_name(&name)))
            }
            Target::Table => {
                println!();
                println!("{name}");
                let mut sink = TableSink::new(io::stdout().lock());
                export(&mut sink, columns, records.iter().copied())?;
                Ok("stdout".into())
            }
        }
    }
}

fn track_reports(tracks: &[Track]) -> Vec<&DecodedReport> {
    tracks.iter().flat_map(|t| t.reports.iter()).collect()
}

/// Decode, classify and export one recording.
fn process_file(
    decoder: &Decoder,
    input: &Path,
    ceiling_m: f64,
    target: &mut Target,
) -> Result<(BatchStats, Vec<Track>)> {
    let reader = open_input(input)?;
    let mut batch = Batch::new(decoder);
    let mut service = Vec::new();

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                batch.skip_unreadable(e);
                continue;
            }
        };
        if let Some(report) = batch.push_line(&line) {
            if report.as_cat034().is_some() {
                service.push(report);
            }
        }
    }

    let outcome = batch.finish(ceiling_m);

    {
        let datasets = [
            (DEPARTING, CAT048_TRACK_COLUMNS, track_reports(&outcome.departing)),
            (LANDING, CAT048_TRACK_COLUMNS, track_reports(&outcome.landing)),
            (SERVICE, CAT034_COLUMNS, service.iter().collect()),
        ];
        for (suffix, columns, records) in &datasets {
            if *suffix == SERVICE && records.is_empty() {
                continue;
            }
            let dest = target.write(input, suffix, columns, records)?;
            info!(rows = records.len(), dest = %dest, "exported {suffix}");
        }
    }

    let mut tracks = outcome.departing;
    tracks.extend(outcome.landing);
    Ok((outcome.stats, tracks))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_decode(file: &Path, json: bool, category: Option<u8>, config: &Config) {
    let reader = open_or_exit(file);
    let decoder = Decoder::new(config.reference());
    let mut batch = Batch::new(&decoder);
    let mut reports = Vec::new();

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                batch.skip_unreadable(e);
                continue;
            }
        };
        let Some(report) = batch.decode_line(&line) else {
            continue;
        };
        if category.is_some_and(|c| c != report.category()) {
            continue;
        }
        if json {
            match serde_json::to_string(&report) {
                Ok(text) => println!("{text}"),
                Err(e) => warn!(error = %e, "failed to serialize report"),
            }
        } else {
            reports.push(report);
        }
    }

    let stats = batch.stats();
    if json {
        info!(
            lines = stats.lines,
            decoded = stats.decoded(),
            failed = stats.failed(),
            "decode complete"
        );
        return;
    }

    print_reports(&reports);
    println!();
    println!(
        "Lines: {} read, {} decoded ({} CAT048, {} CAT034), {} unsupported, {} failed",
        stats.lines,
        stats.decoded(),
        stats.decoded_cat048,
        stats.decoded_cat034,
        stats.unsupported,
        stats.failed()
    );
}

fn cmd_tracks(
    paths: &[PathBuf],
    ceiling_m: f64,
    format: ExportFormat,
    out_dir: Option<PathBuf>,
    db_path: &str,
    config: &Config,
) {
    let inputs = expand_inputs(paths).unwrap_or_else(|e| {
        eprintln!("Error reading inputs: {e}");
        std::process::exit(1);
    });
    if inputs.is_empty() {
        eprintln!("No recordings found");
        std::process::exit(1);
    }

    let mut target = match format {
        ExportFormat::Csv => Target::Csv { out_dir },
        ExportFormat::Table => Target::Table,
        ExportFormat::Sqlite => Target::Sqlite(db::Database::open(db_path).unwrap_or_else(|e| {
            eprintln!("Error opening database {db_path}: {e}");
            std::process::exit(1);
        })),
    };

    let decoder = Decoder::new(config.reference());
    let mut failed = 0;
    for input in &inputs {
        info!(file = %input.display(), ceiling_m, "processing recording");
        match process_file(&decoder, input, ceiling_m, &mut target) {
            Ok((stats, tracks)) => {
                println!();
                println!("Recording: {}", input.display());
                println!(
                    "  Lines: {} read, {} decoded, {} failed",
                    stats.lines,
                    stats.decoded(),
                    stats.failed()
                );
                println!(
                    "  Tracks: {} departing, {} landing, {} above {ceiling_m} m",
                    stats.departing, stats.landing, stats.dropped_by_ceiling
                );
                print_tracks(&tracks);
            }
            Err(e) => {
                eprintln!("Error processing {}: {e}", input.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn cmd_category(file: &Path) {
    let reader = open_or_exit(file);
    let mut counts: BTreeMap<u8, u64> = BTreeMap::new();
    let mut unreadable = 0u64;

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                debug!(error = %e, "skipping unreadable line");
                println!("-  {e}");
                unreadable += 1;
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match RawMessage::parse(trimmed).and_then(|raw| Ok((get_category(&raw.payload)?, raw))) {
            Ok((cat, raw)) => {
                println!("{}  CAT{cat:03}", raw.recv_time);
                *counts.entry(cat).or_default() += 1;
            }
            Err(e) => {
                println!("-  {e}");
                unreadable += 1;
            }
        }
    }

    println!();
    let mut table = Table::new();
    table.set_header(vec!["Category", "Messages"]);
    for (cat, count) in &counts {
        table.add_row(vec![Cell::new(format!("CAT{cat:03}")), Cell::new(count)]);
    }
    if unreadable > 0 {
        table.add_row(vec![Cell::new("unreadable"), Cell::new(unreadable)]);
    }
    println!("{table}");
}

fn cmd_config(action: ConfigAction, config: &Config) {
    match action {
        ConfigAction::Show => {
            println!("# {}", config::config_file().display());
            print!("{}", config::serialize_config(config));
        }
        ConfigAction::Init => match config::save_config(&Config::default()) {
            Ok(path) => println!("Wrote {}", path.display()),
            Err(e) => {
                eprintln!("Error writing config: {e}");
                std::process::exit(1);
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn opt_cell<T: std::fmt::Display>(value: Option<T>) -> Cell {
    value.map_or_else(|| Cell::new("-"), Cell::new)
}

fn print_reports(reports: &[DecodedReport]) {
    if reports.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Received", "Cat", "SAC/SIC", "Time", "ICAO", "Callsign", "Track", "FL (m)", "Lon",
        "Lat", "Speed (m/s)", "Hdg", "Msg type", "Sector",
    ]);

    for report in reports {
        let cat048 = report.as_cat048();
        let cat034 = report.as_cat034();
        let (sac, sic) = match (cat048, cat034) {
            (Some(r), _) => (r.sac, r.sic),
            (_, Some(r)) => (r.sac, r.sic),
            _ => (None, None),
        };
        let coord = cat048.and_then(|r| r.coordinate);

        table.add_row(vec![
            Cell::new(report.recv_time.format("%Y-%m-%d %H:%M:%S%.3f")),
            Cell::new(report.category()),
            Cell::new(match (sac, sic) {
                (Some(a), Some(c)) => format!("{a}/{c}"),
                _ => "-".into(),
            }),
            opt_cell(report.time_of_day().map(|t| t.format("%H:%M:%S%.3f"))),
            opt_cell(cat048.and_then(|r| r.aircraft_address).map(address_to_string)),
            opt_cell(cat048.and_then(|r| r.flight_id.as_deref())),
            opt_cell(cat048.and_then(|r| r.track_number)),
            opt_cell(report.flight_level_m().map(|v| format!("{v:.1}"))),
            opt_cell(coord.map(|c| format!("{:.4}", c.longitude))),
            opt_cell(coord.map(|c| format!("{:.4}", c.latitude))),
            opt_cell(cat048.and_then(|r| r.ground_speed_ms).map(|v| format!("{v:.1}"))),
            opt_cell(cat048.and_then(|r| r.heading_deg).map(|v| format!("{v:.1}"))),
            opt_cell(cat034.and_then(|r| r.message_type)),
            opt_cell(cat034.and_then(|r| r.sector_number)),
        ]);
    }

    println!("{table}");
}

fn print_tracks(tracks: &[Track]) {
    if tracks.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ICAO", "Callsign", "Reports", "First", "Last", "Min FL (m)", "Max FL (m)", "Class",
    ]);

    for track in tracks {
        let s = track.summary();
        table.add_row(vec![
            Cell::new(&s.icao),
            Cell::new(&s.flight_id),
            Cell::new(s.reports),
            opt_cell(s.first_time.map(|t| t.format("%H:%M:%S"))),
            opt_cell(s.last_time.map(|t| t.format("%H:%M:%S"))),
            opt_cell(s.min_flight_level_m.map(|v| format!("{v:.1}"))),
            opt_cell(s.max_flight_level_m.map(|v| format!("{v:.1}"))),
            Cell::new(s.class),
        ]);
    }

    println!("{table}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use asterix_core::types::hex_encode;

    /// CAT048 line: time of day, flight level, address 780A3B, callsign "ABC".
    fn cat048_line(tod_secs: u32, fl_raw: u16) -> String {
        let mut body = vec![0x45, 0xC0];
        body.extend_from_slice(&(tod_secs * 128).to_be_bytes()[1..]);
        body.extend_from_slice(&fl_raw.to_be_bytes());
        body.extend_from_slice(&[0x78, 0x0A, 0x3B]);
        body.extend_from_slice(&[0x04, 0x20, 0xC0, 0x00, 0x00, 0x00]);
        let mut buf = vec![0x00, 0x03, 48];
        buf.extend_from_slice(&((3 + body.len()) as u16).to_be_bytes());
        buf.extend_from_slice(&body);
        format!("20200801:{tod_secs}.0 {}", hex_encode(&buf))
    }

    #[test]
    fn test_is_generated_output() {
        assert!(is_generated_output(Path::new("rec-take.txt")));
        assert!(is_generated_output(Path::new("rec-land")));
        assert!(is_generated_output(Path::new("dir/rec-cat034.csv")));
        assert!(is_generated_output(Path::new("out.DB")));
        assert!(is_generated_output(Path::new("sheet.xlsx")));
        assert!(!is_generated_output(Path::new("20200801.txt")));
        assert!(!is_generated_output(Path::new("takeoff.txt")));
    }

    #[test]
    fn test_expand_inputs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "a-take.csv", "a-land.csv", "tracks.db"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let single = dir.path().join("single.txt");

        let files = expand_inputs(&[dir.path().to_path_buf(), single.clone()]).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("b.txt"), single]
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("-")), "stdin");
        assert_eq!(file_stem(Path::new("/data/20200801.txt")), "20200801");
    }

    #[test]
    fn test_process_file_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rec.txt");
        let text = [
            cat048_line(10, 400),
            "20200801:11.0 0003300040D5".to_string(),
            cat048_line(20, 40),
            "20200801:12.0 00032200054002".to_string(),
        ]
        .join("\n");
        std::fs::write(&input, text).unwrap();

        let out = dir.path().join("out");
        let mut target = Target::Csv {
            out_dir: Some(out.clone()),
        };
        let decoder = Decoder::default();
        let (stats, tracks) = process_file(&decoder, &input, 2000.0, &mut target).unwrap();

        assert_eq!(stats.truncated, 1);
        assert_eq!(stats.landing, 1);
        assert_eq!(tracks.len(), 1);

        let land = std::fs::read_to_string(out.join("rec-land.csv")).unwrap();
        let lines: Vec<&str> = land.lines().collect();
        assert_eq!(lines[0], CAT048_TRACK_COLUMNS.join(","));
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("48,,,00:00:10.000000,,,3048,780A3B,ABC"));

        let take = std::fs::read_to_string(out.join("rec-take.csv")).unwrap();
        assert_eq!(take.lines().count(), 1);

        let service = std::fs::read_to_string(out.join("rec-cat034.csv")).unwrap();
        assert_eq!(service.lines().count(), 2);
    }

    #[test]
    fn test_process_file_counts_unreadable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rec.txt");
        let mut bytes = cat048_line(10, 400).into_bytes();
        bytes.extend_from_slice(b"\n20200801:11.0 \xFF\xFE\n");
        bytes.extend_from_slice(cat048_line(20, 40).as_bytes());
        std::fs::write(&input, bytes).unwrap();

        let mut target = Target::Csv {
            out_dir: Some(dir.path().join("out")),
        };
        let decoder = Decoder::default();
        let (stats, tracks) = process_file(&decoder, &input, 2000.0, &mut target).unwrap();

        assert_eq!(stats.lines, 3);
        assert_eq!(stats.malformed_line, 1);
        assert_eq!(stats.decoded_cat048, 2);
        assert_eq!(stats.landing, 1);
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn test_process_file_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rec.txt");
        std::fs::write(&input, cat048_line(10, 40) + "\n" + &cat048_line(20, 400)).unwrap();

        let mut target = Target::Sqlite(db::Database::open_memory().unwrap());
        let decoder = Decoder::default();
        let (stats, _) = process_file(&decoder, &input, 2000.0, &mut target).unwrap();
        assert_eq!(stats.departing, 1);

        let Target::Sqlite(database) = target else {
            panic!("target changed");
        };
        assert_eq!(database.count_rows("rec-take").unwrap(), 2);
        assert_eq!(database.count_rows("rec-land").unwrap(), 0);
        assert!(database.count_rows("rec-cat034").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "asterix", "tracks", "a.txt", "b", "--format", "sqlite", "--ceiling", "1500",
        ])
        .unwrap();
        match cli.command {
            Commands::Tracks {
                paths,
                ceiling,
                format,
                ..
            } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(ceiling, Some(1500.0));
                assert_eq!(format, ExportFormat::Sqlite);
            }
            _ => panic!("expected tracks"),
        }
    }
}
