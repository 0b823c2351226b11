//! Configuration file management for asterix-decode.
//!
//! Reads/writes `~/.asterix-decode/config.yaml` with the radar reference
//! position, the track ceiling, and export locations.

use std::path::PathBuf;

use crate::batch::DEFAULT_CEILING_M;
use crate::coord::{Coordinate, RADAR_REFERENCE};
use crate::types::AsterixError;

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub radar: RadarConfig,
    pub tracks: TrackConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarConfig {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackConfig {
    pub ceiling_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Output directory; `None` writes next to each input file.
    pub dir: Option<String>,
    pub database: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            radar: RadarConfig {
                lon: RADAR_REFERENCE.longitude,
                lat: RADAR_REFERENCE.latitude,
            },
            tracks: TrackConfig {
                ceiling_m: DEFAULT_CEILING_M,
            },
            export: ExportConfig {
                dir: None,
                database: "data/asterix.db".into(),
            },
        }
    }
}

impl Config {
    /// Radar site used for the polar → geographic transform.
    pub fn reference(&self) -> Coordinate {
        Coordinate::new(self.radar.lon, self.radar.lat)
    }
}

/// Get the config directory path (`~/.asterix-decode/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".asterix-decode")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.asterix-decode/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    let path = config_file();
    if !path.exists() {
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(text) => parse_config(&text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable config, using defaults");
            Config::default()
        }
    }
}

/// Save config to `~/.asterix-decode/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, AsterixError> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).map_err(|e| AsterixError::Config(e.to_string()))?;

    let path = config_file();
    std::fs::write(&path, serialize_config(config))
        .map_err(|e| AsterixError::Config(e.to_string()))?;

    Ok(path)
}

/// Parse simple YAML-like config text. Unknown keys and unparsable values
/// leave the default in place.
pub fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }
        let Some(section) = current_section.as_deref() else {
            continue;
        };

        match (section, key) {
            ("radar", "lon") => {
                if let Some(v) = parse_float_value(val) {
                    config.radar.lon = v;
                }
            }
            ("radar", "lat") => {
                if let Some(v) = parse_float_value(val) {
                    config.radar.lat = v;
                }
            }
            ("tracks", "ceiling_m") => {
                if let Some(v) = parse_float_value(val) {
                    config.tracks.ceiling_m = v;
                }
            }
            ("export", "dir") => config.export.dir = parse_string_value(val),
            ("export", "database") => {
                if let Some(v) = parse_string_value(val) {
                    config.export.database = v;
                }
            }
            _ => {}
        }
    }

    config
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# asterix-decode configuration".to_string(), String::new()];

    lines.push("radar:".into());
    lines.push(format!("  lon: {}", config.radar.lon));
    lines.push(format!("  lat: {}", config.radar.lat));
    lines.push(String::new());

    lines.push("tracks:".into());
    lines.push(format!("  ceiling_m: {}", config.tracks.ceiling_m));
    lines.push(String::new());

    lines.push("export:".into());
    match &config.export.dir {
        Some(dir) => lines.push(format!("  dir: \"{dir}\"")),
        None => lines.push("  dir: null".into()),
    }
    lines.push(format!("  database: \"{}\"", config.export.database));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
