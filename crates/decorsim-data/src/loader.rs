//! Format detection, file discovery and deserialization of the simulation
//! configuration.

use std::path::{Path, PathBuf};

use decorsim_core::config::SimConfig;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Base name of the configuration file inside a config directory.
pub const CONFIG_BASE_NAME: &str = "decorsim";

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look for `{base_name}.ron`, `.toml` and `.json` in `dir`. More than one
/// match is an error.
pub fn find_config_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, ConfigError> {
    let mut found: Option<PathBuf> = None;
    for format in Format::ALL {
        let candidate = dir.join(format!("{base_name}.{}", format.extension()));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(ConfigError::ConflictingFormats { a: existing, b: candidate });
            }
            found = Some(candidate);
        }
    }
    Ok(found)
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `file` is only used for error
/// messages.
pub fn parse<T: DeserializeOwned>(content: &str, format: Format, file: &Path) -> Result<T, ConfigError> {
    let parse_error = |detail: String| ConfigError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse(&content, format, path)
}

/// Load and validate the configuration in `path`.
pub fn load_config(path: &Path) -> Result<SimConfig, ConfigError> {
    let config: SimConfig = deserialize_file(path)?;
    info!(file = %path.display(), "configuration loaded");
    Ok(config.validated())
}

/// Load `decorsim.{ron,toml,json}` from `dir`, or the defaults when there is
/// none.
pub fn load_config_dir(dir: &Path) -> Result<SimConfig, ConfigError> {
    match find_config_file(dir, CONFIG_BASE_NAME)? {
        Some(path) => load_config(&path),
        None => {
            debug!(dir = %dir.display(), "no configuration file, using defaults");
            Ok(SimConfig::default().validated())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("decorsim_data_test_{suffix}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn detect_formats() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("a.yaml")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("a")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config: SimConfig = parse(
            "(freezer: (consumption: 200), solar_panel: (peak_production: 100))",
            Format::Ron,
            Path::new("inline.ron"),
        )
        .unwrap();
        assert_eq!(config.freezer.consumption, 200);
        assert_eq!(config.freezer.cooldown_rate, 2);
        assert_eq!(config.solar_panel.peak_production, 100);
        assert_eq!(config.solar_panel.capacity, 64_000);
    }

    #[test]
    fn toml_sections() {
        let config: SimConfig = parse(
            "[tree_cutter]\nrequires_power = true\nboost_energy = 128\n\n[pipe_valve]\nmax_flow = 250\n",
            Format::Toml,
            Path::new("inline.toml"),
        )
        .unwrap();
        assert!(config.tree_cutter.requires_power);
        assert_eq!(config.tree_cutter.boost_energy, 128);
        assert_eq!(config.pipe_valve.max_flow, 250);
        assert_eq!(config.pipe_valve.redstone_slope, 20);
    }

    #[test]
    fn json_with_explicit_reheat() {
        let config: SimConfig = parse(
            r#"{"freezer": {"tick_interval": 1, "reheat_rate": 3}}"#,
            Format::Json,
            Path::new("inline.json"),
        )
        .unwrap();
        assert_eq!(config.freezer.tick_interval, 1);
        assert_eq!(config.freezer.reheat_rate(), 3);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let result: Result<SimConfig, _> = parse("{ not json", Format::Json, Path::new("broken.json"));
        match result {
            Err(ConfigError::Parse { file, .. }) => assert_eq!(file, PathBuf::from("broken.json")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_config_clamps_values() {
        let dir = make_test_dir("clamp");
        let path = dir.join("decorsim.toml");
        fs::write(&path, "[freezer]\nconsumption = 1\ncooldown_rate = 50\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.freezer.consumption, 8);
        assert_eq!(config.freezer.cooldown_rate, 5);

        cleanup(&dir);
    }

    #[test]
    fn load_config_dir_defaults_when_missing() {
        let dir = make_test_dir("missing");
        assert_eq!(load_config_dir(&dir).unwrap(), SimConfig::default().validated());
        cleanup(&dir);
    }

    #[test]
    fn load_config_dir_rejects_conflicts() {
        let dir = make_test_dir("conflict");
        fs::write(dir.join("decorsim.ron"), "()").unwrap();
        fs::write(dir.join("decorsim.json"), "{}").unwrap();
        assert!(matches!(
            load_config_dir(&dir),
            Err(ConfigError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_config(Path::new("/nonexistent/decorsim.ron"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
