// Configuration loading and parsing (game.toml, scoring.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::recommend::{ConstraintLimits, ScoreWeights};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub game: GameConfig,
    pub backend: BackendConfig,
    pub weights: ScoreWeights,
    pub limits: ConstraintLimits,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// game.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire game.toml file.
#[derive(Debug, Clone, Deserialize)]
struct GameFile {
    game: GameConfig,
    data: DataPaths,
    backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Candidate count at or below which the engine switches to direct
    /// name confirmations.
    pub final_round_threshold: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub players: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the remote scoring service. Empty string disables it.
    #[serde(default)]
    pub base_url: String,
}

// ---------------------------------------------------------------------------
// scoring.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire scoring.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ScoringFile {
    weights: ScoreWeights,
    limits: ConstraintLimits,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/game.toml` and
/// `config/scoring.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- game.toml (required) ---
    let game_path = config_dir.join("game.toml");
    let game_text = read_file(&game_path)?;
    let game_file: GameFile = toml::from_str(&game_text).map_err(|e| ConfigError::ParseError {
        path: game_path.clone(),
        source: e,
    })?;

    // --- scoring.toml (required) ---
    let scoring_path = config_dir.join("scoring.toml");
    let scoring_text = read_file(&scoring_path)?;
    let scoring_file: ScoringFile =
        toml::from_str(&scoring_text).map_err(|e| ConfigError::ParseError {
            path: scoring_path.clone(),
            source: e,
        })?;

    let config = Config {
        game: game_file.game,
        backend: game_file.backend,
        weights: scoring_file.weights,
        limits: scoring_file.limits,
        data_paths: game_file.data,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        // If config/ also doesn't exist, the app will fail to load config.
        // Return an error with a clear message about the missing defaults directory.
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        // Skip non-files and entries without a file name
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.game.final_round_threshold == 0 {
        return Err(ConfigError::ValidationError {
            field: "game.final_round_threshold".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.data_paths.players.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data.players".into(),
            message: "must not be empty".into(),
        });
    }

    // Score weights must be non-negative and carry some signal
    let w = &config.weights;
    let weight_fields: &[(&str, f64)] = &[
        ("weights.points", w.points),
        ("weights.rebounds", w.rebounds),
        ("weights.assists", w.assists),
        ("weights.steals", w.steals),
        ("weights.blocks", w.blocks),
    ];
    for (name, val) in weight_fields {
        if !val.is_finite() || *val < 0.0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be >= 0, got {val}"),
            });
        }
    }
    let sum: f64 = weight_fields.iter().map(|(_, v)| v).sum();
    if sum <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "weights".into(),
            message: "must not all be zero".into(),
        });
    }

    // Constraint limit sanity
    let l = &config.limits;
    if l.max_budget == 0 {
        return Err(ConfigError::ValidationError {
            field: "limits.max_budget".into(),
            message: "must be greater than 0".into(),
        });
    }
    if l.max_height_in == 0 {
        return Err(ConfigError::ValidationError {
            field: "limits.max_height_in".into(),
            message: "must be greater than 0".into(),
        });
    }
    if l.min_age > l.max_age {
        return Err(ConfigError::ValidationError {
            field: "limits.min_age".into(),
            message: format!(
                "must not exceed limits.max_age ({} > {})",
                l.min_age, l.max_age
            ),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
