// Configuration loading and parsing (config/selection.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::squad::player::{Credits, Role};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

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
// Constraint configuration
// ---------------------------------------------------------------------------

/// Per-role selection quotas. TOML keys use the short role codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoleQuotas {
    pub gk: usize,
    pub def: usize,
    pub mid: usize,
    pub fwd: usize,
}

impl Default for RoleQuotas {
    fn default() -> Self {
        Self {
            gk: 1,
            def: 5,
            mid: 5,
            fwd: 3,
        }
    }
}

impl RoleQuotas {
    pub fn quota(&self, role: Role) -> usize {
        match role {
            Role::Goalkeeper => self.gk,
            Role::Defender => self.def,
            Role::Midfielder => self.mid,
            Role::Forward => self.fwd,
        }
    }

    /// Sum of all quotas; the largest squad the quotas could ever allow.
    pub fn total(&self) -> usize {
        self.gk + self.def + self.mid + self.fwd
    }
}

/// The rules a roster must satisfy.
///
/// Defaults are the standard competition limits (11 players, 100.0 credits,
/// at most 7 per source team, 1 GK / 5 DEF / 5 MID / 3 FWD). Formats that
/// differ override fields under `[rules]` or construct their own value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConstraintConfig {
    pub squad_size: usize,
    pub credit_cap: Credits,
    pub per_team_cap: usize,
    pub role_quotas: RoleQuotas,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            squad_size: 11,
            credit_cap: Credits::from_tenths(1000),
            per_team_cap: 7,
            role_quotas: RoleQuotas::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

/// Everything the crate reads from `config/selection.toml`, with defaults
/// filled in for anything the file omits. A missing file yields the standard
/// rules and the standard data paths.
#[derive(Debug, Clone)]
pub struct Config {
    pub rules: ConstraintConfig,
    /// SQLite file for the local store. `None` means use the platform data
    /// directory (see `store::resolve_db_path`).
    pub db_path: Option<PathBuf>,
    pub data_paths: DataPaths,
}

/// Locations of the static catalog files, resolved against the base
/// directory the config was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub matches: PathBuf,
    pub players: PathBuf,
}

// ---------------------------------------------------------------------------
// selection.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire selection.toml file.
#[derive(Debug, Default, Deserialize)]
struct SelectionFile {
    #[serde(default)]
    rules: ConstraintConfig,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    data: DataSection,
}

#[derive(Debug, Default, Deserialize)]
struct StorageSection {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DataSection {
    matches: String,
    players: String,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            matches: "data/matches.toml".to_string(),
            players: "data/players.csv".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Name of the config file under `config/`.
const CONFIG_FILE: &str = "selection.toml";

/// Load and validate configuration from `config/selection.toml` relative to
/// `base_dir`. A missing file is not an error: every setting has a default.
/// Relative storage and data paths resolve against `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);

    let file = if path.exists() {
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Unreadable {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str::<SelectionFile>(&text).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?
    } else {
        info!(path = %path.display(), "no config file, using built-in defaults");
        SelectionFile::default()
    };

    let config = Config {
        rules: file.rules,
        db_path: file.storage.path.map(|p| resolve(base_dir, &p)),
        data_paths: DataPaths {
            matches: resolve(base_dir, &file.data.matches),
            players: resolve(base_dir, &file.data.players),
        },
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure `config/selection.toml` exists by copying the shipped default from
/// `defaults/` when absent. Returns true when a copy was made. A missing
/// defaults file is fine: built-in defaults cover everything, and an existing
/// customized config is never overwritten.
pub fn ensure_config_files(base_dir: &Path) -> Result<bool, ConfigError> {
    let source = base_dir.join("defaults").join(CONFIG_FILE);
    if !source.exists() {
        return Ok(false);
    }

    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let target = config_dir.join(CONFIG_FILE);
    if target.exists() {
        return Ok(false);
    }

    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!(
            "failed to copy {} to {}: {e}",
            source.display(),
            target.display()
        ),
    })?;

    Ok(true)
}

/// Convenience wrapper: copies defaults then loads, both relative to the
/// current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot determine working directory: {e}"),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve a possibly-relative path from the config file against `base_dir`.
fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() {
        p
    } else {
        base_dir.join(p)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let rules = &config.rules;

    if rules.squad_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "rules.squad_size".into(),
            message: "must be greater than 0".into(),
        });
    }

    if rules.credit_cap.is_zero() {
        return Err(ConfigError::ValidationError {
            field: "rules.credit_cap".into(),
            message: "must be greater than 0".into(),
        });
    }

    if rules.per_team_cap == 0 {
        return Err(ConfigError::ValidationError {
            field: "rules.per_team_cap".into(),
            message: "must be greater than 0".into(),
        });
    }

    // A squad that can never be completed is a configuration mistake, not
    // something to discover one rejected toggle at a time.
    if rules.role_quotas.total() < rules.squad_size {
        return Err(ConfigError::ValidationError {
            field: "rules.role_quotas".into(),
            message: format!(
                "quotas sum to {} which cannot fill a squad of {}",
                rules.role_quotas.total(),
                rules.squad_size
            ),
        });
    }

    if rules.per_team_cap * 2 < rules.squad_size {
        return Err(ConfigError::ValidationError {
            field: "rules.per_team_cap".into(),
            message: format!(
                "two source teams capped at {} cannot fill a squad of {}",
                rules.per_team_cap, rules.squad_size
            ),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
