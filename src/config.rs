use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "CareLens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CARELENS_CONFIG";

/// Get the application data directory.
/// ~/CareLens/ on all platforms; falls back to the working directory when no
/// home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the bundled SQLite store.
pub fn database_path() -> PathBuf {
    app_data_dir().join("carelens.db")
}

/// Path of the JSON pipeline config (overridable with `CARELENS_CONFIG`).
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir().join("config.json"))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "warn,carelens=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {0}: {1}")]
    Io(String, String),

    #[error("Cannot parse config {0}: {1}")]
    Parse(String, String),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ═══════════════════════════════════════════════════════════
// Pipeline configuration
// ═══════════════════════════════════════════════════════════

/// Operational knobs for one pipeline instance.
///
/// Decision thresholds (classifier acceptance, action gates) are fixed
/// constants in their modules and are deliberately absent here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub extraction: ExtractionSettings,
    pub scoring: ScoreWeights,
    pub actions: ActionSettings,
}

/// Upload gate and extraction scheduling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Per-file extraction timeout.
    pub timeout_ms: u64,
    /// Files extracted concurrently within one batch.
    pub max_parallel: usize,
    pub max_batch_files: usize,
    pub max_file_size_bytes: u64,
    /// Lowercase extensions, without the dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_parallel: 4,
            max_batch_files: 20,
            max_file_size_bytes: 100 * 1024 * 1024, // 100MB
            allowed_extensions: ["pdf", "jpg", "jpeg", "png", "tif", "tiff", "heic", "txt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Per-item health score weights. Both are applied as penalties.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoreWeights {
    pub per_condition: i32,
    pub per_medication: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            per_condition: 8,
            per_medication: 5,
        }
    }
}

/// Idempotency settings for persisted actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActionSettings {
    /// Appointments for the same specialty within ± this many days of an
    /// existing one are treated as the same appointment.
    pub appointment_dedup_window_days: i64,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            appointment_dedup_window_days: 14,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))?;
        config.validate()?;

        tracing::info!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }

    /// Load from [`config_path`].
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&config_path())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "extraction.timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.extraction.max_parallel == 0 {
            return Err(ConfigError::Invalid {
                field: "extraction.max_parallel",
                reason: "must be greater than zero".into(),
            });
        }
        if self.extraction.max_batch_files == 0 {
            return Err(ConfigError::Invalid {
                field: "extraction.max_batch_files",
                reason: "must be greater than zero".into(),
            });
        }
        if self.scoring.per_condition < 0 || self.scoring.per_medication < 0 {
            return Err(ConfigError::Invalid {
                field: "scoring",
                reason: "weights are penalties and must not be negative".into(),
            });
        }
        if self.actions.appointment_dedup_window_days < 0 {
            return Err(ConfigError::Invalid {
                field: "actions.appointment_dedup_window_days",
                reason: "must not be negative".into(),
            });
        }
        Ok(())
    }
}
