use crate::calculations::AbsencePolicy;
use crate::preferences::DEFAULT_DESIRED_ATTENDANCE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_PREFIX: &str = "BUNK_PLANNER_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Runtime settings shared by the CLI and the HTTP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timetable_path: PathBuf,
    pub holidays_path: Option<PathBuf>,
    /// SQLite file for student preferences; in-memory storage when unset.
    pub database_path: Option<PathBuf>,
    pub http_addr: String,
    pub default_target: f64,
    pub absence_policy: AbsencePolicy,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timetable_path: PathBuf::from("data/timetable.json"),
            holidays_path: None,
            database_path: None,
            http_addr: "0.0.0.0:3000".to_string(),
            default_target: DEFAULT_DESIRED_ATTENDANCE,
            absence_policy: AbsencePolicy::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
                path: path.as_ref().to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    /// Optional file, then `BUNK_PLANNER_*` environment variables on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which receives full variable names
    /// such as `BUNK_PLANNER_HTTP_ADDR`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(value) = var("TIMETABLE") {
            self.timetable_path = PathBuf::from(value);
        }
        if let Some(value) = var("HOLIDAYS") {
            self.holidays_path = Some(PathBuf::from(value));
        }
        if let Some(value) = var("DATABASE") {
            self.database_path = Some(PathBuf::from(value));
        }
        if let Some(value) = var("HTTP_ADDR") {
            self.http_addr = value;
        }
        if let Some(value) = var("TARGET") {
            self.default_target = value.trim().parse().map_err(|err: std::num::ParseFloatError| {
                ConfigError::InvalidValue {
                    key: format!("{ENV_PREFIX}TARGET"),
                    value: value.clone(),
                    reason: err.to_string(),
                }
            })?;
        }
        if let Some(value) = var("ABSENCE_POLICY") {
            self.absence_policy =
                value
                    .parse()
                    .map_err(|reason: String| ConfigError::InvalidValue {
                        key: format!("{ENV_PREFIX}ABSENCE_POLICY"),
                        value: value.clone(),
                        reason,
                    })?;
        }
        if let Some(value) = var("LOG") {
            self.log_level = value;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_target.is_finite() || !(0.0..=100.0).contains(&self.default_target) {
            return Err(ConfigError::InvalidValue {
                key: "default_target".into(),
                value: self.default_target.to_string(),
                reason: "must be between 0 and 100".into(),
            });
        }
        Ok(())
    }
}
