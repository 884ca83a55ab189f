use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use dialog_arbiter::ArbiterPolicy;
use element_stabilizer::StabilizerPolicy;
use serde::{Deserialize, Serialize};
use storefront_event_bus::Verbosity;
use thiserror::Error;
use tokio::fs;

pub const ENV_LOG_LEVEL: &str = "HARNESS_LOG_LEVEL";
pub const ENV_STABILIZER_TIMEOUT_MS: &str = "HARNESS_STABILIZER_TIMEOUT_MS";
pub const ENV_DIALOG_DEADLINE_MS: &str = "HARNESS_DIALOG_DEADLINE_MS";
pub const ENV_DIALOG_GRACE_MS: &str = "HARNESS_DIALOG_GRACE_MS";

const APP_DIR: &str = "storefront-harness";
const FILE_NAME: &str = "harness.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {0} does not exist")]
    Missing(PathBuf),
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{var}={value} is not a valid value")]
    InvalidOverride { var: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSink {
    #[default]
    Stdout,
    Stderr,
    /// Daily-rolled file under `LoggingConfig::directory`.
    File,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub sink: LogSink,
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            sink: LogSink::default(),
            directory: PathBuf::from("logs"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub verbosity: Verbosity,
}

/// Everything the harness reads from `harness.yaml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub logging: LoggingConfig,
    pub observer: ObserverConfig,
    pub stabilizer: StabilizerPolicy,
    pub arbiter: ArbiterPolicy,
}

impl HarnessConfig {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Apply `HARNESS_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            if !level.trim().is_empty() {
                self.logging.level = level.trim().to_string();
            }
        }
        if let Some(ms) = env_millis(ENV_STABILIZER_TIMEOUT_MS)? {
            self.stabilizer.default_timeout_ms = ms;
        }
        if let Some(ms) = env_millis(ENV_DIALOG_DEADLINE_MS)? {
            self.arbiter.deadline_ms = ms;
        }
        if let Some(ms) = env_millis(ENV_DIALOG_GRACE_MS)? {
            self.arbiter.grace_ms = ms;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stabilizer
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("stabilizer.{err}")))?;
        self.arbiter
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("arbiter.{err}")))?;
        tracing::Level::from_str(&self.logging.level).map_err(|_| {
            ConfigError::Invalid(format!("logging.level '{}' is not a level", self.logging.level))
        })?;
        Ok(())
    }
}

fn env_millis(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidOverride { var, value: raw }),
        Err(_) => Ok(None),
    }
}

/// Where configuration came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: HarnessConfig,
    pub source: ConfigSource,
}

/// Candidate locations searched when no explicit path is given.
#[derive(Clone, Debug)]
pub struct ConfigLocator {
    pub local: PathBuf,
    pub user: Option<PathBuf>,
}

impl Default for ConfigLocator {
    fn default() -> Self {
        let user = dirs::config_dir().map(|mut path| {
            path.push(APP_DIR);
            path.push(FILE_NAME);
            path
        });
        Self {
            local: PathBuf::from("config").join(FILE_NAME),
            user,
        }
    }
}

impl ConfigLocator {
    /// Priority: explicit > ./config/harness.yaml > <config_dir>/storefront-harness/harness.yaml.
    pub fn locate(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if self.local.exists() {
            return Some(self.local.clone());
        }
        self.user.clone().filter(|path| path.exists())
    }

    /// Read, override from the environment, and validate.
    pub async fn load(&self, explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        let (mut config, source) = match self.locate(explicit) {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Missing(path));
                }
                let content = fs::read_to_string(&path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                let config =
                    HarnessConfig::from_yaml(&content).map_err(|source| ConfigError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                (config, ConfigSource::File(path))
            }
            None => (HarnessConfig::default(), ConfigSource::Defaults),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(LoadedConfig { config, source })
    }
}

pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    ConfigLocator::default().load(explicit).await
}
