//! Run configuration.
//!
//! Values are layered: built-in defaults, then a TOML file, then `VADD_*`
//! environment variables, then explicit overrides (CLI flags).

use crate::types::DeviceClass;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default vector length.
pub const DEFAULT_LENGTH: usize = 1024;
/// Largest accepted vector length: 2^28 elements, 1 GiB per `f32` vector.
pub const MAX_LENGTH: usize = 1 << 28;
/// Default verification tolerance.
pub const DEFAULT_TOLERANCE: f64 = 0.001;
/// Default input seed.
pub const DEFAULT_SEED: u64 = 1;
/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "vadd.toml";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `warn` or `vadd_opencl=debug`.
    pub level: String,
    /// `compact`, `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: "compact".to_string() }
    }
}

/// Main vadd configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaddConfig {
    pub device: DeviceClass,
    pub length: usize,
    pub tolerance: f64,
    pub seed: u64,
    /// Extra options passed to the device compiler.
    pub build_options: String,
    /// Exit non-zero when verification rejects any element.
    pub strict: bool,
    pub logging: LoggingConfig,
}

impl Default for VaddConfig {
    fn default() -> Self {
        Self {
            device: DeviceClass::Default,
            length: DEFAULT_LENGTH,
            tolerance: DEFAULT_TOLERANCE,
            seed: DEFAULT_SEED,
            build_options: String::new(),
            strict: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl VaddConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: origin.to_path_buf(), source })
    }

    /// Load a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text, path)
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.length == 0 {
            return Err(ConfigError::Invalid {
                key: "length",
                message: "vector length must be at least 1".into(),
            });
        }
        if self.length > MAX_LENGTH {
            return Err(ConfigError::Invalid {
                key: "length",
                message: format!("{} elements exceeds the limit of {MAX_LENGTH}", self.length),
            });
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "tolerance",
                message: format!("must be a positive finite number, got {}", self.tolerance),
            });
        }
        if !matches!(self.logging.format.as_str(), "compact" | "pretty" | "json") {
            return Err(ConfigError::Invalid {
                key: "logging.format",
                message: format!(
                    "unknown format '{}' (expected compact, pretty or json)",
                    self.logging.format
                ),
            });
        }
        Ok(())
    }

    /// Apply `VADD_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("VADD_DEVICE") {
            self.device = v
                .parse()
                .map_err(|message| ConfigError::Invalid { key: "VADD_DEVICE", message })?;
        }
        if let Some(v) = lookup("VADD_LENGTH") {
            self.length = v.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "VADD_LENGTH",
                message: format!("{e}"),
            })?;
        }
        if let Some(v) = lookup("VADD_SEED") {
            self.seed = v.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "VADD_SEED",
                message: format!("{e}"),
            })?;
        }
        if let Some(v) = lookup("VADD_TOLERANCE") {
            self.tolerance = v.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "VADD_TOLERANCE",
                message: format!("{e}"),
            })?;
        }
        if let Some(v) = lookup("VADD_LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }
}

/// Builder merging file, environment and explicit overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: VaddConfig,
    use_env: bool,
    device: Option<DeviceClass>,
    length: Option<usize>,
    tolerance: Option<f64>,
    seed: Option<u64>,
    build_options: Option<String>,
    strict: Option<bool>,
    log_level: Option<String>,
    log_format: Option<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self { use_env: true, ..Self::default() }
    }

    /// Start from a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = VaddConfig::from_file(path)?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok(Self { config, ..Self::new() })
    }

    /// Start from `path` if given, else from `vadd.toml` if it exists, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() { Self::from_file(fallback) } else { Ok(Self::new()) }
            }
        }
    }

    /// Skip `VADD_*` environment lookups.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn device(mut self, device: Option<DeviceClass>) -> Self {
        self.device = device.or(self.device);
        self
    }

    pub fn length(mut self, length: Option<usize>) -> Self {
        self.length = length.or(self.length);
        self
    }

    pub fn tolerance(mut self, tolerance: Option<f64>) -> Self {
        self.tolerance = tolerance.or(self.tolerance);
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed.or(self.seed);
        self
    }

    pub fn build_options(mut self, options: Option<String>) -> Self {
        self.build_options = options.or(self.build_options);
        self
    }

    pub fn strict(mut self, strict: Option<bool>) -> Self {
        self.strict = strict.or(self.strict);
        self
    }

    pub fn log_level(mut self, level: Option<String>) -> Self {
        self.log_level = level.or(self.log_level);
        self
    }

    pub fn log_format(mut self, format: Option<String>) -> Self {
        self.log_format = format.or(self.log_format);
        self
    }

    /// Merge all layers and validate.
    pub fn build(self) -> Result<VaddConfig, ConfigError> {
        let mut config = self.config;
        if self.use_env {
            config.apply_env()?;
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(length) = self.length {
            config.length = length;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(options) = self.build_options {
            config.build_options = options;
        }
        if let Some(strict) = self.strict {
            config.strict = strict;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        config.validate()?;
        Ok(config)
    }
}
