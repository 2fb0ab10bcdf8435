// src/config/loader.rs
//! Configuration loading with file layering and environment overrides

use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::constants::{ENV_PREFIX, ENV_SEPARATOR};
use super::PipelineConfig;
use crate::error::{EegError, EegResult};

/// Loads configuration from layered TOML files plus `EEG__`-prefixed
/// environment variables (e.g. `EEG__ARTIFACT__WINDOW_SAMPLES=250`).
///
/// Later files override earlier ones; the environment overrides all files.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    use_environment: bool,
}

impl ConfigLoader {
    /// Create a loader that only reads environment overrides
    pub fn new() -> Self {
        Self {
            config_paths: Vec::new(),
            use_environment: true,
        }
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            use_environment: true,
        }
    }

    /// Disable environment overrides (useful for reproducible tests)
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    /// Add a file layer
    pub fn add_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Load and validate the pipeline configuration
    pub fn load_pipeline_config(&self) -> EegResult<PipelineConfig> {
        let config: PipelineConfig = self.load()?;
        config.validate()?;
        info!(
            low_hz = config.filter.low_hz,
            high_hz = config.filter.high_hz,
            features = config.features.specs.len(),
            "Loaded pipeline configuration"
        );
        Ok(config)
    }

    /// Load any deserializable configuration type from the configured layers
    pub fn load<T: DeserializeOwned>(&self) -> EegResult<T> {
        let mut builder = Config::builder();

        for path in &self.config_paths {
            if !path.exists() {
                return Err(EegError::configuration(
                    "config_loader",
                    format!("configuration file not found: {}", path.display()),
                ));
            }
            debug!(path = %path.display(), "Adding configuration layer");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        if self.use_environment {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load one TOML file, with environment overrides applied on top
    pub fn from_file<P: AsRef<Path>>(path: P) -> EegResult<PipelineConfig> {
        Self::new().add_path(path).load_pipeline_config()
    }

    /// Parse a pipeline configuration from TOML text
    pub fn from_toml_str(content: &str) -> EegResult<PipelineConfig> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render a configuration as TOML
    pub fn to_toml_string<T: Serialize>(config: &T) -> EegResult<String> {
        toml::to_string_pretty(config).map_err(|e| EegError::configuration("toml", e.to_string()))
    }
}
