// src/error.rs
//! Unified error handling for EEG Core
//!
//! Every fallible operation in the crate returns [`EegResult`]. All errors are
//! reported synchronously to the caller of the offending operation; nothing is
//! retried internally because every stage is a deterministic, pure function.
//!
//! Boundary conditions that are part of normal operation (epochs truncated at
//! the recording edges, windows flagged by the artifact detector) are *not*
//! errors. They surface as data in the stage outputs.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unified error type for the EEG pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EegError {
    /// Sample matrix does not agree with the channel layout
    #[error("Shape error: {reason} (expected: {expected}, got: {actual})")]
    Shape {
        /// What is wrong
        reason: String,
        /// Expected value
        expected: String,
        /// Actual value
        actual: String,
    },

    /// Sampling rate is not a positive finite number
    #[error("Invalid sampling rate: {0} Hz")]
    Rate(f64),

    /// Marker sample index lies outside the recording
    #[error("Marker '{label}' at sample {index} is outside [0, {sample_count})")]
    MarkerRange {
        /// Marker label
        label: String,
        /// Offending sample index
        index: usize,
        /// Samples in the recording
        sample_count: usize,
    },

    /// Filter or band edges are inconsistent or above Nyquist
    #[error("Invalid frequency range [{low_hz}, {high_hz}] Hz (Nyquist: {nyquist_hz} Hz)")]
    FrequencyRange {
        /// Lower edge
        low_hz: f64,
        /// Upper edge
        high_hz: f64,
        /// Nyquist frequency of the recording
        nyquist_hz: f64,
    },

    /// A named channel is not present in the buffer
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// A feature cannot be computed from the available data
    #[error("Insufficient data for '{feature}': {reason}")]
    InsufficientData {
        /// Feature or column that could not be computed
        feature: String,
        /// Why the data is insufficient
        reason: String,
    },

    /// Feature tables being merged disagree on their feature names
    #[error("Schema mismatch in table {table_index}: missing {missing:?}, unexpected {unexpected:?}")]
    SchemaMismatch {
        /// Index of the offending table
        table_index: usize,
        /// Names the table lacks
        missing: Vec<String>,
        /// Names the table has in excess
        unexpected: Vec<String>,
    },

    /// Invalid configuration or configuration source
    #[error("Configuration error in {component}: {reason}")]
    Configuration {
        /// Configuration section or source
        component: String,
        /// What is invalid
        reason: String,
    },

    /// Dataset hand-off serialization (JSON or CSV) failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for EEG operations
pub type EegResult<T> = Result<T, EegError>;

/// Pipeline stages for failure attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingStage {
    /// Filtering, referencing and resampling
    Preprocessing,
    /// Artifact rejection mask construction
    ArtifactDetection,
    /// Epoch segmentation
    Epoching,
    /// Feature extraction
    FeatureExtraction,
    /// Dataset aggregation
    Aggregation,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessingStage::Preprocessing => "preprocessing",
            ProcessingStage::ArtifactDetection => "artifact-detection",
            ProcessingStage::Epoching => "epoching",
            ProcessingStage::FeatureExtraction => "feature-extraction",
            ProcessingStage::Aggregation => "aggregation",
        };
        f.write_str(name)
    }
}

/// An error together with the pipeline stage that raised it
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} failed: {error}")]
pub struct StageError {
    /// Stage that failed
    pub stage: ProcessingStage,
    /// Underlying error
    #[source]
    pub error: EegError,
}

/// Attach a [`ProcessingStage`] to a failing result
pub trait StageContext<T> {
    /// Tag an error with `stage`
    fn at_stage(self, stage: ProcessingStage) -> Result<T, StageError>;
}

impl<T> StageContext<T> for EegResult<T> {
    fn at_stage(self, stage: ProcessingStage) -> Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

impl EegError {
    pub(crate) fn shape(reason: &str, expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        EegError::Shape {
            reason: reason.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn configuration(component: &str, reason: impl Into<String>) -> Self {
        EegError::Configuration {
            component: component.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(feature: &str, reason: impl Into<String>) -> Self {
        EegError::InsufficientData {
            feature: feature.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for EegError {
    fn from(err: serde_json::Error) -> Self {
        EegError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for EegError {
    fn from(err: csv::Error) -> Self {
        EegError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for EegError {
    fn from(err: config::ConfigError) -> Self {
        EegError::configuration("config_loader", err.to_string())
    }
}

impl From<toml::de::Error> for EegError {
    fn from(err: toml::de::Error) -> Self {
        EegError::configuration("toml", err.to_string())
    }
}
