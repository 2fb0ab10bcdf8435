//! EEG-Core: offline EEG preprocessing, epoching and feature extraction
//!
//! The crate turns raw multichannel recordings into per-epoch feature tables
//! for cognitive-science experiments:
//!
//! - Immutable, structurally shared [`SignalBuffer`] recordings with event markers
//! - Zero-phase spectral filtering, re-referencing and FFT resampling
//! - Sliding-window artifact rejection and event-locked epoching
//! - Band-power and evoked-response features
//! - Multi-run aggregation into a reporting [`Dataset`], run in parallel by [`BatchRunner`]
//! - A seeded synthetic generator for validating the whole chain against known ground truth
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use eeg_core::{AnalysisPipeline, PipelineConfig, SyntheticConfig, SyntheticGenerator};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let recording = SyntheticGenerator::new(SyntheticConfig::default())?.generate()?;
//!     let pipeline = AnalysisPipeline::new(PipelineConfig::default())?;
//!
//!     let output = pipeline.run(&recording)?;
//!     for record in output.table.iter() {
//!         println!("{} @ {}: {:?}", record.marker_label, record.onset, record.features);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod processing;
pub mod signal;
pub mod simulation;

pub use batch::{AnalysisJob, BatchReport, BatchRunner, RunFailure};
pub use config::{ConfigLoader, PipelineConfig};
pub use dataset::{aggregate, Dataset, DatasetRow, MergePolicy, RunMetadata};
pub use error::{EegError, EegResult, ProcessingStage};
pub use processing::{AnalysisPipeline, FeatureSpec, FeatureTable, RunOutput};
pub use signal::{ChannelSelection, Marker, SignalBuffer};
pub use simulation::{SyntheticConfig, SyntheticGenerator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Offline EEG preprocessing, epoching and feature extraction".to_string(),
        features: vec![
            "Zero-phase spectral filtering".to_string(),
            "Artifact rejection".to_string(),
            "Event-locked epoching".to_string(),
            "Band-power and evoked features".to_string(),
            "Parallel multi-run aggregation".to_string(),
            "Seeded synthetic recordings".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
