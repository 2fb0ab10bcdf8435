// src/processing/mod.rs
//! Offline processing stages, in pipeline order:
//! preprocessing, artifact detection, epoching, feature extraction

pub mod artifact;
pub mod epochs;
pub mod features;
pub mod filters;
pub mod pipeline;
pub mod spectral;

pub use artifact::{ArtifactDetector, RejectionMask};
pub use epochs::{Epoch, EpochSet, Epocher};
pub use features::{
    EvokedAverage, EvokedMeasure, ExtractOptions, FeatureExtractor, FeatureRecord, FeatureSpec, FeatureTable,
};
pub use filters::Preprocessor;
pub use pipeline::{AnalysisPipeline, RunOutput, RunStats};
