//! One complete analysis run: preprocess, detect artifacts, segment, extract

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use super::artifact::{ArtifactDetector, RejectionMask};
use super::epochs::{EpochSet, Epocher};
use super::features::{ExtractOptions, FeatureExtractor, FeatureTable};
use super::filters::Preprocessor;
use crate::config::PipelineConfig;
use crate::error::{EegResult, ProcessingStage, StageContext, StageError};
use crate::signal::SignalBuffer;

/// Stage-by-stage pipeline built from a [`PipelineConfig`]
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    config: PipelineConfig,
    preprocessor: Preprocessor,
    detector: ArtifactDetector,
    epocher: Epocher,
    extractor: FeatureExtractor,
}

/// Everything produced by one run
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Buffer after filtering, referencing and resampling
    pub preprocessed: SignalBuffer,
    /// Rejected samples of `preprocessed`
    pub mask: RejectionMask,
    /// Segmented epochs
    pub epochs: EpochSet,
    /// Extracted features
    pub table: FeatureTable,
    /// Audit counts
    pub stats: RunStats,
}

/// Audit counts for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Markers in the preprocessed buffer
    pub markers: usize,
    /// Epochs cut
    pub epochs: usize,
    /// Markers whose window left the recording
    pub dropped_epochs: usize,
    /// Epochs without rejected samples
    pub valid_epochs: usize,
    /// Epochs overlapping rejected samples
    pub invalid_epochs: usize,
    /// Rejected share of all samples
    pub rejected_fraction: f64,
    /// Rows in the feature table
    pub feature_rows: usize,
}

impl AnalysisPipeline {
    /// Validate the configuration and build every stage
    pub fn new(config: PipelineConfig) -> EegResult<Self> {
        config.validate()?;

        let preprocessor = Preprocessor::new(config.filter.clone());
        let detector = ArtifactDetector::new(config.artifact.clone())?;
        let epocher = Epocher::new(config.epoch.clone())?;
        let extractor = FeatureExtractor::new(config.features.specs.clone())?.with_options(ExtractOptions {
            include_invalid: config.features.include_invalid,
        });

        Ok(Self {
            config,
            preprocessor,
            detector,
            epocher,
            extractor,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Configured feature extractor
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Run every stage on `buffer`
    pub fn run(&self, buffer: &SignalBuffer) -> EegResult<RunOutput> {
        self.run_staged(buffer).map_err(|failure| failure.error)
    }

    /// Like [`run`](Self::run), but failures name the stage that raised them
    pub fn run_staged(&self, buffer: &SignalBuffer) -> Result<RunOutput, StageError> {
        self.run_inner(buffer, None)
    }

    /// Run with extra rejections (e.g. manually annotated segments) OR-ed into
    /// the detected mask. `annotated` must match the preprocessed buffer's shape.
    pub fn run_with_rejections(
        &self,
        buffer: &SignalBuffer,
        annotated: &RejectionMask,
    ) -> Result<RunOutput, StageError> {
        self.run_inner(buffer, Some(annotated))
    }

    fn run_inner(&self, buffer: &SignalBuffer, annotated: Option<&RejectionMask>) -> Result<RunOutput, StageError> {
        let span = info_span!("analysis_run", channels = buffer.channel_count(), samples = buffer.sample_count());
        let _guard = span.enter();

        let preprocessed = self
            .preprocessor
            .apply(buffer)
            .at_stage(ProcessingStage::Preprocessing)?;

        // thresholds apply to the filtered signal
        let detected = self.detector.detect(&preprocessed);
        let mask = match annotated {
            Some(extra) => detected
                .merge(extra)
                .at_stage(ProcessingStage::ArtifactDetection)?,
            None => detected,
        };

        let epochs = self
            .epocher
            .segment(&preprocessed, &mask)
            .at_stage(ProcessingStage::Epoching)?;

        let table = self
            .extractor
            .extract(&epochs)
            .at_stage(ProcessingStage::FeatureExtraction)?;

        let stats = RunStats {
            markers: preprocessed.markers().len(),
            epochs: epochs.len(),
            dropped_epochs: epochs.dropped(),
            valid_epochs: epochs.valid_count(),
            invalid_epochs: epochs.invalid_count(),
            rejected_fraction: mask.rejected_fraction(),
            feature_rows: table.len(),
        };
        info!(
            epochs = stats.epochs,
            valid = stats.valid_epochs,
            rows = stats.feature_rows,
            "Analysis run complete"
        );

        Ok(RunOutput {
            preprocessed,
            mask,
            epochs,
            table,
            stats,
        })
    }
}
