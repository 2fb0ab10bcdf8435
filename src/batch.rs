// src/batch.rs
//! Parallel execution of independent analysis runs
//!
//! Workers only return values; the report is assembled by the caller's
//! thread, so nothing shared is written concurrently.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::dataset::{aggregate, Dataset, MergePolicy, RunMetadata};
use crate::error::{EegError, EegResult, ProcessingStage, StageError};
use crate::processing::pipeline::{AnalysisPipeline, RunOutput};
use crate::signal::SignalBuffer;

/// One recording to analyse
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    /// Identifiers attached to every row of this run
    pub metadata: RunMetadata,
    /// The raw recording
    pub buffer: SignalBuffer,
}

impl AnalysisJob {
    /// Pair a recording with its metadata
    pub fn new(metadata: RunMetadata, buffer: SignalBuffer) -> Self {
        Self { metadata, buffer }
    }
}

/// A run that failed, with the stage that raised the error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    /// Metadata of the failed job
    pub metadata: RunMetadata,
    /// Stage that raised the error
    pub stage: ProcessingStage,
    /// The error itself
    #[serde(serialize_with = "serialize_error")]
    pub error: EegError,
}

fn serialize_error<S: serde::Serializer>(error: &EegError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Outcome of a batch, in job order
#[derive(Debug)]
pub struct BatchReport {
    /// Successful runs, in job order
    pub completed: Vec<(RunMetadata, RunOutput)>,
    /// Failed runs, in job order
    pub failures: Vec<RunFailure>,
}

impl BatchReport {
    /// Number of successful runs
    pub fn success_count(&self) -> usize {
        self.completed.len()
    }

    /// Number of failed runs
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Aggregate the feature tables of every completed run
    pub fn into_dataset(self, policy: MergePolicy) -> EegResult<Dataset> {
        let tables: Vec<_> = self
            .completed
            .into_iter()
            .map(|(metadata, output)| (metadata, output.table))
            .collect();
        aggregate(&tables, policy)
    }
}

/// Runs one shared pipeline over many jobs on the rayon pool
#[derive(Debug, Clone)]
pub struct BatchRunner {
    pipeline: AnalysisPipeline,
}

impl BatchRunner {
    /// Build the shared pipeline from a configuration
    pub fn new(config: PipelineConfig) -> EegResult<Self> {
        Ok(Self {
            pipeline: AnalysisPipeline::new(config)?,
        })
    }

    /// Use an already constructed pipeline
    pub fn with_pipeline(pipeline: AnalysisPipeline) -> Self {
        Self { pipeline }
    }

    /// The pipeline every job runs through
    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.pipeline
    }

    /// Run every job; a failing job never affects the others
    pub fn run(&self, jobs: Vec<AnalysisJob>) -> BatchReport {
        let total = jobs.len();
        let outcomes: Vec<(RunMetadata, Result<RunOutput, StageError>)> = jobs
            .into_par_iter()
            .map(|job| {
                let outcome = self.pipeline.run_staged(&job.buffer);
                (job.metadata, outcome)
            })
            .collect();

        let mut completed = Vec::new();
        let mut failures = Vec::new();
        for (metadata, outcome) in outcomes {
            match outcome {
                Ok(output) => completed.push((metadata, output)),
                Err(StageError { stage, error }) => {
                    warn!(
                        participant = %metadata.participant_id,
                        task = %metadata.task_id,
                        %stage,
                        %error,
                        "Analysis run failed"
                    );
                    failures.push(RunFailure { metadata, stage, error });
                }
            }
        }

        info!(total, completed = completed.len(), failed = failures.len(), "Batch finished");
        BatchReport { completed, failures }
    }
}
