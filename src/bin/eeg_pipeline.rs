//! Thin driver: synthetic recording in, aggregated dataset JSON out
//!
//! Usage: `eeg-pipeline [pipeline.toml] [synthetic.toml]`

use std::env;
use std::path::PathBuf;

use eeg_core::batch::{AnalysisJob, BatchRunner};
use eeg_core::dataset::{MergePolicy, RunMetadata};
use eeg_core::error::{ProcessingStage, StageContext};
use eeg_core::simulation::{SyntheticConfig, SyntheticGenerator};
use eeg_core::ConfigLoader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eeg_core=info,eeg_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = env::args().skip(1).map(PathBuf::from);
    let pipeline_path = args.next();
    let synthetic_path = args.next();

    let loader = match &pipeline_path {
        Some(path) => ConfigLoader::new().add_path(path),
        None => ConfigLoader::new(),
    };
    let pipeline_config = loader.load_pipeline_config()?;

    let synthetic_config: SyntheticConfig = match &synthetic_path {
        Some(path) => ConfigLoader::new().without_environment().add_path(path).load()?,
        None => SyntheticConfig::default(),
    };

    let recording = SyntheticGenerator::new(synthetic_config)?.generate()?;
    info!(
        channels = recording.channel_count(),
        duration_secs = recording.duration_secs(),
        "Synthetic recording ready"
    );

    let runner = BatchRunner::new(pipeline_config)?;
    let report = runner.run(vec![AnalysisJob::new(RunMetadata::new("synthetic", "demo"), recording)]);
    if report.success_count() == 0 {
        if let Some(failure) = report.failures.first() {
            return Err(failure.error.clone().into());
        }
    }

    let dataset = report
        .into_dataset(MergePolicy::Strict)
        .at_stage(ProcessingStage::Aggregation)?;
    println!("{}", dataset.to_json()?);
    Ok(())
}
