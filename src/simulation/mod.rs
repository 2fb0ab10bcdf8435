//! Synthetic recordings with parametrically known content, used to validate
//! the pipeline end to end

pub mod config;
pub mod noise_models;
pub mod signal_generator;

pub use config::{ComponentSpec, MarkerSpec, NoiseSpec, SyntheticConfig, Waveform};
pub use noise_models::NoiseModel;
pub use signal_generator::SyntheticGenerator;

use crate::error::EegResult;
use crate::signal::SignalBuffer;

/// Noise-free recording over channels `Ch1..ChC`
pub fn generate(
    duration_s: f64,
    sampling_rate: f64,
    channel_count: usize,
    components: Vec<ComponentSpec>,
    markers_spec: Vec<MarkerSpec>,
) -> EegResult<SignalBuffer> {
    let config = SyntheticConfig {
        duration_secs: duration_s,
        sampling_rate,
        channel_labels: (1..=channel_count).map(|i| format!("Ch{}", i)).collect(),
        baseline_offset: 0.0,
        noise: None,
        components,
        markers: markers_spec,
    };
    SyntheticGenerator::new(config)?.generate()
}
