// ================================================================================
// Configuration loading from files and the environment
// File: tests/config_loading.rs
// ================================================================================

use std::io::Write;

use eeg_core::config::ReferenceScheme;
use eeg_core::processing::features::{EvokedMeasure, FeatureSpec};
use eeg_core::simulation::{SyntheticConfig, SyntheticGenerator, Waveform};
use eeg_core::{ChannelSelection, ConfigLoader, EegError, PipelineConfig};
use tempfile::NamedTempFile;

fn toml_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const PIPELINE_TOML: &str = r#"
[filter]
low_hz = 0.5
high_hz = 30.0
notch_hz = 50.0
reference = { kind = "average" }

[artifact]
amplitude_threshold = 75.0
window_samples = 250

[epoch]
window_start = -100
window_end = 600
baseline = [-100, 0]

[features]
include_invalid = true

[[features.specs]]
kind = "band_power"
name = "alpha"
low_hz = 8.0
high_hz = 12.0
channels = { named = ["Pz", "Oz"] }

[[features.specs]]
kind = "evoked"
name = "p3"
measure = "mean_amplitude"
window = [250, 500]
"#;

#[test]
fn test_pipeline_config_from_file() {
    let file = toml_file(PIPELINE_TOML);
    let config = ConfigLoader::new()
        .without_environment()
        .add_path(file.path())
        .load_pipeline_config()
        .unwrap();

    assert_eq!(config.filter.low_hz, 0.5);
    assert_eq!(config.filter.notch_hz, Some(50.0));
    assert_eq!(config.filter.reference, ReferenceScheme::Average);
    assert_eq!(config.artifact.amplitude_threshold, 75.0);
    assert_eq!(config.artifact.window_samples, 250);
    // unspecified fields keep their defaults
    assert_eq!(config.artifact.gradient_threshold, PipelineConfig::default().artifact.gradient_threshold);
    assert_eq!(config.epoch.baseline, Some((-100, 0)));
    assert!(config.features.include_invalid);

    assert_eq!(config.features.specs.len(), 2);
    assert_eq!(
        config.features.specs[0],
        FeatureSpec::band_power("alpha", 8.0, 12.0, ChannelSelection::named(["Pz", "Oz"]))
    );
    match &config.features.specs[1] {
        FeatureSpec::Evoked {
            name,
            measure,
            window,
            channels,
        } => {
            assert_eq!(name, "p3");
            assert_eq!(*measure, EvokedMeasure::MeanAmplitude);
            assert_eq!(*window, Some((250, 500)));
            assert_eq!(*channels, ChannelSelection::All);
        }
        other => panic!("expected evoked spec, got {:?}", other),
    }
}

#[test]
fn test_from_file_shortcut() {
    let file = toml_file(PIPELINE_TOML);
    let config = ConfigLoader::from_file(file.path()).unwrap();
    assert_eq!(config.filter.high_hz, 30.0);
    assert_eq!(config.epoch.window_end, 600);
}

#[test]
fn test_later_layers_override_earlier_ones() {
    let base = toml_file(PIPELINE_TOML);
    let overlay = toml_file("[filter]\nhigh_hz = 45.0\n\n[artifact]\nwindow_samples = 100\n");

    let config = ConfigLoader::with_paths(vec![base.path().to_path_buf(), overlay.path().to_path_buf()])
        .without_environment()
        .load_pipeline_config()
        .unwrap();

    assert_eq!(config.filter.low_hz, 0.5);
    assert_eq!(config.filter.high_hz, 45.0);
    assert_eq!(config.artifact.window_samples, 100);
}

#[test]
fn test_environment_overrides_files() {
    let file = toml_file(PIPELINE_TOML);
    std::env::set_var("EEG__ARTIFACT__GRADIENT_THRESHOLD", "12.5");

    let config = ConfigLoader::new().add_path(file.path()).load_pipeline_config().unwrap();
    std::env::remove_var("EEG__ARTIFACT__GRADIENT_THRESHOLD");

    assert_eq!(config.artifact.gradient_threshold, 12.5);
    assert_eq!(config.artifact.window_samples, 250);
}

#[test]
fn test_missing_file_is_configuration_error() {
    let result = ConfigLoader::new()
        .without_environment()
        .add_path("/nonexistent/eeg/pipeline.toml")
        .load_pipeline_config();
    assert!(matches!(result, Err(EegError::Configuration { .. })));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let file = toml_file("[filter]\nlow_hz = 40.0\nhigh_hz = 10.0\n");
    let result = ConfigLoader::new()
        .without_environment()
        .add_path(file.path())
        .load_pipeline_config();
    assert!(matches!(result, Err(EegError::Configuration { .. })));
}

#[test]
fn test_pipeline_config_toml_round_trip() {
    let config = ConfigLoader::from_toml_str(PIPELINE_TOML).unwrap();
    let rendered = ConfigLoader::to_toml_string(&config).unwrap();
    assert_eq!(ConfigLoader::from_toml_str(&rendered).unwrap(), config);
}

#[test]
fn test_synthetic_config_from_file() {
    let file = toml_file(
        r#"
duration_secs = 2.0
sampling_rate = 256.0
channel_labels = ["C3", "C4"]

[noise]
amplitude = 0.3

[[components]]
channels = { named = ["C3"] }
waveform = { type = "sinusoid", frequency_hz = 12.0, amplitude = 1.0 }

[[components]]
waveform = { type = "pulse", amplitude = 4.0, width_secs = 0.02, latency_secs = 0.25, locked_to = "tone" }

[[markers]]
label = "tone"
time_secs = 0.5

[[markers]]
label = "tone"
time_secs = 1.25
"#,
    );

    let config: SyntheticConfig = ConfigLoader::new()
        .without_environment()
        .add_path(file.path())
        .load()
        .unwrap();

    assert_eq!(config.channel_labels, vec!["C3", "C4"]);
    assert_eq!(config.noise.as_ref().map(|n| n.seed), Some(42));
    assert_eq!(config.components.len(), 2);
    assert!(matches!(
        config.components[1].waveform,
        Waveform::Pulse { locked_to: Some(ref l), .. } if l == "tone"
    ));

    let buffer = SyntheticGenerator::new(config).unwrap().generate().unwrap();
    assert_eq!(buffer.sample_count(), 512);
    assert_eq!(buffer.markers()[1].index, 320);
}
