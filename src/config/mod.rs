// src/config/mod.rs
//! Pipeline configuration

pub mod constants;
pub mod loader;
pub mod processing_config;

pub use loader::ConfigLoader;
pub use processing_config::*;

use serde::{Deserialize, Serialize};

use crate::error::{EegError, EegResult};

/// Complete analysis configuration for one pipeline run
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    /// Preprocessing chain
    #[serde(default)]
    pub filter: FilterConfig,

    /// Artifact thresholds
    #[serde(default)]
    pub artifact: ArtifactConfig,

    /// Epoch window and baseline
    #[serde(default)]
    pub epoch: EpochConfig,

    /// Feature specs and switches
    #[serde(default)]
    pub features: FeatureConfig,
}

impl PipelineConfig {
    /// Check cross-field constraints, reporting every violation at once.
    ///
    /// Constraints that depend on the recording (Nyquist, channel names) are
    /// checked by the stages themselves.
    pub fn validate(&self) -> EegResult<()> {
        let mut violations = Vec::new();

        let f = &self.filter;
        if !(f.low_hz >= 0.0 && f.low_hz < f.high_hz) {
            violations.push(format!("filter band [{}, {}] Hz is empty or negative", f.low_hz, f.high_hz));
        }
        if let Some(notch) = f.notch_hz {
            if notch <= 0.0 || f.notch_width_hz <= 0.0 {
                violations.push(format!("notch {} Hz / width {} Hz must be positive", notch, f.notch_width_hz));
            }
        }
        if let Some(rate) = f.resample_hz {
            if !(rate > 0.0 && rate.is_finite()) {
                violations.push(format!("resample rate {} Hz must be positive", rate));
            }
        }
        if let ReferenceScheme::Channels(names) = &f.reference {
            if names.is_empty() {
                violations.push("reference channel list is empty".to_string());
            }
        }

        let a = &self.artifact;
        if a.window_samples == 0 {
            violations.push("artifact window_samples must be at least 1".to_string());
        }
        if a.amplitude_threshold <= 0.0 || a.gradient_threshold <= 0.0 {
            violations.push("artifact thresholds must be positive".to_string());
        }

        let e = &self.epoch;
        if e.window_start > 0 || e.window_end < 0 {
            violations.push(format!(
                "epoch window [{}, {}] must contain the marker onset",
                e.window_start, e.window_end
            ));
        }
        if let Some((b0, b1)) = e.baseline {
            if b0 > b1 || b0 < e.window_start || b1 > e.window_end {
                violations.push(format!("baseline [{}, {}] must lie inside the epoch window", b0, b1));
            }
        }

        if self.features.specs.is_empty() {
            violations.push("no features requested".to_string());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(EegError::configuration("pipeline", violations.join("; ")))
        }
    }
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;
    use crate::processing::features::{ChannelSelection, FeatureSpec};

    pub fn low_hz() -> f64 { filters::DEFAULT_LOW_HZ }
    pub fn high_hz() -> f64 { filters::DEFAULT_HIGH_HZ }
    pub fn notch_width_hz() -> f64 { filters::DEFAULT_NOTCH_WIDTH_HZ }

    pub fn amplitude_threshold() -> f64 { artifact::DEFAULT_AMPLITUDE_THRESHOLD }
    pub fn gradient_threshold() -> f64 { artifact::DEFAULT_GRADIENT_THRESHOLD }
    pub fn window_samples() -> usize { artifact::DEFAULT_WINDOW_SAMPLES }

    pub fn epoch_window_start() -> i64 { epoch::DEFAULT_WINDOW_START }
    pub fn epoch_window_end() -> i64 { epoch::DEFAULT_WINDOW_END }

    pub fn feature_specs() -> Vec<FeatureSpec> {
        vec![
            FeatureSpec::BandPower {
                name: "theta".to_string(),
                low_hz: bands::THETA.0,
                high_hz: bands::THETA.1,
                channels: ChannelSelection::All,
            },
            FeatureSpec::BandPower {
                name: "alpha".to_string(),
                low_hz: bands::ALPHA.0,
                high_hz: bands::ALPHA.1,
                channels: ChannelSelection::All,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.epoch.epoch_len(), 1001);
        assert_eq!(config.artifact.step(), 100);
    }

    #[test]
    fn test_validation_reports_all_violations() {
        let mut config = PipelineConfig::default();
        config.filter.low_hz = 50.0;
        config.filter.high_hz = 10.0;
        config.artifact.window_samples = 0;
        config.epoch.window_start = 10;

        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("filter band"));
        assert!(message.contains("window_samples"));
        assert!(message.contains("epoch window"));
    }

    #[test]
    fn test_baseline_outside_window_rejected() {
        let mut config = PipelineConfig::default();
        config.epoch.baseline = Some((-500, 0));
        assert!(config.validate().is_err());

        config.epoch.baseline = Some((-100, 0));
        assert!(config.validate().is_ok());
    }
}
