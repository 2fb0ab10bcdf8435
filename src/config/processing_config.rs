// src/config/processing_config.rs
//! Per-stage processing configuration structures
//!
//! Each stage receives its parameters explicitly; there is no ambient global
//! filter state.

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::processing::features::FeatureSpec;

/// Preprocessing chain: band-pass, optional notch, optional reference, optional resample
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilterConfig {
    /// Band-pass lower edge in Hz
    #[serde(default = "defaults::low_hz")]
    pub low_hz: f64,

    /// Band-pass upper edge in Hz
    #[serde(default = "defaults::high_hz")]
    pub high_hz: f64,

    /// Powerline notch centre; absent means no notch
    #[serde(default)]
    pub notch_hz: Option<f64>,

    /// Full width of the notch stop band in Hz
    #[serde(default = "defaults::notch_width_hz")]
    pub notch_width_hz: f64,

    /// Target sampling rate; absent keeps the input rate
    #[serde(default)]
    pub resample_hz: Option<f64>,

    /// Re-referencing applied after filtering
    #[serde(default)]
    pub reference: ReferenceScheme,
}

/// Re-referencing scheme applied after filtering
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(tag = "kind", content = "channels", rename_all = "snake_case")]
pub enum ReferenceScheme {
    /// Keep the recording reference
    #[default]
    None,
    /// Common average reference
    Average,
    /// Mean of the named channels (e.g. linked mastoids)
    Channels(Vec<String>),
}

/// Sliding-window artifact detection thresholds
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ArtifactConfig {
    /// Absolute amplitude limit
    #[serde(default = "defaults::amplitude_threshold")]
    pub amplitude_threshold: f64,

    /// Limit on |x[i+1] - x[i]|
    #[serde(default = "defaults::gradient_threshold")]
    pub gradient_threshold: f64,

    /// Optional limit on the window variance
    #[serde(default)]
    pub variance_threshold: Option<f64>,

    /// Window length in samples
    #[serde(default = "defaults::window_samples")]
    pub window_samples: usize,

    /// Hop between window starts; `None` means half a window
    #[serde(default)]
    pub step_samples: Option<usize>,
}

/// Event-locked epoch window, in samples relative to marker onset
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EpochConfig {
    /// First offset relative to onset (<= 0)
    #[serde(default = "defaults::epoch_window_start")]
    pub window_start: i64,

    /// Last offset relative to onset, inclusive (>= 0)
    #[serde(default = "defaults::epoch_window_end")]
    pub window_end: i64,

    /// Baseline correction range (inclusive offsets), e.g. `(-200, 0)`
    #[serde(default)]
    pub baseline: Option<(i64, i64)>,
}

/// Feature extraction settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FeatureConfig {
    /// Also extract from invalid epochs
    #[serde(default)]
    pub include_invalid: bool,

    /// Features to compute
    #[serde(default = "defaults::feature_specs")]
    pub specs: Vec<FeatureSpec>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_hz: defaults::low_hz(),
            high_hz: defaults::high_hz(),
            notch_hz: None,
            notch_width_hz: defaults::notch_width_hz(),
            resample_hz: None,
            reference: ReferenceScheme::None,
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            amplitude_threshold: defaults::amplitude_threshold(),
            gradient_threshold: defaults::gradient_threshold(),
            variance_threshold: None,
            window_samples: defaults::window_samples(),
            step_samples: None,
        }
    }
}

impl ArtifactConfig {
    /// Effective hop between consecutive window starts
    pub fn step(&self) -> usize {
        self.step_samples.unwrap_or(self.window_samples / 2).max(1)
    }
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            window_start: defaults::epoch_window_start(),
            window_end: defaults::epoch_window_end(),
            baseline: None,
        }
    }
}

impl EpochConfig {
    /// Number of samples in every epoch produced with this window
    pub fn epoch_len(&self) -> usize {
        (self.window_end - self.window_start + 1).max(0) as usize
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            specs: defaults::feature_specs(),
            include_invalid: false,
        }
    }
}
