//! Synthetic recording configuration structures

use serde::{Deserialize, Serialize};

use crate::config::constants::{signal, synthetic};
use crate::error::{EegError, EegResult};
use crate::signal::ChannelSelection;

/// Layout, components, noise and markers of one synthetic recording
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SyntheticConfig {
    /// Recording length in seconds
    pub duration_secs: f64,
    /// Samples per second
    pub sampling_rate: f64,
    /// One label per channel
    pub channel_labels: Vec<String>,
    /// Constant added to every channel
    #[serde(default)]
    pub baseline_offset: f64,
    /// Additive white noise; absent for a noiseless recording
    #[serde(default)]
    pub noise: Option<NoiseSpec>,
    /// Deterministic components
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    /// Markers to place
    #[serde(default)]
    pub markers: Vec<MarkerSpec>,
}

/// One additive ground-truth component
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ComponentSpec {
    /// Component is active for `onset_secs <= t < offset_secs`
    #[serde(default)]
    pub onset_secs: Option<f64>,
    /// End of the active range; unbounded if absent
    #[serde(default)]
    pub offset_secs: Option<f64>,
    /// Channels the component is added to
    #[serde(default)]
    pub channels: ChannelSelection,
    /// Shape of the component
    pub waveform: Waveform,
}

/// Waveform shape of a component
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Waveform {
    /// Sine wave
    Sinusoid {
        /// Frequency in Hz
        frequency_hz: f64,
        /// Peak amplitude
        amplitude: f64,
        /// Phase at `t = 0`
        #[serde(default)]
        phase_rad: f64,
    },
    /// Gaussian transient with standard deviation `width_secs`.
    ///
    /// Locked to a marker label it repeats `latency_secs` after every such
    /// marker; otherwise a single pulse peaks `latency_secs` after the
    /// component onset.
    Pulse {
        /// Peak amplitude
        amplitude: f64,
        /// Gaussian standard deviation in seconds
        width_secs: f64,
        /// Delay of the peak after the marker or onset
        #[serde(default)]
        latency_secs: f64,
        /// Marker label the pulse repeats after
        #[serde(default)]
        locked_to: Option<String>,
    },
}

/// Marker to place at a given time
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MarkerSpec {
    /// Marker label
    pub label: String,
    /// Time in seconds, rounded to the nearest sample
    pub time_secs: f64,
}

/// Gaussian noise parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NoiseSpec {
    /// Standard deviation of the additive Gaussian noise
    pub amplitude: f64,
    /// RNG seed
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    synthetic::DEFAULT_NOISE_SEED
}

impl ComponentSpec {
    /// Sinusoid active for the whole recording
    pub fn sinusoid(channels: ChannelSelection, frequency_hz: f64, amplitude: f64) -> Self {
        Self {
            onset_secs: None,
            offset_secs: None,
            channels,
            waveform: Waveform::Sinusoid {
                frequency_hz,
                amplitude,
                phase_rad: 0.0,
            },
        }
    }

    /// Pulse repeating after every `label` marker
    pub fn locked_pulse(channels: ChannelSelection, label: &str, amplitude: f64, latency_secs: f64, width_secs: f64) -> Self {
        Self {
            onset_secs: None,
            offset_secs: None,
            channels,
            waveform: Waveform::Pulse {
                amplitude,
                width_secs,
                latency_secs,
                locked_to: Some(label.to_string()),
            },
        }
    }

    /// Restrict the component to `[onset_secs, offset_secs)`
    pub fn between(mut self, onset_secs: f64, offset_secs: f64) -> Self {
        self.onset_secs = Some(onset_secs);
        self.offset_secs = Some(offset_secs);
        self
    }
}

impl MarkerSpec {
    /// Marker at `time_secs`
    pub fn new(label: &str, time_secs: f64) -> Self {
        Self {
            label: label.to_string(),
            time_secs,
        }
    }

    /// `count` markers of one label, `interval_secs` apart
    pub fn regular(label: &str, first_secs: f64, interval_secs: f64, count: usize) -> Vec<Self> {
        (0..count)
            .map(|i| Self::new(label, first_secs + i as f64 * interval_secs))
            .collect()
    }
}

impl SyntheticConfig {
    /// Number of samples in the generated recording
    pub fn sample_count(&self) -> usize {
        (self.duration_secs * self.sampling_rate).round() as usize
    }

    /// Check rate, layout, components and markers
    pub fn validate(&self) -> EegResult<()> {
        if !(self.sampling_rate > 0.0 && self.sampling_rate.is_finite()) {
            return Err(EegError::Rate(self.sampling_rate));
        }
        if !(self.duration_secs > 0.0 && self.duration_secs.is_finite()) || self.sample_count() == 0 {
            return Err(EegError::configuration(
                "synthetic",
                format!("duration of {} s yields no samples", self.duration_secs),
            ));
        }
        if self.channel_labels.is_empty() {
            return Err(EegError::configuration("synthetic", "at least one channel is required"));
        }

        let n = self.sample_count();
        for marker in &self.markers {
            if !(marker.time_secs >= 0.0) {
                return Err(EegError::configuration(
                    "synthetic",
                    format!("marker '{}' has negative time {}", marker.label, marker.time_secs),
                ));
            }
            let index = (marker.time_secs * self.sampling_rate).round() as usize;
            if index >= n {
                return Err(EegError::MarkerRange {
                    label: marker.label.clone(),
                    index,
                    sample_count: n,
                });
            }
        }

        if let Some(noise) = &self.noise {
            if !(noise.amplitude >= 0.0 && noise.amplitude.is_finite()) {
                return Err(EegError::configuration(
                    "synthetic",
                    format!("noise amplitude {} must be non-negative", noise.amplitude),
                ));
            }
        }

        let nyquist = self.sampling_rate / 2.0;
        for component in &self.components {
            component.channels.resolve(&self.channel_labels)?;

            if let (Some(on), Some(off)) = (component.onset_secs, component.offset_secs) {
                if on >= off {
                    return Err(EegError::configuration(
                        "synthetic",
                        format!("component onset {} s is not before offset {} s", on, off),
                    ));
                }
            }

            match &component.waveform {
                Waveform::Sinusoid { frequency_hz, .. } => {
                    if !(*frequency_hz >= 0.0 && *frequency_hz <= nyquist) {
                        return Err(EegError::FrequencyRange {
                            low_hz: *frequency_hz,
                            high_hz: *frequency_hz,
                            nyquist_hz: nyquist,
                        });
                    }
                }
                Waveform::Pulse { width_secs, locked_to, .. } => {
                    if !(*width_secs > 0.0) {
                        return Err(EegError::configuration(
                            "synthetic",
                            format!("pulse width {} s must be positive", width_secs),
                        ));
                    }
                    if let Some(label) = locked_to {
                        if !self.markers.iter().any(|m| &m.label == label) {
                            return Err(EegError::configuration(
                                "synthetic",
                                format!("pulse locked to '{}' but no such marker exists", label),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for SyntheticConfig {
    /// Alpha rhythm on Cz with a marker-locked evoked pulse every second
    fn default() -> Self {
        let label = synthetic::DEFAULT_MARKER_LABEL;
        Self {
            duration_secs: signal::DEFAULT_DURATION_SECS,
            sampling_rate: signal::DEFAULT_SAMPLING_RATE_HZ,
            channel_labels: vec!["Fz".to_string(), "Cz".to_string()],
            baseline_offset: 0.0,
            noise: Some(NoiseSpec {
                amplitude: 0.5,
                seed: synthetic::DEFAULT_NOISE_SEED,
            }),
            components: vec![
                ComponentSpec::sinusoid(ChannelSelection::named(["Cz"]), 10.0, 2.0),
                ComponentSpec::locked_pulse(ChannelSelection::All, label, 5.0, 0.3, 0.05),
            ],
            markers: MarkerSpec::regular(label, 0.5, 1.0, 5),
        }
    }
}
