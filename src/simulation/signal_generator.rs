//! Synthetic EEG generation with known ground truth

use ndarray::{Array2, ArrayViewMut1};
use std::f64::consts::PI;
use tracing::{debug, info};

use super::config::{ComponentSpec, SyntheticConfig, Waveform};
use super::noise_models::NoiseModel;
use crate::config::constants::synthetic::PULSE_SUPPORT_SIGMAS;
use crate::error::EegResult;
use crate::signal::{Marker, SignalBuffer};

/// Builds [`SignalBuffer`]s from a validated [`SyntheticConfig`]
pub struct SyntheticGenerator {
    config: SyntheticConfig,
}

impl SyntheticGenerator {
    /// Validate the configuration
    pub fn new(config: SyntheticConfig) -> EegResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Render the recording. Deterministic for a given configuration.
    pub fn generate(&self) -> EegResult<SignalBuffer> {
        let c = &self.config;
        let n = c.sample_count();
        let markers = self.markers();
        let mut samples = Array2::from_elem((c.channel_labels.len(), n), c.baseline_offset);

        for component in &c.components {
            let channels = component.channels.resolve(&c.channel_labels)?;
            debug!(waveform = ?component.waveform, channels = channels.len(), "Adding component");
            for idx in channels {
                self.render(component, &markers, samples.row_mut(idx));
            }
        }

        if let Some(noise) = &c.noise {
            NoiseModel::new(noise).add_to(&mut samples);
        }

        info!(
            channels = c.channel_labels.len(),
            samples = n,
            components = c.components.len(),
            markers = markers.len(),
            "Generated synthetic recording"
        );
        SignalBuffer::new(c.sampling_rate, c.channel_labels.clone(), samples, markers)
    }

    fn markers(&self) -> Vec<Marker> {
        self.config
            .markers
            .iter()
            .map(|m| Marker::new(m.label.clone(), (m.time_secs * self.config.sampling_rate).round() as usize))
            .collect()
    }

    fn render(&self, component: &ComponentSpec, markers: &[Marker], mut row: ArrayViewMut1<'_, f64>) {
        let fs = self.config.sampling_rate;
        let onset = component.onset_secs.unwrap_or(0.0);
        let offset = component.offset_secs.unwrap_or(f64::INFINITY);
        let active = |t: f64| t >= onset && t < offset;

        match &component.waveform {
            Waveform::Sinusoid {
                frequency_hz,
                amplitude,
                phase_rad,
            } => {
                for (i, value) in row.iter_mut().enumerate() {
                    let t = i as f64 / fs;
                    if active(t) {
                        *value += amplitude * (2.0 * PI * frequency_hz * t + phase_rad).sin();
                    }
                }
            }
            Waveform::Pulse {
                amplitude,
                width_secs,
                latency_secs,
                locked_to,
            } => {
                let centres: Vec<f64> = match locked_to {
                    Some(label) => markers
                        .iter()
                        .filter(|m| &m.label == label)
                        .map(|m| m.index as f64 / fs + latency_secs)
                        .collect(),
                    None => vec![onset + latency_secs],
                };

                let support = PULSE_SUPPORT_SIGMAS * width_secs;
                let n = row.len();
                for centre in centres {
                    let first = ((centre - support) * fs).floor().max(0.0) as usize;
                    let last = (((centre + support) * fs).ceil().max(0.0) as usize).min(n.saturating_sub(1));
                    for i in first..=last {
                        let t = i as f64 / fs;
                        if active(t) {
                            let z = (t - centre) / width_secs;
                            row[i] += amplitude * (-0.5 * z * z).exp();
                        }
                    }
                }
            }
        }
    }
}
