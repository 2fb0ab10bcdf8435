// src/processing/filters.rs
//! Preprocessing: zero-phase spectral filters, re-referencing and resampling
//!
//! Every operation is pure: the input buffer is left untouched and a new
//! [`SignalBuffer`] is returned. Filters keep the channel count and the number
//! of samples; only sample values (and for [`resample`], the rate) change.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::debug;

use super::spectral::{FftPlan, Resampler};
use crate::config::{FilterConfig, ReferenceScheme};
use crate::error::{EegError, EegResult};
use crate::signal::{Marker, SignalBuffer};

/// Keep content inside `[low_hz, high_hz]`
pub fn band_pass(buffer: &SignalBuffer, low_hz: f64, high_hz: f64) -> EegResult<SignalBuffer> {
    validate_band(low_hz, high_hz, buffer.nyquist())?;
    debug!(low_hz, high_hz, channels = buffer.channel_count(), "Band-pass filter");

    let plan = FftPlan::new(buffer.sample_count());
    let rate = buffer.sampling_rate();
    map_channels(buffer, |row| plan.filter(row, rate, |f| f >= low_hz && f <= high_hz))
}

/// Remove content within `width_hz / 2` of `center_hz`
pub fn notch(buffer: &SignalBuffer, center_hz: f64, width_hz: f64) -> EegResult<SignalBuffer> {
    let nyquist = buffer.nyquist();
    let half_width = width_hz / 2.0;
    if !(center_hz.is_finite() && width_hz.is_finite())
        || center_hz <= 0.0
        || width_hz <= 0.0
        || center_hz > nyquist
    {
        return Err(EegError::FrequencyRange {
            low_hz: center_hz - half_width,
            high_hz: center_hz + half_width,
            nyquist_hz: nyquist,
        });
    }
    debug!(center_hz, width_hz, "Notch filter");

    let plan = FftPlan::new(buffer.sample_count());
    let rate = buffer.sampling_rate();
    map_channels(buffer, |row| {
        plan.filter(row, rate, |f| (f - center_hz).abs() > half_width)
    })
}

/// Subtract the mean of the named reference channels from every channel
pub fn rereference(buffer: &SignalBuffer, reference_channels: &[&str]) -> EegResult<SignalBuffer> {
    if reference_channels.is_empty() {
        return Err(EegError::configuration("rereference", "no reference channels given"));
    }
    let indices = reference_channels
        .iter()
        .map(|label| buffer.require_channel(label))
        .collect::<EegResult<Vec<_>>>()?;
    debug!(reference = ?reference_channels, "Re-referencing");

    let reference = buffer
        .samples()
        .select(Axis(0), &indices)
        .mean_axis(Axis(0))
        .ok_or_else(|| EegError::configuration("rereference", "empty reference set"))?;
    subtract_reference(buffer, &reference)
}

/// Common average reference
pub fn average_reference(buffer: &SignalBuffer) -> EegResult<SignalBuffer> {
    debug!(channels = buffer.channel_count(), "Common average reference");
    let reference = buffer
        .samples()
        .mean_axis(Axis(0))
        .ok_or_else(|| EegError::configuration("average_reference", "buffer has no channels"))?;
    subtract_reference(buffer, &reference)
}

/// FFT resampling to `target_rate`.
///
/// Marker indices are scaled by the rate ratio, rounded to the nearest sample
/// and clamped into the new recording.
pub fn resample(buffer: &SignalBuffer, target_rate: f64) -> EegResult<SignalBuffer> {
    if !(target_rate > 0.0 && target_rate.is_finite()) {
        return Err(EegError::Rate(target_rate));
    }

    let ratio = target_rate / buffer.sampling_rate();
    let old_len = buffer.sample_count();
    let new_len = ((old_len as f64 * ratio).round() as usize).max(1);
    debug!(
        from_hz = buffer.sampling_rate(),
        to_hz = target_rate,
        old_len,
        new_len,
        "Resampling"
    );

    let resampler = Resampler::new(old_len, new_len);
    let mut samples = Array2::zeros((buffer.channel_count(), new_len));
    for (input, mut output) in buffer.samples().outer_iter().zip(samples.outer_iter_mut()) {
        output.assign(&resampler.process(input));
    }

    let markers = buffer
        .markers()
        .iter()
        .map(|m| {
            let scaled = (m.index as f64 * ratio).round() as usize;
            Marker::new(m.label.clone(), scaled.min(new_len - 1))
        })
        .collect();

    buffer.with_rate(target_rate, samples, markers)
}

/// Configured preprocessing chain
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: FilterConfig,
}

impl Preprocessor {
    /// Chain for one filter configuration
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Filter settings in use
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Band-pass, then notch, reference and resample when configured
    pub fn apply(&self, buffer: &SignalBuffer) -> EegResult<SignalBuffer> {
        let c = &self.config;
        let mut current = band_pass(buffer, c.low_hz, c.high_hz)?;

        if let Some(center) = c.notch_hz {
            current = notch(&current, center, c.notch_width_hz)?;
        }

        current = match &c.reference {
            ReferenceScheme::None => current,
            ReferenceScheme::Average => average_reference(&current)?,
            ReferenceScheme::Channels(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                rereference(&current, &names)?
            }
        };

        if let Some(rate) = c.resample_hz {
            current = resample(&current, rate)?;
        }

        Ok(current)
    }
}

pub(crate) fn validate_band(low_hz: f64, high_hz: f64, nyquist: f64) -> EegResult<()> {
    let valid = low_hz.is_finite()
        && high_hz.is_finite()
        && low_hz >= 0.0
        && low_hz < high_hz
        && high_hz <= nyquist;
    if valid {
        Ok(())
    } else {
        Err(EegError::FrequencyRange {
            low_hz,
            high_hz,
            nyquist_hz: nyquist,
        })
    }
}

fn map_channels<F>(buffer: &SignalBuffer, mut transform: F) -> EegResult<SignalBuffer>
where
    F: FnMut(ArrayView1<'_, f64>) -> Array1<f64>,
{
    let mut samples = Array2::zeros(buffer.samples().dim());
    for (input, mut output) in buffer.samples().outer_iter().zip(samples.outer_iter_mut()) {
        output.assign(&transform(input));
    }
    buffer.with_samples(samples)
}

fn subtract_reference(buffer: &SignalBuffer, reference: &Array1<f64>) -> EegResult<SignalBuffer> {
    let mut samples = buffer.samples().clone();
    for mut row in samples.outer_iter_mut() {
        row -= reference;
    }
    buffer.with_samples(samples)
}
