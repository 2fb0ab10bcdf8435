//! Spectral band power of epoch channels

use ndarray::ArrayView1;

use crate::error::{EegError, EegResult};
use crate::processing::epochs::Epoch;
use crate::processing::filters::validate_band;
use crate::processing::spectral::{FftPlan, Spectrum};

/// Mean squared amplitude of `signal` band-limited to `[low_hz, high_hz]`
pub fn band_power(
    signal: ArrayView1<'_, f64>,
    sampling_rate: f64,
    low_hz: f64,
    high_hz: f64,
) -> EegResult<f64> {
    validate_band(low_hz, high_hz, sampling_rate / 2.0)?;
    if signal.is_empty() {
        return Err(EegError::insufficient("band_power", "signal has no samples"));
    }
    let plan = FftPlan::new(signal.len());
    Ok(plan.spectrum(signal, sampling_rate).band_mean_square(low_hz, high_hz))
}

/// Band power as a fraction of the broadband power of the same channel
pub(super) fn relative_power(spectrum: &Spectrum, low_hz: f64, high_hz: f64, feature: &str) -> EegResult<f64> {
    let total = spectrum.mean_square();
    if total <= 0.0 {
        return Err(EegError::insufficient(feature, "channel has zero total power"));
    }
    Ok(spectrum.band_mean_square(low_hz, high_hz) / total)
}

/// Lazily computed per-channel spectra of one epoch
pub(super) struct EpochSpectra<'a> {
    plan: &'a FftPlan,
    epoch: &'a Epoch,
    sampling_rate: f64,
    cache: Vec<Option<Spectrum>>,
}

impl<'a> EpochSpectra<'a> {
    pub(super) fn new(plan: &'a FftPlan, epoch: &'a Epoch, sampling_rate: f64) -> Self {
        Self {
            plan,
            epoch,
            sampling_rate,
            cache: vec![None; epoch.samples().nrows()],
        }
    }

    pub(super) fn channel(&mut self, index: usize) -> &Spectrum {
        let (plan, epoch, rate) = (self.plan, self.epoch, self.sampling_rate);
        self.cache[index].get_or_insert_with(|| plan.spectrum(epoch.channel(index), rate))
    }
}
