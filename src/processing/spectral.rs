// src/processing/spectral.rs
//! FFT helpers shared by the filters, the resampler and band-power features

use ndarray::{Array1, ArrayView1};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Forward/inverse transforms planned once for a fixed signal length
pub struct FftPlan {
    len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

/// Two-sided spectrum of a real signal
#[derive(Debug, Clone)]
pub struct Spectrum {
    bins: Vec<Complex<f64>>,
    sampling_rate: f64,
}

impl FftPlan {
    /// Plan both directions for signals of `len` samples
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        }
    }

    /// Planned signal length
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length plan
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Spectrum of `signal`, which must have the planned length
    pub fn spectrum(&self, signal: ArrayView1<'_, f64>, sampling_rate: f64) -> Spectrum {
        debug_assert_eq!(signal.len(), self.len);
        let mut bins: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        self.forward.process(&mut bins);
        Spectrum { bins, sampling_rate }
    }

    /// Back to the time domain (real part, normalised)
    pub fn synthesize(&self, spectrum: Spectrum) -> Array1<f64> {
        debug_assert_eq!(spectrum.bins.len(), self.len);
        let mut bins = spectrum.bins;
        self.inverse.process(&mut bins);
        let scale = 1.0 / self.len as f64;
        bins.iter().map(|c| c.re * scale).collect()
    }

    /// Keep only the bins whose (absolute) frequency satisfies `keep`
    pub fn filter<F>(&self, signal: ArrayView1<'_, f64>, sampling_rate: f64, keep: F) -> Array1<f64>
    where
        F: Fn(f64) -> bool,
    {
        let mut spectrum = self.spectrum(signal, sampling_rate);
        spectrum.retain(keep);
        self.synthesize(spectrum)
    }
}

impl Spectrum {
    /// Number of bins
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True when there are no bins
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Absolute frequency of bin `k`; negative-frequency bins are mirrored
    pub fn bin_frequency(&self, k: usize) -> f64 {
        let n = self.bins.len();
        let folded = if k <= n / 2 { k } else { n - k };
        folded as f64 * self.sampling_rate / n as f64
    }

    /// Zero every bin whose frequency fails `keep`
    pub fn retain<F>(&mut self, keep: F)
    where
        F: Fn(f64) -> bool,
    {
        for k in 0..self.bins.len() {
            if !keep(self.bin_frequency(k)) {
                self.bins[k] = Complex::new(0.0, 0.0);
            }
        }
    }

    /// Mean squared amplitude of the signal restricted to `[low_hz, high_hz]`
    /// (Parseval; equals band-limiting then averaging x²)
    pub fn band_mean_square(&self, low_hz: f64, high_hz: f64) -> f64 {
        let n = self.bins.len() as f64;
        let energy: f64 = (0..self.bins.len())
            .filter(|&k| {
                let f = self.bin_frequency(k);
                f >= low_hz && f <= high_hz
            })
            .map(|k| self.bins[k].norm_sqr())
            .sum();
        energy / (n * n)
    }

    /// Mean squared amplitude over all frequencies
    pub fn mean_square(&self) -> f64 {
        let n = self.bins.len() as f64;
        self.bins.iter().map(|c| c.norm_sqr()).sum::<f64>() / (n * n)
    }
}

/// FFT resampler between two fixed lengths (spectral truncation or zero-padding)
pub struct Resampler {
    from_len: usize,
    to_len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl Resampler {
    /// Plan a resampler from `from_len` to `to_len` samples
    pub fn new(from_len: usize, to_len: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            from_len,
            to_len,
            forward: planner.plan_fft_forward(from_len),
            inverse: planner.plan_fft_inverse(to_len),
        }
    }

    /// Resample one channel of the planned input length
    pub fn process(&self, signal: ArrayView1<'_, f64>) -> Array1<f64> {
        debug_assert_eq!(signal.len(), self.from_len);
        let (n, m) = (self.from_len, self.to_len);
        if n == m {
            return signal.to_owned();
        }

        let mut input: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        self.forward.process(&mut input);

        let mut output = vec![Complex::new(0.0, 0.0); m];
        let common = n.min(m);
        let shared = (common - 1) / 2;

        output[0] = input[0];
        for k in 1..=shared {
            output[k] = input[k];
            output[m - k] = input[n - k];
        }

        // even common length: the shared Nyquist bin needs splitting or folding
        if common % 2 == 0 {
            let h = common / 2;
            if m > n {
                output[h] = input[h] * 0.5;
                output[m - h] = input[h] * 0.5;
            } else {
                output[h] = input[h] + input[n - h];
            }
        }

        self.inverse.process(&mut output);
        let scale = 1.0 / n as f64;
        output.iter().map(|c| c.re * scale).collect()
    }
}
