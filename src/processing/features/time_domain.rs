//! Evoked (event-averaged) responses and their time-domain measures

use ndarray::{s, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{EegError, EegResult};
use crate::processing::epochs::EpochSet;

/// Scalar summary of an averaged waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvokedMeasure {
    /// Mean rectified amplitude over the measurement window
    MeanAmplitude,
    /// Largest absolute amplitude
    PeakAmplitude,
    /// Time of the largest absolute amplitude, in seconds relative to onset
    PeakLatency,
}

impl fmt::Display for EvokedMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvokedMeasure::MeanAmplitude => "mean_amplitude",
            EvokedMeasure::PeakAmplitude => "peak_amplitude",
            EvokedMeasure::PeakLatency => "peak_latency",
        })
    }
}

/// Sample-wise mean across all epochs of one label
#[derive(Debug, Clone, PartialEq)]
pub struct EvokedAverage {
    /// Marker label
    pub label: String,
    /// Number of epochs averaged
    pub epoch_count: usize,
    /// `channels × epoch length`
    pub waveform: Array2<f64>,
    /// Offset of the first column relative to marker onset, in samples
    pub window_start: i64,
    /// Sampling rate of the epochs
    pub sampling_rate: f64,
}

impl EvokedAverage {
    /// Measure `channel` over the offset range `window` (whole epoch if `None`)
    pub fn measure(&self, channel: usize, measure: EvokedMeasure, window: Option<(i64, i64)>) -> EegResult<f64> {
        let len = self.waveform.ncols() as i64;
        let (from, to) = match window {
            Some((w0, w1)) => (w0 - self.window_start, w1 - self.window_start),
            None => (0, len - 1),
        };
        if from < 0 || to >= len || from > to {
            return Err(EegError::configuration(
                "evoked",
                format!("measurement window {:?} is outside the epoch", window),
            ));
        }
        if channel >= self.waveform.nrows() {
            return Err(EegError::UnknownChannel(format!("#{}", channel)));
        }
        let trace = self.waveform.slice(s![channel, from as usize..=to as usize]);

        Ok(match measure {
            EvokedMeasure::MeanAmplitude => mean_rectified(trace),
            EvokedMeasure::PeakAmplitude => trace[peak_index(trace)].abs(),
            EvokedMeasure::PeakLatency => {
                let offset = from + peak_index(trace) as i64 + self.window_start;
                offset as f64 / self.sampling_rate
            }
        })
    }
}

/// First pass of the evoked features: one average per marker label
pub fn evoked_averages(epochs: &EpochSet, include_invalid: bool) -> EegResult<BTreeMap<String, EvokedAverage>> {
    let (window_start, _) = epochs.window();
    let mut averages = BTreeMap::new();

    for (label, group) in epochs.group_by_label(include_invalid) {
        let views: Vec<_> = group.iter().map(|e| e.samples().view()).collect();
        let stacked = ndarray::stack(Axis(0), &views).map_err(|e| {
            EegError::shape("epochs of one label must share a shape", "equal epoch shapes", e)
        })?;
        let waveform = stacked
            .mean_axis(Axis(0))
            .ok_or_else(|| EegError::insufficient(label, "no epochs to average"))?;

        averages.insert(
            label.to_string(),
            EvokedAverage {
                label: label.to_string(),
                epoch_count: group.len(),
                waveform,
                window_start,
                sampling_rate: epochs.sampling_rate(),
            },
        );
    }
    Ok(averages)
}

fn mean_rectified(trace: ArrayView1<'_, f64>) -> f64 {
    trace.iter().map(|x| x.abs()).sum::<f64>() / trace.len() as f64
}

/// Index of the largest |x|; the earliest wins on ties
fn peak_index(trace: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, x) in trace.iter().enumerate() {
        if x.abs() > trace[best].abs() {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::artifact::RejectionMask;
    use crate::processing::epochs::segment;
    use crate::signal::{Marker, SignalBuffer};

    fn epochs() -> EpochSet {
        // target epochs carry +1 and +3 at onset, standard carries -2
        let mut samples = Array2::zeros((1, 100));
        samples[[0, 20]] = 1.0;
        samples[[0, 40]] = 3.0;
        samples[[0, 60]] = -2.0;
        let buffer = SignalBuffer::new(
            100.0,
            vec!["Cz".into()],
            samples,
            vec![Marker::new("target", 20), Marker::new("target", 40), Marker::new("standard", 60)],
        )
        .unwrap();
        segment(&buffer, &RejectionMask::clean(&buffer), -2, 3).unwrap()
    }

    #[test]
    fn test_averages_per_label() {
        let averages = evoked_averages(&epochs(), false).unwrap();
        assert_eq!(averages.len(), 2);

        let target = &averages["target"];
        assert_eq!(target.epoch_count, 2);
        assert_eq!(target.waveform.dim(), (1, 6));
        assert_eq!(target.waveform[[0, 2]], 2.0);
    }

    #[test]
    fn test_measures() {
        let averages = evoked_averages(&epochs(), false).unwrap();
        let standard = &averages["standard"];

        let measure = |m: EvokedMeasure, window: Option<(i64, i64)>| standard.measure(0, m, window).unwrap();

        assert_eq!(measure(EvokedMeasure::PeakAmplitude, None), 2.0);
        assert_eq!(measure(EvokedMeasure::PeakLatency, None), 0.0);
        assert!((measure(EvokedMeasure::MeanAmplitude, None) - 2.0 / 6.0).abs() < 1e-12);
        assert_eq!(measure(EvokedMeasure::PeakAmplitude, Some((1, 3))), 0.0);
        assert_eq!(measure(EvokedMeasure::PeakLatency, Some((1, 3))), 0.01);

        assert!(standard.measure(0, EvokedMeasure::PeakAmplitude, Some((-5, 0))).is_err());
        assert!(standard.measure(3, EvokedMeasure::PeakAmplitude, None).is_err());
    }

    #[test]
    fn test_measure_names() {
        assert_eq!(EvokedMeasure::PeakLatency.to_string(), "peak_latency");
    }
}
