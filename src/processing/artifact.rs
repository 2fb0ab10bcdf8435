// src/processing/artifact.rs
//! Sliding-window artifact rejection
//!
//! Each channel is scanned with overlapping windows. A window is flagged as a
//! whole when it breaches the amplitude, gradient or (optional) variance
//! threshold; a sample is rejected if any window covering it was flagged.
//! The gradient check includes the step from the sample just before the window.

use ndarray::{s, Array2, ArrayView1, Axis};
use std::ops::Range;
use tracing::{debug, info};

use crate::config::ArtifactConfig;
use crate::error::{EegError, EegResult};
use crate::signal::SignalBuffer;

/// Per-channel, per-sample rejection flags for one buffer
#[derive(Debug, Clone, PartialEq)]
pub struct RejectionMask {
    flags: Array2<bool>,
}

impl RejectionMask {
    /// Mask with nothing rejected, shaped like `buffer`
    pub fn clean(buffer: &SignalBuffer) -> Self {
        Self {
            flags: Array2::from_elem(buffer.samples().dim(), false),
        }
    }

    /// Wrap precomputed flags, e.g. manual annotations
    pub fn from_flags(flags: Array2<bool>) -> Self {
        Self { flags }
    }

    /// `(channels, samples)`
    pub fn shape(&self) -> (usize, usize) {
        self.flags.dim()
    }

    /// Raw `channels × samples` flags
    pub fn flags(&self) -> &Array2<bool> {
        &self.flags
    }

    /// Flag at one position; out-of-range positions are not rejected
    pub fn is_rejected(&self, channel: usize, sample: usize) -> bool {
        self.flags.get((channel, sample)).copied().unwrap_or(false)
    }

    /// True if any channel is rejected anywhere in `range`
    pub fn any_rejected_in(&self, range: Range<usize>) -> bool {
        let end = range.end.min(self.flags.ncols());
        if range.start >= end {
            return false;
        }
        self.flags.slice(s![.., range.start..end]).iter().any(|&f| f)
    }

    /// Number of rejected samples over all channels
    pub fn rejected_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    /// Rejected share of all samples
    pub fn rejected_fraction(&self) -> f64 {
        if self.flags.is_empty() {
            return 0.0;
        }
        self.rejected_count() as f64 / self.flags.len() as f64
    }

    /// Indices of channels with at least one rejected sample
    pub fn rejected_channels(&self) -> Vec<usize> {
        self.flags
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, row)| row.iter().any(|&f| f))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Logical OR of two masks over the same buffer shape
    pub fn merge(&self, other: &RejectionMask) -> EegResult<RejectionMask> {
        if self.shape() != other.shape() {
            return Err(EegError::shape(
                "rejection masks must have the same shape to merge",
                format!("{:?}", self.shape()),
                format!("{:?}", other.shape()),
            ));
        }
        let mut flags = self.flags.clone();
        flags.zip_mut_with(&other.flags, |a, &b| *a = *a || b);
        Ok(Self { flags })
    }

    /// Fail unless this mask was produced for a buffer of `buffer`'s shape
    pub fn check_matches(&self, buffer: &SignalBuffer) -> EegResult<()> {
        let expected = buffer.samples().dim();
        if self.shape() == expected {
            Ok(())
        } else {
            Err(EegError::shape(
                "rejection mask does not match the buffer",
                format!("{:?}", expected),
                format!("{:?}", self.shape()),
            ))
        }
    }
}

/// Threshold-based artifact detector
#[derive(Debug, Clone)]
pub struct ArtifactDetector {
    config: ArtifactConfig,
}

impl ArtifactDetector {
    /// Validate the window and step settings
    pub fn new(config: ArtifactConfig) -> EegResult<Self> {
        if config.window_samples == 0 {
            return Err(EegError::configuration("artifact", "window_samples must be at least 1"));
        }
        if config.step() > config.window_samples {
            return Err(EegError::configuration(
                "artifact",
                format!(
                    "step of {} samples would leave gaps between {}-sample windows",
                    config.step(),
                    config.window_samples
                ),
            ));
        }
        Ok(Self { config })
    }

    /// Thresholds in use
    pub fn config(&self) -> &ArtifactConfig {
        &self.config
    }

    /// Rejection mask for `buffer`
    pub fn detect(&self, buffer: &SignalBuffer) -> RejectionMask {
        let mut flags = Array2::from_elem(buffer.samples().dim(), false);

        for (channel, (row, mut out)) in buffer
            .samples()
            .outer_iter()
            .zip(flags.outer_iter_mut())
            .enumerate()
        {
            let mut flagged_windows = 0usize;
            for window in windows(row.len(), self.config.window_samples, self.config.step()) {
                if self.window_is_artifact(row, window.clone()) {
                    out.slice_mut(s![window]).fill(true);
                    flagged_windows += 1;
                }
            }
            if flagged_windows > 0 {
                debug!(
                    channel = %buffer.channel_labels()[channel],
                    flagged_windows,
                    "Artifact windows flagged"
                );
            }
        }

        let mask = RejectionMask { flags };
        info!(
            rejected_fraction = mask.rejected_fraction(),
            channels = mask.rejected_channels().len(),
            "Artifact detection complete"
        );
        mask
    }

    fn window_is_artifact(&self, row: ArrayView1<'_, f64>, range: Range<usize>) -> bool {
        let c = &self.config;
        let window = row.slice(s![range.clone()]);

        if window.iter().any(|x| x.abs() > c.amplitude_threshold) {
            return true;
        }
        // include the step from the previous sample
        let lead = row.slice(s![range.start.saturating_sub(1)..range.end]);
        if lead
            .iter()
            .zip(lead.iter().skip(1))
            .any(|(a, b)| (b - a).abs() > c.gradient_threshold)
        {
            return true;
        }
        match c.variance_threshold {
            Some(limit) if window.len() > 1 => window.var(0.0) > limit,
            _ => false,
        }
    }
}

/// Detect with default overlap and no variance criterion
pub fn detect(
    buffer: &SignalBuffer,
    amplitude_threshold: f64,
    gradient_threshold: f64,
    window_samples: usize,
) -> EegResult<RejectionMask> {
    let config = ArtifactConfig {
        amplitude_threshold,
        gradient_threshold,
        window_samples,
        ..ArtifactConfig::default()
    };
    Ok(ArtifactDetector::new(config)?.detect(buffer))
}

/// Window ranges covering `0..len`; the last one may be shorter than `size`
fn windows(len: usize, size: usize, step: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(len);
        ranges.push(start..end);
        if end >= len {
            break;
        }
        start += step;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Marker;

    fn flat_buffer(channels: usize, samples: usize) -> SignalBuffer {
        let labels = (1..=channels).map(|i| format!("Ch{}", i)).collect();
        SignalBuffer::new(100.0, labels, Array2::zeros((channels, samples)), vec![Marker::new("m", 0)]).unwrap()
    }

    fn with_value(buffer: &SignalBuffer, channel: usize, sample: usize, value: f64) -> SignalBuffer {
        let mut samples = buffer.samples().clone();
        samples[[channel, sample]] = value;
        buffer.with_samples(samples).unwrap()
    }

    #[test]
    fn test_windows_cover_partial_tail() {
        assert_eq!(windows(10, 4, 2), vec![0..4, 2..6, 4..8, 6..10]);
        assert_eq!(windows(11, 4, 4), vec![0..4, 4..8, 8..11]);
        assert_eq!(windows(3, 10, 5), vec![0..3]);
    }

    #[test]
    fn test_clean_signal_has_no_rejections() {
        let buffer = flat_buffer(2, 100);
        let mask = detect(&buffer, 10.0, 10.0, 20).unwrap();
        assert_eq!(mask.rejected_count(), 0);
        assert_eq!(mask.shape(), (2, 100));
    }

    #[test]
    fn test_amplitude_spike_flags_overlapping_windows() {
        let buffer = with_value(&flat_buffer(2, 100), 1, 50, 5.0);
        let mask = detect(&buffer, 1.0, 100.0, 20).unwrap();

        // windows 40..60 and 50..70 contain the spike
        assert!(mask.is_rejected(1, 40));
        assert!(mask.is_rejected(1, 69));
        assert!(!mask.is_rejected(1, 39));
        assert!(!mask.is_rejected(1, 70));
        assert!(!mask.is_rejected(0, 50));
        assert_eq!(mask.rejected_channels(), vec![1]);
        assert!(mask.any_rejected_in(65..80));
        assert!(!mask.any_rejected_in(70..100));
    }

    #[test]
    fn test_gradient_threshold() {
        let mut samples = Array2::zeros((1, 40));
        for i in 20..40 {
            samples[[0, i]] = 3.0;
        }
        let buffer = SignalBuffer::new(100.0, vec!["Cz".into()], samples, vec![]).unwrap();

        let mask = detect(&buffer, 10.0, 2.0, 10).unwrap();
        assert!(mask.is_rejected(0, 15));
        assert!(mask.is_rejected(0, 24));
        assert!(!mask.is_rejected(0, 5));

        let relaxed = detect(&buffer, 10.0, 5.0, 10).unwrap();
        assert_eq!(relaxed.rejected_count(), 0);
    }

    #[test]
    fn test_gradient_across_adjacent_windows() {
        let mut samples = Array2::zeros((1, 30));
        for i in 10..30 {
            samples[[0, i]] = 3.0;
        }
        let buffer = SignalBuffer::new(100.0, vec!["Cz".into()], samples, vec![]).unwrap();
        let config = ArtifactConfig {
            amplitude_threshold: 10.0,
            gradient_threshold: 2.0,
            window_samples: 10,
            step_samples: Some(10),
            ..ArtifactConfig::default()
        };
        let mask = ArtifactDetector::new(config).unwrap().detect(&buffer);

        // the jump sits between samples 9 and 10, on the window boundary
        assert!(mask.is_rejected(0, 10));
        assert!(mask.is_rejected(0, 19));
        assert!(!mask.is_rejected(0, 9));
        assert!(!mask.is_rejected(0, 20));
    }

    #[test]
    fn test_final_partial_window_evaluated() {
        let buffer = with_value(&flat_buffer(1, 25), 0, 24, 9.0);
        let config = ArtifactConfig {
            amplitude_threshold: 1.0,
            gradient_threshold: 100.0,
            window_samples: 10,
            step_samples: Some(10),
            ..ArtifactConfig::default()
        };
        let mask = ArtifactDetector::new(config).unwrap().detect(&buffer);
        assert!(mask.is_rejected(0, 20));
        assert!(!mask.is_rejected(0, 19));
    }

    #[test]
    fn test_variance_threshold() {
        let mut samples = Array2::zeros((1, 20));
        for i in (0..20).step_by(2) {
            samples[[0, i]] = 1.0;
        }
        let buffer = SignalBuffer::new(100.0, vec!["Cz".into()], samples, vec![]).unwrap();
        let config = ArtifactConfig {
            amplitude_threshold: 10.0,
            gradient_threshold: 10.0,
            variance_threshold: Some(0.1),
            window_samples: 10,
            step_samples: None,
        };
        let mask = ArtifactDetector::new(config).unwrap().detect(&buffer);
        assert_eq!(mask.rejected_fraction(), 1.0);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(detect(&flat_buffer(1, 10), 1.0, 1.0, 0).is_err());
        let config = ArtifactConfig {
            window_samples: 10,
            step_samples: Some(20),
            ..ArtifactConfig::default()
        };
        assert!(matches!(
            ArtifactDetector::new(config),
            Err(EegError::Configuration { .. })
        ));
    }

    #[test]
    fn test_merge_and_shape_checks() {
        let buffer = with_value(&flat_buffer(2, 50), 0, 10, 5.0);
        let a = detect(&buffer, 1.0, 100.0, 10).unwrap();
        let b = RejectionMask::clean(&buffer);
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged, a);

        let other = RejectionMask::clean(&flat_buffer(2, 60));
        assert!(matches!(a.merge(&other), Err(EegError::Shape { .. })));
        assert!(other.check_matches(&buffer).is_err());
        assert!(a.check_matches(&buffer).is_ok());
    }
}
