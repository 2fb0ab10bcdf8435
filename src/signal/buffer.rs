// src/signal/buffer.rs
//! Immutable multichannel recording

use ndarray::{Array2, ArrayView1};
use std::collections::HashSet;
use std::sync::Arc;

use super::marker::{sort_markers, Marker};
use crate::error::{EegError, EegResult};

/// Immutable multichannel time series with event markers.
///
/// The sample matrix is `channels × samples`. Matrix, labels and markers are
/// reference counted, so clones are cheap and transformations that only touch
/// one part reuse the others.
#[derive(Debug, Clone)]
pub struct SignalBuffer {
    sampling_rate: f64,
    channel_labels: Arc<[String]>,
    samples: Arc<Array2<f64>>,
    markers: Arc<[Marker]>,
}

impl SignalBuffer {
    /// Construct and validate a buffer.
    ///
    /// Markers are stably sorted by onset.
    pub fn new(
        sampling_rate: f64,
        channel_labels: Vec<String>,
        samples: Array2<f64>,
        markers: Vec<Marker>,
    ) -> EegResult<Self> {
        validate_rate(sampling_rate)?;
        validate_layout(&channel_labels, &samples)?;
        validate_finite(&channel_labels, &samples)?;
        let markers = validate_markers(markers, samples.ncols())?;

        Ok(Self {
            sampling_rate,
            channel_labels: channel_labels.into(),
            samples: Arc::new(samples),
            markers: markers.into(),
        })
    }

    /// Same labels and markers over a new sample matrix of identical shape
    pub fn with_samples(&self, samples: Array2<f64>) -> EegResult<Self> {
        if samples.dim() != self.samples.dim() {
            return Err(EegError::shape(
                "replacement matrix must keep the buffer shape",
                format!("{:?}", self.samples.dim()),
                format!("{:?}", samples.dim()),
            ));
        }
        validate_finite(&self.channel_labels, &samples)?;
        Ok(Self {
            sampling_rate: self.sampling_rate,
            channel_labels: Arc::clone(&self.channel_labels),
            samples: Arc::new(samples),
            markers: Arc::clone(&self.markers),
        })
    }

    /// Same samples with a new marker list
    pub fn with_markers(&self, markers: Vec<Marker>) -> EegResult<Self> {
        let markers = validate_markers(markers, self.sample_count())?;
        Ok(Self {
            sampling_rate: self.sampling_rate,
            channel_labels: Arc::clone(&self.channel_labels),
            samples: Arc::clone(&self.samples),
            markers: markers.into(),
        })
    }

    /// New buffer at a different rate; markers are supplied already rescaled
    pub(crate) fn with_rate(
        &self,
        sampling_rate: f64,
        samples: Array2<f64>,
        markers: Vec<Marker>,
    ) -> EegResult<Self> {
        validate_rate(sampling_rate)?;
        validate_finite(&self.channel_labels, &samples)?;
        let markers = validate_markers(markers, samples.ncols())?;
        Ok(Self {
            sampling_rate,
            channel_labels: Arc::clone(&self.channel_labels),
            samples: Arc::new(samples),
            markers: markers.into(),
        })
    }

    /// Subset of channels, in the requested order
    pub fn select_channels(&self, labels: &[&str]) -> EegResult<Self> {
        let indices = labels
            .iter()
            .map(|label| self.require_channel(label))
            .collect::<EegResult<Vec<_>>>()?;

        let selected = self.samples.select(ndarray::Axis(0), &indices);
        let labels: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        validate_layout(&labels, &selected)?;

        Ok(Self {
            sampling_rate: self.sampling_rate,
            channel_labels: labels.into(),
            samples: Arc::new(selected),
            markers: Arc::clone(&self.markers),
        })
    }

    /// Samples per second
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Half the sampling rate
    pub fn nyquist(&self) -> f64 {
        self.sampling_rate / 2.0
    }

    /// Channel labels in row order
    pub fn channel_labels(&self) -> &[String] {
        &self.channel_labels
    }

    /// Number of channels (matrix rows)
    pub fn channel_count(&self) -> usize {
        self.samples.nrows()
    }

    /// Number of samples per channel (matrix columns)
    pub fn sample_count(&self) -> usize {
        self.samples.ncols()
    }

    /// Recording length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.sample_count() as f64 / self.sampling_rate
    }

    /// The `channels × samples` matrix
    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    /// Markers sorted by onset
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Row index of a channel, if present
    pub fn channel_index(&self, label: &str) -> Option<usize> {
        self.channel_labels.iter().position(|l| l == label)
    }

    /// Row index of a channel, or `UnknownChannel`
    pub fn require_channel(&self, label: &str) -> EegResult<usize> {
        self.channel_index(label)
            .ok_or_else(|| EegError::UnknownChannel(label.to_string()))
    }

    /// Samples of one channel by label
    pub fn channel(&self, label: &str) -> EegResult<ArrayView1<'_, f64>> {
        let idx = self.require_channel(label)?;
        Ok(self.samples.row(idx))
    }

    /// True when both buffers share the same sample allocation
    pub fn shares_samples_with(&self, other: &SignalBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

fn validate_rate(sampling_rate: f64) -> EegResult<()> {
    if sampling_rate > 0.0 && sampling_rate.is_finite() {
        Ok(())
    } else {
        Err(EegError::Rate(sampling_rate))
    }
}

fn validate_layout(channel_labels: &[String], samples: &Array2<f64>) -> EegResult<()> {
    if samples.nrows() != channel_labels.len() {
        return Err(EegError::shape(
            "matrix rows must equal channel label count",
            channel_labels.len(),
            samples.nrows(),
        ));
    }
    if channel_labels.is_empty() {
        return Err(EegError::shape("buffer needs at least one channel", ">= 1", 0));
    }
    if samples.ncols() == 0 {
        return Err(EegError::shape("buffer needs at least one sample", ">= 1", 0));
    }

    let mut seen = HashSet::with_capacity(channel_labels.len());
    for label in channel_labels {
        if !seen.insert(label.as_str()) {
            return Err(EegError::shape("channel labels must be unique", "unique labels", label));
        }
    }
    Ok(())
}

/// Every sample must be finite
fn validate_finite(channel_labels: &[String], samples: &Array2<f64>) -> EegResult<()> {
    for (label, row) in channel_labels.iter().zip(samples.outer_iter()) {
        if let Some(index) = row.iter().position(|x| !x.is_finite()) {
            return Err(EegError::shape(
                &format!("channel {} has a non-finite sample at index {}", label, index),
                "finite samples",
                row[index],
            ));
        }
    }
    Ok(())
}

fn validate_markers(mut markers: Vec<Marker>, sample_count: usize) -> EegResult<Vec<Marker>> {
    if let Some(bad) = markers.iter().find(|m| m.index >= sample_count) {
        return Err(EegError::MarkerRange {
            label: bad.label.clone(),
            index: bad.index,
            sample_count,
        });
    }
    sort_markers(&mut markers);
    Ok(markers)
}
