// src/processing/epochs.rs
//! Event-locked segmentation

use ndarray::{s, Array2, ArrayView1, Axis};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::artifact::RejectionMask;
use crate::config::EpochConfig;
use crate::error::{EegError, EegResult};
use crate::signal::{Marker, SignalBuffer};

/// Fixed-length window of samples around one marker
#[derive(Debug, Clone, PartialEq)]
pub struct Epoch {
    marker: Marker,
    samples: Array2<f64>,
    valid: bool,
}

impl Epoch {
    /// Originating marker
    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    /// Label of the originating marker
    pub fn label(&self) -> &str {
        &self.marker.label
    }

    /// Onset sample index of the originating marker
    pub fn onset(&self) -> usize {
        self.marker.index
    }

    /// `channels × epoch length`
    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    /// One channel of the epoch
    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.samples.row(index)
    }

    /// False when any sample in the window was rejected on any channel
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.samples.ncols()
    }

    /// True for a zero-length epoch
    pub fn is_empty(&self) -> bool {
        self.samples.ncols() == 0
    }
}

/// Epochs of one run, in marker order, with their shared layout
#[derive(Debug, Clone)]
pub struct EpochSet {
    channel_labels: Vec<String>,
    sampling_rate: f64,
    window_start: i64,
    window_end: i64,
    epochs: Vec<Epoch>,
    dropped: usize,
}

impl EpochSet {
    /// All epochs, in marker order
    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    /// Iterate over all epochs
    pub fn iter(&self) -> impl Iterator<Item = &Epoch> {
        self.epochs.iter()
    }

    /// Iterate over valid epochs
    pub fn valid(&self) -> impl Iterator<Item = &Epoch> {
        self.epochs.iter().filter(|e| e.valid)
    }

    /// Number of epochs
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    /// True when no epoch was cut
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Number of valid epochs
    pub fn valid_count(&self) -> usize {
        self.valid().count()
    }

    /// Number of invalid epochs
    pub fn invalid_count(&self) -> usize {
        self.epochs.len() - self.valid_count()
    }

    /// Markers whose window fell outside the recording
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Channel labels shared by all epochs
    pub fn channel_labels(&self) -> &[String] {
        &self.channel_labels
    }

    /// Row index of a channel, if present
    pub fn channel_index(&self, label: &str) -> Option<usize> {
        self.channel_labels.iter().position(|l| l == label)
    }

    /// Sampling rate of the source buffer
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Inclusive `(start, end)` offsets relative to onset
    pub fn window(&self) -> (i64, i64) {
        (self.window_start, self.window_end)
    }

    /// Samples per epoch
    pub fn epoch_len(&self) -> usize {
        (self.window_end - self.window_start + 1) as usize
    }

    /// Epochs grouped by marker label, each group in marker order
    pub fn group_by_label(&self, include_invalid: bool) -> BTreeMap<&str, Vec<&Epoch>> {
        let mut groups: BTreeMap<&str, Vec<&Epoch>> = BTreeMap::new();
        for epoch in self.epochs.iter().filter(|e| include_invalid || e.valid) {
            groups.entry(epoch.label()).or_default().push(epoch);
        }
        groups
    }
}

/// Cuts event-locked epochs out of a buffer
#[derive(Debug, Clone)]
pub struct Epocher {
    config: EpochConfig,
}

impl Epocher {
    /// Validate the window and baseline
    pub fn new(config: EpochConfig) -> EegResult<Self> {
        if config.window_start > 0 || config.window_end < 0 {
            return Err(EegError::configuration(
                "epoch",
                format!(
                    "window [{}, {}] must contain the marker onset",
                    config.window_start, config.window_end
                ),
            ));
        }
        if let Some((b0, b1)) = config.baseline {
            if b0 > b1 || b0 < config.window_start || b1 > config.window_end {
                return Err(EegError::configuration(
                    "epoch",
                    format!("baseline [{}, {}] must lie inside the epoch window", b0, b1),
                ));
            }
        }
        Ok(Self { config })
    }

    /// Window settings in use
    pub fn config(&self) -> &EpochConfig {
        &self.config
    }

    /// Segment `buffer` around each marker.
    ///
    /// `mask` must come from a buffer of the same shape. Markers whose window
    /// leaves the recording are counted in [`EpochSet::dropped`]; epochs that
    /// overlap rejected samples are kept and marked invalid.
    pub fn segment(&self, buffer: &SignalBuffer, mask: &RejectionMask) -> EegResult<EpochSet> {
        mask.check_matches(buffer)?;

        let (start_offset, end_offset) = (self.config.window_start, self.config.window_end);
        let n = buffer.sample_count() as i64;
        let mut epochs = Vec::with_capacity(buffer.markers().len());
        let mut dropped = 0;

        for marker in buffer.markers() {
            let first = marker.index as i64 + start_offset;
            let last = marker.index as i64 + end_offset;
            if first < 0 || last >= n {
                debug!(label = %marker.label, index = marker.index, "Epoch outside recording, dropped");
                dropped += 1;
                continue;
            }

            let (first, last) = (first as usize, last as usize);
            let mut samples = buffer.samples().slice(s![.., first..=last]).to_owned();
            if let Some(baseline) = self.config.baseline {
                self.subtract_baseline(&mut samples, baseline);
            }

            epochs.push(Epoch {
                marker: marker.clone(),
                samples,
                valid: !mask.any_rejected_in(first..last + 1),
            });
        }

        let set = EpochSet {
            channel_labels: buffer.channel_labels().to_vec(),
            sampling_rate: buffer.sampling_rate(),
            window_start: start_offset,
            window_end: end_offset,
            epochs,
            dropped,
        };

        if dropped > 0 {
            warn!(dropped, "Markers too close to the recording edges");
        }
        info!(
            epochs = set.len(),
            valid = set.valid_count(),
            invalid = set.invalid_count(),
            dropped,
            "Segmentation complete"
        );
        Ok(set)
    }

    fn subtract_baseline(&self, samples: &mut Array2<f64>, (b0, b1): (i64, i64)) {
        let from = (b0 - self.config.window_start) as usize;
        let to = (b1 - self.config.window_start) as usize;
        let means = samples.slice(s![.., from..=to]).mean_axis(Axis(1));
        if let Some(means) = means {
            for (mut row, mean) in samples.outer_iter_mut().zip(means.iter()) {
                row -= *mean;
            }
        }
    }
}

/// Segment with a plain window and no baseline correction
pub fn segment(
    buffer: &SignalBuffer,
    mask: &RejectionMask,
    window_start: i64,
    window_end: i64,
) -> EegResult<EpochSet> {
    Epocher::new(EpochConfig {
        window_start,
        window_end,
        baseline: None,
    })?
    .segment(buffer, mask)
}
