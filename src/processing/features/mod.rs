//! Epoch feature extraction
//!
//! Features come in two families:
//! - Spectral: band power and relative band power, computed per epoch and channel
//! - Evoked: measures of the per-label average waveform
//!
//! Evoked features need every epoch of a label before any value exists, so
//! extraction runs in two passes. The first pass averages each label's
//! epochs; the second writes one row per included epoch. Every row of a label
//! carries that label's evoked values (broadcast), so all rows share one
//! schema and the table stays one-row-per-epoch.

pub mod frequency;
pub mod time_domain;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

use crate::error::{EegError, EegResult};
use crate::processing::epochs::{Epoch, EpochSet};
use crate::processing::filters::validate_band;
use crate::processing::spectral::FftPlan;

pub use crate::signal::ChannelSelection;
pub use frequency::band_power;
pub use time_domain::{evoked_averages, EvokedAverage, EvokedMeasure};

use frequency::{relative_power, EpochSpectra};

/// One named feature computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSpec {
    /// Mean squared amplitude in `[low_hz, high_hz]`
    BandPower {
        /// Feature name used as the column prefix
        name: String,
        /// Lower band edge in Hz
        low_hz: f64,
        /// Upper band edge in Hz
        high_hz: f64,
        /// Channels to compute on
        #[serde(default)]
        channels: ChannelSelection,
    },
    /// Band power divided by broadband power
    RelativeBandPower {
        /// Feature name used as the column prefix
        name: String,
        /// Lower band edge in Hz
        low_hz: f64,
        /// Upper band edge in Hz
        high_hz: f64,
        /// Channels to compute on
        #[serde(default)]
        channels: ChannelSelection,
    },
    /// Measure of the per-label evoked average
    Evoked {
        /// Feature name used as the column prefix
        name: String,
        /// Summary of the averaged waveform
        measure: EvokedMeasure,
        /// Measurement window in samples relative to onset; whole epoch if absent
        #[serde(default)]
        window: Option<(i64, i64)>,
        /// Channels to compute on
        #[serde(default)]
        channels: ChannelSelection,
    },
}

impl FeatureSpec {
    /// Band power over `[low_hz, high_hz]`
    pub fn band_power(name: &str, low_hz: f64, high_hz: f64, channels: ChannelSelection) -> Self {
        FeatureSpec::BandPower {
            name: name.to_string(),
            low_hz,
            high_hz,
            channels,
        }
    }

    /// Evoked measure over the whole epoch
    pub fn evoked(name: &str, measure: EvokedMeasure, channels: ChannelSelection) -> Self {
        FeatureSpec::Evoked {
            name: name.to_string(),
            measure,
            window: None,
            channels,
        }
    }

    /// Feature name
    pub fn name(&self) -> &str {
        match self {
            FeatureSpec::BandPower { name, .. }
            | FeatureSpec::RelativeBandPower { name, .. }
            | FeatureSpec::Evoked { name, .. } => name,
        }
    }

    /// Channels the feature applies to
    pub fn channels(&self) -> &ChannelSelection {
        match self {
            FeatureSpec::BandPower { channels, .. }
            | FeatureSpec::RelativeBandPower { channels, .. }
            | FeatureSpec::Evoked { channels, .. } => channels,
        }
    }

    /// True for evoked features
    pub fn is_evoked(&self) -> bool {
        matches!(self, FeatureSpec::Evoked { .. })
    }

    /// Column name produced for one channel
    pub fn column_name(&self, channel_label: &str) -> String {
        match self {
            FeatureSpec::BandPower { name, .. } => format!("{}_power_channel_{}", name, channel_label),
            FeatureSpec::RelativeBandPower { name, .. } => {
                format!("{}_relpower_channel_{}", name, channel_label)
            }
            FeatureSpec::Evoked { name, measure, .. } => {
                format!("{}_{}_channel_{}", name, measure, channel_label)
            }
        }
    }
}

/// Extraction switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Also extract from epochs that overlap rejected samples
    pub include_invalid: bool,
}

/// Features of one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Label of the epoch's marker
    pub marker_label: String,
    /// Onset sample index
    pub onset: usize,
    /// Validity of the epoch
    pub valid: bool,
    /// Values by column name
    pub features: BTreeMap<String, f64>,
}

impl FeatureRecord {
    /// Value of one feature column
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.features.get(feature).copied()
    }
}

/// Ordered feature rows sharing one set of feature names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    feature_names: BTreeSet<String>,
    records: Vec<FeatureRecord>,
}

impl FeatureTable {
    /// Table from its column set and rows
    pub fn new(feature_names: BTreeSet<String>, records: Vec<FeatureRecord>) -> Self {
        Self { feature_names, records }
    }

    /// Column names in sorted order
    pub fn feature_names(&self) -> &BTreeSet<String> {
        &self.feature_names
    }

    /// Rows in epoch order
    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    /// Iterate over rows
    pub fn iter(&self) -> impl Iterator<Item = &FeatureRecord> {
        self.records.iter()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of one feature in row order, `None` for an unknown feature
    pub fn column(&self, feature: &str) -> Option<Vec<f64>> {
        if !self.feature_names.contains(feature) {
            return None;
        }
        self.records.iter().map(|r| r.get(feature)).collect()
    }
}

/// A spec with its channels resolved against the epoch layout
struct ResolvedSpec<'a> {
    spec: &'a FeatureSpec,
    channels: Vec<(usize, String)>,
}

/// Computes a [`FeatureTable`] from an [`EpochSet`]
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    specs: Vec<FeatureSpec>,
    options: ExtractOptions,
}

impl FeatureExtractor {
    /// Check names are unique and band edges ordered
    pub fn new(specs: Vec<FeatureSpec>) -> EegResult<Self> {
        let mut names = HashSet::new();
        for spec in &specs {
            if spec.name().is_empty() {
                return Err(EegError::configuration("features", "feature name must not be empty"));
            }
            // the column stem identifies name, family and measure
            if !names.insert(spec.column_name("")) {
                return Err(EegError::configuration(
                    "features",
                    format!("feature '{}' is defined twice", spec.name()),
                ));
            }
        }
        Ok(Self {
            specs,
            options: ExtractOptions::default(),
        })
    }

    /// Replace the extraction switches
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Configured specs
    pub fn specs(&self) -> &[FeatureSpec] {
        &self.specs
    }

    /// Extraction switches in use
    pub fn options(&self) -> ExtractOptions {
        self.options
    }

    /// Per-label evoked waveforms over the epochs this extractor would use
    pub fn evoked_averages(&self, epochs: &EpochSet) -> EegResult<BTreeMap<String, EvokedAverage>> {
        evoked_averages(epochs, self.options.include_invalid)
    }

    /// One row per included epoch
    pub fn extract(&self, epochs: &EpochSet) -> EegResult<FeatureTable> {
        let resolved = self.resolve(epochs)?;
        let feature_names: BTreeSet<String> = resolved
            .iter()
            .flat_map(|r| r.channels.iter().map(move |(_, label)| r.spec.column_name(label)))
            .collect();

        let included: Vec<&Epoch> = epochs
            .iter()
            .filter(|e| self.options.include_invalid || e.is_valid())
            .collect();

        // first pass: evoked values per label
        let evoked = self.evoked_values(epochs, &resolved, included.is_empty())?;

        // second pass: one row per included epoch
        let plan = FftPlan::new(epochs.epoch_len());
        let rate = epochs.sampling_rate();
        let mut records = Vec::with_capacity(included.len());

        for epoch in included {
            let mut spectra = EpochSpectra::new(&plan, epoch, rate);
            let mut features = BTreeMap::new();

            for r in &resolved {
                match r.spec {
                    FeatureSpec::BandPower { low_hz, high_hz, .. } => {
                        for (idx, label) in &r.channels {
                            let power = spectra.channel(*idx).band_mean_square(*low_hz, *high_hz);
                            features.insert(r.spec.column_name(label), power);
                        }
                    }
                    FeatureSpec::RelativeBandPower { low_hz, high_hz, .. } => {
                        for (idx, label) in &r.channels {
                            let column = r.spec.column_name(label);
                            let value = relative_power(spectra.channel(*idx), *low_hz, *high_hz, &column)?;
                            features.insert(column, value);
                        }
                    }
                    FeatureSpec::Evoked { .. } => {}
                }
            }

            if let Some(values) = evoked.get(epoch.label()) {
                features.extend(values.iter().map(|(k, v)| (k.clone(), *v)));
            }

            records.push(FeatureRecord {
                marker_label: epoch.label().to_string(),
                onset: epoch.onset(),
                valid: epoch.is_valid(),
                features,
            });
        }

        info!(
            rows = records.len(),
            features = feature_names.len(),
            skipped_invalid = epochs.len() - records.len(),
            "Feature extraction complete"
        );
        Ok(FeatureTable { feature_names, records })
    }

    fn resolve<'a>(&'a self, epochs: &EpochSet) -> EegResult<Vec<ResolvedSpec<'a>>> {
        let nyquist = epochs.sampling_rate() / 2.0;
        let (window_start, window_end) = epochs.window();

        self.specs
            .iter()
            .map(|spec| {
                match spec {
                    FeatureSpec::BandPower { low_hz, high_hz, .. }
                    | FeatureSpec::RelativeBandPower { low_hz, high_hz, .. } => {
                        validate_band(*low_hz, *high_hz, nyquist)?;
                    }
                    FeatureSpec::Evoked { window: Some((w0, w1)), name, .. } => {
                        if w0 > w1 || *w0 < window_start || *w1 > window_end {
                            return Err(EegError::configuration(
                                "features",
                                format!("evoked window of '{}' lies outside the epoch", name),
                            ));
                        }
                    }
                    FeatureSpec::Evoked { .. } => {}
                }

                let labels = epochs.channel_labels();
                let channels = spec
                    .channels()
                    .resolve(labels)?
                    .into_iter()
                    .map(|idx| (idx, labels[idx].clone()))
                    .collect();
                debug!(feature = spec.name(), "Feature resolved");
                Ok(ResolvedSpec { spec, channels })
            })
            .collect()
    }

    fn evoked_values(
        &self,
        epochs: &EpochSet,
        resolved: &[ResolvedSpec<'_>],
        nothing_included: bool,
    ) -> EegResult<BTreeMap<String, Vec<(String, f64)>>> {
        let evoked_specs: Vec<&ResolvedSpec<'_>> = resolved.iter().filter(|r| r.spec.is_evoked()).collect();
        if evoked_specs.is_empty() {
            return Ok(BTreeMap::new());
        }
        if nothing_included {
            return Err(EegError::insufficient(
                evoked_specs[0].spec.name(),
                "no epochs available to average",
            ));
        }

        let averages = self.evoked_averages(epochs)?;
        let mut values = BTreeMap::new();
        for (label, average) in &averages {
            let mut row = Vec::new();
            for r in &evoked_specs {
                if let FeatureSpec::Evoked { measure, window, .. } = r.spec {
                    for (idx, channel) in &r.channels {
                        row.push((r.spec.column_name(channel), average.measure(*idx, *measure, *window)?));
                    }
                }
            }
            debug!(label = %label, epochs = average.epoch_count, "Evoked average computed");
            values.insert(label.clone(), row);
        }
        Ok(values)
    }
}

/// Extract `specs` from the valid epochs of `epochs`
pub fn extract(epochs: &EpochSet, specs: &[FeatureSpec]) -> EegResult<FeatureTable> {
    FeatureExtractor::new(specs.to_vec())?.extract(epochs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::artifact::RejectionMask;
    use crate::processing::epochs::segment;
    use crate::signal::{Marker, SignalBuffer};
    use ndarray::Array2;
    use std::f64::consts::PI;

    /// 10 Hz, amplitude 2 on Cz; silence on Fz; 1000 Hz sampling
    fn alpha_epochs(mask_second: bool) -> EpochSet {
        let n = 4000;
        let samples = Array2::from_shape_fn((2, n), |(c, i)| {
            if c == 1 {
                2.0 * (2.0 * PI * 10.0 * i as f64 / 1000.0).sin()
            } else {
                0.0
            }
        });
        let buffer = SignalBuffer::new(
            1000.0,
            vec!["Fz".into(), "Cz".into()],
            samples,
            vec![Marker::new("go", 1000), Marker::new("go", 2000), Marker::new("stop", 3000)],
        )
        .unwrap();

        let mut flags = Array2::from_elem((2, n), false);
        if mask_second {
            flags[[0, 2100]] = true;
        }
        segment(&buffer, &RejectionMask::from_flags(flags), -200, 799).unwrap()
    }

    #[test]
    fn test_band_power_features() {
        let specs = vec![
            FeatureSpec::band_power("alpha", 8.0, 12.0, ChannelSelection::All),
            FeatureSpec::band_power("beta", 20.0, 24.0, ChannelSelection::named(["Cz"])),
        ];
        let table = extract(&alpha_epochs(false), &specs).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.feature_names().len(), 3);
        for record in table.iter() {
            let alpha = record.get("alpha_power_channel_Cz").unwrap();
            assert!((alpha - 2.0).abs() < 1e-9);
            assert!(record.get("beta_power_channel_Cz").unwrap() < 1e-12);
            assert_eq!(record.get("alpha_power_channel_Fz").unwrap(), 0.0);
        }
    }

    #[test]
    fn test_invalid_epochs_skipped_by_default() {
        let specs = vec![FeatureSpec::band_power("alpha", 8.0, 12.0, ChannelSelection::All)];
        let epochs = alpha_epochs(true);

        let table = extract(&epochs, &specs).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|r| r.valid));

        let diagnostic = FeatureExtractor::new(specs)
            .unwrap()
            .with_options(ExtractOptions { include_invalid: true })
            .extract(&epochs)
            .unwrap();
        assert_eq!(diagnostic.len(), 3);
        assert!(!diagnostic.records()[1].valid);
    }

    #[test]
    fn test_relative_power_needs_signal() {
        let specs = vec![FeatureSpec::RelativeBandPower {
            name: "alpha".into(),
            low_hz: 8.0,
            high_hz: 12.0,
            channels: ChannelSelection::named(["Cz"]),
        }];
        let table = extract(&alpha_epochs(false), &specs).unwrap();
        let rel = table.column("alpha_relpower_channel_Cz").unwrap();
        assert!(rel.iter().all(|v| (v - 1.0).abs() < 1e-9));

        let silent = vec![FeatureSpec::RelativeBandPower {
            name: "alpha".into(),
            low_hz: 8.0,
            high_hz: 12.0,
            channels: ChannelSelection::named(["Fz"]),
        }];
        assert!(matches!(
            extract(&alpha_epochs(false), &silent),
            Err(EegError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_evoked_values_broadcast_per_label() {
        let specs = vec![FeatureSpec::evoked(
            "erp",
            EvokedMeasure::PeakAmplitude,
            ChannelSelection::named(["Cz"]),
        )];
        let table = extract(&alpha_epochs(false), &specs).unwrap();
        let column = table.column("erp_peak_amplitude_channel_Cz").unwrap();

        assert_eq!(column.len(), 3);
        // both "go" rows carry the same averaged value
        assert_eq!(column[0], column[1]);
        assert!(column.iter().all(|v| *v > 1.9 && *v <= 2.0));
    }

    #[test]
    fn test_evoked_without_epochs_is_insufficient() {
        let buffer = SignalBuffer::new(100.0, vec!["Cz".into()], Array2::zeros((1, 50)), vec![]).unwrap();
        let epochs = segment(&buffer, &RejectionMask::clean(&buffer), -5, 5).unwrap();
        let specs = vec![FeatureSpec::evoked("erp", EvokedMeasure::MeanAmplitude, ChannelSelection::All)];

        assert!(matches!(extract(&epochs, &specs), Err(EegError::InsufficientData { .. })));

        let power_only = vec![FeatureSpec::band_power("alpha", 8.0, 12.0, ChannelSelection::All)];
        let table = extract(&epochs, &power_only).unwrap();
        assert!(table.is_empty());
        assert!(table.feature_names().contains("alpha_power_channel_Cz"));
    }

    #[test]
    fn test_spec_errors() {
        let epochs = alpha_epochs(false);
        let above_nyquist = vec![FeatureSpec::band_power("x", 400.0, 600.0, ChannelSelection::All)];
        assert!(matches!(extract(&epochs, &above_nyquist), Err(EegError::FrequencyRange { .. })));

        let unknown = vec![FeatureSpec::band_power("x", 8.0, 12.0, ChannelSelection::named(["Oz"]))];
        assert!(matches!(extract(&epochs, &unknown), Err(EegError::UnknownChannel(_))));

        let twice = vec![
            FeatureSpec::band_power("x", 8.0, 12.0, ChannelSelection::All),
            FeatureSpec::band_power("x", 1.0, 4.0, ChannelSelection::All),
        ];
        assert!(FeatureExtractor::new(twice).is_err());

        let two_measures = vec![
            FeatureSpec::evoked("erp", EvokedMeasure::PeakAmplitude, ChannelSelection::All),
            FeatureSpec::evoked("erp", EvokedMeasure::PeakLatency, ChannelSelection::All),
        ];
        assert!(FeatureExtractor::new(two_measures).is_ok());
    }

    #[test]
    fn test_spec_serde_tagging() {
        let spec: FeatureSpec = serde_json::from_str(
            r#"{"kind": "band_power", "name": "alpha", "low_hz": 8.0, "high_hz": 12.0}"#,
        )
        .unwrap();
        assert_eq!(spec.channels(), &ChannelSelection::All);
        assert_eq!(spec.column_name("Cz"), "alpha_power_channel_Cz");
    }
}
