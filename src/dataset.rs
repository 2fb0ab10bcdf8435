// src/dataset.rs
//! Multi-run aggregation into the dataset handed to reporting collaborators

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::error::{EegError, EegResult};
use crate::processing::features::FeatureTable;

/// Identifiers attached to every row of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Participant identifier
    pub participant_id: String,
    /// Task identifier
    pub task_id: String,
    /// Free-form extra metadata
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl RunMetadata {
    /// Metadata without extra fields
    pub fn new(participant_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            task_id: task_id.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Add one extra metadata field
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// How tables with differing feature names are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Every table must have the first table's feature names
    #[default]
    Strict,
    /// Union of all names; absent values are null
    UnionWithMissing,
}

/// One epoch's features with its run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    /// Participant identifier
    pub participant_id: String,
    /// Task identifier
    pub task_id: String,
    /// Free-form extra metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    /// Label of the epoch's marker
    pub marker_label: String,
    /// Onset sample index of the epoch's marker
    pub onset: usize,
    /// Feature values by column; `None` for null
    pub values: BTreeMap<String, Option<f64>>,
}

/// Rows from many runs over one column set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Feature columns in sorted order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows, in input order
    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one feature column, `None` entries for nulls
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        if !self.columns.iter().any(|c| c == name) {
            return None;
        }
        Some(self.rows.iter().map(|r| r.values.get(name).copied().flatten()).collect())
    }

    /// Pretty-printed JSON of columns and rows
    pub fn to_json(&self) -> EegResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// CSV with a `participant_id,task_id,marker_label,onset` prefix; nulls are empty cells
    pub fn to_csv(&self) -> EegResult<String> {
        let mut writer = csv::WriterBuilder::new().delimiter(b',').from_writer(Vec::new());

        let header = ["participant_id", "task_id", "marker_label", "onset"]
            .into_iter()
            .chain(self.columns.iter().map(String::as_str));
        writer.write_record(header)?;

        for row in &self.rows {
            let mut record = vec![
                row.participant_id.clone(),
                row.task_id.clone(),
                row.marker_label.clone(),
                row.onset.to_string(),
            ];
            record.extend(self.columns.iter().map(|column| match row.values.get(column) {
                Some(Some(value)) => value.to_string(),
                _ => String::new(),
            }));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| EegError::Serialization(format!("Failed to flush CSV output: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| EegError::Serialization(format!("CSV output is not UTF-8: {}", e)))
    }
}

/// Concatenate per-run tables, attaching each run's metadata to its rows
pub fn aggregate(tables: &[(RunMetadata, FeatureTable)], policy: MergePolicy) -> EegResult<Dataset> {
    let columns: BTreeSet<String> = match policy {
        MergePolicy::Strict => {
            let Some((_, first)) = tables.first() else {
                return Ok(Dataset::default());
            };
            let reference = first.feature_names();
            for (table_index, (_, table)) in tables.iter().enumerate().skip(1) {
                let names = table.feature_names();
                if names != reference {
                    return Err(EegError::SchemaMismatch {
                        table_index,
                        missing: reference.difference(names).cloned().collect(),
                        unexpected: names.difference(reference).cloned().collect(),
                    });
                }
            }
            reference.clone()
        }
        MergePolicy::UnionWithMissing => tables
            .iter()
            .flat_map(|(_, t)| t.feature_names().iter().cloned())
            .collect(),
    };

    let mut rows = Vec::with_capacity(tables.iter().map(|(_, t)| t.len()).sum());
    for (metadata, table) in tables {
        debug!(
            participant = %metadata.participant_id,
            task = %metadata.task_id,
            rows = table.len(),
            "Appending feature table"
        );
        for record in table.iter() {
            let values = columns
                .iter()
                .map(|c| (c.clone(), record.get(c)))
                .collect();
            rows.push(DatasetRow {
                participant_id: metadata.participant_id.clone(),
                task_id: metadata.task_id.clone(),
                extra: metadata.extra.clone(),
                marker_label: record.marker_label.clone(),
                onset: record.onset,
                values,
            });
        }
    }

    info!(tables = tables.len(), rows = rows.len(), columns = columns.len(), "Dataset aggregated");
    Ok(Dataset {
        columns: columns.into_iter().collect(),
        rows,
    })
}
