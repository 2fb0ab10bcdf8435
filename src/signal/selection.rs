// src/signal/selection.rs
//! Channel subsets named in configuration

use serde::{Deserialize, Serialize};

use crate::error::{EegError, EegResult};

/// Which channels a component or feature applies to
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSelection {
    /// Every channel, in buffer order
    #[default]
    All,
    /// The listed channels, in list order
    Named(Vec<String>),
}

impl ChannelSelection {
    /// Selection of the listed channel labels
    pub fn named<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Named(labels.into_iter().map(Into::into).collect())
    }

    /// Row indices of the selected channels within `labels`, in selection order
    pub fn resolve(&self, labels: &[String]) -> EegResult<Vec<usize>> {
        match self {
            Self::All => Ok((0..labels.len()).collect()),
            Self::Named(names) if names.is_empty() => Err(EegError::configuration(
                "channel selection",
                "named selection lists no channels",
            )),
            Self::Named(names) => names
                .iter()
                .map(|name| {
                    labels
                        .iter()
                        .position(|l| l == name)
                        .ok_or_else(|| EegError::UnknownChannel(name.clone()))
                })
                .collect(),
        }
    }
}
