// src/signal/marker.rs
//! Event markers

use serde::{Deserialize, Serialize};

/// Timestamped event onset within a recording
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
    /// Event label; integer trigger codes are stored as their decimal string
    pub label: String,
    /// Onset sample index
    pub index: usize,
}

impl Marker {
    /// Marker with a text label
    pub fn new(label: impl Into<String>, index: usize) -> Self {
        Self {
            label: label.into(),
            index,
        }
    }

    /// Marker from an integer trigger code
    pub fn code(code: u32, index: usize) -> Self {
        Self::new(code.to_string(), index)
    }
}

/// Stable sort by onset; simultaneous events keep their input order.
pub(crate) fn sort_markers(markers: &mut [Marker]) {
    markers.sort_by_key(|m| m.index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_marker() {
        let marker = Marker::code(17, 250);
        assert_eq!(marker.label, "17");
        assert_eq!(marker.index, 250);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut markers = vec![
            Marker::new("b", 10),
            Marker::new("first", 5),
            Marker::new("second", 5),
        ];
        sort_markers(&mut markers);
        let labels: Vec<_> = markers.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["first", "second", "b"]);
    }
}
