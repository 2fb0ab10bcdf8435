// src/config/constants.rs
//! Pipeline configuration constants

/// Recording constants
pub mod signal {
    /// Sampling rate of the demo synthetic recording
    pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 1000.0;
    /// Length of the demo synthetic recording
    pub const DEFAULT_DURATION_SECS: f64 = 5.0;
}

/// Synthetic recording defaults
pub mod synthetic {
    /// Seed used when a noise spec names none
    pub const DEFAULT_NOISE_SEED: u64 = 42;
    /// Marker label of the demo synthetic recording
    pub const DEFAULT_MARKER_LABEL: &str = "stimulus";
    /// Gaussian pulses are evaluated within this many standard deviations
    pub const PULSE_SUPPORT_SIGMAS: f64 = 6.0;
}

/// Filter defaults
pub mod filters {
    /// Band-pass lower edge
    pub const DEFAULT_LOW_HZ: f64 = 1.0;
    /// Band-pass upper edge
    pub const DEFAULT_HIGH_HZ: f64 = 40.0;
    /// Full width of the notch stop band
    pub const DEFAULT_NOTCH_WIDTH_HZ: f64 = 2.0;
}

/// Artifact detection defaults (amplitudes in µV)
pub mod artifact {
    /// Absolute amplitude limit
    pub const DEFAULT_AMPLITUDE_THRESHOLD: f64 = 100.0;
    /// Limit on the step between consecutive samples
    pub const DEFAULT_GRADIENT_THRESHOLD: f64 = 50.0;
    /// Artifact window length in samples
    pub const DEFAULT_WINDOW_SAMPLES: usize = 200;
}

/// Epoch window defaults, in samples relative to marker onset
pub mod epoch {
    /// First epoch offset
    pub const DEFAULT_WINDOW_START: i64 = -200;
    /// Last epoch offset (inclusive)
    pub const DEFAULT_WINDOW_END: i64 = 800;
}

/// Canonical EEG frequency bands (Hz)
pub mod bands {
    /// Theta band edges
    pub const THETA: (f64, f64) = (4.0, 8.0);
    /// Alpha band edges
    pub const ALPHA: (f64, f64) = (8.0, 12.0);
}

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "EEG";
/// Separator between nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";
