//! Error types for calibration and hit reduction.

use spheretree::{ConfigurationError, SensorId};

/// Per-sensor calibration that cannot be used safely.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    /// An acceptance curve needs at least two points.
    #[error("acceptance curve has {0} points, need at least 2")]
    CurveTooShort(usize),

    /// Cosines must lie in [-1, 1].
    #[error("acceptance cosine {0} outside [-1, 1]")]
    CosineOutOfRange(f64),

    /// Cosines must be strictly increasing.
    #[error("acceptance cosines not strictly increasing at {0}")]
    NonIncreasingCosine(f64),

    /// Acceptance values must lie in [0, 1].
    #[error("acceptance value {0} outside [0, 1]")]
    AcceptanceOutOfRange(f64),

    /// Merge windows must be finite and non-negative.
    #[error("merge window {0} ns is not a finite non-negative duration")]
    InvalidMergeWindow(f64),

    /// Evaluation produced a value that cannot be compared.
    #[error("acceptance for sensor {sensor} is not finite")]
    NonFiniteAcceptance {
        /// Sensor whose calibration failed
        sensor: SensorId,
    },
}

/// Why a raw hit was excluded from reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MalformedHitReason {
    /// Weight is zero, negative or not finite
    NonPositiveWeight,
    /// Time is negative or not finite
    NegativeTime,
    /// Direction is zero or not finite
    InvalidDirection,
}

/// A raw hit rejected before sorting. Reported, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("malformed hit #{index} on sensor {sensor}: {reason:?}")]
pub struct MalformedHitError {
    /// Position of the hit in the event's raw buffer
    pub index: usize,
    /// Sensor the hit was recorded on
    pub sensor: SensorId,
    /// What is wrong with it
    pub reason: MalformedHitReason,
}

/// Fatal failure while reducing an event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReductionError {
    /// Hit refers to a sensor without geometry or calibration
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Calibration cannot be applied
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}
