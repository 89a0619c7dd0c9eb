//! Geometry configuration errors.
//!
//! Geometry is assumed validated before indexing; any violation here is a
//! precondition failure and no partial index is produced.

use crate::sensor::{CarrierId, SensorId};

/// Errors raised while registering sensors or building the index.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// The index needs at least one carrier.
    #[error("no carriers to index")]
    EmptyCarrierList,

    /// Every carrier must own at least one sensor.
    #[error("carrier {0} owns no sensors")]
    EmptyCarrier(CarrierId),

    /// A sensor was attached to a carrier that was never registered.
    #[error("unknown carrier {0}")]
    UnknownCarrier(CarrierId),

    /// A sensor id that does not exist in the detector.
    #[error("unknown sensor {0}")]
    UnknownSensor(SensorId),

    /// Sensor radius must be finite and non-negative.
    #[error("sensor radius {radius} is not a finite non-negative length")]
    InvalidSensorRadius {
        /// Offending radius
        radius: f64,
    },

    /// Positions must be finite.
    #[error("non-finite position ({x}, {y}, {z})")]
    NonFinitePosition {
        /// X component
        x: f64,
        /// Y component
        y: f64,
        /// Z component
        z: f64,
    },

    /// Sensor axis must be a finite, non-zero vector.
    #[error("sensor axis cannot be normalized")]
    InvalidAxis,

    /// The geometry must be finalized (carrier radii derived) before use.
    #[error("detector geometry has not been finalized")]
    NotFinalized,

    /// The geometry is frozen and can no longer be modified.
    #[error("detector geometry is already finalized")]
    AlreadyFinalized,
}
