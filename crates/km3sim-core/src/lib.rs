//! # KM3Sim Core
//!
//! Detector-side core of the KM3 neutrino telescope simulation.
//!
//! Two pieces of work happen outside photon transport itself:
//!
//! - **Setup**: once the sensor and carrier tables are complete, a
//!   bounding-sphere index ([`spheretree::GeometryIndex`]) is built over them
//!   so transport can cull unreachable sensors quickly
//! - **Event end**: the raw photon hits collected during an event are sorted,
//!   filtered by angular acceptance and merged into pulses
//!
//! ## Usage
//!
//! ```rust
//! use glam::DVec3;
//! use km3sim_core::{
//!     AcceptanceCurve, Detector, EventId, RawHit, RawHitBuffer, ReducerConfig,
//! };
//! use km3sim_core::spheretree::{DetectorGeometry, IndexConfig, SensorId, SensorSpec};
//!
//! let mut geometry = DetectorGeometry::new();
//! let storey = geometry.add_carrier(DVec3::new(0.0, 0.0, 100.0)).unwrap();
//! geometry
//!     .add_sensor(storey, SensorSpec::spherical(DVec3::new(0.0, 0.0, 100.2), 0.2))
//!     .unwrap();
//!
//! let detector =
//!     Detector::new(geometry, AcceptanceCurve::uniform(), 1.0, &IndexConfig::default()).unwrap();
//!
//! let buffer = RawHitBuffer::new();
//! for t in [0.0, 0.5, 3.0] {
//!     buffer.push(RawHit::new(SensorId::new(0), t, 1.0, -DVec3::Z));
//! }
//! let event = detector
//!     .reduce(EventId::new(1), buffer, &ReducerConfig::default())
//!     .unwrap();
//! assert_eq!(event.hits.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export spheretree for geometry and spatial queries
pub use spheretree;

pub mod buffer;
pub mod calibration;
pub mod detector;
pub mod error;
pub mod hit;
pub mod reducer;

#[cfg(test)]
mod tests;

pub use buffer::RawHitBuffer;
pub use calibration::{AcceptanceCurve, CalibrationTable, SensorCalibration};
pub use detector::Detector;
pub use error::{CalibrationError, MalformedHitError, MalformedHitReason, ReductionError};
pub use hit::{EventId, MergedHit, RawHit, TrackId};
pub use reducer::{AcceptanceMode, HitReducer, ReducedEvent, ReducerConfig};

use spheretree::{ConfigurationError, DetectorGeometry, GeometryIndex, IndexConfig};

/// Build the bounding-sphere index over a finalized geometry.
///
/// # Errors
///
/// Fails if the geometry is not finalized, has no carriers, or has a carrier
/// without sensors.
pub fn build_geometry_index(
    geometry: &DetectorGeometry,
    config: &IndexConfig,
) -> Result<GeometryIndex, ConfigurationError> {
    GeometryIndex::build(geometry, config)
}

/// Reduce one event's raw hits into pulses.
///
/// # Errors
///
/// See [`HitReducer::reduce`].
pub fn reduce_hits(
    hits: Vec<RawHit>,
    calibration: &CalibrationTable,
    config: &ReducerConfig,
) -> Result<ReducedEvent, ReductionError> {
    HitReducer::new(calibration, *config).reduce(EventId::default(), hits)
}
