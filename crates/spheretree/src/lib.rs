//! # Spheretree
//!
//! Bounding-sphere hierarchy over the photosensors of a large-volume optical
//! detector.
//!
//! Sensors are grouped into carriers ("storeys"). The index recursively splits
//! the carriers into two balanced clusters and wraps every cluster in an
//! enclosing sphere, down to one sphere per sensor. Photon transport walks the
//! tree to reject sensors a propagating photon cannot possibly reach:
//!
//! - **Balanced**: every split is kept within `floor(n/2)..=ceil(n/2)` carriers,
//!   so depth stays logarithmic regardless of how the detector is laid out
//! - **Enclosing**: every node's sphere covers every sensor sphere below it
//! - **Reproducible**: cluster seeding draws from a seeded `ChaCha8Rng`
//!
//! ## Quick Start
//!
//! ```rust
//! use glam::DVec3;
//! use spheretree::{DetectorGeometry, GeometryIndex, IndexConfig, SensorSpec};
//!
//! let mut geometry = DetectorGeometry::new();
//! for x in [0.0, 10.0, 20.0] {
//!     let storey = geometry.add_carrier(DVec3::new(x, 0.0, 0.0)).unwrap();
//!     geometry
//!         .add_sensor(storey, SensorSpec::spherical(DVec3::new(x, 0.0, 0.5), 0.2))
//!         .unwrap();
//! }
//! geometry.finalize().unwrap();
//!
//! let index = GeometryIndex::build(&geometry, &IndexConfig::default()).unwrap();
//! let near = index.sensors_within(DVec3::new(0.0, 0.0, 0.0), 1.0);
//! assert_eq!(near.sensors.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cluster;
pub mod error;
pub mod hash;
pub mod index;
pub mod node;
pub mod query;
pub mod sensor;

// Re-exports for convenience
pub use cluster::{BalancedSplit, SplitOutcome};
pub use error::ConfigurationError;
pub use hash::hash_index;
pub use index::{EnclosureViolation, GeometryIndex, IndexConfig, IndexStats};
pub use node::{BoundingNode, NodeId, NodeKind};
pub use query::CullResult;
pub use sensor::{
    Carrier, CarrierId, DetectorExtent, DetectorGeometry, Sensor, SensorId, SensorSpec,
};

use glam::DVec3;

/// A sphere in the detector frame.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sphere {
    /// Center point
    pub center: DVec3,
    /// Radius (non-negative)
    pub radius: f64,
}

impl Sphere {
    /// Create a sphere.
    #[must_use]
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Smallest sphere centred on `center` covering every given sphere.
    ///
    /// Returns a zero-radius sphere when `spheres` is empty.
    #[must_use]
    pub fn enclosing(center: DVec3, spheres: impl IntoIterator<Item = Sphere>) -> Self {
        let radius = spheres
            .into_iter()
            .map(|s| center.distance(s.center) + s.radius)
            .fold(0.0, f64::max);
        Self { center, radius }
    }

    /// Check whether `other` lies entirely inside this sphere.
    #[must_use]
    pub fn contains_sphere(&self, other: &Sphere, tolerance: f64) -> bool {
        self.center.distance(other.center) + other.radius <= self.radius + tolerance
    }

    /// Check whether a point lies inside the sphere.
    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    /// Check whether a sphere of radius `distance` around `point` touches this sphere.
    #[must_use]
    pub fn intersects_sphere(&self, point: DVec3, distance: f64) -> bool {
        let reach = self.radius + distance;
        self.center.distance_squared(point) <= reach * reach
    }

    /// Check whether the segment `origin + t * direction`, `t` in `[0, max_distance]`,
    /// passes through this sphere. `direction` must be a unit vector.
    #[must_use]
    pub fn intersects_segment(&self, origin: DVec3, direction: DVec3, max_distance: f64) -> bool {
        let t = (self.center - origin).dot(direction).clamp(0.0, max_distance);
        let closest = origin + direction * t;
        closest.distance_squared(self.center) <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_enclosing() {
        let s = Sphere::enclosing(
            DVec3::ZERO,
            [
                Sphere::new(DVec3::new(3.0, 0.0, 0.0), 1.0),
                Sphere::new(DVec3::new(0.0, -1.0, 0.0), 0.5),
            ],
        );
        assert!((s.radius - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_sphere_contains() {
        let big = Sphere::new(DVec3::ZERO, 5.0);
        assert!(big.contains_sphere(&Sphere::new(DVec3::new(4.0, 0.0, 0.0), 1.0), 1e-9));
        assert!(!big.contains_sphere(&Sphere::new(DVec3::new(4.5, 0.0, 0.0), 1.0), 1e-9));
        assert!(big.contains_point(DVec3::new(0.0, 5.0, 0.0)));
    }

    #[test]
    fn test_sphere_segment_intersection() {
        let s = Sphere::new(DVec3::new(10.0, 1.0, 0.0), 1.5);
        assert!(s.intersects_segment(DVec3::ZERO, DVec3::X, 20.0));
        // Segment stops short of the sphere
        assert!(!s.intersects_segment(DVec3::ZERO, DVec3::X, 5.0));
        // Sphere is behind the origin
        assert!(!s.intersects_segment(DVec3::ZERO, -DVec3::X, 20.0));
    }
}
