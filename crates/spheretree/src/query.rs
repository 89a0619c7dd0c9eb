//! Culling queries against the bounding-sphere hierarchy.
//!
//! A subtree is skipped as soon as its sphere fails the query test, which is
//! sound because every node encloses all sensor spheres below it.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::index::GeometryIndex;
use crate::node::NodeKind;
use crate::sensor::SensorId;
use crate::Sphere;

/// Result of a culling query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CullResult {
    /// Sensors whose bounding sphere passes the query, ascending
    pub sensors: Vec<SensorId>,
    /// Number of nodes tested
    pub nodes_visited: u32,
}

impl CullResult {
    /// Check whether `sensor` survived culling.
    #[must_use]
    pub fn contains(&self, sensor: SensorId) -> bool {
        self.sensors.binary_search(&sensor).is_ok()
    }
}

impl GeometryIndex {
    fn cull(&self, test: impl Fn(&Sphere) -> bool) -> CullResult {
        let mut result = CullResult::default();
        let mut stack = vec![self.root_id()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            result.nodes_visited += 1;
            if !test(&node.sphere) {
                continue;
            }
            if let NodeKind::Sensor { sensor } = node.kind {
                result.sensors.push(sensor);
            }
            stack.extend(node.children().iter().rev());
        }
        result.sensors.sort_unstable();
        result
    }

    /// Sensors a photon leaving `origin` along `direction` could reach within
    /// `max_distance` (e.g. its absorption length).
    ///
    /// A `direction` that cannot be normalized degrades to the sensors
    /// containing `origin`.
    #[must_use]
    pub fn candidates_along_ray(
        &self,
        origin: DVec3,
        direction: DVec3,
        max_distance: f64,
    ) -> CullResult {
        match direction.try_normalize() {
            Some(direction) => {
                self.cull(|sphere| sphere.intersects_segment(origin, direction, max_distance))
            }
            None => self.cull(|sphere| sphere.contains_point(origin)),
        }
    }

    /// Sensors whose bounding sphere comes within `distance` of `point`.
    #[must_use]
    pub fn sensors_within(&self, point: DVec3, distance: f64) -> CullResult {
        self.cull(|sphere| sphere.intersects_sphere(point, distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexConfig;
    use crate::sensor::{DetectorGeometry, SensorSpec};

    /// One vertical line of storeys, two sensors each (looking up and down).
    fn line(storeys: u32) -> DetectorGeometry {
        let mut geometry = DetectorGeometry::new();
        for i in 0..storeys {
            let z = f64::from(i) * 10.0;
            let storey = geometry.add_carrier(DVec3::new(0.0, 0.0, z)).unwrap();
            for dz in [0.5, -0.5] {
                geometry
                    .add_sensor(storey, SensorSpec::spherical(DVec3::new(0.0, 0.0, z + dz), 0.2))
                    .unwrap();
            }
        }
        geometry.finalize().unwrap();
        geometry
    }

    fn brute_force(geometry: &DetectorGeometry, test: impl Fn(&Sphere) -> bool) -> Vec<SensorId> {
        geometry
            .sensors()
            .iter()
            .filter(|s| test(&s.bounding_sphere()))
            .map(|s| s.id)
            .collect()
    }

    #[test]
    fn test_ray_matches_brute_force() {
        let geometry = line(16);
        let index = GeometryIndex::build(&geometry, &IndexConfig::default()).unwrap();

        let origin = DVec3::new(-5.0, 0.0, 40.0);
        let direction = DVec3::new(1.0, 0.0, 0.1).normalize();
        let result = index.candidates_along_ray(origin, direction, 20.0);
        let expected = brute_force(&geometry, |s| s.intersects_segment(origin, direction, 20.0));

        assert_eq!(result.sensors, expected);
        assert_eq!(result.sensors, vec![SensorId::new(8)]);
        assert!(result.nodes_visited < u32::try_from(index.nodes().len()).unwrap());
    }

    #[test]
    fn test_ray_pointing_away_finds_nothing() {
        let geometry = line(8);
        let index = GeometryIndex::build(&geometry, &IndexConfig::default()).unwrap();

        let result = index.candidates_along_ray(DVec3::new(100.0, 0.0, 0.0), DVec3::X, 1000.0);
        assert!(result.sensors.is_empty());
        assert_eq!(result.nodes_visited, 1);
    }

    #[test]
    fn test_sensors_within() {
        let geometry = line(8);
        let index = GeometryIndex::build(&geometry, &IndexConfig::default()).unwrap();

        let result = index.sensors_within(DVec3::new(0.0, 0.0, 30.0), 1.0);
        assert_eq!(result.sensors, vec![SensorId::new(6), SensorId::new(7)]);
        assert!(result.contains(SensorId::new(7)));
        assert!(!result.contains(SensorId::new(8)));
    }

    #[test]
    fn test_degenerate_direction() {
        let geometry = line(4);
        let index = GeometryIndex::build(&geometry, &IndexConfig::default()).unwrap();

        let result = index.candidates_along_ray(DVec3::new(0.0, 0.0, 10.5), DVec3::ZERO, 50.0);
        assert_eq!(result.sensors, vec![SensorId::new(2)]);
    }
}
