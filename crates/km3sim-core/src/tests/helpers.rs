//! Geometry and hit factories shared by the crate-level tests.

use std::collections::BTreeMap;

use glam::DVec3;
use spheretree::{DetectorGeometry, GeometryIndex, NodeKind, SensorId, SensorSpec};

use crate::calibration::{AcceptanceCurve, CalibrationTable};
use crate::hit::RawHit;

// =============================================================================
// Geometry
// =============================================================================

/// Three storeys at (0,0,0), (10,0,0) and (0,10,0), each carrying one
/// spherical sensor of radius 1 at the storey centre.
pub fn triangle_geometry() -> DetectorGeometry {
    let mut geometry = DetectorGeometry::new();
    for (x, y) in [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)] {
        let pos = DVec3::new(x, y, 0.0);
        let storey = geometry.add_carrier(pos).unwrap();
        geometry
            .add_sensor(storey, SensorSpec::spherical(pos, 1.0))
            .unwrap();
    }
    geometry.finalize().unwrap();
    geometry
}

/// Vertical lines of storeys on a square grid. Each storey carries
/// `sensors_per_storey` small cylindrical sensors around its centre.
pub fn line_geometry(
    lines_per_side: u32,
    storeys_per_line: u32,
    sensors_per_storey: u32,
) -> DetectorGeometry {
    let mut geometry = DetectorGeometry::new();
    for i in 0..lines_per_side {
        for j in 0..lines_per_side {
            for k in 0..storeys_per_line {
                let pos = DVec3::new(
                    f64::from(i) * 90.0,
                    f64::from(j) * 90.0,
                    100.0 + f64::from(k) * 36.0,
                );
                let storey = geometry.add_carrier(pos).unwrap();
                for m in 0..sensors_per_storey {
                    let phi = f64::from(m) * std::f64::consts::TAU / f64::from(sensors_per_storey);
                    let axis = DVec3::new(phi.cos(), phi.sin(), -0.5).normalize();
                    geometry
                        .add_sensor(
                            storey,
                            SensorSpec::cylindrical(pos + axis * 0.2, 0.04, 0.01).with_axis(axis),
                        )
                        .unwrap();
                }
            }
        }
    }
    geometry.finalize().unwrap();
    geometry
}

/// Carrier counts of the two children of every internal node that was split
/// under the strict balance bound.
pub fn strict_splits(index: &GeometryIndex) -> Vec<(u32, [u32; 2])> {
    index
        .nodes()
        .iter()
        .filter_map(|node| match node.kind {
            NodeKind::Internal {
                children,
                relaxed: false,
            } => {
                let count = |id| index.node(id).map_or(0, |n| n.carrier_count);
                Some((node.carrier_count, [count(children[0]), count(children[1])]))
            }
            _ => None,
        })
        .collect()
}

// =============================================================================
// Calibration and hits
// =============================================================================

/// One storey with one upward-facing spherical sensor.
pub fn single_sensor_geometry() -> DetectorGeometry {
    let mut geometry = DetectorGeometry::new();
    let storey = geometry.add_carrier(DVec3::ZERO).unwrap();
    geometry
        .add_sensor(storey, SensorSpec::spherical(DVec3::ZERO, 0.2))
        .unwrap();
    geometry.finalize().unwrap();
    geometry
}

/// `count` spherical sensors on one storey, all calibrated with `curve`.
pub fn table_with(count: u32, curve: AcceptanceCurve, merge_window: f64) -> CalibrationTable {
    let mut geometry = DetectorGeometry::new();
    let storey = geometry.add_carrier(DVec3::ZERO).unwrap();
    for i in 0..count {
        geometry
            .add_sensor(
                storey,
                SensorSpec::spherical(DVec3::new(f64::from(i) * 0.5, 0.0, 0.0), 0.2),
            )
            .unwrap();
    }
    geometry.finalize().unwrap();
    CalibrationTable::from_geometry(&geometry, curve, merge_window).unwrap()
}

/// A photon arriving head-on at an upward-facing sensor.
pub fn head_on(sensor: u32, time: f64, weight: f64) -> RawHit {
    RawHit::new(SensorId::new(sensor), time, weight, -DVec3::Z)
}

/// Sum of weights per sensor id.
pub fn weight_by_sensor(items: impl IntoIterator<Item = (SensorId, f64)>) -> Vec<(SensorId, f64)> {
    let mut sums: BTreeMap<SensorId, f64> = BTreeMap::new();
    for (sensor, weight) in items {
        *sums.entry(sensor).or_default() += weight;
    }
    sums.into_iter().collect()
}
