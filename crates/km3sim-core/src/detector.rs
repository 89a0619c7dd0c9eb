//! Detector facade: geometry, spatial index and calibration built together.

use spheretree::{ConfigurationError, DetectorGeometry, GeometryIndex, IndexConfig};
use tracing::info;

use crate::buffer::RawHitBuffer;
use crate::calibration::{AcceptanceCurve, CalibrationTable};
use crate::error::ReductionError;
use crate::hit::EventId;
use crate::reducer::{HitReducer, ReducedEvent, ReducerConfig};

/// A fully set-up detector, ready to reduce events.
#[derive(Debug, Clone)]
pub struct Detector {
    geometry: DetectorGeometry,
    index: GeometryIndex,
    calibration: CalibrationTable,
}

impl Detector {
    /// Finalize `geometry` if needed, build its index and calibrate every
    /// sensor with the same acceptance curve and merge window.
    ///
    /// # Errors
    ///
    /// Fails if the geometry is invalid or the merge window is negative or
    /// not finite.
    pub fn new(
        mut geometry: DetectorGeometry,
        acceptance: AcceptanceCurve,
        merge_window: f64,
        config: &IndexConfig,
    ) -> Result<Self, ReductionError> {
        if !geometry.is_finalized() {
            geometry.finalize()?;
        }
        let index = GeometryIndex::build(&geometry, config)?;
        let calibration = CalibrationTable::from_geometry(&geometry, acceptance, merge_window)?;

        let extent = geometry.extent();
        info!(
            carriers = geometry.carrier_count(),
            sensors = geometry.sensor_count(),
            radius = extent.radius,
            lowest = extent.lowest,
            highest = extent.highest,
            "detector ready"
        );

        Ok(Self {
            geometry,
            index,
            calibration,
        })
    }

    /// Registered sensors and carriers.
    #[must_use]
    pub fn geometry(&self) -> &DetectorGeometry {
        &self.geometry
    }

    /// Bounding-sphere hierarchy over the geometry.
    #[must_use]
    pub fn index(&self) -> &GeometryIndex {
        &self.index
    }

    /// Per-sensor calibration.
    #[must_use]
    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    /// Mutable calibration, for overriding single sensors.
    pub fn calibration_mut(&mut self) -> &mut CalibrationTable {
        &mut self.calibration
    }

    /// A reducer over this detector's calibration.
    #[must_use]
    pub fn reducer(&self, config: ReducerConfig) -> HitReducer<'_> {
        HitReducer::new(&self.calibration, config)
    }

    /// Drain an event's hit buffer and reduce it.
    ///
    /// # Errors
    ///
    /// See [`HitReducer::reduce`].
    pub fn reduce(
        &self,
        event: EventId,
        buffer: RawHitBuffer,
        config: &ReducerConfig,
    ) -> Result<ReducedEvent, ReductionError> {
        self.reducer(*config).reduce(event, buffer.into_hits())
    }

    /// Check that every sensor in the geometry has a calibration entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownSensor`] for the first sensor
    /// without one.
    pub fn check_calibration(&self) -> Result<(), ConfigurationError> {
        for sensor in self.geometry.sensors() {
            self.calibration.require(sensor.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::calibration::SensorCalibration;
    use crate::hit::RawHit;
    use glam::DVec3;
    use spheretree::{SensorId, SensorSpec};

    fn geometry() -> DetectorGeometry {
        let mut geometry = DetectorGeometry::new();
        for x in [0.0, 20.0, 40.0, 60.0] {
            let storey = geometry.add_carrier(DVec3::new(x, 0.0, 100.0)).unwrap();
            geometry
                .add_sensor(
                    storey,
                    SensorSpec::spherical(DVec3::new(x, 0.0, 100.2), 0.2),
                )
                .unwrap();
        }
        geometry
    }

    #[test]
    fn test_new_finalizes_and_indexes() {
        let detector =
            Detector::new(geometry(), AcceptanceCurve::uniform(), 10.0, &IndexConfig::default())
                .unwrap();
        assert!(detector.geometry().is_finalized());
        assert_eq!(detector.index().stats().carrier_count, 4);
        assert_eq!(detector.calibration().len(), 4);
        assert!(detector.check_calibration().is_ok());
    }

    #[test]
    fn test_reduce_drains_buffer() {
        let detector =
            Detector::new(geometry(), AcceptanceCurve::uniform(), 10.0, &IndexConfig::default())
                .unwrap();
        let buffer = RawHitBuffer::new();
        buffer.push(RawHit::new(SensorId::new(1), 15.0, 1.0, -DVec3::Z));
        buffer.push(RawHit::new(SensorId::new(1), 5.0, 2.0, -DVec3::Z));
        buffer.push(RawHit::new(SensorId::new(3), 0.0, 1.0, -DVec3::Z));

        let out = detector
            .reduce(EventId::new(9), buffer, &ReducerConfig::default())
            .unwrap();
        assert_eq!(out.event, EventId::new(9));
        assert_eq!(out.hits.len(), 2);
        assert_eq!(out.hits[0].sensor, SensorId::new(1));
        assert_eq!(out.hits[0].time, 5.0);
        assert_eq!(out.hits[0].weight, 3.0);
    }

    #[test]
    fn test_per_sensor_calibration_override() {
        let mut detector =
            Detector::new(geometry(), AcceptanceCurve::uniform(), 1.0, &IndexConfig::default())
                .unwrap();
        let sensor = *detector.geometry().sensor(SensorId::new(1)).unwrap();
        let forward = Arc::new(AcceptanceCurve::forward(0.0).unwrap());
        detector
            .calibration_mut()
            .insert(sensor.id, SensorCalibration::new(forward, &sensor, 0.0).unwrap());

        let buffer = RawHitBuffer::new();
        for s in [0, 1] {
            for t in [0.0, 0.5, 0.5] {
                buffer.push(RawHit::new(SensorId::new(s), t, 1.0, -DVec3::Z));
            }
            // Arrives from behind
            buffer.push(RawHit::new(SensorId::new(s), 0.7, 1.0, DVec3::Z));
        }

        let out = detector
            .reduce(EventId::new(2), buffer, &ReducerConfig::default())
            .unwrap();
        let pulses: Vec<(u32, f64, u32)> = out
            .hits
            .iter()
            .map(|h| (h.sensor.as_u32(), h.time, h.count))
            .collect();
        // Sensor 0 keeps every hit in one 1 ns window; sensor 1 drops the
        // rear hit and only merges coincident ones
        assert_eq!(pulses, vec![(0, 0.0, 4), (1, 0.0, 1), (1, 0.5, 2)]);
        assert_eq!(out.rejected_by_acceptance, 1);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let err = Detector::new(geometry(), AcceptanceCurve::uniform(), f64::NAN, &IndexConfig::default())
            .unwrap_err();
        assert!(matches!(err, ReductionError::Calibration(_)));
    }
}
