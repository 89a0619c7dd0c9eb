//! Per-sensor calibration: angular acceptance and merge window.
//!
//! The acceptance curve is a piecewise-linear table of
//! `(cos θ, acceptance)` points, where θ is the angle between the reversed
//! photon direction and the sensor axis (cos θ = 1 is head-on). Outside the
//! tabulated cosine range the sensor does not accept photons at all.
//!
//! Spherical sensors (negative height) use the curve as is. Thin cylindrical
//! sensors only register photons entering through the flat face, so the curve
//! is scaled by the share of the projected area the face presents:
//!
//! ```text
//! face fraction = π R² |c| / (π R² |c| + 2 R H √(1 - c²))
//! ```

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use spheretree::{ConfigurationError, DetectorGeometry, Sensor, SensorId};

use crate::error::CalibrationError;

/// Angular acceptance as a function of incidence cosine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct AcceptanceCurve {
    cosines: Vec<f64>,
    values: Vec<f64>,
}

impl AcceptanceCurve {
    /// Build a curve from `(cosine, acceptance)` points.
    ///
    /// # Errors
    ///
    /// Fails with fewer than two points, cosines outside `[-1, 1]` or not
    /// strictly increasing, or acceptance values outside `[0, 1]`.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, CalibrationError> {
        let (cosines, values): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
        if cosines.len() < 2 {
            return Err(CalibrationError::CurveTooShort(cosines.len()));
        }
        for &c in &cosines {
            if !(-1.0..=1.0).contains(&c) {
                return Err(CalibrationError::CosineOutOfRange(c));
            }
        }
        for pair in cosines.windows(2) {
            if pair[1] <= pair[0] {
                return Err(CalibrationError::NonIncreasingCosine(pair[1]));
            }
        }
        for &v in &values {
            if !(0.0..=1.0).contains(&v) {
                return Err(CalibrationError::AcceptanceOutOfRange(v));
            }
        }
        Ok(Self { cosines, values })
    }

    /// Full acceptance from every direction.
    #[must_use]
    pub fn uniform() -> Self {
        Self {
            cosines: vec![-1.0, 1.0],
            values: vec![1.0, 1.0],
        }
    }

    /// Full acceptance for incidence cosines in `[min_cosine, 1]`, none below.
    ///
    /// # Errors
    ///
    /// Fails unless `min_cosine` lies in `[-1, 1)`.
    pub fn forward(min_cosine: f64) -> Result<Self, CalibrationError> {
        Self::new([(min_cosine, 1.0), (1.0, 1.0)])
    }

    /// Tabulated cosine range.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        (self.cosines[0], self.cosines[self.cosines.len() - 1])
    }

    /// Interpolated acceptance, `None` outside the tabulated range.
    #[must_use]
    pub fn evaluate(&self, cosine: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(lo..=hi).contains(&cosine) {
            return None;
        }
        let upper = self.cosines.partition_point(|&c| c <= cosine);
        if upper == self.cosines.len() {
            return Some(self.values[upper - 1]);
        }
        let (c0, c1) = (self.cosines[upper - 1], self.cosines[upper]);
        let (v0, v1) = (self.values[upper - 1], self.values[upper]);
        Some(v0 + (v1 - v0) * (cosine - c0) / (c1 - c0))
    }
}

impl TryFrom<Vec<(f64, f64)>> for AcceptanceCurve {
    type Error = CalibrationError;

    fn try_from(points: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<AcceptanceCurve> for Vec<(f64, f64)> {
    fn from(curve: AcceptanceCurve) -> Self {
        curve.cosines.into_iter().zip(curve.values).collect()
    }
}

/// Static calibration of one sensor.
///
/// Only built through [`SensorCalibration::new`], so the merge window is
/// always finite and non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorCalibration {
    curve: Arc<AcceptanceCurve>,
    radius: f64,
    height: f64,
    axis: DVec3,
    merge_window: f64,
}

impl SensorCalibration {
    /// Calibrate `sensor` with a shared acceptance curve.
    ///
    /// # Errors
    ///
    /// Fails if `merge_window` is negative or not finite.
    pub fn new(
        curve: Arc<AcceptanceCurve>,
        sensor: &Sensor,
        merge_window: f64,
    ) -> Result<Self, CalibrationError> {
        if !merge_window.is_finite() || merge_window < 0.0 {
            return Err(CalibrationError::InvalidMergeWindow(merge_window));
        }
        Ok(Self {
            curve,
            radius: sensor.radius,
            height: sensor.height,
            axis: sensor.axis,
            merge_window,
        })
    }

    /// Angular acceptance curve.
    #[must_use]
    pub fn curve(&self) -> &AcceptanceCurve {
        &self.curve
    }

    /// Photocathode radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Full height; negative for spherical sensors.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Unit facing direction.
    #[must_use]
    pub fn axis(&self) -> DVec3 {
        self.axis
    }

    /// Merge window (ns).
    #[must_use]
    pub fn merge_window(&self) -> f64 {
        self.merge_window
    }

    /// Spherical sensors carry a negative height.
    #[must_use]
    pub fn is_spherical(&self) -> bool {
        self.height < 0.0
    }

    /// Cosine of the incidence angle for a photon travelling along `direction`
    /// (unit vector).
    #[must_use]
    pub fn incidence_cosine(&self, direction: DVec3) -> f64 {
        (-direction.dot(self.axis)).clamp(-1.0, 1.0)
    }

    /// Share of the projected area presented by the flat face of a cylinder.
    fn face_fraction(&self, cosine: f64) -> f64 {
        let face = PI * self.radius * self.radius * cosine.abs();
        let side = 2.0 * self.radius * self.height * (1.0 - cosine * cosine).sqrt();
        if face + side > 0.0 {
            face / (face + side)
        } else {
            1.0
        }
    }

    /// Acceptance for a photon travelling along `direction` (unit vector);
    /// `None` when the incidence cosine is outside the curve's domain.
    #[must_use]
    pub fn acceptance(&self, direction: DVec3) -> Option<f64> {
        let cosine = self.incidence_cosine(direction);
        let value = self.curve.evaluate(cosine)?;
        if self.is_spherical() {
            Some(value)
        } else {
            Some(value * self.face_fraction(cosine))
        }
    }
}

/// Calibration of every sensor, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    sensors: BTreeMap<SensorId, SensorCalibration>,
}

impl CalibrationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calibrate every sensor of `geometry` with one curve and merge window.
    ///
    /// # Errors
    ///
    /// Fails if `merge_window` is negative or not finite.
    pub fn from_geometry(
        geometry: &DetectorGeometry,
        acceptance: AcceptanceCurve,
        merge_window: f64,
    ) -> Result<Self, CalibrationError> {
        let acceptance = Arc::new(acceptance);
        let sensors = geometry
            .sensors()
            .iter()
            .map(|sensor| {
                SensorCalibration::new(Arc::clone(&acceptance), sensor, merge_window)
                    .map(|calibration| (sensor.id, calibration))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { sensors })
    }

    /// Add or replace one sensor's calibration.
    pub fn insert(&mut self, sensor: SensorId, calibration: SensorCalibration) {
        self.sensors.insert(sensor, calibration);
    }

    /// Look up a sensor's calibration.
    #[must_use]
    pub fn get(&self, sensor: SensorId) -> Option<&SensorCalibration> {
        self.sensors.get(&sensor)
    }

    /// Look up a sensor's calibration, failing for unknown sensors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownSensor`] if `sensor` is not calibrated.
    pub fn require(&self, sensor: SensorId) -> Result<&SensorCalibration, ConfigurationError> {
        self.get(sensor)
            .ok_or(ConfigurationError::UnknownSensor(sensor))
    }

    /// Number of calibrated sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Check if no sensor is calibrated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Calibrations in sensor id order.
    pub fn iter(&self) -> impl Iterator<Item = (SensorId, &SensorCalibration)> {
        self.sensors.iter().map(|(id, c)| (*id, c))
    }
}
