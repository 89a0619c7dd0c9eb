//! Detector geometry: sensors, carriers and the registry that owns them.
//!
//! A [`Sensor`] is a single photodetector (a photocathode). A [`Carrier`]
//! ("storey") groups the sensors mounted on the same frame. The
//! [`DetectorGeometry`] registry is filled once during detector construction,
//! then frozen with [`DetectorGeometry::finalize`], which derives every
//! carrier's bounding radius from its sensors.
//!
//! # Example
//!
//! ```
//! use glam::DVec3;
//! use spheretree::{DetectorGeometry, SensorSpec};
//!
//! let mut geometry = DetectorGeometry::new();
//! let storey = geometry.add_carrier(DVec3::new(0.0, 0.0, 100.0)).unwrap();
//! geometry
//!     .add_sensor(storey, SensorSpec::spherical(DVec3::new(0.0, 0.0, 101.0), 0.25))
//!     .unwrap();
//! geometry.finalize().unwrap();
//!
//! assert_eq!(geometry.carrier(storey).unwrap().radius, 1.25);
//! ```

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::Sphere;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an identifier from its raw value.
            #[must_use]
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn as_u32(self) -> u32 {
                self.0
            }

            /// Returns the raw value as a table index.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self::new(id)
            }
        }
    };
}

id_type!(
    /// Unique identifier of a sensor (photocathode).
    ///
    /// Sensor ids are dense and assigned in registration order.
    SensorId
);

id_type!(
    /// Unique identifier of a carrier (storey).
    CarrierId
);

/// Height sentinel for spherical sensors, where height is not applicable.
pub const SPHERICAL_HEIGHT: f64 = -1.0e-3;

/// Description of a sensor to register.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    /// Centre of the sensor in the detector frame
    pub position: DVec3,
    /// Bounding radius
    pub radius: f64,
    /// Full height for cylindrical sensors; negative for spherical ones
    pub height: f64,
    /// Direction the photocathode faces
    pub axis: DVec3,
}

impl SensorSpec {
    /// A spherical sensor facing +z.
    #[must_use]
    pub fn spherical(position: DVec3, radius: f64) -> Self {
        Self {
            position,
            radius,
            height: SPHERICAL_HEIGHT,
            axis: DVec3::Z,
        }
    }

    /// A thin cylindrical sensor facing +z.
    #[must_use]
    pub fn cylindrical(position: DVec3, radius: f64, height: f64) -> Self {
        Self {
            position,
            radius,
            height,
            axis: DVec3::Z,
        }
    }

    /// Set the facing direction.
    #[must_use]
    pub fn with_axis(mut self, axis: DVec3) -> Self {
        self.axis = axis;
        self
    }
}

/// A registered photodetector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    /// Identifier
    pub id: SensorId,
    /// Centre in the detector frame
    pub position: DVec3,
    /// Bounding radius
    pub radius: f64,
    /// Full height, negative for spherical sensors
    pub height: f64,
    /// Unit facing direction
    pub axis: DVec3,
    /// Owning carrier
    pub carrier: CarrierId,
}

impl Sensor {
    /// Spherical sensors carry a negative height.
    #[must_use]
    pub fn is_spherical(&self) -> bool {
        self.height < 0.0
    }

    /// The sensor's own bounding sphere.
    #[must_use]
    pub fn bounding_sphere(&self) -> Sphere {
        Sphere::new(self.position, self.radius)
    }
}

/// A group of sensors mounted together (a "storey").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    /// Identifier
    pub id: CarrierId,
    /// Origin of the carrier frame
    pub position: DVec3,
    /// Owned sensors, in insertion order
    pub sensors: Vec<SensorId>,
    /// Maximum distance from `position` to any owned sensor's surface.
    /// Zero until the geometry is finalized.
    pub radius: f64,
}

impl Carrier {
    /// The carrier's bounding sphere.
    #[must_use]
    pub fn bounding_sphere(&self) -> Sphere {
        Sphere::new(self.position, self.radius)
    }
}

/// Outer dimensions of the detector, derived from carrier spheres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorExtent {
    /// Radius of the origin-centred sphere enclosing every carrier
    pub radius: f64,
    /// Lowest carrier z (never above zero)
    pub lowest: f64,
    /// Highest carrier z (never below zero)
    pub highest: f64,
    /// Largest cylindrical distance from the z axis to a carrier surface
    pub max_rho: f64,
}

impl DetectorExtent {
    /// Enlarge the outer dimensions by `distance` (e.g. the maximum photon
    /// absorption length) to get the volume where light can still reach a sensor.
    #[must_use]
    pub fn padded(&self, distance: f64) -> Self {
        Self {
            radius: self.radius + distance,
            lowest: self.lowest,
            highest: self.highest + distance,
            max_rho: self.max_rho + distance,
        }
    }
}

/// Registry of every sensor and carrier in the detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorGeometry {
    sensors: Vec<Sensor>,
    carriers: Vec<Carrier>,
    finalized: bool,
}

fn check_finite(p: DVec3) -> Result<(), ConfigurationError> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::NonFinitePosition {
            x: p.x,
            y: p.y,
            z: p.z,
        })
    }
}

impl DetectorGeometry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a carrier at `position`.
    ///
    /// # Errors
    ///
    /// Fails once the registry is finalized, or if `position` is not finite.
    pub fn add_carrier(&mut self, position: DVec3) -> Result<CarrierId, ConfigurationError> {
        if self.finalized {
            return Err(ConfigurationError::AlreadyFinalized);
        }
        check_finite(position)?;
        #[allow(clippy::cast_possible_truncation)]
        let id = CarrierId::new(self.carriers.len() as u32);
        self.carriers.push(Carrier {
            id,
            position,
            sensors: Vec::new(),
            radius: 0.0,
        });
        Ok(id)
    }

    /// Register a sensor on `carrier`.
    ///
    /// # Errors
    ///
    /// Fails if the geometry is already finalized, the carrier is unknown, or
    /// `spec` has a non-finite position, an invalid radius or an axis that
    /// cannot be normalized.
    pub fn add_sensor(
        &mut self,
        carrier: CarrierId,
        spec: SensorSpec,
    ) -> Result<SensorId, ConfigurationError> {
        if self.finalized {
            return Err(ConfigurationError::AlreadyFinalized);
        }
        if carrier.index() >= self.carriers.len() {
            return Err(ConfigurationError::UnknownCarrier(carrier));
        }
        check_finite(spec.position)?;
        if !spec.radius.is_finite() || spec.radius < 0.0 {
            return Err(ConfigurationError::InvalidSensorRadius {
                radius: spec.radius,
            });
        }
        let axis = spec
            .axis
            .try_normalize()
            .ok_or(ConfigurationError::InvalidAxis)?;

        #[allow(clippy::cast_possible_truncation)]
        let id = SensorId::new(self.sensors.len() as u32);
        self.sensors.push(Sensor {
            id,
            position: spec.position,
            radius: spec.radius,
            height: if spec.height.is_finite() {
                spec.height
            } else {
                SPHERICAL_HEIGHT
            },
            axis,
            carrier,
        });
        self.carriers[carrier.index()].sensors.push(id);
        Ok(id)
    }

    /// Freeze the registry and derive every carrier radius.
    ///
    /// # Errors
    ///
    /// Fails if there are no carriers, a carrier owns no sensors, or a carrier
    /// position is not finite.
    pub fn finalize(&mut self) -> Result<(), ConfigurationError> {
        if self.carriers.is_empty() {
            return Err(ConfigurationError::EmptyCarrierList);
        }
        for carrier in &self.carriers {
            check_finite(carrier.position)?;
            if carrier.sensors.is_empty() {
                return Err(ConfigurationError::EmptyCarrier(carrier.id));
            }
        }

        let sensors = &self.sensors;
        for carrier in &mut self.carriers {
            carrier.radius = Sphere::enclosing(
                carrier.position,
                carrier
                    .sensors
                    .iter()
                    .map(|id| sensors[id.index()].bounding_sphere()),
            )
            .radius;
        }
        self.finalized = true;
        Ok(())
    }

    /// Whether [`finalize`](Self::finalize) has completed.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Look up a sensor.
    #[must_use]
    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.get(id.index())
    }

    /// Look up a carrier.
    #[must_use]
    pub fn carrier(&self, id: CarrierId) -> Option<&Carrier> {
        self.carriers.get(id.index())
    }

    /// All sensors in id order.
    #[must_use]
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// All carriers in id order.
    #[must_use]
    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }

    /// Number of sensors.
    #[must_use]
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Number of carriers.
    #[must_use]
    pub fn carrier_count(&self) -> usize {
        self.carriers.len()
    }

    /// Outer dimensions of the detector.
    ///
    /// Meaningful only once the geometry is finalized.
    #[must_use]
    pub fn extent(&self) -> DetectorExtent {
        self.carriers
            .iter()
            .fold(DetectorExtent::default(), |mut extent, carrier| {
                let pos = carrier.position;
                extent.radius = extent.radius.max(pos.length() + carrier.radius);
                extent.lowest = extent.lowest.min(pos.z);
                extent.highest = extent.highest.max(pos.z);
                extent.max_rho = extent.max_rho.max(pos.x.hypot(pos.y) + carrier.radius);
                extent
            })
    }
}
