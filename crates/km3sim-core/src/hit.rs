//! Raw and merged photon hits.
//!
//! A [`RawHit`] is one photon detection recorded while an event is tracked.
//! A [`MergedHit`] is the pulse written to the event record after the raw
//! hits on a sensor have been folded inside the merge window.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use spheretree::SensorId;

/// Identifier of a simulated event.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    /// Creates an event id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the particle track that produced a photon.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub i32);

/// One photon detection on a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// Sensor that detected the photon
    pub sensor: SensorId,
    /// Arrival time (ns)
    pub time: f64,
    /// Signal amplitude in photoelectron equivalents
    pub weight: f64,
    /// Photon direction of travel at detection
    pub direction: DVec3,
    /// Track the photon originates from, if known
    pub track: Option<TrackId>,
}

impl RawHit {
    /// Create a hit without track information.
    #[must_use]
    pub fn new(sensor: SensorId, time: f64, weight: f64, direction: DVec3) -> Self {
        Self {
            sensor,
            time,
            weight,
            direction,
            track: None,
        }
    }

    /// Attach the originating track.
    #[must_use]
    pub fn with_track(mut self, track: TrackId) -> Self {
        self.track = Some(track);
        self
    }
}

/// A pulse: one or more raw hits on the same sensor within a merge window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergedHit {
    /// Sensor the pulse was recorded on
    pub sensor: SensorId,
    /// Time of the earliest constituent (ns)
    pub time: f64,
    /// Sum of constituent weights
    pub weight: f64,
    /// Number of constituents
    pub count: u32,
    /// Track of the earliest constituent
    pub track: Option<TrackId>,
}

impl MergedHit {
    /// Start a pulse from its first hit.
    #[must_use]
    pub fn open(hit: &RawHit) -> Self {
        Self {
            sensor: hit.sensor,
            time: hit.time,
            weight: hit.weight,
            count: 1,
            track: hit.track,
        }
    }

    /// Fold a later hit into this pulse.
    pub fn absorb(&mut self, hit: &RawHit) {
        self.weight += hit.weight;
        self.count += 1;
    }

    /// Re-express the pulse as a single raw hit arriving along `direction`.
    #[must_use]
    pub fn to_raw_hit(&self, direction: DVec3) -> RawHit {
        RawHit {
            sensor: self.sensor,
            time: self.time,
            weight: self.weight,
            direction,
            track: self.track,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_absorb() {
        let first = RawHit::new(SensorId::new(3), 10.0, 1.5, -DVec3::Z).with_track(TrackId(7));
        let second = RawHit::new(SensorId::new(3), 12.0, 0.5, -DVec3::Z).with_track(TrackId(8));

        let mut pulse = MergedHit::open(&first);
        pulse.absorb(&second);

        assert_eq!(pulse.time, 10.0);
        assert_eq!(pulse.weight, 2.0);
        assert_eq!(pulse.count, 2);
        assert_eq!(pulse.track, Some(TrackId(7)));
    }

    #[test]
    fn test_to_raw_hit() {
        let pulse = MergedHit {
            sensor: SensorId::new(1),
            time: 4.0,
            weight: 3.0,
            count: 3,
            track: None,
        };
        let raw = pulse.to_raw_hit(DVec3::X);
        assert_eq!(raw.sensor, SensorId::new(1));
        assert_eq!(raw.time, 4.0);
        assert_eq!(raw.weight, 3.0);
        assert_eq!(raw.direction, DVec3::X);
    }
}
