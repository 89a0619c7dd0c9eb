//! Per-event raw hit accumulation.
//!
//! Tracking threads append hits through a shared reference while the event
//! runs. [`RawHitBuffer::into_hits`] consumes the buffer, so once it returns
//! no append can still be pending: that is the barrier before reduction.

use std::sync::{Mutex, PoisonError};

use crate::hit::RawHit;

/// Append-only, unordered raw hit buffer for one event.
#[derive(Debug, Default)]
pub struct RawHitBuffer {
    hits: Mutex<Vec<RawHit>>,
}

impl RawHitBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` hits.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hits: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Append one hit. Safe to call from several threads at once.
    pub fn push(&self, hit: RawHit) {
        // A panicking tracker cannot leave a half-written RawHit behind
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hit);
    }

    /// Append a batch of hits under a single lock.
    pub fn extend(&self, hits: impl IntoIterator<Item = RawHit>) {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(hits);
    }

    /// Number of hits collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if no hit has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the buffer, ending the event's accumulation phase.
    #[must_use]
    pub fn into_hits(self) -> Vec<RawHit> {
        self.hits.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Vec<RawHit>> for RawHitBuffer {
    fn from(hits: Vec<RawHit>) -> Self {
        Self {
            hits: Mutex::new(hits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use rayon::prelude::*;
    use spheretree::SensorId;

    #[test]
    fn test_concurrent_append() {
        let buffer = RawHitBuffer::new();
        (0..1000u32).into_par_iter().for_each(|i| {
            buffer.push(RawHit::new(
                SensorId::new(i % 17),
                f64::from(i),
                1.0,
                -DVec3::Z,
            ));
        });
        assert_eq!(buffer.len(), 1000);

        let mut times: Vec<f64> = buffer.into_hits().iter().map(|h| h.time).collect();
        times.sort_by(f64::total_cmp);
        let expected: Vec<f64> = (0..1000u32).map(f64::from).collect();
        assert_eq!(times, expected);
    }

    #[test]
    fn test_extend_and_from() {
        let buffer = RawHitBuffer::from(vec![RawHit::new(SensorId::new(0), 1.0, 1.0, DVec3::X)]);
        buffer.extend([
            RawHit::new(SensorId::new(1), 2.0, 1.0, DVec3::X),
            RawHit::new(SensorId::new(2), 3.0, 1.0, DVec3::X),
        ]);
        assert!(!buffer.is_empty());
        assert_eq!(buffer.into_hits().len(), 3);
    }
}
