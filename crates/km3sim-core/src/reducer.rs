//! Event-end hit reduction.
//!
//! [`HitReducer::reduce`] turns the unordered raw hits of one event into
//! pulses in three stages:
//!
//! 1. **order**: malformed hits are set aside, the rest are stably sorted by
//!    sensor id and arrival time;
//! 2. **accept**: each hit is tested against its sensor's angular acceptance;
//! 3. **merge**: within each sensor's run, hits arriving no later than the
//!    merge window after the first hit of the open pulse are folded into it.
//!
//! The window is anchored at the first hit of a pulse, so a burst of hits
//! spaced just under the window apart still splits into several pulses.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::calibration::CalibrationTable;
use crate::error::{CalibrationError, MalformedHitError, MalformedHitReason, ReductionError};
use crate::hit::{EventId, MergedHit, RawHit};

/// How the acceptance value of a hit decides whether it is kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AcceptanceMode {
    /// Keep a hit iff its acceptance exceeds `threshold`.
    Gate {
        /// Acceptance at or below which a hit is dropped
        threshold: f64,
    },
    /// Keep a hit with probability equal to its acceptance.
    ///
    /// Draws come from a `ChaCha8Rng` seeded with `seed` on the stream
    /// numbered by the event id, so a given event reduces identically
    /// however events are scheduled.
    Sampled {
        /// Base seed combined with the event id
        seed: u64,
    },
}

impl Default for AcceptanceMode {
    fn default() -> Self {
        Self::Gate { threshold: 0.0 }
    }
}

/// Configuration for [`HitReducer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Acceptance decision rule
    pub acceptance: AcceptanceMode,
}

impl ReducerConfig {
    /// Probabilistic acceptance with the given seed.
    #[must_use]
    pub fn sampled(seed: u64) -> Self {
        Self {
            acceptance: AcceptanceMode::Sampled { seed },
        }
    }
}

/// Result of reducing one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducedEvent {
    /// Event the hits belong to
    pub event: EventId,
    /// Pulses ordered by (sensor, time)
    pub hits: Vec<MergedHit>,
    /// Raw hits excluded before sorting
    pub malformed: Vec<MalformedHitError>,
    /// Raw hits dropped by the acceptance filter
    pub rejected_by_acceptance: usize,
}

impl ReducedEvent {
    /// Sum of pulse weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.hits.iter().map(|h| h.weight).sum()
    }
}

/// Reduces raw hits against a calibration table.
#[derive(Debug, Clone, Copy)]
pub struct HitReducer<'a> {
    table: &'a CalibrationTable,
    config: ReducerConfig,
}

impl<'a> HitReducer<'a> {
    /// Create a reducer over `table`.
    #[must_use]
    pub fn new(table: &'a CalibrationTable, config: ReducerConfig) -> Self {
        Self { table, config }
    }

    /// The reducer's configuration.
    #[must_use]
    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    /// Reduce the raw hits of one event.
    ///
    /// # Errors
    ///
    /// Fails with [`ReductionError::Configuration`] if a hit refers to a
    /// sensor missing from the calibration table, and with
    /// [`ReductionError::Calibration`] if an acceptance evaluates to a
    /// non-finite value. Malformed hits are reported in
    /// [`ReducedEvent::malformed`] instead.
    pub fn reduce(&self, event: EventId, hits: Vec<RawHit>) -> Result<ReducedEvent, ReductionError> {
        let (mut hits, malformed) = screen(event, hits);
        hits.sort_by(|a, b| a.sensor.cmp(&b.sensor).then(a.time.total_cmp(&b.time)));

        let total = hits.len();
        let accepted = self.filter(event, hits)?;
        let rejected_by_acceptance = total - accepted.len();
        let merged = self.merge(&accepted)?;

        Ok(ReducedEvent {
            event,
            hits: merged,
            malformed,
            rejected_by_acceptance,
        })
    }

    /// Reduce independent events in parallel. Results keep the input order.
    pub fn reduce_events(
        &self,
        events: Vec<(EventId, Vec<RawHit>)>,
    ) -> Vec<Result<ReducedEvent, ReductionError>> {
        events
            .into_par_iter()
            .map(|(event, hits)| self.reduce(event, hits))
            .collect()
    }

    fn filter(&self, event: EventId, hits: Vec<RawHit>) -> Result<Vec<RawHit>, ReductionError> {
        let mut decision = Decision::new(self.config.acceptance, event);

        let mut accepted = Vec::with_capacity(hits.len());
        for hit in hits {
            let calibration = self.table.require(hit.sensor)?;
            let Some(acceptance) = calibration.acceptance(hit.direction.normalize()) else {
                continue;
            };
            if !acceptance.is_finite() {
                return Err(CalibrationError::NonFiniteAcceptance { sensor: hit.sensor }.into());
            }
            if decision.keep(acceptance) {
                accepted.push(hit);
            }
        }
        Ok(accepted)
    }

    fn merge(&self, hits: &[RawHit]) -> Result<Vec<MergedHit>, ReductionError> {
        let mut merged: Vec<MergedHit> = Vec::new();

        for run in hits.chunk_by(|a, b| a.sensor == b.sensor) {
            let sensor = run[0].sensor;
            let window = self.table.require(sensor)?.merge_window();
            let first_pulse = merged.len();

            let mut pulse = MergedHit::open(&run[0]);
            for hit in &run[1..] {
                if hit.time - pulse.time <= window {
                    pulse.absorb(hit);
                } else {
                    merged.push(pulse);
                    pulse = MergedHit::open(hit);
                }
            }
            merged.push(pulse);

            trace!(
                sensor = sensor.as_u32(),
                hits = run.len(),
                pulses = merged.len() - first_pulse,
                "sensor run reduced"
            );
        }
        Ok(merged)
    }
}

/// Split off malformed hits, keeping the rest in input order.
fn screen(event: EventId, hits: Vec<RawHit>) -> (Vec<RawHit>, Vec<MalformedHitError>) {
    let mut valid = Vec::with_capacity(hits.len());
    let mut malformed = Vec::new();

    for (index, hit) in hits.into_iter().enumerate() {
        match malformed_reason(&hit) {
            None => valid.push(hit),
            Some(reason) => {
                let error = MalformedHitError {
                    index,
                    sensor: hit.sensor,
                    reason,
                };
                warn!(event = event.as_u64(), %error, "dropping malformed hit");
                malformed.push(error);
            }
        }
    }
    (valid, malformed)
}

fn malformed_reason(hit: &RawHit) -> Option<MalformedHitReason> {
    if !(hit.weight.is_finite() && hit.weight > 0.0) {
        Some(MalformedHitReason::NonPositiveWeight)
    } else if !(hit.time.is_finite() && hit.time >= 0.0) {
        Some(MalformedHitReason::NegativeTime)
    } else if hit.direction.try_normalize().is_none() {
        Some(MalformedHitReason::InvalidDirection)
    } else {
        None
    }
}

/// Per-event acceptance decision state.
enum Decision {
    Gate(f64),
    Sampled(ChaCha8Rng),
}

impl Decision {
    fn new(mode: AcceptanceMode, event: EventId) -> Self {
        match mode {
            AcceptanceMode::Gate { threshold } => Self::Gate(threshold),
            AcceptanceMode::Sampled { seed } => Self::Sampled(event_rng(seed, event)),
        }
    }

    fn keep(&mut self, acceptance: f64) -> bool {
        match self {
            Self::Gate(threshold) => acceptance > *threshold,
            Self::Sampled(rng) => rng.gen::<f64>() < acceptance,
        }
    }
}

fn event_rng(seed: u64, event: EventId) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(event.as_u64());
    rng
}
