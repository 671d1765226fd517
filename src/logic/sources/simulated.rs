//! Simulated Source - pseudo-random sensor readings

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ReadingSource, SourceCounters, SourceKind, SourceStats};
use crate::constants::{MAX_THICKNESS_CM, MAX_VOLTAGE, MIN_THICKNESS_CM};
use crate::logic::error::SourceError;
use crate::logic::reading::Reading;

/// voltage ~ U(0, 3.3), thickness_cm ~ U(0.1, 2.0)
pub struct SimulatedSource<R: Rng + Send = StdRng> {
    rng: R,
    counters: SourceCounters,
}

impl SimulatedSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> SimulatedSource<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, counters: SourceCounters::default() }
    }
}

impl<R: Rng + Send> ReadingSource for SimulatedSource<R> {
    fn next_reading(&mut self) -> Result<Option<Reading>, SourceError> {
        let voltage = self.rng.gen_range(0.0..=MAX_VOLTAGE);
        let thickness_cm = self.rng.gen_range(MIN_THICKNESS_CM..=MAX_THICKNESS_CM);

        self.counters.reading();
        Ok(Reading::now(voltage, thickness_cm))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Simulated
    }

    fn stats(&self) -> SourceStats {
        self.counters.snapshot()
    }
}
