//! Per-pair fetch serialization.
//!
//! At most one backfill+read may be in flight per `(instrument, granularity)`
//! pair; a second fetch for the same pair blocks until the first releases its
//! guard. Fetches for different pairs proceed in parallel.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};

use crate::{Granularity, InstrumentCode};

type PairKey = (InstrumentCode, Granularity);

struct Registry {
    in_flight: Mutex<HashSet<PairKey>>,
    released: Condvar,
}

/// Mutual-exclusion token registry keyed by instrument pair.
#[derive(Clone)]
pub struct PairLocks {
    registry: Arc<Registry>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                in_flight: Mutex::new(HashSet::new()),
                released: Condvar::new(),
            }),
        }
    }

    /// Block until the pair is free, then hold it for the guard's lifetime.
    pub fn lock(&self, code: &InstrumentCode, granularity: Granularity) -> PairGuard {
        let key = (code.clone(), granularity);
        let mut in_flight = self
            .registry
            .in_flight
            .lock()
            .expect("pair lock registry poisoned");
        while in_flight.contains(&key) {
            in_flight = self
                .registry
                .released
                .wait(in_flight)
                .expect("pair lock registry poisoned");
        }
        in_flight.insert(key.clone());
        drop(in_flight);

        PairGuard {
            registry: Arc::clone(&self.registry),
            key,
        }
    }
}

impl Default for PairLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of one fetch call; releases the pair on drop.
pub struct PairGuard {
    registry: Arc<Registry>,
    key: PairKey,
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        let mut in_flight = self
            .registry
            .in_flight
            .lock()
            .expect("pair lock registry poisoned");
        in_flight.remove(&self.key);
        drop(in_flight);
        self.registry.released.notify_all();
    }
}
