// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Polygon ID allocation

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use crate::config::{IdSettings, IdStrategy};
use crate::geo::PolygonId;

/// Retries after which a dense project is reported
const RETRY_WARNING: u32 = 64;

pub struct IdAllocator {
    strategy: IdStrategy,
    rng: StdRng,
    /// Collisions seen by the random strategy since creation
    retries: u64,
}

impl IdAllocator {
    pub fn new(settings: &IdSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            strategy: settings.strategy,
            rng,
            retries: 0,
        }
    }

    pub fn retries(&self) -> u64 {
        self.retries
    }

    /// Pick an ID not in `taken`
    ///
    /// The random strategy tries 1 first, then samples `2..=10 * len(taken)`
    /// until it misses every existing ID. There is no retry limit; an
    /// unusually long search is logged.
    pub fn allocate(&mut self, taken: &HashSet<PolygonId>) -> PolygonId {
        match self.strategy {
            IdStrategy::Sequential => (1..=PolygonId::MAX)
                .find(|id| !taken.contains(id))
                .unwrap_or(PolygonId::MAX),
            IdStrategy::Random => {
                let upper = (taken.len() as PolygonId).saturating_mul(10).max(2);
                let mut id = 1;
                let mut attempts = 0u32;
                while taken.contains(&id) {
                    id = self.rng.gen_range(2..=upper);
                    attempts += 1;
                    self.retries += 1;
                    if attempts == RETRY_WARNING {
                        log::warn!(
                            "[WARN] ID allocation needed {attempts} retries among {} polygons",
                            taken.len()
                        );
                    }
                }
                id
            }
        }
    }
}
