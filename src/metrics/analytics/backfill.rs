//! PMC backfill and repopulation.
//!
//! Recomputes an athlete's full training-day series from scratch. Different
//! athletes may be repopulated concurrently; the same athlete and sport may
//! not, which [`PopulationLocks`] enforces.

use std::collections::{BTreeMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Mutex;

use chrono::NaiveDate;
use rayon::prelude::*;

use super::training_load::{DayInput, LoadState, TrainingDayRecord, TrainingLoadAccumulator};
use super::types::{AthleteId, Sport};

/// Key of a population run.
pub type PopulationKey = (AthleteId, Sport);

/// Registry of population runs in progress.
#[derive(Debug, Default)]
pub struct PopulationLocks {
    in_progress: Mutex<HashSet<PopulationKey>>,
}

impl PopulationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a key. Returns `None` if a run for it is already in progress.
    pub fn try_acquire(&self, athlete: AthleteId, sport: Sport) -> Option<PopulationPermit<'_>> {
        let key = (athlete, sport);
        let mut in_progress = self.in_progress.lock().unwrap_or_else(|e| e.into_inner());
        if in_progress.insert(key) {
            Some(PopulationPermit { locks: self, key })
        } else {
            None
        }
    }

    pub fn is_in_progress(&self, athlete: AthleteId, sport: Sport) -> bool {
        self.in_progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(athlete, sport))
    }

    fn release(&self, key: &PopulationKey) {
        self.in_progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

/// Held while a population run is active; released on drop.
#[derive(Debug)]
pub struct PopulationPermit<'a> {
    locks: &'a PopulationLocks,
    key: PopulationKey,
}

impl PopulationPermit<'_> {
    pub fn key(&self) -> PopulationKey {
        self.key
    }
}

impl Drop for PopulationPermit<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

/// One athlete's backfill request.
#[derive(Debug, Clone)]
pub struct BackfillRequest {
    pub athlete: AthleteId,
    pub sport: Sport,
    pub days: BTreeMap<NaiveDate, DayInput>,
    pub seed: Option<LoadState>,
    pub through: Option<NaiveDate>,
}

/// Result of a backfill.
#[derive(Debug, Clone, PartialEq)]
pub enum BackfillOutcome {
    /// Every day was computed.
    Completed(Vec<TrainingDayRecord>),
    /// The progress callback asked to stop; holds the days computed so far.
    Stopped(Vec<TrainingDayRecord>),
    /// Another run for the same athlete and sport holds the lock.
    AlreadyRunning,
}

impl BackfillOutcome {
    pub fn records(&self) -> &[TrainingDayRecord] {
        match self {
            BackfillOutcome::Completed(records) | BackfillOutcome::Stopped(records) => records,
            BackfillOutcome::AlreadyRunning => &[],
        }
    }
}

/// Runs PMC repopulation.
#[derive(Debug, Default)]
pub struct PmcBackfill {
    accumulator: TrainingLoadAccumulator,
    locks: PopulationLocks,
}

impl PmcBackfill {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locks(&self) -> &PopulationLocks {
        &self.locks
    }

    /// Recompute a full series, reporting `(current, total, label)` after each day.
    ///
    /// The callback may return `ControlFlow::Break` to stop between days.
    pub fn repopulate<F>(&self, request: &BackfillRequest, mut progress: F) -> BackfillOutcome
    where
        F: FnMut(usize, usize, &str) -> ControlFlow<()>,
    {
        let Some(_permit) = self.locks.try_acquire(request.athlete, request.sport) else {
            tracing::warn!(
                athlete = %request.athlete,
                sport = %request.sport,
                "PMC population already in progress"
            );
            return BackfillOutcome::AlreadyRunning;
        };

        let series = self
            .accumulator
            .series(&request.days, request.seed, request.through);
        let total = series.remaining();
        tracing::info!(
            athlete = %request.athlete,
            sport = %request.sport,
            total,
            "Repopulating PMC"
        );

        let mut records = Vec::with_capacity(total);
        for record in series {
            records.push(record);
            let label = record.date.to_string();
            if progress(records.len(), total, &label).is_break() {
                tracing::info!(
                    athlete = %request.athlete,
                    done = records.len(),
                    total,
                    "PMC population stopped by caller"
                );
                return BackfillOutcome::Stopped(records);
            }
        }

        tracing::info!(
            athlete = %request.athlete,
            sport = %request.sport,
            days = records.len(),
            "PMC population complete"
        );
        BackfillOutcome::Completed(records)
    }

    /// Repopulate many athletes in parallel, without progress reporting.
    pub fn repopulate_many(
        &self,
        requests: &[BackfillRequest],
    ) -> Vec<(PopulationKey, BackfillOutcome)> {
        requests
            .par_iter()
            .map(|request| {
                let outcome = self.repopulate(request, |_, _, _| ControlFlow::Continue(()));
                ((request.athlete, request.sport), outcome)
            })
            .collect()
    }
}
