//! Explicit cache of built power-duration profiles.
//!
//! Keyed by athlete, sport and window length. Nothing is evicted implicitly;
//! the caller invalidates when new activities or edits arrive.

use std::collections::HashMap;

use super::pdc::PowerDurationProfile;
use super::types::{AthleteId, Sport};

/// Cache key for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub athlete: AthleteId,
    pub sport: Sport,
    /// Window length in days, `None` for an all-time profile.
    pub window_days: Option<u32>,
}

impl ProfileKey {
    pub fn new(athlete: AthleteId, sport: Sport, window_days: Option<u32>) -> Self {
        Self {
            athlete,
            sport,
            window_days,
        }
    }

    /// Key a profile would be stored under.
    pub fn for_profile(profile: &PowerDurationProfile) -> Self {
        Self::new(
            profile.athlete(),
            profile.sport(),
            profile.window().map(|w| w.days),
        )
    }
}

/// Profile cache with caller-controlled invalidation.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: HashMap<ProfileKey, PowerDurationProfile>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ProfileKey) -> Option<&PowerDurationProfile> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &ProfileKey) -> Option<&mut PowerDurationProfile> {
        self.entries.get_mut(key)
    }

    /// Store a profile under its own key, returning any profile it replaced.
    pub fn insert(&mut self, profile: PowerDurationProfile) -> Option<PowerDurationProfile> {
        self.entries.insert(ProfileKey::for_profile(&profile), profile)
    }

    /// Cached profile for `key`, building it with `build` on a miss.
    pub fn get_or_insert_with<F>(&mut self, key: ProfileKey, build: F) -> &PowerDurationProfile
    where
        F: FnOnce() -> PowerDurationProfile,
    {
        self.entries.entry(key).or_insert_with(build)
    }

    /// Drop one entry. Returns true if it existed.
    pub fn invalidate(&mut self, key: &ProfileKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every window of an athlete, optionally for one sport only.
    pub fn invalidate_athlete(&mut self, athlete: AthleteId, sport: Option<Sport>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| key.athlete != athlete || sport.is_some_and(|s| s != key.sport));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
