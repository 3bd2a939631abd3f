use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// Where an entity's latest edit stands.
///
/// `Idle → Pending → {Committed | RolledBack}`. Only `Pending` entries are
/// kept in the table; a settled edit leaves the entity `Idle` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

/// Per-entity single-flight table owned by one mutation engine.
#[derive(Debug)]
pub struct SingleFlight<K> {
    phases: Arc<Mutex<HashMap<K, Phase>>>,
}

impl<K> Default for SingleFlight<K> {
    fn default() -> Self {
        Self {
            phases: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Copy + Eq + Hash + fmt::Debug> SingleFlight<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, key: K) -> Phase {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
            .unwrap_or(Phase::Idle)
    }

    pub fn in_flight(&self) -> usize {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|p| **p == Phase::Pending)
            .count()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.phases.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Move `key` to `Pending`. `None` when an edit is already in flight.
    pub fn begin(&self, key: K) -> Option<Flight<K>> {
        let mut phases = self.phases.lock().unwrap_or_else(PoisonError::into_inner);
        if phases.get(&key) == Some(&Phase::Pending) {
            log::debug!("Dropping edit on {:?}: already in flight", key);
            return None;
        }
        phases.insert(key, Phase::Pending);
        Some(Flight {
            key,
            outcome: Phase::RolledBack,
            phases: Arc::clone(&self.phases),
        })
    }
}

/// Guard for one in-flight edit. Dropping it always releases the entity;
/// an edit that never reached `commit` counts as rolled back.
#[derive(Debug)]
pub struct Flight<K: Copy + Eq + Hash + fmt::Debug> {
    key: K,
    outcome: Phase,
    phases: Arc<Mutex<HashMap<K, Phase>>>,
}

impl<K: Copy + Eq + Hash + fmt::Debug> Flight<K> {
    pub fn commit(mut self) {
        self.outcome = Phase::Committed;
    }

    pub fn roll_back(mut self) {
        self.outcome = Phase::RolledBack;
    }
}

impl<K: Copy + Eq + Hash + fmt::Debug> Drop for Flight<K> {
    fn drop(&mut self) {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        log::debug!("Edit on {:?} settled: {:?}", self.key, self.outcome);
    }
}
