//! Capacity gate bounding the number of in-flight workers.
//!
//! The active count is only touched under the gate's mutex, both on admission
//! and on completion, and waiters sleep on a condition variable.

use std::sync::{Condvar, Mutex, MutexGuard};

use tracing::debug;

use crate::{EngineError, EngineResult};

#[derive(Debug, Default)]
struct GateState {
    active: usize,
    peak: usize,
    admitted: usize,
}

#[derive(Debug)]
pub struct CapacityGate {
    max: usize,
    state: Mutex<GateState>,
    changed: Condvar,
}

impl CapacityGate {
    /// A gate admitting at most `max` workers at once. `max` must be positive.
    pub fn new(max: usize) -> Self {
        CapacityGate {
            max,
            state: Mutex::new(GateState::default()),
            changed: Condvar::new(),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    fn lock(&self) -> EngineResult<MutexGuard<'_, GateState>> {
        self.state
            .lock()
            .map_err(|e| EngineError::Synchronization(format!("capacity gate poisoned: {e}")))
    }

    /// Block until a slot is free, then take it.
    pub fn acquire(&self) -> EngineResult<()> {
        let mut state = self.lock()?;
        while state.active >= self.max {
            state = self
                .changed
                .wait(state)
                .map_err(|e| EngineError::Synchronization(format!("capacity gate poisoned: {e}")))?;
        }
        state.active += 1;
        state.admitted += 1;
        state.peak = state.peak.max(state.active);
        debug!(active = state.active, max = self.max, "slot acquired");
        Ok(())
    }

    /// Give a slot back and wake waiters.
    pub fn release(&self) -> EngineResult<()> {
        let mut state = self.lock()?;
        if state.active == 0 {
            return Err(EngineError::Synchronization(
                "capacity gate released more often than acquired".into(),
            ));
        }
        state.active -= 1;
        debug!(active = state.active, "slot released");
        drop(state);
        self.changed.notify_all();
        Ok(())
    }

    /// Block until every acquired slot has been released.
    pub fn wait_idle(&self) -> EngineResult<()> {
        let mut state = self.lock()?;
        while state.active > 0 {
            state = self
                .changed
                .wait(state)
                .map_err(|e| EngineError::Synchronization(format!("capacity gate poisoned: {e}")))?;
        }
        Ok(())
    }

    pub fn active(&self) -> usize {
        self.lock().map(|s| s.active).unwrap_or(0)
    }

    /// Highest active count ever observed.
    pub fn peak(&self) -> usize {
        self.lock().map(|s| s.peak).unwrap_or(0)
    }

    /// Total number of successful acquisitions.
    pub fn admitted(&self) -> usize {
        self.lock().map(|s| s.admitted).unwrap_or(0)
    }
}
