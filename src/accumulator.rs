//! Shared running total for batch workers.

use std::sync::Mutex;

use crate::{EngineError, EngineResult};

/// A single `f64` total mutated only under its lock.
///
/// The lock covers the read-modify-write of the total, nothing else; callers
/// compute their area first and then call [`Accumulator::add`].
#[derive(Debug, Default)]
pub struct Accumulator {
    total: Mutex<f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Accumulator {
            total: Mutex::new(0.0),
        }
    }

    pub fn add(&self, value: f64) -> EngineResult<()> {
        let mut total = self
            .total
            .lock()
            .map_err(|e| EngineError::Synchronization(format!("accumulator lock poisoned: {e}")))?;
        *total += value;
        Ok(())
    }

    pub fn total(&self) -> EngineResult<f64> {
        self.total
            .lock()
            .map(|t| *t)
            .map_err(|e| EngineError::Synchronization(format!("accumulator lock poisoned: {e}")))
    }

    /// Return the current total and set it back to zero.
    pub fn take(&self) -> EngineResult<f64> {
        let mut total = self
            .total
            .lock()
            .map_err(|e| EngineError::Synchronization(format!("accumulator lock poisoned: {e}")))?;
        Ok(std::mem::take(&mut *total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_concurrent_adds_lose_nothing() {
        for k in [1usize, 2, 16, 100, 128] {
            for _trial in 0..10 {
                let acc = Arc::new(Accumulator::new());
                let barrier = Arc::new(Barrier::new(k));
                let handles: Vec<_> = (0..k)
                    .map(|_| {
                        let acc = Arc::clone(&acc);
                        let barrier = Arc::clone(&barrier);
                        std::thread::spawn(move || {
                            barrier.wait();
                            acc.add(0.5).unwrap();
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
                // 0.5 * k is exactly representable for these k
                assert_eq!(acc.total().unwrap(), 0.5 * k as f64);
            }
        }
    }

    #[test]
    fn test_take_resets() {
        let acc = Accumulator::new();
        acc.add(1.5).unwrap();
        acc.add(2.0).unwrap();
        assert_eq!(acc.take().unwrap(), 3.5);
        assert_eq!(acc.total().unwrap(), 0.0);
    }
}
