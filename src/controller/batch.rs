//! Fixed-size synchronous batches sharing one accumulator.
//!
//! Each batch admits up to `batch_size` requests, runs one thread per admitted
//! request, joins all of them, and only then reports the total. The next batch
//! is not filled until the previous one has been reported.

use std::sync::Arc;

use tracing::{debug, info};

use crate::accumulator::Accumulator;
use crate::config::TotalMode;
use crate::integrate::integrate_request;
use crate::request::{IntegrationRequest, RequestSource};
use crate::sink::{BatchReport, ResultSink};
use crate::{EngineError, EngineResult};

use super::{RunOutcome, WorkerStrategy};

/// Reusable arena of batch slots indexed by position.
#[derive(Debug)]
pub struct TaskSlots {
    slots: Vec<Option<IntegrationRequest>>,
}

impl TaskSlots {
    pub fn new(capacity: usize) -> Self {
        TaskSlots {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Clear every slot, then admit requests in order until the slots are
    /// full or the source is exhausted. Returns the number admitted.
    pub fn fill(&mut self, source: &mut dyn RequestSource) -> usize {
        self.clear();
        let mut filled = 0;
        for slot in self.slots.iter_mut() {
            match source.next_request() {
                Some(request) => {
                    *slot = Some(request);
                    filled += 1;
                }
                None => break,
            }
        }
        filled
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    pub fn occupied(&self) -> impl Iterator<Item = (usize, &IntegrationRequest)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|r| (i, r)))
    }
}

/// One admitted request bound to the batch's accumulator.
pub struct WorkerTask<'a> {
    pub request: IntegrationRequest,
    pub accumulator: &'a Accumulator,
}

impl WorkerTask<'_> {
    /// Integrate without holding the lock, then fold the area in.
    pub fn run(self) -> EngineResult<()> {
        let area = integrate_request(&self.request);
        self.accumulator.add(area)
    }
}

pub struct BatchStrategy {
    slots: TaskSlots,
    accumulator: Accumulator,
    total_mode: TotalMode,
    sink: Arc<dyn ResultSink>,
}

impl BatchStrategy {
    pub fn new(
        batch_size: usize,
        total_mode: TotalMode,
        sink: Arc<dyn ResultSink>,
    ) -> EngineResult<Self> {
        if batch_size == 0 {
            return Err(EngineError::Config("batch_size must be at least 1".into()));
        }
        Ok(BatchStrategy {
            slots: TaskSlots::new(batch_size),
            accumulator: Accumulator::new(),
            total_mode,
            sink,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.slots.capacity()
    }

    /// Spawn one thread per occupied slot and join them all.
    fn run_batch(&self, batch: usize) -> EngineResult<()> {
        std::thread::scope(|scope| -> EngineResult<()> {
            let mut handles = Vec::with_capacity(self.slots.capacity());
            for (slot, request) in self.slots.occupied() {
                let task = WorkerTask {
                    request: *request,
                    accumulator: &self.accumulator,
                };
                let handle = std::thread::Builder::new()
                    .name(format!("batch-{batch}-slot-{slot}"))
                    .spawn_scoped(scope, move || task.run())
                    .map_err(|e| EngineError::WorkerSpawn(format!("failed to spawn batch worker: {e}")))?;
                handles.push(handle);
            }
            for handle in handles {
                handle
                    .join()
                    .map_err(|_| EngineError::Synchronization("batch worker panicked".into()))??;
            }
            Ok(())
        })
    }
}

impl WorkerStrategy for BatchStrategy {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn drive(&mut self, source: &mut dyn RequestSource) -> EngineResult<RunOutcome> {
        info!(
            batch_size = self.batch_size(),
            total_mode = ?self.total_mode,
            "dispatching batches"
        );
        let mut batch = 0;
        let mut admitted = 0;
        let mut peak = 0;

        loop {
            let filled = self.slots.fill(source);
            let exhausted = filled < self.slots.capacity();
            // an empty trailing batch must not wipe the last reported total
            if filled > 0 && self.total_mode == TotalMode::PerBatch {
                self.accumulator.take()?;
            }

            self.run_batch(batch)?;

            if filled > 0 {
                let total = self.accumulator.total()?;
                debug!(batch, filled, total, "batch joined");
                self.sink.report_total(&BatchReport {
                    batch,
                    requests: filled,
                    total,
                })?;
                batch += 1;
                admitted += filled;
                peak = peak.max(filled);
            }

            if exhausted {
                break;
            }
        }
        self.slots.clear();

        Ok(RunOutcome {
            strategy: self.name().to_string(),
            requests_admitted: admitted,
            batches: batch,
            peak_active: peak,
            total: Some(self.accumulator.total()?),
        })
    }
}
