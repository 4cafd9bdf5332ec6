//! Capacity-gated independent workers.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, info};

use crate::request::RequestSource;
use crate::sink::{AreaReport, ResultSink};
use crate::{EngineError, EngineResult};

use super::capacity::CapacityGate;
use super::launcher::WorkerLauncher;
use super::{RunOutcome, WorkerStrategy};

/// First fatal error raised by any worker completion.
type FailureSlot = Arc<Mutex<Option<EngineError>>>;

fn record_failure(slot: &FailureSlot, err: EngineError) {
    if let Ok(mut first) = slot.lock() {
        if first.is_none() {
            *first = Some(err);
        }
    }
}

fn take_failure(slot: &FailureSlot) -> Option<EngineError> {
    slot.lock().ok().and_then(|mut f| f.take())
}

/// Admits a request only while fewer than `max_workers` are in flight; each
/// admitted request runs in its own isolated worker and reports its own area.
pub struct IndependentStrategy {
    gate: Arc<CapacityGate>,
    launcher: Box<dyn WorkerLauncher>,
    sink: Arc<dyn ResultSink>,
}

impl IndependentStrategy {
    pub fn new(
        max_workers: usize,
        launcher: Box<dyn WorkerLauncher>,
        sink: Arc<dyn ResultSink>,
    ) -> EngineResult<Self> {
        if max_workers == 0 {
            return Err(EngineError::Config(
                "max_concurrent_workers must be at least 1".into(),
            ));
        }
        Ok(IndependentStrategy {
            gate: Arc::new(CapacityGate::new(max_workers)),
            launcher,
            sink,
        })
    }

    /// The gate, for observing active/peak counts.
    pub fn gate(&self) -> &Arc<CapacityGate> {
        &self.gate
    }

    fn admit_all(&self, source: &mut dyn RequestSource, failure: &FailureSlot) -> EngineResult<usize> {
        let mut admitted = 0;
        loop {
            let Some(request) = source.next_request() else {
                debug!(admitted, "request source exhausted");
                return Ok(admitted);
            };

            self.gate.acquire()?;
            if let Some(err) = take_failure(failure) {
                self.gate.release()?;
                return Err(err);
            }

            let gate = Arc::clone(&self.gate);
            let sink = Arc::clone(&self.sink);
            let slot = Arc::clone(failure);
            let on_done = Box::new(move |outcome: EngineResult<AreaReport>| {
                let reported = outcome.and_then(|report| sink.report_area(&report));
                if let Err(e) = reported {
                    error!(error = %e, "worker failed");
                    record_failure(&slot, e);
                }
                if let Err(e) = gate.release() {
                    record_failure(&slot, e);
                }
            });

            if let Err(e) = self.launcher.launch(request, on_done) {
                self.gate.release()?;
                return Err(e);
            }
            admitted += 1;
        }
    }
}

impl WorkerStrategy for IndependentStrategy {
    fn name(&self) -> &'static str {
        "independent"
    }

    fn drive(&mut self, source: &mut dyn RequestSource) -> EngineResult<RunOutcome> {
        info!(
            launcher = self.launcher.name(),
            max_workers = self.gate.max(),
            "dispatching independent workers"
        );
        let failure: FailureSlot = Arc::new(Mutex::new(None));
        let admitted = self.admit_all(source, &failure);

        // in-flight workers cannot be cancelled; let them finish either way
        self.gate.wait_idle()?;

        let admitted = admitted?;
        if let Some(err) = take_failure(&failure) {
            return Err(err);
        }
        Ok(RunOutcome {
            strategy: self.name().to_string(),
            requests_admitted: admitted,
            batches: 0,
            peak_active: self.gate.peak(),
            total: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::launcher::{Completion, ThreadLauncher};
    use crate::request::{IntegrationRequest, IterRequestSource};
    use crate::sink::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Thread launcher that sleeps and tracks how many workers run at once.
    #[derive(Default)]
    struct SlowLauncher {
        running: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
        fail_after: Option<usize>,
        fail_worker: Option<usize>,
        launched: AtomicUsize,
    }

    impl WorkerLauncher for SlowLauncher {
        fn name(&self) -> &str {
            "slow"
        }

        fn launch(&self, request: IntegrationRequest, on_done: Completion) -> EngineResult<()> {
            let n = self.launched.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| n >= limit) {
                return Err(EngineError::WorkerSpawn("resource exhausted".into()));
            }
            let running = Arc::clone(&self.running);
            let max_seen = Arc::clone(&self.max_seen);
            let fails = self.fail_worker == Some(n);
            std::thread::spawn(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(15));
                let area = crate::integrate::integrate_request(&request);
                running.fetch_sub(1, Ordering::SeqCst);
                if fails {
                    on_done(Err(EngineError::WorkerFailure("boom".into())));
                } else {
                    on_done(Ok(AreaReport::new(&request, area)));
                }
            });
            Ok(())
        }
    }

    fn requests(n: usize) -> Vec<IntegrationRequest> {
        (0..n)
            .map(|i| IntegrationRequest::new(0.0, 1.0 + i as f64, 100, i % 3).unwrap())
            .collect()
    }

    #[test]
    fn test_burst_respects_cap() {
        let launcher = SlowLauncher::default();
        let max_seen = Arc::clone(&launcher.max_seen);
        let sink = Arc::new(MemorySink::new());
        let mut strategy = IndependentStrategy::new(3, Box::new(launcher), sink.clone()).unwrap();

        let mut source = IterRequestSource::new(requests(20));
        let outcome = strategy.drive(&mut source).unwrap();

        assert_eq!(outcome.requests_admitted, 20);
        assert_eq!(sink.areas().len(), 20);
        assert!(outcome.peak_active <= 3);
        assert!(max_seen.load(Ordering::SeqCst) <= 3);
        assert_eq!(strategy.gate().active(), 0);
    }

    #[test]
    fn test_empty_source_dispatches_nothing() {
        let sink = Arc::new(MemorySink::new());
        let mut strategy =
            IndependentStrategy::new(2, Box::new(ThreadLauncher::new()), sink.clone()).unwrap();
        let mut source = IterRequestSource::new(Vec::<IntegrationRequest>::new());
        let outcome = strategy.drive(&mut source).unwrap();
        assert_eq!(outcome.requests_admitted, 0);
        assert!(sink.areas().is_empty());
        assert_eq!(outcome.peak_active, 0);
    }

    #[test]
    fn test_spawn_failure_is_fatal_after_draining() {
        let launcher = SlowLauncher {
            fail_after: Some(4),
            ..Default::default()
        };
        let sink = Arc::new(MemorySink::new());
        let mut strategy = IndependentStrategy::new(2, Box::new(launcher), sink.clone()).unwrap();
        let mut source = IterRequestSource::new(requests(10));

        let err = strategy.drive(&mut source).unwrap_err();
        assert!(matches!(err, EngineError::WorkerSpawn(_)));
        // the four workers that did start were allowed to finish
        assert_eq!(sink.areas().len(), 4);
        assert_eq!(strategy.gate().active(), 0);
    }

    #[test]
    fn test_worker_failure_stops_admission() {
        // with one slot, the failed second worker is recorded before the
        // third request can be admitted
        let launcher = SlowLauncher {
            fail_worker: Some(1),
            ..Default::default()
        };
        let sink = Arc::new(MemorySink::new());
        let mut strategy = IndependentStrategy::new(1, Box::new(launcher), sink.clone()).unwrap();
        let mut source = IterRequestSource::new(requests(10));

        let err = strategy.drive(&mut source).unwrap_err();
        assert!(matches!(err, EngineError::WorkerFailure(ref msg) if msg == "boom"));
        assert_eq!(sink.areas().len(), 1);
        assert_eq!(strategy.gate().active(), 0);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let sink = Arc::new(MemorySink::new());
        assert!(IndependentStrategy::new(0, Box::new(ThreadLauncher::new()), sink).is_err());
    }
}
