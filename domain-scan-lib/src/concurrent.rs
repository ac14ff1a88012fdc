//! Bounded-concurrency scan dispatcher.
//!
//! One blocking task enumerates candidates into a bounded job queue. A fixed
//! pool of workers pulls from that queue, consults the cache, classifies
//! misses, and publishes into a bounded result queue. A watcher waits for
//! the job queue to drain, gives in-flight workers a grace period, and then
//! lets the result queue close so the consumer sees the end of the run.
//!
//! Both queues are bounded, so a slow consumer throttles the workers and a
//! busy worker pool throttles the generator.

use crate::cache::{ResultCache, SweeperHandle};
use crate::checker::DomainChecker;
use crate::error::ScanError;
use crate::generate::CandidateGenerator;
use crate::types::{ProgressSnapshot, ScanConfig, ScanResult, ScanStats};
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Runs scans with a shared checker and cache.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<ScanConfig>,
    checker: DomainChecker,
    cache: Arc<ResultCache>,
}

impl Dispatcher {
    /// Create a dispatcher around explicit collaborators.
    pub fn new(config: ScanConfig, checker: DomainChecker, cache: Arc<ResultCache>) -> Self {
        Self {
            config: Arc::new(config),
            checker,
            cache,
        }
    }

    /// Dispatcher backed by the real network clients and a fresh cache.
    pub fn from_config(config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        let checker = DomainChecker::from_config(&config)?;
        let cache = Arc::new(ResultCache::new(config.cache_ttl));
        Ok(Self::new(config, checker, cache))
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Start a scan over the configured search space.
    ///
    /// Configuration problems (including a rejected filter pattern) are
    /// reported here, before any task is spawned. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> Result<ScanHandle, ScanError> {
        self.config.validate()?;
        let generator = CandidateGenerator::from_config(&self.config)?;
        self.start_with(generator)
    }

    /// Start a scan over an explicit generator.
    pub fn start_with(&self, generator: CandidateGenerator) -> Result<ScanHandle, ScanError> {
        self.config.validate()?;
        let stop = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(ScanStats::new(generator.total()));
        let generator = generator.with_stop_flag(Arc::clone(&stop));

        let (job_tx, job_rx) = mpsc::channel::<String>(self.config.job_queue_capacity);
        let (result_tx, result_rx) = mpsc::channel::<ScanResult>(self.config.result_queue_capacity);
        let (drained_tx, drained_rx) = watch::channel(false);

        let sweeper = self.cache.start_sweeper(self.config.sweep_interval);

        info!(
            total = generator.total(),
            workers = self.config.workers,
            delay_ms = self.config.delay.as_millis() as u64,
            "starting scan"
        );

        let generation = spawn_generation(generator, job_tx, Arc::clone(&stats));

        let jobs = Arc::new(Mutex::new(job_rx));
        let drained_tx = Arc::new(drained_tx);
        let workers: Vec<JoinHandle<()>> = (0..self.config.workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    jobs: Arc::clone(&jobs),
                    results: result_tx.clone(),
                    checker: self.checker.clone(),
                    cache: Arc::clone(&self.cache),
                    stats: Arc::clone(&stats),
                    stop: Arc::clone(&stop),
                    drained: Arc::clone(&drained_tx),
                    delay: self.config.delay,
                };
                tokio::spawn(worker.run())
            })
            .collect();
        // Workers own the only result senders from here on
        drop(result_tx);

        let watcher = tokio::spawn(watch_completion(
            generation,
            workers,
            drained_rx,
            self.config.grace_period,
        ));

        Ok(ScanHandle {
            results: result_rx,
            stats,
            stop,
            watcher,
            _sweeper: sweeper,
        })
    }
}

fn spawn_generation(
    mut generator: CandidateGenerator,
    jobs: mpsc::Sender<String>,
    stats: Arc<ScanStats>,
) -> JoinHandle<u64> {
    tokio::task::spawn_blocking(move || {
        while let Some(domain) = generator.next() {
            stats.set_examined(generator.examined());
            if jobs.blocking_send(domain).is_err() {
                debug!("job queue closed, stopping generation");
                break;
            }
            stats.record_generated();
        }
        stats.set_examined(generator.examined());

        info!(
            examined = generator.examined(),
            queued = generator.yielded(),
            "generation finished"
        );
        generator.yielded()
    })
}

struct Worker {
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::Sender<ScanResult>,
    checker: DomainChecker,
    cache: Arc<ResultCache>,
    stats: Arc<ScanStats>,
    stop: Arc<AtomicBool>,
    drained: Arc<watch::Sender<bool>>,
    delay: Duration,
}

impl Worker {
    async fn run(self) {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            // Lock only for the dequeue so one job goes to exactly one worker
            let next = self.jobs.lock().await.recv().await;
            let Some(domain) = next else {
                break;
            };

            let result = match self.process(&domain).await {
                Some(result) => result,
                None => continue,
            };

            self.stats.record_result(&result);
            if self.results.send(result).await.is_err() {
                debug!(worker = self.id, "result queue closed");
                break;
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        self.drained.send_replace(true);
        debug!(worker = self.id, "worker finished");
    }

    async fn process(&self, domain: &str) -> Option<ScanResult> {
        if let Some(hit) = self.cache.get(domain) {
            debug!(worker = self.id, domain = %domain, "cache hit");
            return Some(ScanResult {
                domain: domain.to_string(),
                available: hit.available,
                signatures: hit.signatures,
                cached: true,
                check_duration: None,
            });
        }

        match self.checker.check_domain(domain).await {
            Ok(result) => {
                self.cache
                    .set(domain, result.available, result.signatures.clone());
                Some(result)
            }
            Err(e) => {
                warn!(worker = self.id, domain = %domain, error = %e, "skipping candidate");
                None
            }
        }
    }
}

/// Wait for generation and the first drained worker, then bound the rest.
async fn watch_completion(
    generation: JoinHandle<u64>,
    workers: Vec<JoinHandle<()>>,
    mut drained: watch::Receiver<bool>,
    grace: Duration,
) {
    match generation.await {
        Ok(queued) => debug!(queued, "generation task joined"),
        Err(e) => warn!(error = %e, "generation task failed"),
    }

    // Err means every worker is gone already
    let _ = drained.wait_for(|done| *done).await;

    let aborts: Vec<_> = workers.iter().map(JoinHandle::abort_handle).collect();
    if tokio::time::timeout(grace, join_all(workers)).await.is_err() {
        let still_running = aborts.iter().filter(|a| !a.is_finished()).count();
        warn!(
            still_running,
            grace_secs = grace.as_secs(),
            "grace period expired, aborting in-flight workers"
        );
        for abort in aborts {
            abort.abort();
        }
    }
    info!("scan drained");
}

/// Signals a running scan to stop. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        if !self.flag.swap(true, Ordering::Relaxed) {
            warn!("stop requested, finishing in-flight checks");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A running scan.
///
/// Results arrive through [`ScanHandle::next_result`] in completion order.
/// The sequence ends once the job queue has drained and the workers have
/// finished or been aborted.
#[derive(Debug)]
pub struct ScanHandle {
    results: mpsc::Receiver<ScanResult>,
    stats: Arc<ScanStats>,
    stop: Arc<AtomicBool>,
    watcher: JoinHandle<()>,
    _sweeper: SweeperHandle,
}

impl ScanHandle {
    /// Next published result, or `None` once the run is over.
    pub async fn next_result(&mut self) -> Option<ScanResult> {
        self.results.recv().await
    }

    /// Stop enumerating. Workers finish their current candidate and exit.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Current progress counters.
    pub fn stats(&self) -> ProgressSnapshot {
        self.stats.snapshot()
    }

    /// Discard unread results, wait for the run to end, return final counters.
    pub async fn wait(mut self) -> Result<ProgressSnapshot, ScanError> {
        while self.results.recv().await.is_some() {}
        (&mut self.watcher)
            .await
            .map_err(|e| ScanError::internal(format!("completion watcher failed: {}", e)))?;
        Ok(self.stats.snapshot())
    }
}
