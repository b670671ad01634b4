//! Fixed-cadence batch propagation loop
//!
//! The first tick runs on the caller's thread before [`start`] returns, every
//! later tick on one dedicated loop thread, so two ticks never overlap. Each
//! tick propagates the whole collection against a single captured instant.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use super::propagator::{PropagatedPosition, Propagator};
use crate::data::ElementSet;

/// Positions from one tick, all computed for the same instant
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub instant: DateTime<Utc>,
    pub positions: Vec<PropagatedPosition>,
}

/// Errors that prevent a loop from starting
#[derive(Debug)]
pub enum LoopStartError {
    /// Tick interval must be positive
    InvalidInterval,

    /// Nothing to propagate
    NoElementSets,

    /// Loop thread could not be spawned
    Spawn(std::io::Error),
}

impl std::fmt::Display for LoopStartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInterval => write!(f, "Tick interval must be greater than zero"),
            Self::NoElementSets => write!(f, "No element sets to propagate"),
            Self::Spawn(e) => write!(f, "Failed to spawn propagation thread: {}", e),
        }
    }
}

impl std::error::Error for LoopStartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

/// Loop configuration
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Wall-clock time between tick starts
    pub interval: Duration,
    /// Threads used to propagate one tick (1 = propagate on the loop thread)
    pub workers: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            workers: 1,
        }
    }
}

struct LoopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Handle to a running loop; dropping it stops the loop
pub struct StopHandle {
    signal: Arc<LoopSignal>,
    thread: Option<thread::JoinHandle<()>>,
}

impl StopHandle {
    /// Cancel all future ticks
    ///
    /// A tick already running completes and is still delivered. Calling this
    /// more than once has no further effect.
    pub fn stop(&self) {
        let mut stopped = self.signal.stopped.lock();
        if !*stopped {
            *stopped = true;
            log::info!("Stopping propagation loop");
        }
        self.signal.wake.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.signal.stopped.lock()
    }

    /// Stop the loop and wait for its thread to exit
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("Propagation loop thread panicked");
            }
        }
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start a loop that ticks every `interval_ms` milliseconds
pub fn start<F>(
    element_sets: Vec<ElementSet>,
    interval_ms: u64,
    on_tick: F,
) -> Result<StopHandle, LoopStartError>
where
    F: FnMut(Snapshot) + Send + 'static,
{
    start_with(
        element_sets,
        LoopConfig {
            interval: Duration::from_millis(interval_ms),
            ..Default::default()
        },
        on_tick,
    )
}

/// Start a loop with explicit configuration
pub fn start_with<F>(
    element_sets: Vec<ElementSet>,
    config: LoopConfig,
    mut on_tick: F,
) -> Result<StopHandle, LoopStartError>
where
    F: FnMut(Snapshot) + Send + 'static,
{
    if config.interval.is_zero() {
        return Err(LoopStartError::InvalidInterval);
    }
    if element_sets.is_empty() {
        return Err(LoopStartError::NoElementSets);
    }

    let propagator = Propagator::new(&element_sets);
    let workers = config.workers.max(1);
    let interval = config.interval;

    log::info!(
        "Starting propagation loop: {} element sets every {:?} ({} worker(s))",
        propagator.len(),
        interval,
        workers
    );

    // First tick on the caller's thread
    let first_deadline = Instant::now();
    on_tick(run_tick(&propagator, workers));

    let signal = Arc::new(LoopSignal {
        stopped: Mutex::new(false),
        wake: Condvar::new(),
    });

    let thread_signal = Arc::clone(&signal);
    let handle = thread::Builder::new()
        .name("propagation-loop".to_string())
        .spawn(move || {
            let mut deadline = first_deadline + interval;

            loop {
                {
                    let mut stopped = thread_signal.stopped.lock();
                    while !*stopped && Instant::now() < deadline {
                        thread_signal.wake.wait_until(&mut stopped, deadline);
                    }
                    if *stopped {
                        break;
                    }
                }

                on_tick(run_tick(&propagator, workers));

                deadline = next_deadline(deadline, interval, Instant::now());
            }

            log::debug!("Propagation loop thread exiting");
        })
        .map_err(LoopStartError::Spawn)?;

    Ok(StopHandle {
        signal,
        thread: Some(handle),
    })
}

fn run_tick(propagator: &Propagator, workers: usize) -> Snapshot {
    let instant = Utc::now();
    let positions = propagator.propagate_all_parallel(&instant, workers);

    log::debug!(
        "Tick at {}: {}/{} positions",
        instant.to_rfc3339(),
        positions.len(),
        propagator.len()
    );

    Snapshot { instant, positions }
}

/// Next deadline on the fixed grid, skipping any that already passed
fn next_deadline(previous: Instant, interval: Duration, now: Instant) -> Instant {
    let mut next = previous + interval;
    if next > now {
        return next;
    }

    let behind = now.duration_since(next);
    let skipped = (behind.as_nanos() / interval.as_nanos()) as u32 + 1;
    next += interval * skipped;
    log::warn!(
        "Propagation tick overran its interval, skipping {} tick(s)",
        skipped
    );
    next
}
