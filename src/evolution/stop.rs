//! # StopCondition
//!
//! Multi-criteria termination for one optimization run. Four counters are
//! tracked: evaluations, generations, steps since the last improvement and
//! elapsed milliseconds. Both evaluations and generations count as steps. The
//! run ends when the evaluation, generation or time budget is exhausted, or when
//! the search stagnates for longer than allowed once every minimum bound has
//! been met.
//!
//! Elapsed time is maintained by a ticker thread started with [`StopCondition::start`]
//! which refreshes the counter every 250ms and exits once the run is over. The
//! ticker and the optimizer share atomics and the lock over the start instant.
//!
//! ## Example
//!
//! ```rust
//! use driftga::evolution::stop::{StopBounds, StopCondition};
//!
//! let bounds = StopBounds::default().with_max_evaluations(3);
//! let stop = StopCondition::new(bounds).unwrap();
//!
//! stop.start().unwrap();
//! for _ in 0..3 {
//!     assert!(stop.is_running());
//!     stop.evaluation();
//! }
//! assert!(!stop.is_running());
//! stop.stop();
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::trace;

use crate::error::{GeneticError, Result, ResultExt};

const TICK: Duration = Duration::from_millis(250);

/// Minimum and maximum bounds of a [`StopCondition`]. `None` maxima are unbounded.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StopBounds {
    min_evaluations: u64,
    max_evaluations: Option<u64>,
    min_generations: u64,
    max_generations: Option<u64>,
    max_without_improvement: Option<u64>,
    min_seconds: u64,
    max_seconds: Option<u64>,
}

impl StopBounds {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        min_evaluations: u64,
        max_evaluations: Option<u64>,
        min_generations: u64,
        max_generations: Option<u64>,
        max_without_improvement: Option<u64>,
        min_seconds: u64,
        max_seconds: Option<u64>,
    ) -> Self {
        Self {
            min_evaluations,
            max_evaluations,
            min_generations,
            max_generations,
            max_without_improvement,
            min_seconds,
            max_seconds,
        }
    }

    pub fn with_min_evaluations(mut self, value: u64) -> Self {
        self.min_evaluations = value;
        self
    }

    pub fn with_max_evaluations(mut self, value: u64) -> Self {
        self.max_evaluations = Some(value);
        self
    }

    pub fn with_min_generations(mut self, value: u64) -> Self {
        self.min_generations = value;
        self
    }

    pub fn with_max_generations(mut self, value: u64) -> Self {
        self.max_generations = Some(value);
        self
    }

    pub fn with_max_without_improvement(mut self, value: u64) -> Self {
        self.max_without_improvement = Some(value);
        self
    }

    pub fn with_min_seconds(mut self, value: u64) -> Self {
        self.min_seconds = value;
        self
    }

    pub fn with_max_seconds(mut self, value: u64) -> Self {
        self.max_seconds = Some(value);
        self
    }

    pub fn max_evaluations(&self) -> Option<u64> {
        self.max_evaluations
    }

    pub fn max_generations(&self) -> Option<u64> {
        self.max_generations
    }

    pub fn max_without_improvement(&self) -> Option<u64> {
        self.max_without_improvement
    }

    pub fn max_seconds(&self) -> Option<u64> {
        self.max_seconds
    }

    fn validate(&self) -> Result<()> {
        let pairs = [
            ("evaluations", self.min_evaluations, self.max_evaluations),
            ("generations", self.min_generations, self.max_generations),
            ("seconds", self.min_seconds, self.max_seconds),
        ];
        for (name, min, max) in pairs {
            if let Some(max) = max {
                if min > max {
                    return Err(GeneticError::Configuration(format!(
                        "Minimum {} ({}) exceeds maximum ({})",
                        name, min, max
                    )));
                }
            }
        }
        if self.max_evaluations.is_none()
            && self.max_generations.is_none()
            && self.max_without_improvement.is_none()
            && self.max_seconds.is_none()
        {
            return Err(GeneticError::Configuration(
                "Stop condition needs at least one maximum bound".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Limits {
    min_evaluations: u64,
    max_evaluations: u64,
    min_generations: u64,
    max_generations: u64,
    max_without_improvement: u64,
    min_millis: u64,
    max_millis: u64,
}

impl From<&StopBounds> for Limits {
    fn from(bounds: &StopBounds) -> Self {
        Self {
            min_evaluations: bounds.min_evaluations,
            max_evaluations: bounds.max_evaluations.unwrap_or(u64::MAX),
            min_generations: bounds.min_generations,
            max_generations: bounds.max_generations.unwrap_or(u64::MAX),
            max_without_improvement: bounds.max_without_improvement.unwrap_or(u64::MAX),
            min_millis: bounds.min_seconds.saturating_mul(1000),
            max_millis: bounds
                .max_seconds
                .map_or(u64::MAX, |secs| secs.saturating_mul(1000)),
        }
    }
}

fn millis_since(instant: Instant) -> u64 {
    u64::try_from(instant.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug)]
struct StopState {
    limits: Limits,
    evaluations: AtomicU64,
    generations: AtomicU64,
    without_improvement: AtomicU64,
    elapsed_millis: AtomicU64,
    running: AtomicBool,
    started_at: Mutex<Option<Instant>>,
    ticker: Mutex<Option<Sender<()>>>,
}

impl StopState {
    /// Stores the elapsed time while the run is live. Holding the clock lock
    /// orders the ticker against [`StopState::freeze`], so a late tick never
    /// overwrites the frozen value.
    fn refresh_elapsed(&self) {
        let started_at = self.started_at.lock();
        if let Some(started_at) = *started_at {
            if self.running.load(Ordering::SeqCst) {
                self.elapsed_millis
                    .store(millis_since(started_at), Ordering::SeqCst);
            }
        }
    }

    fn freeze(&self) {
        let started_at = self.started_at.lock();
        if self.running.load(Ordering::SeqCst) {
            if let Some(started_at) = *started_at {
                self.elapsed_millis
                    .store(millis_since(started_at), Ordering::SeqCst);
            }
            self.running.store(false, Ordering::SeqCst);
        }
    }

    fn check_bounds(&self) {
        let limits = &self.limits;
        let evaluations = self.evaluations.load(Ordering::SeqCst);
        let generations = self.generations.load(Ordering::SeqCst);
        let stale = self.without_improvement.load(Ordering::SeqCst);
        let millis = self.elapsed_millis.load(Ordering::SeqCst);

        let exhausted = evaluations >= limits.max_evaluations
            || generations >= limits.max_generations
            || millis >= limits.max_millis;
        let minimums_met = evaluations >= limits.min_evaluations
            && generations >= limits.min_generations
            && millis >= limits.min_millis;
        let stagnated = stale >= limits.max_without_improvement;

        if exhausted || (stagnated && minimums_met) {
            self.running.store(false, Ordering::SeqCst);
        }
    }
}

/// Shared handle over the counters of one optimization run.
///
/// Cloning the handle shares the counters, which is how the ticker thread
/// observes the run.
#[derive(Debug, Clone)]
pub struct StopCondition {
    bounds: StopBounds,
    state: Arc<StopState>,
}

impl StopCondition {
    /// Creates a stop condition over the given bounds.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` when a minimum exceeds its maximum or
    /// when every maximum is unbounded.
    pub fn new(bounds: StopBounds) -> Result<Self> {
        bounds.validate()?;
        let limits = Limits::from(&bounds);
        Ok(Self {
            bounds,
            state: Arc::new(StopState {
                limits,
                evaluations: AtomicU64::new(0),
                generations: AtomicU64::new(0),
                without_improvement: AtomicU64::new(0),
                elapsed_millis: AtomicU64::new(0),
                running: AtomicBool::new(false),
                started_at: Mutex::new(None),
                ticker: Mutex::new(None),
            }),
        })
    }

    pub fn bounds(&self) -> &StopBounds {
        &self.bounds
    }

    /// Resets every counter, starts the clock and the ticker thread.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Other` when the ticker thread cannot be spawned;
    /// the condition is left stopped in that case.
    pub fn start(&self) -> Result<()> {
        self.state.ticker.lock().take();
        self.state.evaluations.store(0, Ordering::SeqCst);
        self.state.generations.store(0, Ordering::SeqCst);
        self.state.without_improvement.store(0, Ordering::SeqCst);
        self.state.elapsed_millis.store(0, Ordering::SeqCst);
        *self.state.started_at.lock() = Some(Instant::now());
        self.state.running.store(true, Ordering::SeqCst);
        self.state.check_bounds();

        let (shutdown, signal) = crossbeam_channel::bounded::<()>(0);
        let state = Arc::clone(&self.state);
        let spawned = thread::Builder::new()
            .name("stop-condition-ticker".to_string())
            .spawn(move || loop {
                if !state.running.load(Ordering::SeqCst) {
                    break;
                }
                state.refresh_elapsed();
                state.check_bounds();
                match signal.recv_timeout(TICK) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            });

        match spawned.context("spawning the stop condition ticker") {
            Ok(_) => {
                *self.state.ticker.lock() = Some(shutdown);
                Ok(())
            }
            Err(e) => {
                self.state.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Freezes the elapsed time and ends the run. Calling it again has no effect.
    pub fn stop(&self) {
        self.state.freeze();
        if self.state.ticker.lock().take().is_some() {
            trace!("stop condition ticker released");
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Counts one objective evaluation, which is also one more step without
    /// improvement until [`StopCondition::record_improvement`] is called.
    pub fn evaluation(&self) {
        if self.is_running() {
            self.state.evaluations.fetch_add(1, Ordering::SeqCst);
            self.state.without_improvement.fetch_add(1, Ordering::SeqCst);
            self.state.check_bounds();
        }
    }

    /// Counts one completed generation, which is also one more step without
    /// improvement until [`StopCondition::record_improvement`] is called.
    pub fn iteration(&self) {
        if self.is_running() {
            self.state.generations.fetch_add(1, Ordering::SeqCst);
            self.state.without_improvement.fetch_add(1, Ordering::SeqCst);
            self.state.check_bounds();
        }
    }

    /// Resets the stagnation counter after a new best solution.
    pub fn record_improvement(&self) {
        if self.is_running() {
            self.state.without_improvement.store(0, Ordering::SeqCst);
        }
    }

    pub fn performed_evaluations(&self) -> u64 {
        self.state.evaluations.load(Ordering::SeqCst)
    }

    pub fn performed_generations(&self) -> u64 {
        self.state.generations.load(Ordering::SeqCst)
    }

    pub fn generations_without_improvement(&self) -> u64 {
        self.state.without_improvement.load(Ordering::SeqCst)
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.state.elapsed_millis.load(Ordering::SeqCst)
    }

    pub fn performed_seconds(&self) -> u64 {
        self.elapsed_millis() / 1000
    }
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopCondition:")?;
        let rows = [
            ("Steps", self.performed_generations(), self.bounds.max_generations),
            (
                "NoUpdate",
                self.generations_without_improvement(),
                self.bounds.max_without_improvement,
            ),
            (
                "Evaluations",
                self.performed_evaluations(),
                self.bounds.max_evaluations,
            ),
            ("Seconds", self.performed_seconds(), self.bounds.max_seconds),
        ];
        for (label, current, max) in rows {
            match max {
                Some(max) => write!(f, " {}({}/{})", label, current, max)?,
                None => write!(f, " {}({})", label, current)?,
            }
        }
        Ok(())
    }
}
