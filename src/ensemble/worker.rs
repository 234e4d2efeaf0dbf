//! # OptimizationWorker
//!
//! A single background thread running one optimization at a time. The task
//! queue holds at most one task and submissions are refused while a task is
//! queued or running, so triggers arriving during an optimization are dropped
//! rather than queued. Reports come back over a channel and are collected by
//! the streaming thread, which alone mutates the ensemble.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use tracing::{debug, error};

use crate::caching::CachedChallenge;
use crate::ensemble::example::Example;
use crate::ensemble::member::{Member, MemberId};
use crate::ensemble::memory::EnsembleMemberConfiguration;
use crate::ensemble::problem::Problem;
use crate::error::{GeneticError, OptionExt, Result};
use crate::evolution::{
    GeneticOptimizer, OptimizationOutcome, OptimizationStatus, OptimizerOptions, StopBounds,
    StopCondition,
};
use crate::rng::RandomNumberGenerator;

/// Everything one optimization needs, detached from the live ensemble.
#[derive(Debug)]
pub struct OptimizationTask {
    pub ticket: u64,
    pub members: Vec<Member>,
    pub examples: Vec<Example>,
    pub configurations: Vec<EnsembleMemberConfiguration>,
    pub stop_bounds: StopBounds,
    pub options: OptimizerOptions,
    pub fitness_cache: bool,
    pub seed: u64,
}

/// Result of one task.
#[derive(Debug, Clone)]
pub struct OptimizationReport {
    pub ticket: u64,
    pub outcome: OptimizationOutcome,
    /// One weight per pool member, present when the outcome is installable.
    pub weights: Option<Vec<f64>>,
    /// Pool member ids at the time the task was built.
    pub member_ids: Vec<MemberId>,
}

impl OptimizationTask {
    /// Runs the task on the calling thread. Panics are caught and reported as a
    /// faulted outcome.
    pub fn run(self) -> OptimizationReport {
        let ticket = self.ticket;
        let member_ids: Vec<MemberId> = self.members.iter().map(Member::id).collect();

        match panic::catch_unwind(AssertUnwindSafe(|| self.optimize())) {
            Ok(Ok((outcome, weights))) => OptimizationReport {
                ticket,
                outcome,
                weights,
                member_ids,
            },
            Ok(Err(e)) => faulted(ticket, member_ids, e.to_string()),
            Err(_) => faulted(ticket, member_ids, "optimization task panicked".to_string()),
        }
    }

    fn optimize(self) -> Result<(OptimizationOutcome, Option<Vec<f64>>)> {
        let problem = Arc::new(Problem::new(
            &self.members,
            &self.examples,
            self.configurations,
        )?);
        let stop_condition = StopCondition::new(self.stop_bounds)?;
        let rng = RandomNumberGenerator::from_seed(self.seed);

        let outcome = if self.fitness_cache {
            GeneticOptimizer::new(
                CachedChallenge::new(Arc::clone(&problem)),
                stop_condition,
                self.options,
                rng,
            )?
            .execute()
        } else {
            GeneticOptimizer::new(Arc::clone(&problem), stop_condition, self.options, rng)?
                .execute()
        };

        let weights = if outcome.is_installable() {
            outcome.best.as_ref().map(|best| problem.weights(&best.genotype))
        } else {
            None
        };
        Ok((outcome, weights))
    }
}

fn faulted(ticket: u64, member_ids: Vec<MemberId>, reason: String) -> OptimizationReport {
    error!(ticket, %reason, "optimization task failed");
    OptimizationReport {
        ticket,
        outcome: OptimizationOutcome {
            best: None,
            status: OptimizationStatus::Faulted(reason),
            evaluations: 0,
            generations: 0,
            elapsed_millis: 0,
        },
        weights: None,
        member_ids,
    }
}

const LIVENESS_CHECK: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct OptimizationWorker {
    tasks: Option<Sender<OptimizationTask>>,
    handle: Option<JoinHandle<()>>,
    results: Receiver<OptimizationReport>,
    reports: Sender<OptimizationReport>,
    /// Ticket of the task queued or running.
    in_flight: Option<u64>,
    started: Arc<AtomicUsize>,
}

impl OptimizationWorker {
    /// Creates the worker. The thread is spawned on the first submission.
    pub fn new() -> Self {
        let (reports, results) = crossbeam_channel::unbounded();
        Self {
            tasks: None,
            handle: None,
            results,
            reports,
            in_flight: None,
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of tasks the worker thread has started.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    fn thread_exited(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Forgets the task in flight after the worker thread died without
    /// reporting. The next submission spawns a new thread.
    fn abandon(&mut self, ticket: u64) -> OptimizationReport {
        self.in_flight = None;
        self.tasks = None;
        self.handle = None;
        faulted(ticket, Vec::new(), "optimization worker stopped without reporting".to_string())
    }

    fn spawn(&mut self) -> Result<Sender<OptimizationTask>> {
        if let Some(tasks) = &self.tasks {
            return Ok(tasks.clone());
        }

        let (tasks, queue) = crossbeam_channel::bounded::<OptimizationTask>(1);
        let reports = self.reports.clone();
        let started = Arc::clone(&self.started);
        let handle = thread::Builder::new()
            .name("ensemble-optimizer".to_string())
            .spawn(move || {
                for task in queue {
                    started.fetch_add(1, Ordering::SeqCst);
                    if reports.send(task.run()).is_err() {
                        break;
                    }
                }
                debug!("optimization worker stopped");
            })?;

        self.tasks = Some(tasks.clone());
        self.handle = Some(handle);
        Ok(tasks)
    }

    /// Hands a task to the worker. Returns `false` without queueing it when
    /// a task is already queued or running.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Io` if the thread cannot be spawned and
    /// `GeneticError::Worker` if it is gone.
    pub fn submit(&mut self, task: OptimizationTask) -> Result<bool> {
        if self.is_busy() {
            debug!(ticket = task.ticket, "optimization in flight, task dropped");
            return Ok(false);
        }

        let ticket = task.ticket;
        match self.spawn()?.try_send(task) {
            Ok(()) => {
                self.in_flight = Some(ticket);
                Ok(true)
            }
            Err(TrySendError::Full(task)) => {
                debug!(ticket = task.ticket, "task queue full, task dropped");
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.tasks = None;
                self.handle = None;
                Err(GeneticError::Worker(
                    "optimization worker is no longer running".to_string(),
                ))
            }
        }
    }

    /// Returns the report of the task in flight if it has finished. A worker
    /// thread that died without reporting yields a faulted report for the
    /// task, which clears the worker.
    pub fn poll(&mut self) -> Option<OptimizationReport> {
        let ticket = self.in_flight?;
        match self.results.try_recv() {
            Ok(report) => {
                self.in_flight = None;
                Some(report)
            }
            Err(TryRecvError::Empty) if !self.thread_exited() => None,
            Err(TryRecvError::Empty) => match self.results.try_recv() {
                Ok(report) => {
                    self.in_flight = None;
                    Some(report)
                }
                Err(_) => Some(self.abandon(ticket)),
            },
            Err(TryRecvError::Disconnected) => Some(self.abandon(ticket)),
        }
    }

    /// Blocks until the task in flight reports. A worker thread that died
    /// without reporting yields a faulted report.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Worker` when nothing is in flight.
    pub fn wait(&mut self) -> Result<OptimizationReport> {
        let ticket = self
            .in_flight
            .ok_or_else_genetic(|| GeneticError::Worker("no optimization in flight".to_string()))?;
        loop {
            match self.results.recv_timeout(LIVENESS_CHECK) {
                Ok(report) => {
                    self.in_flight = None;
                    return Ok(report);
                }
                Err(RecvTimeoutError::Timeout) if !self.thread_exited() => continue,
                Err(RecvTimeoutError::Timeout) => {
                    if let Ok(report) = self.results.try_recv() {
                        self.in_flight = None;
                        return Ok(report);
                    }
                    return Ok(self.abandon(ticket));
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(self.abandon(ticket)),
            }
        }
    }
}

impl Default for OptimizationWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::learners::MajorityClass;
    use std::collections::BTreeSet;

    fn task(ticket: u64, participating: bool) -> OptimizationTask {
        let mut member = Member::new(
            MemberId(ticket),
            Box::new(MajorityClass::new()),
            0,
            BTreeSet::new(),
        );
        member.set_role(participating, false);
        OptimizationTask {
            ticket,
            members: vec![member],
            examples: vec![Example::new(vec![0.0], 0), Example::new(vec![1.0], 1)],
            configurations: Vec::new(),
            stop_bounds: StopBounds::default().with_max_evaluations(10),
            options: OptimizerOptions::builder()
                .population_size(4)
                .num_elitism(1)
                .build(),
            fitness_cache: true,
            seed: 3,
        }
    }

    #[test]
    fn test_task_without_participants_faults() {
        let report = task(0, false).run();

        assert!(matches!(report.outcome.status, OptimizationStatus::Faulted(_)));
        assert!(report.weights.is_none());
        assert_eq!(report.member_ids, vec![MemberId(0)]);
    }

    #[test]
    fn test_inline_run_reports_weights() {
        let report = task(5, true).run();

        assert_eq!(report.ticket, 5);
        assert_eq!(report.outcome.status, OptimizationStatus::Completed);
        assert_eq!(report.outcome.evaluations, 10);
        assert_eq!(report.weights.map(|w| w.len()), Some(1));
    }

    #[test]
    fn test_worker_refuses_second_task() {
        let mut worker = OptimizationWorker::new();
        assert!(worker.wait().is_err());
        assert!(worker.poll().is_none());

        assert!(worker.submit(task(1, true)).unwrap());
        assert!(worker.is_busy());
        assert!(!worker.submit(task(2, true)).unwrap());

        let report = worker.wait().unwrap();
        assert_eq!(report.ticket, 1);
        assert!(!worker.is_busy());
        assert_eq!(worker.started(), 1);
    }

    /// A worker whose thread exited while `ticket` was in flight.
    fn orphaned(ticket: u64) -> OptimizationWorker {
        let handle = thread::spawn(|| {});
        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        let mut worker = OptimizationWorker::new();
        worker.handle = Some(handle);
        worker.in_flight = Some(ticket);
        worker
    }

    #[test]
    fn test_poll_faults_task_of_dead_thread() {
        let mut worker = orphaned(7);

        let report = worker.poll().unwrap();

        assert_eq!(report.ticket, 7);
        assert!(matches!(report.outcome.status, OptimizationStatus::Faulted(_)));
        assert!(!worker.is_busy());
        assert!(worker.poll().is_none());

        assert!(worker.submit(task(8, true)).unwrap());
        assert_eq!(worker.wait().unwrap().ticket, 8);
    }

    #[test]
    fn test_wait_faults_task_of_dead_thread() {
        let mut worker = orphaned(3);

        let report = worker.wait().unwrap();

        assert_eq!(report.ticket, 3);
        assert!(report.weights.is_none());
        assert!(!worker.is_busy());
    }

    #[test]
    fn test_late_report_of_finished_thread_is_kept() {
        let mut worker = orphaned(4);
        worker.reports.send(task(4, true).run()).unwrap();

        let report = worker.poll().unwrap();

        assert_eq!(report.outcome.status, OptimizationStatus::Completed);
    }
}
