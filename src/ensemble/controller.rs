//! # EnsembleController
//!
//! The online learner. For every labeled example it votes with the active
//! members, feeds the outcome to the change detector, decays the weight of
//! active members that were wrong, trains active and hidden members and keeps
//! the example in the evaluation buffer.
//!
//! A drift (or the optional schedule) triggers a genetic optimization of the
//! member weights over a snapshot of the pool and the buffer. The result is
//! installed in one step on the streaming thread; members replaced while a
//! detached optimization was running keep their new state.
//!
//! ## Example
//!
//! ```rust
//! use driftga::ensemble::{
//!     Ddm, EnsembleConfig, EnsembleController, Example, Learner, NaiveBayes, OptimizationMode,
//!     Schema,
//! };
//!
//! let config = EnsembleConfig::builder()
//!     .initial_size(3)
//!     .hidden_size(2)
//!     .max_size(6)
//!     .mode(OptimizationMode::Inline)
//!     .build();
//! let templates: Vec<Box<dyn Learner>> = vec![Box::new(NaiveBayes::new())];
//! let schema = Schema::new(2, 2).unwrap();
//!
//! let mut controller =
//!     EnsembleController::new(config, templates, Box::new(Ddm::default()), schema).unwrap();
//!
//! for i in 0..100 {
//!     let class = i % 2;
//!     controller.train(&Example::new(vec![class as f64, 0.5], class)).unwrap();
//! }
//! assert_eq!(controller.predict(&Example::new(vec![1.0, 0.5], 1)), 1);
//! ```

use tracing::{debug, error, info, warn};

use crate::ensemble::config::{EnsembleConfig, OptimizationMode};
use crate::ensemble::detector::{ChangeDetector, DriftLevel};
use crate::ensemble::example::{Example, ExampleBuffer, Schema};
use crate::ensemble::learner::{accumulate_vote, arg_max, Archetype, Learner};
use crate::ensemble::member::{Member, MemberId};
use crate::ensemble::memory::{ConfigurationMemory, EnsembleMemberConfiguration};
use crate::ensemble::worker::{OptimizationReport, OptimizationTask, OptimizationWorker};
use crate::error::{GeneticError, Result};
use crate::evolution::{OptimizationOutcome, OptimizationStatus};
use crate::rng::RandomNumberGenerator;

/// Active members whose weight decays below this value are replaced.
pub const WEIGHT_FLOOR: f64 = 0.001;

#[derive(Debug)]
pub struct EnsembleController {
    config: EnsembleConfig,
    schema: Schema,
    templates: Vec<Box<dyn Learner>>,
    detector: Box<dyn ChangeDetector>,
    members: Vec<Member>,
    buffer: ExampleBuffer,
    memory: ConfigurationMemory,
    worker: OptimizationWorker,
    rng: RandomNumberGenerator,
    drift_level: DriftLevel,
    instances_seen: u64,
    next_member_id: u64,
    next_ticket: u64,
    pending_ticket: Option<u64>,
    /// Optimizations started inline or by workers discarded on reset.
    other_starts: usize,
    installs: usize,
    last_outcome: Option<OptimizationOutcome>,
}

impl EnsembleController {
    /// Builds the pool: the first `initial_size` members are active, the next
    /// `hidden_size` are hidden and the rest are dormant until promoted. Each
    /// member clones a template drawn uniformly.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` for an invalid configuration or an
    /// empty template list.
    pub fn new(
        config: EnsembleConfig,
        templates: Vec<Box<dyn Learner>>,
        detector: Box<dyn ChangeDetector>,
        schema: Schema,
    ) -> Result<Self> {
        config.validate()?;
        if templates.is_empty() {
            return Err(GeneticError::Configuration(
                "At least one learner template is required".to_string(),
            ));
        }

        let mut controller = Self {
            buffer: ExampleBuffer::new(config.buffer_capacity()),
            memory: ConfigurationMemory::new(config.memory_capacity()),
            rng: RandomNumberGenerator::from_seed(config.seed()),
            config,
            schema,
            templates,
            detector,
            members: Vec::new(),
            worker: OptimizationWorker::new(),
            drift_level: DriftLevel::InControl,
            instances_seen: 0,
            next_member_id: 0,
            next_ticket: 0,
            pending_ticket: None,
            other_starts: 0,
            installs: 0,
            last_outcome: None,
        };
        controller.init_members();
        Ok(controller)
    }

    fn init_members(&mut self) {
        let initial = self.config.initial_size();
        let hidden = self.config.hidden_size();
        let members = (0..self.config.max_size())
            .map(|index| {
                let mut member = self.create_member();
                member.set_role(index < initial, index >= initial && index - initial < hidden);
                member
            })
            .collect();
        self.members = members;
    }

    fn create_member(&mut self) -> Member {
        let template_index = self.rng.gen_index(self.templates.len());
        let excluded = if self.config.attribute_selection() {
            Member::draw_excluded(self.schema.num_attributes(), &mut self.rng)
        } else {
            Default::default()
        };
        let id = MemberId(self.next_member_id);
        self.next_member_id += 1;
        Member::new(
            id,
            self.templates[template_index].boxed_clone(),
            template_index,
            excluded,
        )
    }

    fn hidden_replacement(&mut self) -> Member {
        let mut member = self.create_member();
        member.set_role(false, true);
        member
    }

    /// Processes one labeled example.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Schema` when the example does not fit the schema.
    /// Optimization faults are logged and never returned.
    pub fn train(&mut self, example: &Example) -> Result<()> {
        self.schema.check(example)?;
        self.collect_report();

        self.instances_seen += 1;
        if let Some(period) = self.config.optimization_period() {
            if self.instances_seen % period as u64 == 0 {
                debug!(instances = self.instances_seen, "scheduled optimization");
                self.launch_optimization();
            }
        }

        let prediction = self.predict(example);
        self.observe_drift(prediction == example.class());

        let beta = self.config.beta();
        let mut decayed = false;
        for index in 0..self.members.len() {
            let member = &mut self.members[index];
            if !member.is_active() || member.correctly_classifies(example) {
                continue;
            }
            member.punish(beta, example.weight());
            decayed = true;
            if member.weight() < WEIGHT_FLOOR {
                debug!(member = %member, "weight below floor, member replaced");
                self.members[index] = self.hidden_replacement();
            }
        }

        if decayed {
            let total: f64 = self
                .members
                .iter()
                .filter(|member| member.is_active())
                .map(Member::weight)
                .sum();
            if total > 0.0 {
                for member in self.members.iter_mut().filter(|m| m.is_active()) {
                    member.set_weight(member.weight() / total);
                }
            }
        }

        for member in self.members.iter_mut().filter(|m| m.participates()) {
            member.train(example);
        }

        self.buffer.push(example.clone());
        Ok(())
    }

    /// Weighted vote of the active members, one score per class.
    pub fn votes(&self, example: &Example) -> Vec<f64> {
        let mut combined = Vec::new();
        for member in self.members.iter().filter(|m| m.is_active()) {
            accumulate_vote(&mut combined, &member.distribution(example), member.weight());
        }
        combined
    }

    pub fn predict(&self, example: &Example) -> usize {
        arg_max(&self.votes(example))
    }

    fn observe_drift(&mut self, correct: bool) {
        self.detector.input(if correct { 0.0 } else { 1.0 });
        let level = DriftLevel::observe(self.detector.as_ref());
        if level == self.drift_level {
            return;
        }

        self.drift_level = level;
        match level {
            DriftLevel::Change => {
                info!(instances = self.instances_seen, "drift detected");
                self.launch_optimization();
            }
            DriftLevel::Warning => debug!(instances = self.instances_seen, "drift warning"),
            DriftLevel::InControl => debug!(instances = self.instances_seen, "back in control"),
        }
    }

    fn launch_optimization(&mut self) {
        if let Err(e) = self.trigger_optimization() {
            error!(error = %e, "optimization could not be started");
        }
    }

    /// Starts an optimization unless one is already in flight or optimization
    /// is disabled. Returns whether a run was started.
    ///
    /// In `Inline` and `Join` mode the result is installed before returning.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::EmptyEnsemble` when no member is active or
    /// hidden, and worker errors when the background thread is unavailable.
    pub fn trigger_optimization(&mut self) -> Result<bool> {
        if !self.config.optimization_enabled() {
            return Ok(false);
        }
        if self.pending_ticket.is_some() || self.worker.is_busy() {
            debug!("optimization in flight, trigger dropped");
            return Ok(false);
        }
        if !self.members.iter().any(Member::participates) {
            return Err(GeneticError::EmptyEnsemble);
        }

        if self.config.sample_before_optimization() {
            self.memory
                .push(EnsembleMemberConfiguration::capture(&self.members));
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let task = OptimizationTask {
            ticket,
            members: self.members.clone(),
            examples: self.buffer.snapshot(),
            configurations: self.memory.snapshot(),
            stop_bounds: self.config.stop_bounds(),
            options: self.config.optimizer().clone(),
            fitness_cache: self.config.fitness_cache(),
            seed: self.rng.next_seed(),
        };
        if self.config.reset_buffer_on_optimization() {
            self.buffer.clear();
        }

        info!(
            ticket,
            examples = task.examples.len(),
            active = ?self.active_indices(),
            "optimization started"
        );

        match self.config.mode() {
            OptimizationMode::Inline => {
                self.other_starts += 1;
                let report = task.run();
                self.install(report);
                Ok(true)
            }
            OptimizationMode::Join => {
                if !self.worker.submit(task)? {
                    return Ok(false);
                }
                let report = self.worker.wait()?;
                self.install(report);
                Ok(true)
            }
            OptimizationMode::Detached => {
                let submitted = self.worker.submit(task)?;
                if submitted {
                    self.pending_ticket = Some(ticket);
                }
                Ok(submitted)
            }
        }
    }

    fn collect_report(&mut self) {
        if let Some(report) = self.worker.poll() {
            self.pending_ticket = None;
            self.install(report);
        }
    }

    /// Blocks until a detached optimization in flight reports, then installs
    /// it. Returns `false` when nothing was in flight. A worker that died
    /// without reporting counts as a faulted run.
    ///
    /// # Errors
    ///
    /// Returns `GeneticError::Worker` if the worker lost track of the task.
    pub fn wait_for_optimization(&mut self) -> Result<bool> {
        if self.pending_ticket.is_none() {
            return Ok(false);
        }
        let report = self.worker.wait();
        self.pending_ticket = None;
        self.install(report?);
        Ok(true)
    }

    /// Overwrites weight and role of every member still present in the pool
    /// from the decoded best genotype.
    fn install(&mut self, report: OptimizationReport) {
        let OptimizationReport {
            ticket,
            outcome,
            weights,
            member_ids,
        } = report;
        let status = outcome.status.clone();
        self.last_outcome = Some(outcome);

        let weights = match (status, weights) {
            (OptimizationStatus::Completed, Some(weights)) if weights.len() == self.members.len() => weights,
            (OptimizationStatus::Faulted(reason), _) => {
                warn!(ticket, %reason, "optimization faulted, configuration kept");
                return;
            }
            (status, _) => {
                info!(ticket, ?status, "optimization produced nothing to install");
                return;
            }
        };

        let replaced_meanwhile =
            |index: usize, member: &Member| member_ids.get(index) != Some(&member.id());
        // Hidden replacements made while the run was detached keep their role
        // and count against the hidden budget.
        let mut hidden = self
            .members
            .iter()
            .enumerate()
            .filter(|(index, member)| replaced_meanwhile(*index, *member) && member.is_hidden())
            .count();
        for index in 0..self.members.len() {
            if replaced_meanwhile(index, &self.members[index]) {
                continue;
            }
            let weight = weights[index];
            if weight > 0.0 {
                self.members[index].set_weight(weight);
                self.members[index].set_role(true, false);
            } else if hidden < self.config.hidden_size() {
                self.members[index] = self.hidden_replacement();
                hidden += 1;
            } else {
                self.members[index].set_weight(0.0);
                self.members[index].set_role(false, false);
            }
        }

        if self.config.sample_after_optimization() {
            self.memory
                .push(EnsembleMemberConfiguration::capture(&self.members));
        }
        self.installs += 1;

        let active = self.active_indices();
        if active.is_empty() {
            warn!(ticket, "installed configuration has no active member");
        }
        info!(ticket, ?active, "configuration installed");
    }

    /// Restores the initial pool and forgets the stream. An optimization in
    /// flight is abandoned and its result discarded.
    pub fn reset(&mut self) {
        self.other_starts += self.worker.started();
        self.worker = OptimizationWorker::new();
        self.pending_ticket = None;
        self.detector.reset();
        self.drift_level = DriftLevel::InControl;
        self.instances_seen = 0;
        self.buffer.clear();
        self.rng = RandomNumberGenerator::from_seed(self.config.seed());
        self.init_members();
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Current weight of every pool member.
    pub fn member_weights(&self) -> Vec<f64> {
        self.members.iter().map(Member::weight).collect()
    }

    pub fn active_indices(&self) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, member)| member.is_active())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn drift_level(&self) -> DriftLevel {
        self.drift_level
    }

    pub fn instances_seen(&self) -> u64 {
        self.instances_seen
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn memory(&self) -> &ConfigurationMemory {
        &self.memory
    }

    /// Whether a detached optimization is still running.
    pub fn is_optimizing(&self) -> bool {
        self.pending_ticket.is_some()
    }

    /// Optimizations started since construction, inline or on the worker.
    pub fn optimizations_started(&self) -> usize {
        self.other_starts + self.worker.started()
    }

    /// Configurations installed since construction.
    pub fn installs(&self) -> usize {
        self.installs
    }

    pub fn last_outcome(&self) -> Option<&OptimizationOutcome> {
        self.last_outcome.as_ref()
    }

    /// Active member count, active members per archetype and the active
    /// members themselves.
    pub fn summary(&self) -> String {
        let active: Vec<&Member> = self.members.iter().filter(|m| m.is_active()).collect();
        let counts = Archetype::histogram(active.iter().map(|m| m.archetype()));
        let listing: Vec<String> = active.iter().map(|m| m.to_string()).collect();
        format!("{} {:?} {}", active.len(), counts, listing.join(", "))
    }
}
