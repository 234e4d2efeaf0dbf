//! # Ensemble
//!
//! The drift-adaptive ensemble built on top of the optimizer: labeled
//! examples and the evaluation buffer, the learner and change detector
//! capabilities with small built-in implementations, ensemble members and
//! their configuration memory, the optimization problem, the background
//! worker and the controller tying them together. A dynamic weighted majority
//! ensemble without genetic search serves as a baseline.

pub mod config;
pub mod controller;
pub mod detector;
pub mod example;
pub mod hdwm;
pub mod learner;
pub mod learners;
pub mod member;
pub mod memory;
pub mod problem;
pub mod worker;

pub use config::{EnsembleConfig, EnsembleConfigBuilder, OptimizationMode};
pub use controller::{EnsembleController, WEIGHT_FLOOR};
pub use detector::{ChangeDetector, Ddm, DriftLevel};
pub use example::{Example, ExampleBuffer, Schema};
pub use hdwm::{DynamicWeightedMajority, HdwmConfig};
pub use learner::{Archetype, Learner};
pub use learners::{MajorityClass, NaiveBayes, Perceptron};
pub use member::{Member, MemberId};
pub use memory::{ConfigurationMemory, EnsembleMemberConfiguration, SlotProfile};
pub use problem::Problem;
pub use worker::{OptimizationReport, OptimizationTask, OptimizationWorker};
