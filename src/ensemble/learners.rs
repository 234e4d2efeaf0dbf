//! Minimal incremental learners usable as ensemble templates.

use std::f64::consts::PI;

use crate::ensemble::example::Example;
use crate::ensemble::learner::{Archetype, Learner};

/// Smallest variance a Gaussian estimator reports.
const MIN_VARIANCE: f64 = 1e-6;

/// Predicts the class with the highest accumulated sample weight.
#[derive(Debug, Clone, Default)]
pub struct MajorityClass {
    class_weights: Vec<f64>,
}

impl MajorityClass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Learner for MajorityClass {
    fn archetype(&self) -> Archetype {
        Archetype::Majority
    }

    fn train(&mut self, example: &Example) {
        if self.class_weights.len() <= example.class() {
            self.class_weights.resize(example.class() + 1, 0.0);
        }
        self.class_weights[example.class()] += example.weight();
    }

    fn vote_distribution(&self, _example: &Example) -> Vec<f64> {
        self.class_weights.clone()
    }

    fn boxed_clone(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }

    fn reset(&mut self) {
        self.class_weights.clear();
    }
}

/// Weighted running mean and variance (West's incremental update).
#[derive(Debug, Clone, Default)]
struct GaussianEstimator {
    weight_sum: f64,
    mean: f64,
    variance_sum: f64,
}

impl GaussianEstimator {
    fn add(&mut self, value: f64, weight: f64) {
        if weight <= 0.0 || !value.is_finite() {
            return;
        }
        let previous_mean = self.mean;
        self.weight_sum += weight;
        self.mean += weight / self.weight_sum * (value - previous_mean);
        self.variance_sum += weight * (value - previous_mean) * (value - self.mean);
    }

    fn variance(&self) -> f64 {
        if self.weight_sum > 1.0 {
            (self.variance_sum / (self.weight_sum - 1.0)).max(MIN_VARIANCE)
        } else {
            MIN_VARIANCE
        }
    }

    fn log_density(&self, value: f64) -> f64 {
        let variance = self.variance();
        let diff = value - self.mean;
        -0.5 * (2.0 * PI * variance).ln() - diff * diff / (2.0 * variance)
    }
}

/// Gaussian naive Bayes over numeric attributes.
#[derive(Debug, Clone, Default)]
pub struct NaiveBayes {
    class_weights: Vec<f64>,
    /// `estimators[class][attribute]`
    estimators: Vec<Vec<GaussianEstimator>>,
}

impl NaiveBayes {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Learner for NaiveBayes {
    fn archetype(&self) -> Archetype {
        Archetype::Bayesian
    }

    fn train(&mut self, example: &Example) {
        let class = example.class();
        if self.class_weights.len() <= class {
            self.class_weights.resize(class + 1, 0.0);
            self.estimators.resize_with(class + 1, Vec::new);
        }
        self.class_weights[class] += example.weight();

        let estimators = &mut self.estimators[class];
        if estimators.len() < example.attributes().len() {
            estimators.resize_with(example.attributes().len(), GaussianEstimator::default);
        }
        for (estimator, value) in estimators.iter_mut().zip(example.attributes()) {
            estimator.add(*value, example.weight());
        }
    }

    fn vote_distribution(&self, example: &Example) -> Vec<f64> {
        let total: f64 = self.class_weights.iter().sum();
        if total <= 0.0 {
            return Vec::new();
        }

        let log_scores: Vec<Option<f64>> = self
            .class_weights
            .iter()
            .zip(self.estimators.iter())
            .map(|(weight, estimators)| {
                if *weight <= 0.0 {
                    return None;
                }
                let likelihood: f64 = estimators
                    .iter()
                    .zip(example.attributes())
                    .map(|(estimator, value)| estimator.log_density(*value))
                    .sum();
                Some((weight / total).ln() + likelihood)
            })
            .collect();

        let max = log_scores
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return vec![0.0; log_scores.len()];
        }
        log_scores
            .into_iter()
            .map(|score| score.map_or(0.0, |s| (s - max).exp()))
            .collect()
    }

    fn boxed_clone(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }

    fn reset(&mut self) {
        self.class_weights.clear();
        self.estimators.clear();
    }
}

/// One-vs-rest sigmoid perceptron trained by gradient descent.
#[derive(Debug, Clone)]
pub struct Perceptron {
    learning_rate: f64,
    /// `weights[class]`, bias last.
    weights: Vec<Vec<f64>>,
    num_attributes: usize,
}

impl Perceptron {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            weights: Vec::new(),
            num_attributes: 0,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn activation(&self, class_weights: &[f64], attributes: &[f64]) -> f64 {
        let bias = class_weights.last().copied().unwrap_or(0.0);
        let dot: f64 = class_weights
            .iter()
            .zip(attributes.iter())
            .take(self.num_attributes)
            .map(|(w, x)| w * x)
            .sum();
        sigmoid(dot + bias)
    }
}

impl Default for Perceptron {
    fn default() -> Self {
        Self::new(0.1)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Learner for Perceptron {
    fn archetype(&self) -> Archetype {
        Archetype::Linear
    }

    fn train(&mut self, example: &Example) {
        if self.weights.is_empty() {
            self.num_attributes = example.attributes().len();
        }
        if self.weights.len() <= example.class() {
            self.weights
                .resize(example.class() + 1, vec![0.0; self.num_attributes + 1]);
        }

        for class in 0..self.weights.len() {
            let target = if class == example.class() { 1.0 } else { 0.0 };
            let predicted = self.activation(&self.weights[class], example.attributes());
            let delta = (target - predicted)
                * predicted
                * (1.0 - predicted)
                * self.learning_rate
                * example.weight();

            let num_attributes = self.num_attributes;
            let class_weights = &mut self.weights[class];
            for (w, x) in class_weights
                .iter_mut()
                .zip(example.attributes().iter())
                .take(num_attributes)
            {
                *w += delta * x;
            }
            if let Some(bias) = class_weights.last_mut() {
                *bias += delta;
            }
        }
    }

    fn vote_distribution(&self, example: &Example) -> Vec<f64> {
        self.weights
            .iter()
            .map(|class_weights| self.activation(class_weights, example.attributes()))
            .collect()
    }

    fn boxed_clone(&self) -> Box<dyn Learner> {
        Box::new(self.clone())
    }

    fn reset(&mut self) {
        self.weights.clear();
        self.num_attributes = 0;
    }
}
