//! Labeled examples, the stream schema and the bounded evaluation buffer.

use std::collections::{BTreeSet, VecDeque};

use crate::error::{GeneticError, Result};

/// One labeled example of the stream.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    attributes: Vec<f64>,
    class: usize,
    weight: f64,
}

impl Example {
    /// Creates an example with a sample weight of one.
    pub fn new(attributes: Vec<f64>, class: usize) -> Self {
        Self::weighted(attributes, class, 1.0)
    }

    pub fn weighted(attributes: Vec<f64>, class: usize, weight: f64) -> Self {
        Self {
            attributes,
            class,
            weight,
        }
    }

    pub fn attributes(&self) -> &[f64] {
        &self.attributes
    }

    pub fn class(&self) -> usize {
        self.class
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Returns the example without the excluded attribute indices. The label
    /// and the weight are kept.
    pub fn project(&self, excluded: &BTreeSet<usize>) -> Example {
        if excluded.is_empty() {
            return self.clone();
        }
        let attributes = self
            .attributes
            .iter()
            .enumerate()
            .filter(|(index, _)| !excluded.contains(index))
            .map(|(_, value)| *value)
            .collect();
        Example::weighted(attributes, self.class, self.weight)
    }
}

/// Fixed shape of the examples of a stream.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    num_attributes: usize,
    num_classes: usize,
}

impl Schema {
    /// # Errors
    ///
    /// Returns `GeneticError::Configuration` when there are fewer than two
    /// classes or no attribute at all.
    pub fn new(num_attributes: usize, num_classes: usize) -> Result<Self> {
        if num_attributes == 0 {
            return Err(GeneticError::Configuration(
                "Schema needs at least one attribute".to_string(),
            ));
        }
        if num_classes < 2 {
            return Err(GeneticError::Configuration(format!(
                "Schema needs at least two classes, got {}",
                num_classes
            )));
        }
        Ok(Self {
            num_attributes,
            num_classes,
        })
    }

    pub fn num_attributes(&self) -> usize {
        self.num_attributes
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// # Errors
    ///
    /// Returns `GeneticError::Schema` when the example has the wrong number of
    /// attributes, an out of range label or a non-finite weight.
    pub fn check(&self, example: &Example) -> Result<()> {
        if example.attributes.len() != self.num_attributes {
            return Err(GeneticError::Schema(format!(
                "expected {} attributes, got {}",
                self.num_attributes,
                example.attributes.len()
            )));
        }
        if example.class >= self.num_classes {
            return Err(GeneticError::Schema(format!(
                "class {} outside of 0..{}",
                example.class, self.num_classes
            )));
        }
        if !example.weight.is_finite() || example.weight < 0.0 {
            return Err(GeneticError::Schema(format!(
                "invalid sample weight {}",
                example.weight
            )));
        }
        Ok(())
    }
}

/// Sliding window over the most recent examples.
#[derive(Debug, Clone)]
pub struct ExampleBuffer {
    examples: VecDeque<Example>,
    capacity: usize,
}

impl ExampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            examples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an example, evicting the oldest one when full.
    pub fn push(&mut self, example: Example) {
        if self.capacity == 0 {
            return;
        }
        if self.examples.len() == self.capacity {
            self.examples.pop_front();
        }
        self.examples.push_back(example);
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.examples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Example> {
        self.examples.iter()
    }

    /// Copies the buffer, oldest first.
    pub fn snapshot(&self) -> Vec<Example> {
        self.examples.iter().cloned().collect()
    }
}
