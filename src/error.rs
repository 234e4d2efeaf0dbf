//! # Error Types
//!
//! This module defines the error types shared by the optimizer and the ensemble
//! controller. Most failures are configuration faults detected while building an
//! optimizer or a controller; faults that happen while a run is in progress are
//! recovered locally and never reach the streaming path.
//!
//! ## Examples
//!
//! Using the `Result` type:
//!
//! ```rust
//! use driftga::error::{GeneticError, Result};
//!
//! fn check_population(size: usize) -> Result<()> {
//!     if size == 0 {
//!         return Err(GeneticError::EmptyPopulation);
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_population(0).is_err());
//! ```
//!
//! Using the `OptionExt` trait to convert `Option` to `Result`:
//!
//! ```rust
//! use driftga::error::{GeneticError, OptionExt};
//!
//! fn lowest_cost(costs: &[f64]) -> driftga::error::Result<f64> {
//!     costs
//!         .iter()
//!         .copied()
//!         .reduce(f64::min)
//!         .ok_or_else_genetic(|| GeneticError::EmptyPopulation)
//! }
//!
//! assert_eq!(lowest_cost(&[0.4, 0.1]).unwrap(), 0.1);
//! ```

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Represents errors that can occur while configuring or running an optimization.
#[derive(Error, Debug)]
pub enum GeneticError {
    /// Error that occurs when an invalid configuration is provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error that occurs when an empty population is encountered.
    #[error("Empty population error: Cannot operate on an empty population")]
    EmptyPopulation,

    /// Error that occurs when no ensemble member is eligible for optimization.
    #[error("Empty ensemble error: no active or hidden member to optimize")]
    EmptyEnsemble,

    /// Error that occurs when a fitness calculation fails.
    #[error("Fitness calculation error: {0}")]
    FitnessCalculation(String),

    /// Error that occurs when an example does not match the stream schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Error that occurs when the optimization worker cannot be reached.
    #[error("Worker error: {0}")]
    Worker(String),

    /// Error that occurs when an I/O operation fails.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic error with a custom message.
    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for optimization operations.
pub type Result<T> = std::result::Result<T, GeneticError>;

/// Extension trait for Result to add context to errors.
///
/// ## Examples
///
/// ```rust
/// use driftga::error::ResultExt;
///
/// fn parse_period(raw: &str) -> driftga::error::Result<usize> {
///     raw.parse::<usize>().context("Invalid optimization period")
/// }
///
/// assert!(parse_period("x").is_err());
/// ```
pub trait ResultExt<T, E> {
    /// Converts the error to a `GeneticError` carrying the provided context.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| GeneticError::Other(format!("{}: {}", context, e)))
    }
}

/// Extension trait for Option to convert to Result with a custom error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, GeneticError>` using a closure
    /// to generate the error.
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GeneticError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GeneticError,
    {
        self.ok_or_else(err_fn)
    }
}
