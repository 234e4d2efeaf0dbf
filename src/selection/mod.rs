//! Parent selection and survivor selection over genotypes ordered by cost.

pub mod elitist;
pub mod selection_strategy;
pub mod tournament;

pub use elitist::ElitistSelection;
pub use selection_strategy::SelectionStrategy;
pub use tournament::TournamentSelection;
