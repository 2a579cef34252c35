//! Service layer
//!
//! Services hold the run-time logic of the bridge. They take a unit of work
//! built at definition time, execute it through the pipeline engine and turn
//! the run report into completion records.
//!
//! Services are trait-based so callers can substitute their own.

mod materialize;

// Re-export traits
pub use materialize::MaterializationService;

// Re-export implementations
pub use materialize::StandardMaterializationService;
