//! # Global Leaderboard Library
//!
//! Shared library for the leaderboard workspace. It aggregates per-server
//! rankings from the upstream game API into a consolidated Redis cache and
//! serves paged reads out of it.
//!
//! The refresh pipeline is: scheduler -> upstream (server list) ->
//! aggregator -> upstream (per-server rankings) -> store (bulk replace).
//! The read path is: query service -> store, with a distinguishable error
//! taxonomy instead of silent fallback to the live API.

// Declare the modules to re-export
pub mod aggregator;
pub mod model;
pub mod modes;
pub mod query;
pub mod scheduler;
pub mod store;
pub mod upstream;

// Re-export everything
pub use aggregator::*;
pub use model::*;
pub use modes::*;
pub use query::*;
pub use scheduler::*;
pub use store::*;
pub use upstream::*;
