//! Processing job lifecycle over a keyed store.

pub mod store;
pub mod tracker;

pub use store::{InMemoryJobStore, JobStore};
pub use tracker::{JobTracker, ProcessingOutcome};
