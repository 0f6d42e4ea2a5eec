//! Jobs domain: job descriptors, targets, runners and datastore capabilities

pub mod domain;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::error::StoreError;
pub use domain::store::{Datastore, JobStore, LockStore, RunnerStore, TargetStore};
