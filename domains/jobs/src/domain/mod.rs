//! Jobs domain layer: entities, capability traits, errors

pub mod entities;
pub mod error;
pub mod store;
