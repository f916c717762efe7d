//! Domain layer types and invariants.

pub mod resource;

pub use resource::{Resource, ResourceId};
