//! Domain types implementing the [`Entity`](resource_framework::Entity) trait.

pub mod entry;

pub use entry::*;
