//! # Entry Resource
//!
//! This module wires [`BlogEntry`] to a [`Resource`] and attaches the blog's listeners.
//!
//! ## Structure
//!
//! - [`listeners`] - timestamp stamping and the published-entry delete guard
//! - [`error`] - [`EntryError`] for the blog-level operations in [`crate::lifecycle`]
//! - [`new()`] - factory that builds the resource and attaches the listeners
//!
//! ## Usage
//!
//! ```rust
//! use resource_framework::mock::MockDataSource;
//! use resource_sample::entry_resource::{self, listeners::system_clock};
//! use resource_sample::model::BlogEntry;
//! use resource_framework::Spec;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let entries = entry_resource::new(MockDataSource::new(), system_clock);
//!
//!     let entry = BlogEntry::new("hello-world", "Hello", "First post", "matthew");
//!     let saved = entries.create(Spec::Entity(entry)).await?;
//!     assert!(saved.saved().is_some_and(|e| e.created > 0));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod listeners;

pub use error::*;

use crate::model::BlogEntry;
use listeners::Clock;
use resource_framework::{DataSource, Resource};

/// The blog entry resource over any data source.
pub type EntryResource<D> = Resource<BlogEntry, D>;

/// Creates the entry resource with the blog listeners attached.
pub fn new<D: DataSource>(data_source: D, clock: Clock) -> EntryResource<D> {
    let resource = Resource::new(data_source);
    listeners::attach(resource.events(), clock);
    resource
}
