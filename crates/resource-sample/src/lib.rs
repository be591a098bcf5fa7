//! # Blog Sample Library
//!
//! This library exposes the blog domain built on the resource framework, for the demo binary and
//! for integration testing.

pub mod entry_resource;
pub mod lifecycle;
pub mod model;
