//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
//! Module paths are hidden (`with_target(false)`); every resource log line carries an
//! `entity_type` field instead.
//!
//! ## What Gets Traced
//!
//! - **Reads**: `get_all` and `get` at `debug`, including listener short-circuits
//! - **Writes**: successful create, update and delete at `info`
//! - **Rejections**: validation failures and missing targets at `warn`
//! - **Translation**: the document-store criteria of every query at `debug`
//!
//! ```bash
//! RUST_LOG=info cargo run -p resource-sample
//! RUST_LOG=debug cargo run -p resource-sample
//! RUST_LOG=resource_framework=debug,resource_sample=info cargo run -p resource-sample
//! ```
//!
//! With `RUST_LOG=debug` a create and a rejected update look like:
//!
//! ```text
//! DEBUG Create entity_type="BlogEntry" id=Some(Text("hello-world"))
//! INFO Created entity_type="BlogEntry" id=Some(Text("hello-world"))
//! DEBUG Get entity_type="BlogEntry" id=hello-world found=true
//! WARN Update rejected by validation entity_type="BlogEntry" id=hello-world errors=...
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
