//! # Blog Sample
//!
//! A walk through the resource framework with a blog-entry domain on the in-memory data source.
//!
//! 1. Setting up tracing and the [`BlogSystem`].
//! 2. Publishing an entry and saving a draft (timestamps come from listeners).
//! 3. Revising, rejecting an invalid edit, and deleting with the published-entry guard.
//! 4. Showing the document-store criteria of the listing query.

use resource_framework::tracing::setup_tracing;
use resource_framework::CriteriaTranslator;
use resource_sample::entry_resource::EntryError;
use resource_sample::lifecycle::{listing_query, BlogSystem};
use resource_sample::model::BlogEntry;
use serde_json::json;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), EntryError> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting blog sample");
    let blog = BlogSystem::new();

    let span = tracing::info_span!("publishing");
    let published = async {
        let mut entry = BlogEntry::new(
            "hello-world",
            "Hello, world",
            "The first entry on this blog.",
            "matthew",
        );
        entry.tags = vec!["meta".into(), "rust".into()];
        blog.publish(entry).await
    }
    .instrument(span)
    .await?;
    info!(id = %published.id, created = published.created, "Entry published");

    let draft = blog
        .draft(BlogEntry::new(
            "work-in-progress",
            "Work in progress",
            "Not quite there yet.",
            "matthew",
        ))
        .await?;
    info!(id = %draft.id, is_draft = draft.is_draft, "Draft saved");

    let revised = blog
        .revise(&draft.id, json!({ "body": "Almost there.", "tags": "drafts, rust" }))
        .await?;
    info!(id = %revised.id, tags = ?revised.tags, "Draft revised");

    match blog.revise(&draft.id, json!({ "title": "" })).await {
        Err(EntryError::Invalid(errors)) => info!(?errors, "Invalid edit rejected"),
        other => error!(?other, "Invalid edit was not rejected"),
    }

    match blog.remove(&published.id).await {
        Err(EntryError::Published(id)) => info!(%id, "Published entry protected"),
        other => error!(?other, "Published entry was not protected"),
    }
    blog.unpublish(&published.id).await?;
    blog.remove(&published.id).await?;

    let query = listing_query(Some("matthew"), 10, 0);
    let criteria = CriteriaTranslator::new().translate(&query);
    info!(
        query = %query.to_structured(),
        filter = %serde_json::Value::Object(criteria.filter),
        "Listing query as document-store criteria"
    );

    info!(
        stored = blog.entries.data_source().stored(),
        "Blog sample completed"
    );
    Ok(())
}
