//! The document-store seam the bridge persists through.
//!
//! # Design
//! Implementations supply `get`, `put`, and `all_docs`; `upsert` is built on
//! top of them the way a CouchDB client plugin would do it: read the current
//! revision, let the caller compute the next body, write it back against that
//! revision, and re-read on a revision conflict until the write lands.
//! Concurrent writers to the same id are serialized by revisions alone;
//! nothing here holds a lock across the read-modify-write. Every conflict
//! means another writer succeeded, so the retry loop always makes progress.

use crate::error::{StoreError, StoreResult};
use crate::types::{AllDocsResponse, PutResult, TodoDocument, UpsertResult};

/// Computes the next body from the current one. `None` in means the document
/// does not exist yet; `None` out means "leave it alone".
pub type UpsertDiff = dyn Fn(Option<TodoDocument>) -> Option<TodoDocument> + Send + Sync;

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, including its `_rev`.
    async fn get(&self, id: &str) -> StoreResult<TodoDocument>;

    /// Write a document. Updating an existing id requires its current `_rev`.
    async fn put(&self, doc: TodoDocument) -> StoreResult<PutResult>;

    /// List every stored document, sorted by id.
    async fn all_docs(&self, include_docs: bool) -> StoreResult<AllDocsResponse>;

    /// Insert or update the document stored under `id` using `diff`.
    ///
    /// The `_id` and current `_rev` are forced onto whatever `diff` returns,
    /// so a stale `_rev` carried by the caller's fields never causes a
    /// conflict on its own. Revision conflicts are retried until the write
    /// succeeds.
    async fn upsert(&self, id: &str, diff: &UpsertDiff) -> StoreResult<UpsertResult> {
        self.upsert_bounded(id, diff, None).await
    }

    /// `upsert` that gives up with `conflict` after `max_attempts` writes.
    /// `None` retries without limit.
    async fn upsert_bounded(
        &self,
        id: &str,
        diff: &UpsertDiff,
        max_attempts: Option<usize>,
    ) -> StoreResult<UpsertResult> {
        if id.is_empty() {
            return Err(StoreError::MissingId);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = match self.get(id).await {
                Ok(doc) => Some(doc),
                Err(StoreError::NotFound { .. }) => None,
                Err(err) => return Err(err),
            };
            let current_rev = current.as_ref().and_then(|doc| doc.rev().map(str::to_string));

            let Some(mut next) = diff(current) else {
                return Ok(UpsertResult {
                    updated: false,
                    id: id.to_string(),
                    rev: current_rev.unwrap_or_default(),
                });
            };
            next.set_id(id);
            next.set_rev(current_rev.as_deref());

            match self.put(next).await {
                Ok(written) => {
                    return Ok(UpsertResult {
                        updated: true,
                        id: written.id,
                        rev: written.rev,
                    })
                }
                Err(StoreError::Conflict { .. }) if max_attempts.map_or(true, |max| attempt < max) => {
                    tracing::debug!(id, attempt, "upsert hit a revision conflict, re-reading");
                }
                Err(err) => return Err(err),
            }
        }
    }
}
