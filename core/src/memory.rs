//! In-memory `DocumentStore` with CouchDB-style revisions.
//!
//! # Design
//! Documents live in an `Arc<RwLock<BTreeMap>>` so clones share one store and
//! listings come out sorted by id. Revisions are `<generation>-<random hex>`;
//! the generation counts writes to that id and the random part keeps two
//! writers that raced from the same revision from minting the same token.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;
use crate::types::{AllDocsResponse, AllDocsRow, PutResult, RowValue, TodoDocument};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDoc {
    generation: u64,
    rev: String,
    body: TodoDocument,
}

/// Point-in-time copy of every stored document, revisions included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryState {
    docs: BTreeMap<String, StoredDoc>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Arc<RwLock<BTreeMap<String, StoredDoc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: MemoryState) -> Self {
        Self {
            docs: Arc::new(RwLock::new(state.docs)),
        }
    }

    pub async fn snapshot(&self) -> MemoryState {
        MemoryState {
            docs: self.docs.read().await.clone(),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn mint_rev(generation: u64) -> String {
    format!("{generation}-{}", Uuid::new_v4().simple())
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &str) -> StoreResult<TodoDocument> {
        let docs = self.docs.read().await;
        let stored = docs
            .get(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        let mut doc = stored.body.clone();
        doc.set_rev(Some(&stored.rev));
        Ok(doc)
    }

    async fn put(&self, doc: TodoDocument) -> StoreResult<PutResult> {
        let id = doc.id().ok_or(StoreError::MissingId)?.to_string();
        let supplied_rev = doc.rev().map(str::to_string);

        let mut docs = self.docs.write().await;
        let generation = match (docs.get(&id), supplied_rev.as_deref()) {
            (Some(stored), Some(rev)) if stored.rev == rev => stored.generation + 1,
            (None, None) => 1,
            _ => return Err(StoreError::Conflict { id }),
        };

        let rev = mint_rev(generation);
        let mut body = doc;
        body.set_rev(None);
        docs.insert(
            id.clone(),
            StoredDoc {
                generation,
                rev: rev.clone(),
                body,
            },
        );
        Ok(PutResult { ok: true, id, rev })
    }

    async fn all_docs(&self, include_docs: bool) -> StoreResult<AllDocsResponse> {
        let docs = self.docs.read().await;
        let rows = docs
            .iter()
            .map(|(id, stored)| AllDocsRow {
                id: id.clone(),
                key: id.clone(),
                value: RowValue {
                    rev: stored.rev.clone(),
                },
                doc: include_docs.then(|| {
                    let mut doc = stored.body.clone();
                    doc.set_rev(Some(&stored.rev));
                    doc
                }),
            })
            .collect::<Vec<_>>();
        Ok(AllDocsResponse {
            total_rows: rows.len(),
            offset: 0,
            rows,
        })
    }
}
