//! A named database that survives restarts.
//!
//! # Design
//! `FsStore` wraps a `MemoryStore` and rewrites a JSON snapshot of it after
//! every successful write: the snapshot goes to a temporary file first and is
//! renamed over `<root>/<db>.json`, so a crash mid-write leaves the previous
//! snapshot intact. Writes are serialized by a gate so snapshots reach the
//! disk in the order their writes happened. Reads never touch the disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::memory::{MemoryState, MemoryStore};
use crate::store::DocumentStore;
use crate::types::{AllDocsResponse, PutResult, TodoDocument};

#[derive(Debug, Clone)]
pub struct FsStore {
    state_file: PathBuf,
    inner: MemoryStore,
    write_gate: Arc<Mutex<()>>,
}

impl FsStore {
    /// Open the database `db_name` under `root`, creating both if needed.
    pub fn open<P: AsRef<Path>>(root: P, db_name: &str) -> StoreResult<Self> {
        if db_name.is_empty() || db_name.contains(&['/', '\\'][..]) || db_name.starts_with('.') {
            return Err(StoreError::Backend(format!("invalid database name {db_name:?}")));
        }
        fs::create_dir_all(root.as_ref())
            .map_err(|err| StoreError::Backend(format!("create store root failed: {err}")))?;

        let state_file = root.as_ref().join(format!("{db_name}.json"));
        let state = if state_file.exists() {
            let raw = fs::read(&state_file)
                .map_err(|err| StoreError::Backend(format!("read state file failed: {err}")))?;
            serde_json::from_slice::<MemoryState>(&raw)
                .map_err(|err| StoreError::Backend(format!("corrupt state file: {err}")))?
        } else {
            MemoryState::default()
        };
        tracing::debug!(path = %state_file.display(), "opened document store");

        Ok(Self {
            state_file,
            inner: MemoryStore::from_state(state),
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.state_file
    }

    async fn flush(&self) -> StoreResult<()> {
        let snapshot = self.inner.snapshot().await;
        let raw = serde_json::to_vec_pretty(&snapshot)
            .map_err(|err| StoreError::Backend(format!("encode state failed: {err}")))?;
        let tmp = self.state_file.with_extension("json.tmp");
        fs::write(&tmp, raw)
            .map_err(|err| StoreError::Backend(format!("write state file failed: {err}")))?;
        fs::rename(&tmp, &self.state_file)
            .map_err(|err| StoreError::Backend(format!("rename state file failed: {err}")))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for FsStore {
    async fn get(&self, id: &str) -> StoreResult<TodoDocument> {
        self.inner.get(id).await
    }

    async fn put(&self, doc: TodoDocument) -> StoreResult<PutResult> {
        let _gate = self.write_gate.lock().await;
        let written = self.inner.put(doc).await?;
        self.flush().await.inspect_err(|err| {
            tracing::error!(id = %written.id, error = %err, "write applied in memory but not saved");
        })?;
        Ok(written)
    }

    async fn all_docs(&self, include_docs: bool) -> StoreResult<AllDocsResponse> {
        self.inner.all_docs(include_docs).await
    }
}
