//! Translation layer between the application's ports and a document store.
//!
//! # Design
//! The application talks to the bridge through one command channel
//! (`AppCommand`) and hears back through one reply channel (`BridgeReply`);
//! each variant corresponds to one named port. The bridge itself holds only a
//! store handle and the reply sender.
//!
//! Every document in a persisted batch becomes its own task. Tasks share
//! nothing but the store, report exactly once on the reply channel, and may
//! complete in any order. Nothing is retried here; the store's own conflict
//! handling inside `upsert` is the only recovery.
//!
//! All reply payloads are JSON text, errors included.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::BridgeError;
use crate::store::DocumentStore;
use crate::types::{TodoDocument, UpsertResult};

pub const SAVE_TODOS_PORT: &str = "saveTodosToPouch";
pub const GET_TODOS_PORT: &str = "getTodosFromPouch";
pub const SAVE_SUCCESS_PORT: &str = "pouchSaveSuccess";
pub const SAVE_ERROR_PORT: &str = "pouchSaveError";
pub const GET_SUCCESS_PORT: &str = "pouchGetSuccess";
pub const GET_ERROR_PORT: &str = "pouchGetError";

/// Messages the application sends to the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// A serialized batch of documents to persist.
    SaveTodos(String),
    /// Request for every stored document. The filter is carried but unused.
    GetTodos(Value),
}

impl AppCommand {
    pub fn port(&self) -> &'static str {
        match self {
            AppCommand::SaveTodos(_) => SAVE_TODOS_PORT,
            AppCommand::GetTodos(_) => GET_TODOS_PORT,
        }
    }
}

/// Messages the bridge sends back to the application. Payloads are JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeReply {
    SaveSuccess(String),
    SaveError(String),
    GetSuccess(String),
    GetError(String),
}

impl BridgeReply {
    pub fn port(&self) -> &'static str {
        match self {
            BridgeReply::SaveSuccess(_) => SAVE_SUCCESS_PORT,
            BridgeReply::SaveError(_) => SAVE_ERROR_PORT,
            BridgeReply::GetSuccess(_) => GET_SUCCESS_PORT,
            BridgeReply::GetError(_) => GET_ERROR_PORT,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            BridgeReply::SaveSuccess(payload)
            | BridgeReply::SaveError(payload)
            | BridgeReply::GetSuccess(payload)
            | BridgeReply::GetError(payload) => payload,
        }
    }
}

/// Parse a batch payload into documents.
///
/// Anything but a JSON array of objects fails the whole batch.
pub fn parse_batch(text: &str) -> Result<Vec<TodoDocument>, BridgeError> {
    serde_json::from_str(text).map_err(|e| BridgeError::Parse(e.to_string()))
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, BridgeError> {
    serde_json::to_string(value).map_err(|e| BridgeError::Encode(e.to_string()))
}

/// Handles for the per-document writes spawned by one `persist` call.
///
/// Dropping this detaches the writes; they still run and still reply.
#[derive(Debug)]
pub struct PendingWrites {
    handles: Vec<JoinHandle<()>>,
}

impl PendingWrites {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait until every write in the batch has replied.
    pub async fn settled(self) {
        for handle in self.handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "document write task failed");
            }
        }
    }
}

/// Bridge between the application's ports and a `DocumentStore`.
pub struct Bridge<S: DocumentStore + ?Sized + 'static> {
    store: Arc<S>,
    replies: mpsc::UnboundedSender<BridgeReply>,
}

impl<S: DocumentStore + ?Sized + 'static> Clone for Bridge<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            replies: self.replies.clone(),
        }
    }
}

impl<S: DocumentStore + ?Sized + 'static> Bridge<S> {
    pub fn new(store: Arc<S>, replies: mpsc::UnboundedSender<BridgeReply>) -> Self {
        Self { store, replies }
    }

    /// Persist a serialized batch.
    ///
    /// A malformed batch is logged and returned as `BridgeError::Parse`;
    /// nothing is written and nothing is sent to the application. Otherwise
    /// one write per document is spawned and the handles are returned.
    pub fn persist(&self, batch: &str) -> Result<PendingWrites, BridgeError> {
        let docs = parse_batch(batch).inspect_err(|err| {
            tracing::error!(error = %err, "dropping batch that failed to parse");
        })?;

        let handles = docs
            .into_iter()
            .map(|doc| {
                let bridge = self.clone();
                tokio::spawn(async move { bridge.write_one(doc).await })
            })
            .collect();
        Ok(PendingWrites { handles })
    }

    /// Upsert one document, merging its fields over any stored version.
    pub async fn save_one(&self, doc: TodoDocument) -> Result<UpsertResult, BridgeError> {
        let id = doc.id().map(str::to_string);
        let diff = move |existing: Option<TodoDocument>| Some(doc.clone().merged_onto(existing));
        let outcome = self.store.upsert(id.as_deref().unwrap_or_default(), &diff).await;
        outcome.map_err(|source| BridgeError::StoreWrite { id, source })
    }

    async fn write_one(&self, doc: TodoDocument) {
        let reply = match self.save_one(doc).await {
            Ok(result) => encode(&result).map(BridgeReply::SaveSuccess),
            Err(BridgeError::StoreWrite { id, source }) => {
                let body = source.to_body();
                let err = BridgeError::StoreWrite { id, source };
                tracing::error!(error = %err, "document write failed");
                encode(&body).map(BridgeReply::SaveError)
            }
            Err(err) => Err(err),
        };
        self.send(reply);
    }

    /// Fetch every stored document and reply with their bodies.
    ///
    /// `filter` is accepted for the port's sake and not applied.
    pub fn fetch_all(&self, filter: Value) -> JoinHandle<()> {
        if !filter.is_null() {
            tracing::debug!(%filter, "fetch filter ignored");
        }
        let bridge = self.clone();
        tokio::spawn(async move { bridge.read_all().await })
    }

    /// Every stored document body, without revision metadata.
    pub async fn fetch_bodies(&self) -> Result<Vec<TodoDocument>, BridgeError> {
        let listing = self.store.all_docs(true).await.map_err(BridgeError::StoreRead)?;
        tracing::debug!(rows = listing.rows.len(), "fetched all documents");
        Ok(listing.into_bodies())
    }

    async fn read_all(&self) {
        let reply = match self.fetch_bodies().await {
            Ok(bodies) => encode(&bodies).map(BridgeReply::GetSuccess),
            Err(BridgeError::StoreRead(source)) => {
                encode(&source.to_body()).map(BridgeReply::GetError)
            }
            Err(err) => Err(err),
        };
        self.send(reply);
    }

    fn send(&self, reply: Result<BridgeReply, BridgeError>) {
        match reply {
            Ok(reply) => {
                let port = reply.port();
                if self.replies.send(reply).is_err() {
                    tracing::debug!(port, "application detached, reply dropped");
                }
            }
            Err(err) => tracing::error!(error = %err, "reply not sent"),
        }
    }

    /// Route one command without waiting for its outcome.
    pub fn dispatch(&self, command: AppCommand) {
        match command {
            AppCommand::SaveTodos(batch) => {
                // Parse failures are already logged and stay silent to the app.
                let _ = self.persist(&batch);
            }
            AppCommand::GetTodos(filter) => {
                self.fetch_all(filter);
            }
        }
    }

    /// Serve commands until every sender is dropped.
    pub async fn run(self, mut commands: mpsc::UnboundedReceiver<AppCommand>) {
        while let Some(command) = commands.recv().await {
            tracing::trace!(port = command.port(), "command received");
            self.dispatch(command);
        }
        tracing::debug!("command channel closed, bridge stopping");
    }
}
