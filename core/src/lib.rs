//! Persistence bridge between an embedded todo application and a document
//! store.
//!
//! # Overview
//! The application sends serialized batches and fetch requests over a
//! command channel; the bridge upserts each document into a `DocumentStore`
//! and answers on reply ports. A small input guard keeps Tab from leaving the
//! command input.
//!
//! # Design
//! - `DocumentStore` is the seam. `MemoryStore` implements it in-process,
//!   `FsStore` adds a JSON snapshot on disk so a named database survives a
//!   restart, and `RemoteStore` reaches a document server through
//!   `StoreClient` (`build_*` / `parse_*`) and a host-supplied `HttpExecutor`,
//!   so no network code lives here.
//! - The bridge keeps no state beyond its store handle and reply sender.
//!   Each per-document write is an independent task that replies once.
//! - Documents are raw JSON objects; only `_id` and `_rev` mean anything to
//!   this crate.

pub mod bootstrap;
pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod fs;
pub mod guard;
pub mod http;
pub mod memory;
pub mod remote;
pub mod store;
pub mod types;

pub use bootstrap::{embed, fresh_id, AppPorts, Embedded};
pub use bridge::{parse_batch, AppCommand, Bridge, BridgeReply, PendingWrites};
pub use client::StoreClient;
pub use config::BridgeConfig;
pub use error::{ApiError, BridgeError, ErrorBody, StoreError, StoreResult};
pub use fs::FsStore;
pub use guard::{ElementLookup, HeadlessPage, InputElement, InputGuard, KeyEvent};
pub use http::{HttpExecutor, HttpMethod, HttpRequest, HttpResponse};
pub use memory::{MemoryState, MemoryStore};
pub use remote::RemoteStore;
pub use store::DocumentStore;
pub use types::{AllDocsResponse, InitFlags, PutResult, TodoDocument, UpsertResult};
