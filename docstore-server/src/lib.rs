//! CouchDB-flavoured HTTP front for a `DocumentStore`.
//!
//! Serves one named database. Errors come back as the store's `ErrorBody`
//! with the matching status code, so clients see the same `conflict` /
//! `not_found` / `missing_id` vocabulary over HTTP as the bridge does
//! in-process.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use todo_bridge::{
    AllDocsResponse, DocumentStore, FsStore, MemoryStore, PutResult, StoreError, StoreResult, TodoDocument,
};
use tokio::net::TcpListener;

pub const DEFAULT_DB_NAME: &str = "todos";
pub const DEFAULT_PORT: u16 = 5984;

/// Runtime settings for the server binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub db_name: String,
    /// Where the database file lives. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_name: DEFAULT_DB_NAME.to_string(),
            data_dir: None,
        }
    }
}

impl ServerConfig {
    /// Read `PORT`, `TODO_DB_NAME` and `TODO_DATA_DIR`, falling back to the
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let port = match lookup("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(%raw, "ignoring unparseable PORT");
                defaults.port
            }),
            None => defaults.port,
        };
        Self {
            port,
            db_name: lookup("TODO_DB_NAME")
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.db_name),
            data_dir: lookup("TODO_DATA_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Open the configured store: on disk when `data_dir` is set.
    pub fn open_store(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        match &self.data_dir {
            Some(dir) => Ok(Arc::new(FsStore::open(dir, &self.db_name)?)),
            None => Ok(Arc::new(MemoryStore::new())),
        }
    }
}

#[derive(Clone)]
struct AppState {
    db_name: Arc<str>,
    store: Arc<dyn DocumentStore>,
}

impl AppState {
    fn check_db(&self, db: &str) -> Result<(), ApiFailure> {
        if db == &*self.db_name {
            Ok(())
        } else {
            Err(ApiFailure(StoreError::NotFound { id: db.to_string() }))
        }
    }
}

/// A store error rendered as an HTTP response.
struct ApiFailure(StoreError);

impl From<StoreError> for ApiFailure {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_body())).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DbInfo {
    pub db_name: String,
    pub doc_count: usize,
}

#[derive(Deserialize)]
struct AllDocsQuery {
    #[serde(default)]
    include_docs: bool,
}

/// Router over a fresh in-memory store named `todos`.
pub fn app() -> Router {
    app_with(Arc::new(MemoryStore::new()), DEFAULT_DB_NAME)
}

pub fn app_with(store: Arc<dyn DocumentStore>, db_name: &str) -> Router {
    let state = AppState {
        db_name: Arc::from(db_name),
        store,
    };
    Router::new()
        .route("/{db}", get(db_info))
        .route("/{db}/_all_docs", get(all_docs))
        .route("/{db}/{id}", get(get_doc).put(put_doc))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, config: &ServerConfig) -> Result<(), std::io::Error> {
    let store = config.open_store().map_err(std::io::Error::other)?;
    let router = app_with(store, &config.db_name);
    axum::serve(listener, router).await
}

async fn db_info(State(state): State<AppState>, Path(db): Path<String>) -> Result<Json<DbInfo>, ApiFailure> {
    state.check_db(&db)?;
    let listing = state.store.all_docs(false).await?;
    Ok(Json(DbInfo {
        db_name: db,
        doc_count: listing.total_rows,
    }))
}

async fn all_docs(
    State(state): State<AppState>,
    Path(db): Path<String>,
    Query(query): Query<AllDocsQuery>,
) -> Result<Json<AllDocsResponse>, ApiFailure> {
    state.check_db(&db)?;
    Ok(Json(state.store.all_docs(query.include_docs).await?))
}

async fn get_doc(
    State(state): State<AppState>,
    Path((db, id)): Path<(String, String)>,
) -> Result<Json<TodoDocument>, ApiFailure> {
    state.check_db(&db)?;
    Ok(Json(state.store.get(&id).await?))
}

async fn put_doc(
    State(state): State<AppState>,
    Path((db, id)): Path<(String, String)>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<PutResult>), ApiFailure> {
    state.check_db(&db)?;
    let mut doc = TodoDocument::new(fields);
    doc.set_id(&id);
    let written = state.store.put(doc).await.inspect_err(|err| {
        tracing::debug!(%id, error = %err, "put rejected");
    })?;
    Ok((StatusCode::CREATED, Json(written)))
}
