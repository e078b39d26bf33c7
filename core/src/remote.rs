//! `DocumentStore` backed by a document server.
//!
//! Requests are built and parsed by `StoreClient`; the round-trip itself is
//! delegated to the host's `HttpExecutor`. Client errors are translated into
//! the store vocabulary so `upsert` sees a 409 as a retryable conflict.

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::http::HttpExecutor;
use crate::store::DocumentStore;
use crate::types::{AllDocsResponse, PutResult, TodoDocument};

#[derive(Debug, Clone)]
pub struct RemoteStore<E> {
    client: StoreClient,
    executor: E,
}

impl<E: HttpExecutor> RemoteStore<E> {
    pub fn new(client: StoreClient, executor: E) -> Self {
        Self { client, executor }
    }

    pub fn client(&self) -> &StoreClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl<E: HttpExecutor> DocumentStore for RemoteStore<E> {
    async fn get(&self, id: &str) -> StoreResult<TodoDocument> {
        let response = self
            .executor
            .execute(self.client.build_get_doc(id))
            .await
            .map_err(|err| err.into_store_error(id))?;
        self.client
            .parse_get_doc(response)
            .map_err(|err| err.into_store_error(id))
    }

    async fn put(&self, doc: TodoDocument) -> StoreResult<PutResult> {
        let id = doc.id().ok_or(StoreError::MissingId)?.to_string();
        let request = self
            .client
            .build_put_doc(&doc)
            .map_err(|err| err.into_store_error(&id))?;
        let response = self
            .executor
            .execute(request)
            .await
            .map_err(|err| err.into_store_error(&id))?;
        self.client
            .parse_put_doc(response)
            .map_err(|err| err.into_store_error(&id))
    }

    async fn all_docs(&self, include_docs: bool) -> StoreResult<AllDocsResponse> {
        let db = self.client.db();
        let response = self
            .executor
            .execute(self.client.build_all_docs(include_docs))
            .await
            .map_err(|err| err.into_store_error(db))?;
        self.client
            .parse_all_docs(response)
            .map_err(|err| err.into_store_error(db))
    }
}
