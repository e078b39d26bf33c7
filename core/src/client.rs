//! Stateless request builder and response parser for the document server.
//!
//! # Design
//! `StoreClient` holds only a base URL and a database name. Each operation is
//! split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes an `HttpResponse`. The caller executes the
//! round-trip in between, so this module stays deterministic and free of I/O.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{AllDocsResponse, PutResult, TodoDocument};

/// Synchronous, stateless client for one database on a document server.
#[derive(Debug, Clone)]
pub struct StoreClient {
    base_url: String,
    db: String,
}

impl StoreClient {
    pub fn new(base_url: &str, db: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            db: db.to_string(),
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    fn db_url(&self) -> String {
        format!("{}/{}", self.base_url, encode_segment(&self.db))
    }

    pub fn build_all_docs(&self, include_docs: bool) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/_all_docs?include_docs={include_docs}", self.db_url()),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_get_doc(&self, id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/{}", self.db_url(), encode_segment(id)),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Build a write for `doc`, addressed by its own `_id`.
    pub fn build_put_doc(&self, doc: &TodoDocument) -> Result<HttpRequest, ApiError> {
        let id = doc
            .id()
            .ok_or_else(|| ApiError::SerializationError("document has no _id".to_string()))?;
        let body = serde_json::to_string(doc).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: format!("{}/{}", self.db_url(), encode_segment(id)),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    pub fn parse_all_docs(&self, response: HttpResponse) -> Result<AllDocsResponse, ApiError> {
        check_status(&response, 200)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    pub fn parse_get_doc(&self, response: HttpResponse) -> Result<TodoDocument, ApiError> {
        check_status(&response, 200)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    pub fn parse_put_doc(&self, response: HttpResponse) -> Result<PutResult, ApiError> {
        check_status(&response, 201)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    match response.status {
        status if status == expected => Ok(()),
        404 => Err(ApiError::NotFound),
        409 => Err(ApiError::Conflict),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

/// Everything outside the RFC 3986 unreserved set.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
