//! Error types for the store, the bridge, and the store client.
//!
//! # Design
//! `StoreError` follows the CouchDB error vocabulary (`not_found`,
//! `conflict`, `missing_id`) because those names and status codes are what
//! the application and the HTTP server both speak. Every store error renders
//! to an `ErrorBody`, which is the one serialized shape an error takes when it
//! leaves the crate, whether on a reply port or in an HTTP response.

use serde::{Deserialize, Serialize};

/// Errors raised by a `DocumentStore`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No document is stored under this id.
    #[error("missing: {id}")]
    NotFound { id: String },

    /// The supplied revision does not match the stored one.
    #[error("Document update conflict: {id}")]
    Conflict { id: String },

    /// The document has no usable `_id`.
    #[error("_id is required for puts")]
    MissingId,

    /// The backing storage failed.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// HTTP-style status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            StoreError::NotFound { .. } => 404,
            StoreError::Conflict { .. } => 409,
            StoreError::MissingId => 412,
            StoreError::Backend(_) => 500,
        }
    }

    /// Short machine-readable error name.
    pub fn name(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Conflict { .. } => "conflict",
            StoreError::MissingId => "missing_id",
            StoreError::Backend(_) => "unknown_error",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status(),
            name: self.name().to_string(),
            message: self.to_string(),
            error: true,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Serialized form of a store error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub error: bool,
}

impl From<&StoreError> for ErrorBody {
    fn from(err: &StoreError) -> Self {
        err.to_body()
    }
}

/// Errors surfaced by the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The batch text was not a JSON array of objects. Fatal to the batch.
    #[error("malformed batch: {0}")]
    Parse(String),

    /// Writing one document failed.
    #[error("write failed for {id:?}: {source}")]
    StoreWrite {
        id: Option<String>,
        #[source]
        source: StoreError,
    },

    /// Listing the store failed.
    #[error("fetch failed: {0}")]
    StoreRead(#[source] StoreError),

    /// A reply payload could not be serialized.
    #[error("encoding reply failed: {0}")]
    Encode(String),
}

/// Errors returned by `StoreClient` parse methods.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server returned 404; the database or document does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned 409; the revision was stale.
    #[error("document update conflict")]
    Conflict,

    /// The server returned a non-2xx status other than 404 or 409.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The host could not complete the round-trip at all.
    #[error("transport failed: {0}")]
    Transport(String),
}

impl ApiError {
    /// Translate a client error about document `id` into the store vocabulary.
    pub fn into_store_error(self, id: &str) -> StoreError {
        match self {
            ApiError::NotFound => StoreError::NotFound { id: id.to_string() },
            ApiError::Conflict => StoreError::Conflict { id: id.to_string() },
            ApiError::HttpError { status: 412, .. } => StoreError::MissingId,
            other => StoreError::Backend(other.to_string()),
        }
    }
}
