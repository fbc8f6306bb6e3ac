//! Remote collection access: one endpoint per entity, list/create/update/remove.
//!
//! Every call is a single attempt. Retrying is left to whoever drives the
//! controller.

mod http;
mod memory;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::records::{Entity, RecordId};

pub use http::{
    build_http_client, endpoint_url, fetch_application_columns, ApiOptions, HttpCollection,
};
pub(crate) use http::{decode, read_response};
pub use memory::InMemoryCollection;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The server rejected the request (4xx).
    #[error("{message}")]
    Validation { status: u16, message: String },

    #[error("record {id} was not found")]
    NotFound { id: RecordId },

    /// Network failure, non-4xx error status, or an unreadable body.
    #[error("{message}")]
    Transport { status: Option<u16>, message: String },
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        ClientError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Validation { status, .. } => Some(*status),
            ClientError::NotFound { .. } => Some(404),
            ClientError::Transport { status, .. } => *status,
        }
    }

    /// Classifies a non-2xx response. `id` is set for calls addressed to one record.
    pub fn from_status(status: u16, id: Option<RecordId>, message: String) -> Self {
        match (status, id) {
            (404, Some(id)) => ClientError::NotFound { id },
            (400..=499, _) => ClientError::Validation { status, message },
            _ => ClientError::Transport {
                status: Some(status),
                message,
            },
        }
    }
}

#[async_trait]
pub trait CollectionSource<E: Entity>: Send + Sync {
    async fn list(&self) -> Result<Vec<E>, ClientError>;

    /// The server assigns the id.
    async fn create(&self, payload: &JsonValue) -> Result<E, ClientError>;

    /// Fields missing from `payload` are left untouched server side.
    async fn update(&self, id: RecordId, payload: &JsonValue) -> Result<E, ClientError>;

    async fn remove(&self, id: RecordId) -> Result<(), ClientError>;
}
