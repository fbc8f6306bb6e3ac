//! Record schemas exchanged with the remote service.
//!
//! Each entity maps to one collection endpoint. Records are owned by the
//! server; the client only ever holds cached copies, compared by id.

mod application;
mod user;
mod vacancy;

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::validators::ValidationError;

pub use application::{Application, ApplicationColumn, ApplicationDraft};
pub use user::{Role, User, UserDraft};
pub use vacancy::{Vacancy, VacancyDraft};

pub type RecordId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update,
}

/// A record type served from one collection endpoint.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Draft: Draft<Self>;

    /// Path segment of the collection, e.g. `users`.
    const ENDPOINT: &'static str;

    /// Human label used in notices, e.g. `User`.
    const LABEL: &'static str;

    /// Name of the server-assigned identifier field.
    const ID_FIELD: &'static str;

    fn id(&self) -> RecordId;

    /// Fields the free-text search looks into.
    fn search_fields(&self) -> Vec<&str>;

    /// Value compared against the categorical criterion.
    fn category(&self) -> Option<String>;
}

/// Form values for creating or editing an entity.
pub trait Draft<E>: Clone + Debug + Default + Send + Sync + 'static {
    fn from_record(record: &E) -> Self;

    /// Runs the external validators; no network access.
    fn validate(&self, mode: FormMode) -> Result<(), ValidationError>;

    /// JSON body sent to the server. Blank secrets are left out on update so the
    /// stored value survives.
    fn payload(&self, mode: FormMode) -> JsonValue;
}

pub(crate) fn required_fields_missing() -> ValidationError {
    ValidationError::new("Please fill in all required fields.")
}

pub(crate) fn optional_text(value: &str) -> JsonValue {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        JsonValue::Null
    } else {
        JsonValue::String(trimmed.to_string())
    }
}
