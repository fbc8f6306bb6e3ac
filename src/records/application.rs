use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value as JsonValue};

use super::{optional_text, required_fields_missing, Draft, Entity, FormMode, RecordId};
use crate::validators::{self, ValidationError};

/// A candidate applying to one vacancy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub application_id: RecordId,
    pub vacancy_id: RecordId,
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default)]
    pub candidate_email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl Entity for Application {
    type Draft = ApplicationDraft;

    const ENDPOINT: &'static str = "applications";
    const LABEL: &'static str = "Application";
    const ID_FIELD: &'static str = "application_id";

    fn id(&self) -> RecordId {
        self.application_id
    }

    fn search_fields(&self) -> Vec<&str> {
        self.candidate_name
            .as_deref()
            .into_iter()
            .chain(self.candidate_email.as_deref())
            .collect()
    }

    fn category(&self) -> Option<String> {
        self.status.clone()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplicationDraft {
    pub vacancy_id: RecordId,
    pub candidate_name: String,
    pub candidate_email: String,
    pub status: String,
    pub score: Option<f64>,
}

impl Draft<Application> for ApplicationDraft {
    fn from_record(record: &Application) -> Self {
        Self {
            vacancy_id: record.vacancy_id,
            candidate_name: record.candidate_name.clone().unwrap_or_default(),
            candidate_email: record.candidate_email.clone().unwrap_or_default(),
            status: record.status.clone().unwrap_or_default(),
            score: record.score,
        }
    }

    fn validate(&self, _mode: FormMode) -> Result<(), ValidationError> {
        if self.vacancy_id <= 0 {
            return Err(required_fields_missing());
        }
        if !validators::is_empty(&self.candidate_name)
            && !validators::is_name_valid(&self.candidate_name)
        {
            return Err(ValidationError::new(
                "Candidate name must be at least 2 characters long.",
            ));
        }
        if !validators::is_empty(&self.candidate_email)
            && !validators::is_email_valid(self.candidate_email.trim())
        {
            return Err(ValidationError::new("Please enter a valid email address."));
        }
        if let Some(score) = self.score {
            if !(0.0..=100.0).contains(&score) {
                return Err(ValidationError::new("Score must be between 0 and 100."));
            }
        }
        Ok(())
    }

    fn payload(&self, _mode: FormMode) -> JsonValue {
        json!({
            "vacancy_id": self.vacancy_id,
            "candidate_name": optional_text(&self.candidate_name),
            "candidate_email": optional_text(&self.candidate_email),
            "status": optional_text(&self.status),
            "score": self.score,
        })
    }
}

/// One row of the per-vacancy application count summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplicationColumn {
    pub vacancy_id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(
        default,
        alias = "application_count",
        alias = "total_applications",
        deserialize_with = "count_from_number_or_text"
    )]
    pub applications_count: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountValue {
    Number(i64),
    Text(String),
}

// SQL COUNT columns often arrive as strings
fn count_from_number_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match CountValue::deserialize(deserializer)? {
        CountValue::Number(n) => Ok(n),
        CountValue::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
