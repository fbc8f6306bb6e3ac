use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use super::{optional_text, required_fields_missing, Draft, Entity, FormMode, RecordId};
use crate::validators::{self, ValidationError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vacancy {
    pub vacancy_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub modality: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Entity for Vacancy {
    type Draft = VacancyDraft;

    const ENDPOINT: &'static str = "vacancies";
    const LABEL: &'static str = "Vacancy";
    const ID_FIELD: &'static str = "vacancy_id";

    fn id(&self) -> RecordId {
        self.vacancy_id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.description.as_deref());
        fields.extend(self.location.as_deref());
        fields
    }

    fn category(&self) -> Option<String> {
        self.status.clone()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VacancyDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub modality: String,
    pub status: String,
}

impl Draft<Vacancy> for VacancyDraft {
    fn from_record(record: &Vacancy) -> Self {
        Self {
            title: record.title.clone(),
            description: record.description.clone().unwrap_or_default(),
            location: record.location.clone().unwrap_or_default(),
            modality: record.modality.clone().unwrap_or_default(),
            status: record.status.clone().unwrap_or_default(),
        }
    }

    fn validate(&self, _mode: FormMode) -> Result<(), ValidationError> {
        if validators::is_empty(&self.title) {
            return Err(required_fields_missing());
        }
        if !validators::is_name_valid(&self.title) {
            return Err(ValidationError::new(
                "Title must be at least 2 characters long.",
            ));
        }
        Ok(())
    }

    fn payload(&self, _mode: FormMode) -> JsonValue {
        json!({
            "title": self.title.trim(),
            "description": optional_text(&self.description),
            "location": optional_text(&self.location),
            "modality": optional_text(&self.modality),
            "status": optional_text(&self.status),
        })
    }
}
