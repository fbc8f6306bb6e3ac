use serde::Serialize;

use crate::records::Entity;

/// Active list criteria. Blank fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub search: String,
    pub category: String,
}

/// Partial criteria update; `None` keeps the current value, `Some("")` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl FilterPatch {
    pub fn search(value: impl Into<String>) -> Self {
        Self {
            search: Some(value.into()),
            category: None,
        }
    }

    pub fn category(value: impl Into<String>) -> Self {
        Self {
            search: None,
            category: Some(value.into()),
        }
    }
}

impl FilterCriteria {
    pub fn merge(&mut self, patch: FilterPatch) {
        if let Some(search) = patch.search {
            self.search = search;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
    }

    pub fn is_active(&self) -> bool {
        !self.search.trim().is_empty() || !self.category.trim().is_empty()
    }

    pub fn matches<E: Entity>(&self, record: &E) -> bool {
        let search = self.search.trim().to_lowercase();
        if !search.is_empty()
            && !record
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&search))
        {
            return false;
        }
        let category = self.category.trim();
        if !category.is_empty() && record.category().as_deref() != Some(category) {
            return false;
        }
        true
    }
}

/// Narrows `records` to those matching every active criterion, keeping input order.
pub fn apply<E: Entity>(records: &[E], criteria: &FilterCriteria) -> Vec<E> {
    if !criteria.is_active() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| criteria.matches(*r))
        .cloned()
        .collect()
}
