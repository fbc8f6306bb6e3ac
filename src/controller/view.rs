use serde::Serialize;

use crate::filter::FilterCriteria;
use crate::pagination::PageWindow;
use crate::records::{Entity, RecordId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Editing,
    ConfirmingDelete,
    /// Last load failed; records may be stale.
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Snapshot handed to whatever paints the list.
#[derive(Clone, Debug)]
pub struct ListView<E: Entity> {
    pub visible: Vec<E>,
    pub window: PageWindow,
    pub criteria: FilterCriteria,
    pub busy: bool,
    pub notice: Option<Notice>,
    pub phase: Phase,
    pub edit_target: Option<RecordId>,
    pub delete_target: Option<RecordId>,
    /// Open form values, kept across failed submits.
    pub form: Option<E::Draft>,
}
