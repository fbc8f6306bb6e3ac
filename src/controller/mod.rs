//! List-view controller: cached records, filters, pagination and the
//! create/edit/delete flows, reconciled against the remote collection.
//!
//! Every successful write is followed by a full reload of the collection.
//! Filters and the requested page survive reloads; the page is reclamped.
//!
//! The controller never guards against overlapping calls itself. It publishes
//! `busy` through [`ListController::subscribe`] so the caller can disable its
//! submit and delete affordances while a round trip is outstanding.

mod view;

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::{ClientError, CollectionSource};
use crate::filter::{self, FilterCriteria, FilterPatch};
use crate::pagination::{paginate, PageWindow};
use crate::records::{Draft, Entity, FormMode, RecordId};
use crate::validators::ValidationError;

pub use view::{ListView, Notice, NoticeKind, Phase};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] ClientError),
}

struct ListState<E: Entity> {
    records: Vec<E>,
    criteria: FilterCriteria,
    page: usize,
    page_size: usize,
    edit_target: Option<RecordId>,
    form: Option<E::Draft>,
    delete_target: Option<RecordId>,
    busy: bool,
    notice: Option<Notice>,
    phase: Phase,
}

pub struct ListController<E: Entity, S: CollectionSource<E>> {
    source: S,
    state: ListState<E>,
    tx: watch::Sender<ListView<E>>,
}

impl<E: Entity, S: CollectionSource<E>> ListController<E, S> {
    pub fn new(source: S, page_size: usize) -> Self {
        let state = ListState {
            records: Vec::new(),
            criteria: FilterCriteria::default(),
            page: 1,
            page_size: page_size.max(1),
            edit_target: None,
            form: None,
            delete_target: None,
            busy: false,
            notice: None,
            phase: Phase::Idle,
        };
        let (tx, _rx) = watch::channel(snapshot(&state));
        Self { source, state, tx }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn subscribe(&self) -> watch::Receiver<ListView<E>> {
        self.tx.subscribe()
    }

    pub fn view(&self) -> ListView<E> {
        snapshot(&self.state)
    }

    /// Full cached collection, unfiltered.
    pub fn records(&self) -> &[E] {
        &self.state.records
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.state.criteria
    }

    pub fn page(&self) -> usize {
        self.state.page
    }

    pub fn page_size(&self) -> usize {
        self.state.page_size
    }

    pub fn is_busy(&self) -> bool {
        self.state.busy
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.state.notice.as_ref()
    }

    pub fn edit_target(&self) -> Option<RecordId> {
        self.state.edit_target
    }

    pub fn delete_target(&self) -> Option<RecordId> {
        self.state.delete_target
    }

    pub fn form(&self) -> Option<&E::Draft> {
        self.state.form.as_ref()
    }

    /// Counts of the full cache per category value.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.state.records {
            if let Some(category) = record.category() {
                *counts.entry(category).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Replaces the cache with the server's list. On failure the stale cache
    /// is kept and the controller moves to [`Phase::Error`].
    pub async fn load(&mut self) -> Result<(), ClientError> {
        match self.source.list().await {
            Ok(records) => {
                debug!(endpoint = E::ENDPOINT, count = records.len(), "collection loaded");
                self.state.records = records;
                self.reclamp();
                if self.state.phase == Phase::Error {
                    self.state.phase = self.resting_phase();
                }
                self.publish();
                Ok(())
            }
            Err(err) => {
                warn!(endpoint = E::ENDPOINT, error = %err, "collection load failed");
                self.state.notice = Some(Notice::error(load_failure_message(&err)));
                self.state.phase = Phase::Error;
                self.publish();
                Err(err)
            }
        }
    }

    pub fn set_filter(&mut self, patch: FilterPatch) {
        self.state.criteria.merge(patch);
        self.state.page = 1;
        self.reclamp();
        self.publish();
    }

    pub fn clear_filters(&mut self) {
        self.state.criteria = FilterCriteria::default();
        self.state.page = 1;
        self.reclamp();
        self.publish();
    }

    pub fn set_page(&mut self, page: usize) {
        self.state.page = page;
        self.reclamp();
        self.publish();
    }

    pub fn begin_create(&mut self) {
        self.state.edit_target = None;
        self.state.form = Some(E::Draft::default());
        self.state.phase = Phase::Editing;
        self.publish();
    }

    /// Opens the edit form prefilled from the cache. Ids not in the cache are
    /// ignored; returns whether the form was opened.
    pub fn begin_edit(&mut self, id: RecordId) -> bool {
        let Some(record) = self.state.records.iter().find(|r| r.id() == id) else {
            debug!(endpoint = E::ENDPOINT, id, "edit ignored, id not cached");
            return false;
        };
        self.state.form = Some(<E::Draft as Draft<E>>::from_record(record));
        self.state.edit_target = Some(id);
        self.state.phase = Phase::Editing;
        self.publish();
        true
    }

    pub fn cancel_edit(&mut self) {
        self.state.edit_target = None;
        self.state.form = None;
        if self.state.phase == Phase::Editing {
            self.state.phase = Phase::Idle;
        }
        self.publish();
    }

    /// Validates locally, then creates or updates depending on the edit target.
    /// Form values are kept on any failure.
    pub async fn submit(&mut self, draft: E::Draft) -> Result<(), ListError> {
        let target = self.state.edit_target;
        let mode = if target.is_some() {
            FormMode::Update
        } else {
            FormMode::Create
        };
        self.state.form = Some(draft.clone());
        self.state.phase = Phase::Editing;

        if let Err(err) = draft.validate(mode) {
            self.state.notice = Some(Notice::error(err.message.clone()));
            self.publish();
            return Err(err.into());
        }

        let payload = draft.payload(mode);
        self.set_busy(true);
        let result = match target {
            Some(id) => self.source.update(id, &payload).await.map(|_| ()),
            None => self.source.create(&payload).await.map(|_| ()),
        };
        self.state.busy = false;

        match result {
            Ok(()) => {
                let verb = if target.is_some() { "updated" } else { "created" };
                self.state.edit_target = None;
                self.state.form = None;
                self.state.phase = Phase::Idle;
                self.state.notice = Some(Notice::success(format!(
                    "{} {verb} successfully!",
                    E::LABEL
                )));
                self.publish();
                if let Err(err) = self.load().await {
                    debug!(endpoint = E::ENDPOINT, error = %err, "reload after write failed");
                }
                Ok(())
            }
            Err(err) => {
                self.state.notice = Some(Notice::error(save_failure_message::<E>(&err)));
                self.publish();
                if matches!(err, ClientError::NotFound { .. }) {
                    self.reload_quietly().await;
                }
                Err(err.into())
            }
        }
    }

    pub fn begin_delete(&mut self, id: RecordId) {
        self.state.delete_target = Some(id);
        self.state.phase = Phase::ConfirmingDelete;
        self.publish();
    }

    /// Removes the delete target. On failure the target stays set for a retry.
    pub async fn confirm_delete(&mut self) -> Result<(), ListError> {
        let Some(id) = self.state.delete_target else {
            return Ok(());
        };
        self.set_busy(true);
        let result = self.source.remove(id).await;
        self.state.busy = false;

        match result {
            Ok(()) => {
                self.state.delete_target = None;
                self.state.phase = Phase::Idle;
                self.state.notice = Some(Notice::success(format!(
                    "{} deleted successfully.",
                    E::LABEL
                )));
                self.publish();
                if let Err(err) = self.load().await {
                    debug!(endpoint = E::ENDPOINT, error = %err, "reload after write failed");
                }
                Ok(())
            }
            Err(err) => {
                self.state.phase = Phase::ConfirmingDelete;
                self.state.notice = Some(Notice::error(delete_failure_message::<E>(&err)));
                self.publish();
                if matches!(err, ClientError::NotFound { .. }) {
                    self.reload_quietly().await;
                }
                Err(err.into())
            }
        }
    }

    pub fn cancel_delete(&mut self) {
        self.state.delete_target = None;
        if self.state.phase == Phase::ConfirmingDelete {
            self.state.phase = Phase::Idle;
        }
        self.publish();
    }

    /// Catches the cache up after a NotFound without replacing the notice
    /// that reported it.
    async fn reload_quietly(&mut self) {
        match self.source.list().await {
            Ok(records) => {
                self.state.records = records;
                self.reclamp();
                self.publish();
            }
            Err(err) => {
                warn!(endpoint = E::ENDPOINT, error = %err, "follow-up reload failed");
            }
        }
    }

    /// Phase implied by the open form or pending delete.
    fn resting_phase(&self) -> Phase {
        if self.state.delete_target.is_some() {
            Phase::ConfirmingDelete
        } else if self.state.form.is_some() {
            Phase::Editing
        } else {
            Phase::Idle
        }
    }

    fn set_busy(&mut self, busy: bool) {
        self.state.busy = busy;
        self.publish();
    }

    fn reclamp(&mut self) {
        let criteria = &self.state.criteria;
        let matching = self
            .state
            .records
            .iter()
            .filter(|r| criteria.matches(*r))
            .count();
        self.state.page = paginate(matching, self.state.page_size, self.state.page).page;
    }

    fn publish(&self) {
        self.tx.send_replace(snapshot(&self.state));
    }
}

fn snapshot<E: Entity>(state: &ListState<E>) -> ListView<E> {
    let filtered = filter::apply(&state.records, &state.criteria);
    let window: PageWindow = paginate(filtered.len(), state.page_size, state.page);
    ListView {
        visible: filtered[window.start..window.end].to_vec(),
        window,
        criteria: state.criteria.clone(),
        busy: state.busy,
        notice: state.notice.clone(),
        phase: state.phase,
        edit_target: state.edit_target,
        delete_target: state.delete_target,
        form: state.form.clone(),
    }
}

fn with_status(text: String, err: &ClientError) -> String {
    match err.status() {
        Some(status) => format!("{text} (HTTP {status})"),
        None => text,
    }
}

fn load_failure_message(err: &ClientError) -> String {
    match err {
        ClientError::Validation { message, .. } => message.clone(),
        _ => with_status(
            "Error loading page data. Please check the server connection.".to_string(),
            err,
        ),
    }
}

fn save_failure_message<E: Entity>(err: &ClientError) -> String {
    match err {
        ClientError::Validation { message, .. } => message.clone(),
        ClientError::NotFound { id } => format!("{} {id} no longer exists.", E::LABEL),
        ClientError::Transport { .. } => with_status(
            format!(
                "An error occurred while saving the {}.",
                E::LABEL.to_lowercase()
            ),
            err,
        ),
    }
}

fn delete_failure_message<E: Entity>(err: &ClientError) -> String {
    match err {
        ClientError::Validation { message, .. } => message.clone(),
        ClientError::NotFound { id } => format!("{} {id} no longer exists.", E::LABEL),
        ClientError::Transport { .. } => with_status(
            format!("Failed to delete {}.", E::LABEL.to_lowercase()),
            err,
        ),
    }
}
