//! Orchestrates backend calls, the record store, and dialog state.
//!
//! Every successful mutation is followed by a full reload; nothing is patched
//! locally. Controller state lives behind a mutex that is never held across a
//! backend call.

use std::sync::Arc;

use shared::domain::{RollId, Student};
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{debug, info, warn};

use crate::{
    dialog::{Dialog, DialogSession, DialogState, EditRejected, EditorMode},
    error::SyncError,
    store::{RecordStore, StoreStatus},
    transport::{BackendError, StudentBackend},
    validator::{Field, FieldErrors, StudentDraft, StudentSubmission},
    view::{page_count, SortKey, TableView},
};

pub const FETCH_FAILED_MESSAGE: &str =
    "An error occurred while fetching students. Please ensure the backend server is running.";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save student";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete student";
pub const CREATED_MESSAGE: &str = "Student created successfully!";
pub const UPDATED_MESSAGE: &str = "Student updated successfully!";
pub const DELETED_MESSAGE: &str = "Student deleted successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    StoreChanged(StoreStatus),
    Notification(Notification),
    DialogChanged,
}

/// Everything the presentation layer may ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Refresh,
    OpenCreate,
    OpenEdit(Student),
    OpenDelete(Student),
    EditField(Field, String),
    SubmitSave(StudentDraft),
    ConfirmDelete,
    Cancel,
    ChangeSort(SortKey),
    ChangePage(usize),
    ChangePageSize(usize),
    DismissNotification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Loaded { count: usize },
    AlreadyInFlight,
}

/// Read-only copy of everything needed to render one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub status: StoreStatus,
    pub page: Vec<Student>,
    pub total: usize,
    pub page_count: usize,
    pub table: TableView,
    pub dialog: DialogState,
    pub notification: Option<Notification>,
    pub actions_enabled: bool,
}

#[derive(Default)]
struct ControllerState {
    store: RecordStore,
    table: TableView,
    dialog: Dialog,
    notification: Option<Notification>,
}

impl ControllerState {
    fn actions_enabled(&self) -> bool {
        !self.store.is_loading() && !self.dialog.state().is_submitting()
    }
}

enum Mutation {
    Create(StudentSubmission),
    Update(StudentSubmission),
}

pub struct SyncController {
    backend: Arc<dyn StudentBackend>,
    state: Mutex<ControllerState>,
    load_finished: Notify,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncController {
    pub fn new(backend: Arc<dyn StudentBackend>) -> Self {
        Self::with_table(backend, TableView::default())
    }

    pub fn with_table(backend: Arc<dyn StudentBackend>, table: TableView) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend,
            state: Mutex::new(ControllerState {
                table,
                ..ControllerState::default()
            }),
            load_finished: Notify::new(),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        let guard = self.state.lock().await;
        let records = guard.store.records();
        ViewSnapshot {
            status: guard.store.status().clone(),
            page: guard.table.apply(records),
            total: records.len(),
            page_count: page_count(records.len(), guard.table.page_size),
            table: guard.table,
            dialog: guard.dialog.state().clone(),
            notification: guard.notification.clone(),
            actions_enabled: guard.actions_enabled(),
        }
    }

    /// Looks a student up in the loaded records, ignoring the current page.
    pub async fn find_student(&self, roll: &RollId) -> Option<Student> {
        let guard = self.state.lock().await;
        guard
            .store
            .records()
            .iter()
            .find(|student| &student.roll == roll)
            .cloned()
    }

    pub async fn dispatch(&self, intent: Intent) -> Result<(), SyncError> {
        debug!(?intent, "dispatching intent");
        match intent {
            Intent::Refresh => self.refresh().await.map(|_| ()),
            Intent::OpenCreate => {
                self.open_dialog(|dialog| dialog.open_create()).await;
                Ok(())
            }
            Intent::OpenEdit(student) => {
                self.open_dialog(|dialog| dialog.open_edit(student)).await;
                Ok(())
            }
            Intent::OpenDelete(student) => {
                self.open_dialog(|dialog| dialog.open_delete(student)).await;
                Ok(())
            }
            Intent::EditField(field, value) => self.edit_field(field, value).await,
            Intent::SubmitSave(draft) => self.submit_save(draft).await,
            Intent::ConfirmDelete => self.confirm_delete().await,
            Intent::Cancel => {
                self.cancel().await;
                Ok(())
            }
            Intent::ChangeSort(key) => {
                self.state.lock().await.table.change_sort(key);
                Ok(())
            }
            Intent::ChangePage(index) => {
                self.state.lock().await.table.change_page(index);
                Ok(())
            }
            Intent::ChangePageSize(size) => {
                self.state.lock().await.table.change_page_size(size);
                Ok(())
            }
            Intent::DismissNotification => {
                self.state.lock().await.notification = None;
                Ok(())
            }
        }
    }

    /// Lists all students and replaces the store contents.
    ///
    /// A refresh requested while one is running is dropped; the running load
    /// already covers it.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SyncError> {
        let ticket = {
            let mut guard = self.state.lock().await;
            match guard.store.begin_load() {
                Some(ticket) => ticket,
                None => return Ok(RefreshOutcome::AlreadyInFlight),
            }
        };
        let _ = self.events.send(SyncEvent::StoreChanged(StoreStatus::Loading));

        let result = self.backend.list_students().await;

        let mut guard = self.state.lock().await;
        let outcome = match result {
            Ok(students) => {
                let count = students.len();
                if guard.store.load_succeeded(ticket, students) {
                    info!(count, "student list loaded");
                    let _ = self.events.send(SyncEvent::StoreChanged(StoreStatus::Loaded));
                }
                Ok(RefreshOutcome::Loaded { count })
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch students");
                if guard.store.load_failed(ticket, FETCH_FAILED_MESSAGE) {
                    let _ = self.events.send(SyncEvent::StoreChanged(StoreStatus::Error(
                        FETCH_FAILED_MESSAGE.to_string(),
                    )));
                }
                Err(SyncError::Network(FETCH_FAILED_MESSAGE.to_string()))
            }
        };
        drop(guard);
        self.load_finished.notify_waiters();
        outcome
    }

    pub async fn edit_field(&self, field: Field, value: String) -> Result<(), SyncError> {
        let mut guard = self.state.lock().await;
        guard.dialog.edit_field(field, value).map_err(|rejected| match rejected {
            EditRejected::NoEditor => SyncError::NoDialog,
            EditRejected::RollLocked => SyncError::RollIdChanged,
        })
    }

    pub async fn cancel(&self) {
        let mut guard = self.state.lock().await;
        if guard.dialog.state().is_open() {
            guard.dialog.close();
            let _ = self.events.send(SyncEvent::DialogChanged);
        }
    }

    /// Validates and submits the open create/edit dialog.
    pub async fn submit_save(&self, draft: StudentDraft) -> Result<(), SyncError> {
        let (session, mutation) = {
            let mut guard = self.state.lock().await;
            let enabled = guard.actions_enabled();
            let Some(editor) = guard.dialog.editor_mut() else {
                return Err(SyncError::NoDialog);
            };
            if !enabled {
                return Err(SyncError::Busy);
            }

            editor.draft = draft;
            editor.submit_error = None;
            let submission = match editor.draft.submission() {
                Ok(submission) => {
                    editor.errors = FieldErrors::default();
                    submission
                }
                Err(errors) => {
                    debug!(%errors, "draft rejected before submission");
                    editor.errors = errors.clone();
                    return Err(SyncError::Validation(errors));
                }
            };

            let mutation = match &editor.mode {
                EditorMode::Create => Mutation::Create(submission),
                EditorMode::Edit { original } => {
                    if submission.roll != original.roll {
                        warn!(
                            original = %original.roll,
                            submitted = %submission.roll,
                            "rejecting update that changes the roll"
                        );
                        let err = SyncError::RollIdChanged;
                        editor.submit_error = Some(err.user_message());
                        return Err(err);
                    }
                    Mutation::Update(submission)
                }
            };
            editor.submitting = true;
            (guard.dialog.session(), mutation)
        };
        let _ = self.events.send(SyncEvent::DialogChanged);

        let (result, success_message) = match &mutation {
            Mutation::Create(submission) => (
                self.backend
                    .create_student(&submission.create_request())
                    .await,
                CREATED_MESSAGE,
            ),
            Mutation::Update(submission) => (
                self.backend
                    .update_student(&submission.roll, &submission.update_request())
                    .await,
                UPDATED_MESSAGE,
            ),
        };

        match result {
            Ok(()) => {
                self.complete_mutation(session, success_message).await;
                Ok(())
            }
            Err(err) => Err(self.fail_mutation(session, err, SAVE_FAILED_MESSAGE).await),
        }
    }

    /// Deletes the student shown in the open confirmation dialog.
    pub async fn confirm_delete(&self) -> Result<(), SyncError> {
        let (session, roll) = {
            let mut guard = self.state.lock().await;
            let enabled = guard.actions_enabled();
            let Some(delete) = guard.dialog.delete_mut() else {
                return Err(SyncError::NoDialog);
            };
            if !enabled {
                return Err(SyncError::Busy);
            }
            delete.submitting = true;
            delete.error = None;
            let roll = delete.target.roll.clone();
            (guard.dialog.session(), roll)
        };
        let _ = self.events.send(SyncEvent::DialogChanged);

        match self.backend.delete_student(&roll).await {
            Ok(()) => {
                self.complete_mutation(session, DELETED_MESSAGE).await;
                Ok(())
            }
            Err(err) => Err(self.fail_mutation(session, err, DELETE_FAILED_MESSAGE).await),
        }
    }

    async fn open_dialog(&self, open: impl FnOnce(&mut Dialog) -> DialogSession) {
        let mut guard = self.state.lock().await;
        open(&mut guard.dialog);
        let _ = self.events.send(SyncEvent::DialogChanged);
    }

    async fn complete_mutation(&self, session: DialogSession, message: &'static str) {
        self.reload_after_mutation().await;

        let notification = Notification::success(message);
        let mut guard = self.state.lock().await;
        if guard.dialog.finish_submission(session, None) {
            let _ = self.events.send(SyncEvent::DialogChanged);
        }
        guard.notification = Some(notification.clone());
        drop(guard);
        info!(message, "mutation applied");
        let _ = self.events.send(SyncEvent::Notification(notification));
    }

    async fn fail_mutation(
        &self,
        session: DialogSession,
        err: BackendError,
        fallback: &'static str,
    ) -> SyncError {
        warn!(error = %err, "mutation failed");
        let message = err.server_message().unwrap_or(fallback).to_string();

        let notification = Notification::error(message.clone());
        let mut guard = self.state.lock().await;
        if guard.dialog.finish_submission(session, Some(message.clone())) {
            let _ = self.events.send(SyncEvent::DialogChanged);
        }
        guard.notification = Some(notification.clone());
        drop(guard);
        let _ = self.events.send(SyncEvent::Notification(notification));

        match err {
            BackendError::Network(_) => SyncError::Network(message),
            _ => SyncError::Server(message),
        }
    }

    /// Reloads after a mutation. If a load is already running it may have
    /// started before the mutation landed, so wait for it and load again.
    async fn reload_after_mutation(&self) {
        loop {
            let finished = self.load_finished.notified();
            match self.refresh().await {
                Ok(RefreshOutcome::AlreadyInFlight) => finished.await,
                // Refresh failures already land in the store status.
                _ => return,
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
