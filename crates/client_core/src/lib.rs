//! Client-side view state for the student roster: form validation, table
//! sorting and paging, the record store, and the controller that keeps it in
//! sync with the REST backend.

pub mod config;
pub mod dialog;
pub mod error;
pub mod store;
pub mod sync;
pub mod transport;
pub mod validator;
pub mod view;

pub use config::ClientSettings;
pub use dialog::{DeleteDialog, DialogState, EditRejected, EditorDialog, EditorMode};
pub use error::SyncError;
pub use store::{RecordStore, StoreStatus};
pub use sync::{
    Intent, Notification, RefreshOutcome, Severity, SyncController, SyncEvent, ViewSnapshot,
};
pub use transport::{BackendError, HttpStudentBackend, StudentBackend};
pub use validator::{validate, Field, FieldErrors, StudentDraft, StudentSubmission};
pub use view::{SortDirection, SortKey, TableView};
