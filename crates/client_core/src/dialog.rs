//! Create/edit and delete-confirmation dialog state.
//!
//! `Closed -> Open(draft) -> Submitting -> Closed | Open(error)`. Every time a
//! dialog opens it gets a new session number so a submission that finishes
//! after its dialog went away can be told apart from the current one.

use shared::domain::Student;

use crate::validator::{Field, FieldErrors, StudentDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogSession(u64);

/// Why a field edit was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditRejected {
    NoEditor,
    RollLocked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorMode {
    Create,
    Edit { original: Student },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorDialog {
    pub mode: EditorMode,
    pub draft: StudentDraft,
    pub errors: FieldErrors,
    pub submit_error: Option<String>,
    pub submitting: bool,
}

impl EditorDialog {
    /// The roll cannot be edited once a record is selected for edit.
    pub fn roll_editable(&self) -> bool {
        matches!(self.mode, EditorMode::Create)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteDialog {
    pub target: Student,
    pub error: Option<String>,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    Editor(EditorDialog),
    ConfirmDelete(DeleteDialog),
}

impl DialogState {
    pub fn is_open(&self) -> bool {
        !matches!(self, DialogState::Closed)
    }

    pub fn is_submitting(&self) -> bool {
        match self {
            DialogState::Closed => false,
            DialogState::Editor(editor) => editor.submitting,
            DialogState::ConfirmDelete(delete) => delete.submitting,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            DialogState::Closed => None,
            DialogState::Editor(editor) => editor.submit_error.as_deref(),
            DialogState::ConfirmDelete(delete) => delete.error.as_deref(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Dialog {
    state: DialogState,
    session: u64,
}

impl Dialog {
    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn session(&self) -> DialogSession {
        DialogSession(self.session)
    }

    pub fn is_current(&self, session: DialogSession) -> bool {
        self.state.is_open() && session.0 == self.session
    }

    pub fn open_create(&mut self) -> DialogSession {
        self.open(DialogState::Editor(EditorDialog {
            mode: EditorMode::Create,
            draft: StudentDraft::for_create(),
            errors: FieldErrors::default(),
            submit_error: None,
            submitting: false,
        }))
    }

    pub fn open_edit(&mut self, student: Student) -> DialogSession {
        self.open(DialogState::Editor(EditorDialog {
            mode: EditorMode::Edit {
                original: student.clone(),
            },
            draft: StudentDraft::from_student(&student),
            errors: FieldErrors::default(),
            submit_error: None,
            submitting: false,
        }))
    }

    pub fn open_delete(&mut self, student: Student) -> DialogSession {
        self.open(DialogState::ConfirmDelete(DeleteDialog {
            target: student,
            error: None,
            submitting: false,
        }))
    }

    /// Closes whatever is open and drops the draft.
    pub fn close(&mut self) {
        self.state = DialogState::Closed;
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorDialog> {
        match &mut self.state {
            DialogState::Editor(editor) => Some(editor),
            _ => None,
        }
    }

    pub fn delete_mut(&mut self) -> Option<&mut DeleteDialog> {
        match &mut self.state {
            DialogState::ConfirmDelete(delete) => Some(delete),
            _ => None,
        }
    }

    pub fn edit_field(
        &mut self,
        field: Field,
        value: impl Into<String>,
    ) -> Result<(), EditRejected> {
        let Some(editor) = self.editor_mut() else {
            return Err(EditRejected::NoEditor);
        };
        if field == Field::Roll && !editor.roll_editable() {
            return Err(EditRejected::RollLocked);
        }
        editor.draft.set(field, value);
        editor.errors.clear(field);
        Ok(())
    }

    /// Settles a finished submission; `false` if the dialog it belonged to is gone.
    pub fn finish_submission(&mut self, session: DialogSession, error: Option<String>) -> bool {
        if !self.is_current(session) {
            return false;
        }
        match error {
            None => self.close(),
            Some(message) => match &mut self.state {
                DialogState::Editor(editor) => {
                    editor.submitting = false;
                    editor.submit_error = Some(message);
                }
                DialogState::ConfirmDelete(delete) => {
                    delete.submitting = false;
                    delete.error = Some(message);
                }
                DialogState::Closed => {}
            },
        }
        true
    }

    fn open(&mut self, state: DialogState) -> DialogSession {
        self.session += 1;
        self.state = state;
        self.session()
    }
}

#[cfg(test)]
#[path = "tests/dialog_tests.rs"]
mod tests;
