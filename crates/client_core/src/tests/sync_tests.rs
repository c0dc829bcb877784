use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{Branch, RollId},
    protocol::{CreateStudentRequest, UpdateStudentRequest},
};
use tokio::sync::oneshot;

use super::*;
use crate::validator::NAME_REQUIRED;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    List,
    Create(RollId),
    Update(RollId),
    Delete(RollId),
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Rejected(Option<&'static str>),
    Network,
}

impl Failure {
    fn to_error(self) -> BackendError {
        match self {
            Failure::Rejected(message) => BackendError::Rejected {
                status: 400,
                message: message.map(str::to_string),
            },
            Failure::Network => BackendError::Network("connection refused".into()),
        }
    }
}

#[derive(Default)]
struct FakeBackend {
    students: Mutex<Vec<Student>>,
    calls: Mutex<Vec<Call>>,
    list_failure: Mutex<Option<Failure>>,
    mutation_failure: Mutex<Option<Failure>>,
    list_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    mutation_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
}

impl FakeBackend {
    fn with_students(students: Vec<Student>) -> Arc<Self> {
        Arc::new(Self {
            students: Mutex::new(students),
            ..Self::default()
        })
    }

    async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn gate_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.list_gates.lock().await.push_back(rx);
        tx
    }

    async fn gate_mutation(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.mutation_gates.lock().await.push_back(rx);
        tx
    }

    async fn start_mutation(&self, call: Call) -> Result<(), BackendError> {
        self.calls.lock().await.push(call);
        let gate = self.mutation_gates.lock().await.pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match *self.mutation_failure.lock().await {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StudentBackend for FakeBackend {
    async fn list_students(&self) -> Result<Vec<Student>, BackendError> {
        self.calls.lock().await.push(Call::List);
        let gate = self.list_gates.lock().await.pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(failure) = *self.list_failure.lock().await {
            return Err(failure.to_error());
        }
        Ok(self.students.lock().await.clone())
    }

    async fn create_student(&self, request: &CreateStudentRequest) -> Result<(), BackendError> {
        self.start_mutation(Call::Create(request.roll.clone()))
            .await?;
        self.students.lock().await.push(Student {
            id: None,
            roll: request.roll.clone(),
            name: request.name.clone(),
            branch: request.branch,
            gpa: request.gpa,
        });
        Ok(())
    }

    async fn update_student(
        &self,
        roll: &RollId,
        request: &UpdateStudentRequest,
    ) -> Result<(), BackendError> {
        self.start_mutation(Call::Update(roll.clone())).await?;
        let mut students = self.students.lock().await;
        if let Some(student) = students.iter_mut().find(|s| &s.roll == roll) {
            student.name = request.name.clone();
            student.branch = request.branch;
            student.gpa = request.gpa;
        }
        Ok(())
    }

    async fn delete_student(&self, roll: &RollId) -> Result<(), BackendError> {
        self.start_mutation(Call::Delete(roll.clone())).await?;
        self.students.lock().await.retain(|s| &s.roll != roll);
        Ok(())
    }
}

fn student(roll: &str, name: &str, gpa: f64) -> Student {
    Student::new(roll, name, Branch::Cse, gpa)
}

fn draft(roll: &str, name: &str, branch: &str, gpa: &str) -> StudentDraft {
    StudentDraft {
        roll: roll.into(),
        name: name.into(),
        branch: branch.into(),
        gpa: gpa.into(),
    }
}

async fn loaded_controller(students: Vec<Student>) -> (Arc<SyncController>, Arc<FakeBackend>) {
    let backend = FakeBackend::with_students(students);
    let controller = Arc::new(SyncController::new(backend.clone()));
    controller.refresh().await.expect("initial load");
    backend.calls.lock().await.clear();
    (controller, backend)
}

async fn wait_until(controller: &SyncController, cond: impl Fn(&ViewSnapshot) -> bool) {
    for _ in 0..400 {
        if cond(&controller.snapshot().await) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("controller never reached the expected state");
}

async fn wait_for_calls(backend: &FakeBackend, count: usize) {
    for _ in 0..400 {
        if backend.calls().await.len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("backend never saw {count} calls");
}

#[tokio::test]
async fn refresh_loads_backend_records() {
    let backend = FakeBackend::with_students(vec![student("U001", "A", 8.5)]);
    let controller = SyncController::new(backend.clone());
    assert_eq!(controller.snapshot().await.status, StoreStatus::Idle);

    let outcome = controller.refresh().await.expect("refresh");
    assert_eq!(outcome, RefreshOutcome::Loaded { count: 1 });

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.status, StoreStatus::Loaded);
    assert_eq!(snapshot.page, vec![student("U001", "A", 8.5)]);
    assert_eq!(snapshot.total, 1);
}

#[tokio::test]
async fn refresh_failure_keeps_records_and_shows_banner() {
    let (controller, backend) = loaded_controller(vec![student("U001", "A", 8.5)]).await;
    *backend.list_failure.lock().await = Some(Failure::Network);

    let err = controller.refresh().await.expect_err("fails");
    assert!(matches!(err, SyncError::Network(ref m) if m == FETCH_FAILED_MESSAGE));

    let snapshot = controller.snapshot().await;
    assert_eq!(
        snapshot.status,
        StoreStatus::Error(FETCH_FAILED_MESSAGE.to_string())
    );
    assert_eq!(snapshot.total, 1);

    *backend.list_failure.lock().await = None;
    controller.dispatch(Intent::Refresh).await.expect("retry");
    assert_eq!(controller.snapshot().await.status, StoreStatus::Loaded);
}

#[tokio::test]
async fn overlapping_refresh_is_dropped() {
    let backend = FakeBackend::with_students(vec![student("U001", "A", 8.5)]);
    let controller = Arc::new(SyncController::new(backend.clone()));
    let release = backend.gate_list().await;

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.refresh().await }
    });
    wait_until(&controller, |s| s.status == StoreStatus::Loading).await;
    assert!(!controller.snapshot().await.actions_enabled);

    let second = controller.refresh().await.expect("second");
    assert_eq!(second, RefreshOutcome::AlreadyInFlight);

    release.send(()).expect("release");
    let first = first.await.expect("join").expect("first");
    assert_eq!(first, RefreshOutcome::Loaded { count: 1 });
    assert_eq!(backend.calls().await, vec![Call::List]);
}

#[tokio::test]
async fn create_with_missing_name_never_reaches_backend() {
    let (controller, backend) = loaded_controller(Vec::new()).await;
    controller.dispatch(Intent::OpenCreate).await.expect("open");

    let err = controller
        .dispatch(Intent::SubmitSave(draft("U002", "  ", "CSE", "7.5")))
        .await
        .expect_err("invalid");
    let SyncError::Validation(errors) = err else {
        panic!("validation error expected");
    };
    assert_eq!(errors.get(Field::Name), Some(NAME_REQUIRED));
    assert!(backend.calls().await.is_empty());

    let DialogState::Editor(editor) = controller.snapshot().await.dialog else {
        panic!("dialog should stay open");
    };
    assert!(editor.errors.contains(Field::Name));
    assert_eq!(editor.draft.roll, "U002");
}

#[tokio::test]
async fn create_mutates_then_lists_then_closes_with_notification() {
    let (controller, backend) = loaded_controller(Vec::new()).await;
    let mut events = controller.subscribe_events();
    controller.dispatch(Intent::OpenCreate).await.expect("open");

    controller
        .dispatch(Intent::SubmitSave(draft(" U002 ", " Priya ", "ECE", "9.1")))
        .await
        .expect("create");

    assert_eq!(
        backend.calls().await,
        vec![Call::Create(RollId::new("U002")), Call::List]
    );
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.dialog, DialogState::Closed);
    assert_eq!(snapshot.page.len(), 1);
    assert_eq!(snapshot.page[0].name, "Priya");
    assert_eq!(
        snapshot.notification,
        Some(Notification::success(CREATED_MESSAGE))
    );

    let mut saw_success = false;
    while let Ok(event) = events.try_recv() {
        if event == SyncEvent::Notification(Notification::success(CREATED_MESSAGE)) {
            saw_success = true;
        }
    }
    assert!(saw_success);

    controller
        .dispatch(Intent::DismissNotification)
        .await
        .expect("dismiss");
    assert_eq!(controller.snapshot().await.notification, None);
}

#[tokio::test]
async fn update_keys_by_original_roll_and_reloads() {
    let original = student("U001", "Raj", 8.0);
    let (controller, backend) = loaded_controller(vec![original.clone()]).await;
    controller
        .dispatch(Intent::OpenEdit(original))
        .await
        .expect("open");
    controller
        .dispatch(Intent::EditField(Field::Name, "Raj Kumar".into()))
        .await
        .expect("edit");

    let DialogState::Editor(editor) = controller.snapshot().await.dialog else {
        panic!("editor expected");
    };
    controller
        .dispatch(Intent::SubmitSave(editor.draft))
        .await
        .expect("update");

    assert_eq!(
        backend.calls().await,
        vec![Call::Update(RollId::new("U001")), Call::List]
    );
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.page[0].name, "Raj Kumar");
    assert_eq!(
        snapshot.notification,
        Some(Notification::success(UPDATED_MESSAGE))
    );
}

#[tokio::test]
async fn update_that_changes_roll_is_rejected_locally() {
    let original = student("U001", "Raj", 8.0);
    let (controller, backend) = loaded_controller(vec![original.clone()]).await;
    controller
        .dispatch(Intent::OpenEdit(original))
        .await
        .expect("open");

    let err = controller
        .dispatch(Intent::EditField(Field::Roll, "U999".into()))
        .await
        .expect_err("roll locked");
    assert!(matches!(err, SyncError::RollIdChanged));

    let err = controller
        .dispatch(Intent::SubmitSave(draft("U999", "Raj", "CSE", "8")))
        .await
        .expect_err("changed roll");
    assert!(matches!(err, SyncError::RollIdChanged));
    assert!(backend.calls().await.is_empty());
    assert!(controller.snapshot().await.dialog.error().is_some());
}

#[tokio::test]
async fn delete_rejected_by_backend_keeps_dialog_and_records() {
    let target = student("U001", "Raj", 8.0);
    let (controller, backend) = loaded_controller(vec![target.clone()]).await;
    *backend.mutation_failure.lock().await = Some(Failure::Rejected(Some("not found")));

    controller
        .dispatch(Intent::OpenDelete(target.clone()))
        .await
        .expect("open");
    let err = controller
        .dispatch(Intent::ConfirmDelete)
        .await
        .expect_err("rejected");
    assert!(matches!(err, SyncError::Server(ref m) if m == "not found"));

    let snapshot = controller.snapshot().await;
    let DialogState::ConfirmDelete(delete) = &snapshot.dialog else {
        panic!("delete dialog should stay open");
    };
    assert_eq!(delete.error.as_deref(), Some("not found"));
    assert!(!delete.submitting);
    assert_eq!(snapshot.page, vec![target]);
    assert_eq!(backend.calls().await, vec![Call::Delete(RollId::new("U001"))]);
    assert_eq!(
        snapshot.notification.map(|n| n.severity),
        Some(Severity::Error)
    );
}

#[tokio::test]
async fn failures_without_server_message_use_generic_text() {
    let (controller, backend) = loaded_controller(Vec::new()).await;

    *backend.mutation_failure.lock().await = Some(Failure::Rejected(None));
    controller.dispatch(Intent::OpenCreate).await.expect("open");
    let err = controller
        .dispatch(Intent::SubmitSave(draft("U1", "A", "IT", "5")))
        .await
        .expect_err("rejected");
    assert!(matches!(err, SyncError::Server(ref m) if m == SAVE_FAILED_MESSAGE));

    *backend.mutation_failure.lock().await = Some(Failure::Network);
    let err = controller
        .dispatch(Intent::SubmitSave(draft("U1", "A", "IT", "5")))
        .await
        .expect_err("offline");
    assert!(matches!(err, SyncError::Network(ref m) if m == SAVE_FAILED_MESSAGE));

    let DialogState::Editor(editor) = controller.snapshot().await.dialog else {
        panic!("editor should stay open");
    };
    assert_eq!(editor.draft, draft("U1", "A", "IT", "5"));
    assert_eq!(editor.submit_error.as_deref(), Some(SAVE_FAILED_MESSAGE));
}

#[tokio::test]
async fn cancel_discards_dialog_and_actions_need_an_open_dialog() {
    let (controller, backend) = loaded_controller(vec![student("U001", "Raj", 8.0)]).await;
    controller.dispatch(Intent::OpenCreate).await.expect("open");
    controller.dispatch(Intent::Cancel).await.expect("cancel");
    assert_eq!(controller.snapshot().await.dialog, DialogState::Closed);

    assert!(matches!(
        controller.dispatch(Intent::ConfirmDelete).await,
        Err(SyncError::NoDialog)
    ));
    assert!(matches!(
        controller
            .dispatch(Intent::SubmitSave(draft("U2", "B", "CE", "4")))
            .await,
        Err(SyncError::NoDialog)
    ));
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn save_is_refused_while_loading() {
    let backend = FakeBackend::with_students(Vec::new());
    let controller = Arc::new(SyncController::new(backend.clone()));
    let release = backend.gate_list().await;
    let load = tokio::spawn({
        let controller = controller.clone();
        async move { controller.refresh().await }
    });
    wait_until(&controller, |s| s.status == StoreStatus::Loading).await;

    controller.dispatch(Intent::OpenCreate).await.expect("open");
    let err = controller
        .dispatch(Intent::SubmitSave(draft("U1", "A", "CSE", "5")))
        .await
        .expect_err("busy");
    assert!(matches!(err, SyncError::Busy));

    release.send(()).expect("release");
    load.await.expect("join").expect("load");
    assert_eq!(backend.calls().await, vec![Call::List]);
}

#[tokio::test]
async fn late_result_does_not_touch_a_newer_dialog() {
    let target = student("U001", "Raj", 8.0);
    let (controller, backend) = loaded_controller(vec![target.clone()]).await;
    let release = backend.gate_mutation().await;

    controller
        .dispatch(Intent::OpenDelete(target))
        .await
        .expect("open");
    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.confirm_delete().await }
    });
    wait_for_calls(&backend, 1).await;

    controller.dispatch(Intent::Cancel).await.expect("cancel");
    controller.dispatch(Intent::OpenCreate).await.expect("reopen");

    release.send(()).expect("release");
    pending.await.expect("join").expect("delete");

    let snapshot = controller.snapshot().await;
    let DialogState::Editor(editor) = snapshot.dialog else {
        panic!("the new create dialog must survive");
    };
    assert_eq!(editor.mode, EditorMode::Create);
    assert_eq!(snapshot.total, 0);
}

#[tokio::test]
async fn mutation_reloads_again_after_an_overlapping_refresh() {
    let target = student("U001", "Raj", 8.0);
    let (controller, backend) = loaded_controller(vec![target.clone()]).await;
    let release_delete = backend.gate_mutation().await;

    controller
        .dispatch(Intent::OpenDelete(target))
        .await
        .expect("open");
    let delete = tokio::spawn({
        let controller = controller.clone();
        async move { controller.confirm_delete().await }
    });
    wait_for_calls(&backend, 1).await;

    let release_list = backend.gate_list().await;
    let refresh = tokio::spawn({
        let controller = controller.clone();
        async move { controller.refresh().await }
    });
    wait_for_calls(&backend, 2).await;

    release_delete.send(()).expect("release delete");
    tokio::time::sleep(Duration::from_millis(20)).await;
    release_list.send(()).expect("release list");

    refresh.await.expect("join").expect("refresh");
    delete.await.expect("join").expect("delete");

    assert_eq!(
        backend.calls().await,
        vec![Call::Delete(RollId::new("U001")), Call::List, Call::List]
    );
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.total, 0);
    assert_eq!(snapshot.dialog, DialogState::Closed);
}

#[tokio::test]
async fn table_intents_drive_the_snapshot_page() {
    let students: Vec<_> = (0..12)
        .map(|i| student(&format!("U{i:03}"), "x", i as f64 / 2.0))
        .collect();
    let (controller, _backend) = loaded_controller(students).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.page.len(), 5);
    assert_eq!(snapshot.page_count, 3);

    controller.dispatch(Intent::ChangePage(2)).await.expect("page");
    assert_eq!(controller.snapshot().await.page.len(), 2);

    controller.dispatch(Intent::ChangePage(3)).await.expect("page");
    assert!(controller.snapshot().await.page.is_empty());

    controller
        .dispatch(Intent::ChangePageSize(10))
        .await
        .expect("size");
    controller
        .dispatch(Intent::ChangeSort(SortKey::Gpa))
        .await
        .expect("sort");
    controller
        .dispatch(Intent::ChangeSort(SortKey::Gpa))
        .await
        .expect("sort");
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.table.page_index, 0);
    assert_eq!(snapshot.page.len(), 10);
    assert_eq!(snapshot.page[0].roll.as_str(), "U011");
}

#[tokio::test]
async fn find_student_searches_beyond_the_visible_page() {
    let students: Vec<_> = (0..8)
        .map(|i| student(&format!("U{i:03}"), "x", 5.0))
        .collect();
    let (controller, _backend) = loaded_controller(students).await;

    let found = controller.find_student(&RollId::new("U007")).await;
    assert_eq!(found.map(|s| s.roll), Some(RollId::new("U007")));
    assert!(controller.find_student(&RollId::new("nope")).await.is_none());
}

#[tokio::test]
async fn editing_fields_needs_an_editor_not_a_delete_dialog() {
    let target = student("U001", "Raj", 8.0);
    let (controller, backend) = loaded_controller(vec![target.clone()]).await;

    let err = controller
        .dispatch(Intent::EditField(Field::Name, "x".into()))
        .await
        .expect_err("nothing open");
    assert!(matches!(err, SyncError::NoDialog));

    controller
        .dispatch(Intent::OpenDelete(target.clone()))
        .await
        .expect("open");
    let err = controller
        .dispatch(Intent::EditField(Field::Name, "x".into()))
        .await
        .expect_err("delete dialog has no fields");
    assert!(matches!(err, SyncError::NoDialog));

    let DialogState::ConfirmDelete(delete) = controller.snapshot().await.dialog else {
        panic!("delete dialog should be untouched");
    };
    assert_eq!(delete.target, target);
    assert!(backend.calls().await.is_empty());
}
