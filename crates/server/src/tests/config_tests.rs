use super::{apply_file_overrides, normalize_database_url, prepare_database_url, Settings};

use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn empty_database_url_falls_back_to_default() {
    assert_eq!(normalize_database_url("   "), Settings::default().database_url);
}

#[test]
fn keeps_in_memory_url_untouched() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn creates_parent_dir_for_relative_sqlite_url() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("student_roster_server_test_{suffix}"));
    let db_path = temp_root.join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.join("data").exists());

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn file_overrides_bind_and_database() {
    let mut settings = Settings::default();
    apply_file_overrides(
        &mut settings,
        r#"
bind_addr = "0.0.0.0:9000"
database_url = "sqlite://./other.db"
"#,
    );
    assert_eq!(
        settings,
        Settings {
            server_bind: "0.0.0.0:9000".into(),
            database_url: "sqlite://./other.db".into(),
        }
    );
}

#[test]
fn malformed_file_is_ignored() {
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, "bind_addr = 8000");
    assert_eq!(settings, Settings::default());
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("student_roster_server_open_test_{suffix}"));
    let db_path = temp_root.join("nested").join("students.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should be created: {}",
        db_path.display()
    );

    fs::remove_dir_all(temp_root).expect("cleanup");
}
