use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{Branch, RollId, ServerId, Student};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentFields {
    pub name: String,
    pub branch: Branch,
    pub gpa: f64,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // A pooled in-memory database would give every connection its own empty schema.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Students in insertion order.
    pub async fn list_students(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query("SELECT id, roll, name, branch, gpa FROM students ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .context("failed to list students")?;
        rows.iter().map(student_from_row).collect()
    }

    pub async fn student_by_roll(&self, roll: &RollId) -> Result<Option<Student>> {
        let row = sqlx::query("SELECT id, roll, name, branch, gpa FROM students WHERE roll = ?")
            .bind(roll.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load student {roll}"))?;
        row.as_ref().map(student_from_row).transpose()
    }

    /// Returns `None` when a student with the same roll already exists.
    pub async fn insert_student(
        &self,
        roll: &RollId,
        fields: &StudentFields,
    ) -> Result<Option<Student>> {
        let id = ServerId::generate();
        let row = sqlx::query(
            "INSERT INTO students (id, roll, name, branch, gpa) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(roll) DO NOTHING
             RETURNING id, roll, name, branch, gpa",
        )
        .bind(id.as_str())
        .bind(roll.as_str())
        .bind(&fields.name)
        .bind(fields.branch.as_str())
        .bind(fields.gpa)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to insert student {roll}"))?;
        row.as_ref().map(student_from_row).transpose()
    }

    /// Returns `None` when no student has this roll.
    pub async fn update_student(
        &self,
        roll: &RollId,
        fields: &StudentFields,
    ) -> Result<Option<Student>> {
        let row = sqlx::query(
            "UPDATE students SET name = ?, branch = ?, gpa = ? WHERE roll = ?
             RETURNING id, roll, name, branch, gpa",
        )
        .bind(&fields.name)
        .bind(fields.branch.as_str())
        .bind(fields.gpa)
        .bind(roll.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update student {roll}"))?;
        row.as_ref().map(student_from_row).transpose()
    }

    pub async fn delete_student(&self, roll: &RollId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE roll = ?")
            .bind(roll.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete student {roll}"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn student_from_row(row: &SqliteRow) -> Result<Student> {
    let branch: String = row.try_get("branch")?;
    Ok(Student {
        id: Some(ServerId(row.try_get("id")?)),
        roll: RollId(row.try_get("roll")?),
        name: row.try_get("name")?,
        branch: branch
            .parse()
            .with_context(|| format!("stored student has invalid branch '{branch}'"))?,
        gpa: row.try_get("gpa")?,
    })
}

/// Creates the directory holding a file-backed SQLite database.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
