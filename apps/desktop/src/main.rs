use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    config::load_settings, view::PAGE_SIZE_OPTIONS, HttpStudentBackend, Intent, Severity, SortDirection, SortKey,
    StoreStatus, StudentDraft, SyncController, SyncError, TableView, ViewSnapshot,
};
use shared::domain::{RollId, Student};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides the configured backend base URL.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long, value_enum, default_value_t = SortArg::Roll)]
        sort: SortArg,
        #[arg(long)]
        desc: bool,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, value_parser = parse_page_size)]
        page_size: Option<usize>,
    },
    Add {
        #[arg(long)]
        roll: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "CSE")]
        branch: String,
        #[arg(long)]
        gpa: String,
    },
    Edit {
        roll: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        gpa: Option<String>,
    },
    Delete {
        roll: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Roll,
    Name,
    Branch,
    Gpa,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Roll => SortKey::Roll,
            SortArg::Name => SortKey::Name,
            SortArg::Branch => SortKey::Branch,
            SortArg::Gpa => SortKey::Gpa,
        }
    }
}

fn parse_page_size(raw: &str) -> Result<usize, String> {
    let size: usize = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a page size"))?;
    if PAGE_SIZE_OPTIONS.contains(&size) {
        Ok(size)
    } else {
        Err(format!("page size must be one of {PAGE_SIZE_OPTIONS:?}"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    let backend = HttpStudentBackend::from_settings(&settings)?;
    let controller = SyncController::with_table(
        Arc::new(backend),
        TableView::with_page_size(settings.page_size),
    );

    if let Err(err) = controller.refresh().await {
        bail!("{}", err.user_message());
    }

    match args.command {
        Command::List {
            sort,
            desc,
            page,
            page_size,
        } => {
            if let Some(size) = page_size {
                controller.dispatch(Intent::ChangePageSize(size)).await?;
            }
            let key = SortKey::from(sort);
            let direction = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            // A header click selects a column ascending, a second click flips it.
            for _ in 0..2 {
                let table = controller.snapshot().await.table;
                if table.sort_key == key && table.sort_direction == direction {
                    break;
                }
                controller.dispatch(Intent::ChangeSort(key)).await?;
            }
            controller
                .dispatch(Intent::ChangePage(page.saturating_sub(1)))
                .await?;
            print_table(&controller.snapshot().await);
        }
        Command::Add {
            roll,
            name,
            branch,
            gpa,
        } => {
            controller.dispatch(Intent::OpenCreate).await?;
            let draft = StudentDraft {
                roll,
                name,
                branch,
                gpa,
            };
            submit(&controller, Intent::SubmitSave(draft)).await?;
        }
        Command::Edit {
            roll,
            name,
            branch,
            gpa,
        } => {
            let student = lookup(&controller, &roll).await?;
            let mut draft = StudentDraft::from_student(&student);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(branch) = branch {
                draft.branch = branch;
            }
            if let Some(gpa) = gpa {
                draft.gpa = gpa;
            }
            controller.dispatch(Intent::OpenEdit(student)).await?;
            submit(&controller, Intent::SubmitSave(draft)).await?;
        }
        Command::Delete { roll } => {
            let student = lookup(&controller, &roll).await?;
            controller.dispatch(Intent::OpenDelete(student)).await?;
            submit(&controller, Intent::ConfirmDelete).await?;
        }
    }

    Ok(())
}

async fn lookup(controller: &SyncController, roll: &str) -> Result<Student> {
    controller
        .find_student(&RollId::new(roll.trim()))
        .await
        .ok_or_else(|| anyhow!("no student with roll {roll}"))
}

async fn submit(controller: &SyncController, intent: Intent) -> Result<()> {
    match controller.dispatch(intent).await {
        Ok(()) => {
            let snapshot = controller.snapshot().await;
            if let Some(notification) = &snapshot.notification {
                if notification.severity == Severity::Success {
                    println!("{}", notification.message);
                }
            }
            if let StoreStatus::Error(message) = &snapshot.status {
                eprintln!("warning: {message}");
            }
            Ok(())
        }
        Err(SyncError::Validation(errors)) => {
            for (field, message) in errors.iter() {
                eprintln!("{}: {message}", field.as_str());
            }
            bail!("student not saved");
        }
        Err(err) => bail!("{}", err.user_message()),
    }
}

fn print_table(snapshot: &ViewSnapshot) {
    println!("{:<10} {:<24} {:<6} {:>5}", "ROLL", "NAME", "BRANCH", "GPA");
    for student in &snapshot.page {
        println!(
            "{:<10} {:<24} {:<6} {:>5.2}",
            student.roll.as_str(),
            student.name,
            student.branch.as_str(),
            student.gpa
        );
    }
    let table = snapshot.table;
    println!(
        "page {} of {} ({} students, sorted by {} {})",
        table.page_index + 1,
        snapshot.page_count.max(1),
        snapshot.total,
        table.sort_key.as_str(),
        match table.sort_direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_must_be_an_offered_option() {
        assert_eq!(parse_page_size("25"), Ok(25));
        assert!(parse_page_size("7").is_err());
        assert!(parse_page_size("0").is_err());
        assert!(parse_page_size("ten").is_err());
    }

    #[test]
    fn list_flags_parse() {
        let args = Args::try_parse_from([
            "desktop",
            "list",
            "--sort",
            "gpa",
            "--desc",
            "--page-size",
            "10",
        ])
        .expect("args");
        let Command::List {
            sort,
            desc,
            page,
            page_size,
        } = args.command
        else {
            panic!("list expected");
        };
        assert_eq!(SortKey::from(sort), SortKey::Gpa);
        assert!(desc);
        assert_eq!(page, 1);
        assert_eq!(page_size, Some(10));
        assert!(Args::try_parse_from(["desktop", "list", "--page-size", "3"]).is_err());
    }
}
