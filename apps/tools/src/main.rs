use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::domain::{Branch, RollId};
use storage::{Storage, StudentFields};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/students.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert the sample students, skipping rolls that already exist.
    Seed,
    /// Print every stored student.
    List,
}

const SAMPLE_STUDENTS: [(&str, &str, Branch, f64); 5] = [
    ("2024001", "Raj Kumar", Branch::Cse, 3.8),
    ("2024002", "Priya Singh", Branch::Ece, 3.9),
    ("2024003", "Amit Patel", Branch::Me, 3.7),
    ("2024004", "Neha Gupta", Branch::Cse, 3.95),
    ("2024005", "Vikram Sharma", Branch::Ece, 3.6),
];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Seed => {
            let mut created = 0;
            for (roll, name, branch, gpa) in SAMPLE_STUDENTS {
                let fields = StudentFields {
                    name: name.to_string(),
                    branch,
                    gpa,
                };
                match storage.insert_student(&RollId::new(roll), &fields).await? {
                    Some(student) => {
                        created += 1;
                        println!(
                            "created {} ({}) roll={}",
                            student.name, student.branch, student.roll
                        );
                    }
                    None => println!("skipped roll={roll}: already exists"),
                }
            }
            println!("seeded {created} of {} students", SAMPLE_STUDENTS.len());
        }
        Command::List => {
            let students = storage.list_students().await?;
            for student in &students {
                println!(
                    "{:<10} {:<24} {:<6} {:.2}",
                    student.roll.as_str(),
                    student.name,
                    student.branch.as_str(),
                    student.gpa
                );
            }
            println!("{} students", students.len());
        }
    }

    Ok(())
}
