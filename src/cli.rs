use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "studytrack",
    version,
    about = "Track study tasks grouped by subject with SQLite"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "SQLite database file (defaults to STUDYTRACK_DB or ~/.studytrack/studytrack.db)"
    )]
    pub db: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Subject(SubjectCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    Board(Board),
}

#[derive(Subcommand, Debug)]
pub enum SubjectCommand {
    Add(SubjectAdd),
    List(SubjectList),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    Add(TaskAdd),
    List(TaskList),
    Show(TaskShow),
    Edit(TaskEdit),
    Done(TaskDone),
    Reopen(TaskReopen),
    Remove(TaskRemove),
}

#[derive(Args, Debug)]
pub struct SubjectAdd {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct SubjectList {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TaskAdd {
    #[arg(value_name = "SUBJECT_ID", help = "Subject ID (an empty value adds nothing)")]
    pub subject_id: String,
    pub name: String,
}

#[derive(Args, Debug)]
pub struct TaskList {
    #[arg(long, value_enum, default_value = "all")]
    pub status: TaskStatusArg,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TaskShow {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct TaskEdit {
    pub id: i64,
    #[arg(long, help = "New name (empty keeps the current name)")]
    pub name: Option<String>,
    #[arg(long, value_name = "ID", help = "New subject ID (empty keeps the current subject)")]
    pub subject: Option<String>,
}

#[derive(Args, Debug)]
pub struct TaskDone {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct TaskReopen {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct TaskRemove {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct Board {
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum TaskStatusArg {
    All,
    Pending,
    Completed,
}
