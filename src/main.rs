mod cli;
mod config;
mod db;
mod entities;
mod error;
mod model;
mod store;
mod sync;
mod util;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    Board, Cli, Command, SubjectAdd, SubjectCommand, SubjectList, TaskAdd, TaskCommand, TaskDone,
    TaskEdit, TaskList, TaskRemove, TaskReopen, TaskShow, TaskStatusArg,
};
use crate::config::Config;
use crate::error::AppError;
use crate::model::TaskFilter;
use crate::store::SqliteStore;
use crate::sync::Tracker;
use crate::util::{format_board, format_subject_list, format_task_detail, format_task_list, BoardJson};

type App = Tracker<SqliteStore>;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config::log_filter()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<(), AppError> {
    let Cli { db: db_flag, command } = Cli::parse();
    let config = Config::resolve(db_flag)?;
    db::ensure_parent_dir(&config.db_path)?;
    let mut lock = db::open_lock(&config.db_path)?;
    let _guard = lock.write()?;

    let conn = db::connect(&config.db_path).await?;
    db::ensure_schema(&conn).await?;
    let mut app = Tracker::new(SqliteStore::new(conn));
    app.load().await?;
    tracing::debug!(
        db = %config.db_path.display(),
        loaded = app.is_loaded(),
        "tracker ready"
    );

    match command {
        Command::Subject(command) => handle_subject(&mut app, command).await,
        Command::Task(command) => handle_task(&mut app, command).await,
        Command::Board(args) => handle_board(&app, args),
    }
}

async fn handle_subject(app: &mut App, command: SubjectCommand) -> Result<(), AppError> {
    match command {
        SubjectCommand::Add(args) => handle_subject_add(app, args).await,
        SubjectCommand::List(args) => handle_subject_list(app, args),
    }
}

async fn handle_task(app: &mut App, command: TaskCommand) -> Result<(), AppError> {
    match command {
        TaskCommand::Add(args) => handle_task_add(app, args).await,
        TaskCommand::List(args) => handle_task_list(app, args),
        TaskCommand::Show(args) => handle_task_show(app, args),
        TaskCommand::Edit(args) => handle_task_edit(app, args).await,
        TaskCommand::Done(args) => handle_task_done(app, args).await,
        TaskCommand::Reopen(args) => handle_task_reopen(app, args).await,
        TaskCommand::Remove(args) => handle_task_remove(app, args).await,
    }
}

async fn handle_subject_add(app: &mut App, args: SubjectAdd) -> Result<(), AppError> {
    match app.add_subject(&args.name).await? {
        Some(subject) => println!(
            "Created subject ID: {}: {} ({})",
            subject.id, subject.name, subject.color
        ),
        None => println!("No changes: subject name is empty."),
    }
    Ok(())
}

fn handle_subject_list(app: &App, args: SubjectList) -> Result<(), AppError> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(app.subjects())?);
        return Ok(());
    }
    println!("{}", format_subject_list(app.subjects(), app.tasks()));
    Ok(())
}

async fn handle_task_add(app: &mut App, args: TaskAdd) -> Result<(), AppError> {
    let subject_id = parse_optional_id("subject id", &args.subject_id)?;
    match app.add_task(&args.name, subject_id).await? {
        Some(task) => println!("Created task ID: {}: {}", task.id, task.name),
        None => println!("No changes: task needs a name and an existing subject."),
    }
    Ok(())
}

fn handle_task_list(app: &App, args: TaskList) -> Result<(), AppError> {
    let tasks = app.tasks_by(task_filter_from_arg(args.status));
    if args.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    println!("{}", format_task_list(&tasks, |task| app.subject_of(task)));
    Ok(())
}

fn handle_task_show(app: &App, args: TaskShow) -> Result<(), AppError> {
    let task = app
        .task(args.id)
        .ok_or_else(|| AppError::NotFound(format!("task id {}", args.id)))?;
    println!("{}", format_task_detail(task, app.subject_of(task)));
    Ok(())
}

async fn handle_task_edit(app: &mut App, args: TaskEdit) -> Result<(), AppError> {
    let subject_id = match args.subject.as_deref() {
        Some(value) => parse_optional_id("subject id", value)?,
        None => None,
    };
    let name = args.name.unwrap_or_default();
    let task = app
        .edit_task(args.id, &name, subject_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("task id {}", args.id)))?;
    println!("Updated task ID: {}: {}", task.id, task.name);
    Ok(())
}

async fn handle_task_done(app: &mut App, args: TaskDone) -> Result<(), AppError> {
    let task = app
        .toggle_completion(args.id, true)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("task id {}", args.id)))?;
    println!("Task ID: {} marked completed.", task.id);
    Ok(())
}

async fn handle_task_reopen(app: &mut App, args: TaskReopen) -> Result<(), AppError> {
    let task = app
        .toggle_completion(args.id, false)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("task id {}", args.id)))?;
    println!("Task ID: {} reopened.", task.id);
    Ok(())
}

async fn handle_task_remove(app: &mut App, args: TaskRemove) -> Result<(), AppError> {
    match app.delete_task(args.id).await {
        Ok(()) => {}
        Err(err) if err.store_error().is_not_found() => {
            return Err(AppError::NotFound(format!("task id {}", args.id)));
        }
        Err(err) => return Err(err.into()),
    }
    println!("Task ID: {} removed.", args.id);
    Ok(())
}

fn handle_board(app: &App, args: Board) -> Result<(), AppError> {
    let pending = app.pending();
    let completed = app.completed();
    if args.json {
        let board = BoardJson {
            subjects: app.subjects(),
            pending,
            completed,
        };
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }
    println!(
        "{}",
        format_board(&pending, &completed, |task| app.subject_of(task))
    );
    Ok(())
}

/// Blank input means "not given"; anything else must be an integer id.
fn parse_optional_id(label: &str, value: &str) -> Result<Option<i64>, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| AppError::InvalidInput(format!("{label} must be an integer: {trimmed}")))
}

fn task_filter_from_arg(arg: TaskStatusArg) -> TaskFilter {
    match arg {
        TaskStatusArg::All => TaskFilter::All,
        TaskStatusArg::Pending => TaskFilter::Pending,
        TaskStatusArg::Completed => TaskFilter::Completed,
    }
}
