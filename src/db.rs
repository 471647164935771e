use std::fs::{self, File, OpenOptions};
use std::path::Path;

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema, Statement};
use url::Url;

use crate::entities::{subject, task};
use crate::error::AppError;

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Advisory lock beside the database file; held for the whole command so two
/// invocations never interleave their read-modify-write cycles.
pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::InvalidInput(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await?;

    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut subject_stmt = schema.create_table_from_entity(subject::Entity);
    subject_stmt.if_not_exists();
    db.execute(builder.build(&subject_stmt)).await?;

    let mut task_stmt = schema.create_table_from_entity(task::Entity);
    task_stmt.if_not_exists();
    db.execute(builder.build(&task_stmt)).await?;

    let mut subject_index = Index::create()
        .name("idx_subjects_created")
        .table(subject::Entity)
        .col(subject::Column::CreatedAt)
        .to_owned();
    subject_index.if_not_exists();
    db.execute(builder.build(&subject_index)).await?;

    let mut task_index = Index::create()
        .name("idx_tasks_subject")
        .table(task::Entity)
        .col(task::Column::SubjectId)
        .to_owned();
    task_index.if_not_exists();
    db.execute(builder.build(&task_index)).await?;

    let mut task_created_index = Index::create()
        .name("idx_tasks_created")
        .table(task::Entity)
        .col(task::Column::CreatedAt)
        .to_owned();
    task_created_index.if_not_exists();
    db.execute(builder.build(&task_created_index)).await?;

    Ok(())
}
