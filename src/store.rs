use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::entities::{subject, task};
use crate::error::StoreError;
use crate::model::{NewSubject, NewTask, Subject, Task, TaskPatch};

/// Row-level access to the `subjects` and `tasks` tables.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// All subjects, oldest first.
    async fn select_subjects(&self) -> Result<Vec<Subject>, StoreError>;

    /// All tasks joined with their subject, newest first.
    async fn select_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn insert_subject(&self, input: NewSubject) -> Result<Subject, StoreError>;

    /// Inserts a pending task and returns it joined with its subject.
    async fn insert_task(&self, input: NewTask) -> Result<Task, StoreError>;

    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<(), StoreError>;

    async fn delete_task(&self, id: i64) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    db: DatabaseConnection,
}

impl SqliteStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RowStore for SqliteStore {
    async fn select_subjects(&self) -> Result<Vec<Subject>, StoreError> {
        let rows = subject::Entity::find()
            .order_by_asc(subject::Column::CreatedAt)
            .order_by_asc(subject::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Subject::from).collect())
    }

    async fn select_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let rows = task::Entity::find()
            .find_also_related(subject::Entity)
            .order_by_desc(task::Column::CreatedAt)
            .order_by_desc(task::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(task, subject)| Task::from_row(task, subject))
            .collect())
    }

    async fn insert_subject(&self, input: NewSubject) -> Result<Subject, StoreError> {
        let active = subject::ActiveModel {
            name: Set(input.name),
            color: Set(input.color),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let insert = subject::Entity::insert(active).exec(&self.db).await?;
        let created = subject::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound {
                table: "subjects",
                id: insert.last_insert_id,
            })?;
        Ok(created.into())
    }

    async fn insert_task(&self, input: NewTask) -> Result<Task, StoreError> {
        let parent = subject::Entity::find_by_id(input.subject_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                StoreError::Constraint(format!("subject id {} does not exist", input.subject_id))
            })?;

        let active = task::ActiveModel {
            subject_id: Set(input.subject_id),
            name: Set(input.name),
            completed: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let insert = task::Entity::insert(active).exec(&self.db).await?;
        let created = task::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound {
                table: "tasks",
                id: insert.last_insert_id,
            })?;
        Ok(Task::from_row(created, Some(parent)))
    }

    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<(), StoreError> {
        let existing = task::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound { table: "tasks", id })?;

        if let Some(subject_id) = patch.subject_id {
            if subject::Entity::find_by_id(subject_id)
                .one(&self.db)
                .await?
                .is_none()
            {
                return Err(StoreError::Constraint(format!(
                    "subject id {subject_id} does not exist"
                )));
            }
        }
        if patch.is_empty() {
            return Ok(());
        }

        let mut active: task::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(subject_id) = patch.subject_id {
            active.subject_id = Set(subject_id);
        }
        if let Some(completed) = patch.completed {
            active.completed = Set(completed);
        }
        active.update(&self.db).await?;
        Ok(())
    }

    async fn delete_task(&self, id: i64) -> Result<(), StoreError> {
        let result = task::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound { table: "tasks", id });
        }
        Ok(())
    }
}
