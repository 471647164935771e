use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{subject, task};

/// Colours handed out to new subjects.
pub const PALETTE: [&str; 6] = [
    "#ef4444", "#10b981", "#f59e0b", "#8b5cf6", "#06b6d4", "#f97316",
];

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Joined copy of a subject carried on a task row. Display only; `subject_id`
/// on the task is authoritative.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubjectRef {
    pub id: i64,
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub subject_id: i64,
    pub name: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewSubject {
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewTask {
    pub subject_id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub subject_id: Option<i64>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.subject_id.is_none() && self.completed.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl From<subject::Model> for Subject {
    fn from(model: subject::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            created_at: model.created_at,
        }
    }
}

impl From<&Subject> for SubjectRef {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name.clone(),
            color: subject.color.clone(),
        }
    }
}

impl From<subject::Model> for SubjectRef {
    fn from(model: subject::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
        }
    }
}

impl Task {
    pub fn from_row(model: task::Model, subject: Option<subject::Model>) -> Self {
        Self {
            id: model.id,
            subject_id: model.subject_id,
            name: model.name,
            completed: model.completed,
            created_at: model.created_at,
            subject: subject.map(SubjectRef::from),
        }
    }
}
