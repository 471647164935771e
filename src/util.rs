use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Subject, Task};

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

fn checkbox(task: &Task) -> &'static str {
    if task.completed {
        "x"
    } else {
        " "
    }
}

fn status_label(task: &Task) -> &'static str {
    if task.completed {
        "completed"
    } else {
        "pending"
    }
}

pub fn format_task_detail(task: &Task, subject: Option<&Subject>) -> String {
    let mut output = String::new();
    output.push_str(&format!("Task ID: {}\n", task.id));
    output.push_str(&format!("Name: {}\n", task.name));
    output.push_str(&format!("Status: {}\n", status_label(task)));
    match subject {
        Some(subject) => output.push_str(&format!(
            "Subject: {} (subject id {}, {})\n",
            subject.name, subject.id, subject.color
        )),
        None => output.push_str(&format!("Subject: (unknown, subject id {})\n", task.subject_id)),
    }
    output.push_str(&format!("Created: {}\n", format_datetime(task.created_at)));
    output.trim_end().to_string()
}

pub fn format_subject_list(subjects: &[Subject], tasks: &[Task]) -> String {
    if subjects.is_empty() {
        return "No subjects found.".to_string();
    }
    let mut output = format!(
        "{:<4} {:<8} {:<7} {}\n",
        "ID", "COLOR", "TASKS", "NAME"
    );
    for subject in subjects {
        let owned: Vec<&Task> = tasks
            .iter()
            .filter(|task| task.subject_id == subject.id)
            .collect();
        let done = owned.iter().filter(|task| task.completed).count();
        output.push_str(&format!(
            "{:<4} {:<8} {:<7} {}\n",
            subject.id,
            subject.color,
            format!("{}/{}", done, owned.len()),
            subject.name
        ));
    }
    output.trim_end().to_string()
}

pub fn format_task_list<'a, F>(tasks: &[&Task], subject_of: F) -> String
where
    F: Fn(&Task) -> Option<&'a Subject>,
{
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }
    let mut output = format!(
        "{:<4} {:<10} {:<16} {}\n",
        "ID", "STAT", "SUBJECT", "NAME"
    );
    for task in tasks.iter().copied() {
        let subject = subject_of(task)
            .map(|subject| subject.name.as_str())
            .unwrap_or("-");
        output.push_str(&format!(
            "{:<4} {:<10} {:<16} {}\n",
            task.id,
            status_label(task),
            subject,
            task.name
        ));
    }
    output.trim_end().to_string()
}

pub fn format_board<'a, F>(pending: &[&Task], completed: &[&Task], subject_of: F) -> String
where
    F: Fn(&Task) -> Option<&'a Subject>,
{
    let mut output = String::new();
    for (label, section) in [("Pending", pending), ("Completed", completed)] {
        output.push_str(&format!("{label} ({}):\n", section.len()));
        if section.is_empty() {
            output.push_str("  (none)\n");
        }
        for task in section.iter().copied() {
            let subject = subject_of(task)
                .map(|subject| subject.name.as_str())
                .unwrap_or("-");
            output.push_str(&format!(
                "- [{}] {} ({}, task id {})\n",
                checkbox(task),
                task.name,
                subject,
                task.id
            ));
        }
        output.push('\n');
    }
    output.trim_end().to_string()
}

#[derive(Debug, Serialize)]
pub struct BoardJson<'a> {
    pub subjects: &'a [Subject],
    pub pending: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
}
