//! In-memory mirror of the subjects and tasks tables.
//!
//! [`Tracker`] is the only way to change the mirror. Every mutating operation
//! issues its remote call first and patches local state only after the store
//! reports success, so a failed call leaves the mirror exactly as it was.
//! The pending and completed views are computed from the single task list on
//! each read and therefore always partition it.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::model::{NewSubject, NewTask, Subject, SubjectRef, Task, TaskFilter, TaskPatch, PALETTE};
use crate::store::RowStore;

type ColorPicker = Box<dyn FnMut() -> String + Send>;

pub struct Tracker<S> {
    store: S,
    subjects: Vec<Subject>,
    tasks: Vec<Task>,
    // Order in which tasks entered the completed view; absent for pending tasks.
    completed_rank: HashMap<i64, u64>,
    next_rank: u64,
    loaded: bool,
    pick_color: ColorPicker,
}

impl<S: RowStore> Tracker<S> {
    pub fn new(store: S) -> Self {
        Self::with_color_picker(store, random_palette_color)
    }

    pub fn with_color_picker<F>(store: S, picker: F) -> Self
    where
        F: FnMut() -> String + Send + 'static,
    {
        Self {
            store,
            subjects: Vec::new(),
            tasks: Vec::new(),
            completed_rank: HashMap::new(),
            next_rank: 0,
            loaded: false,
            pick_color: Box::new(picker),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Every task, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn subject(&self, id: i64) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.id == id)
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Current subject of a task, resolved through the subject mirror rather
    /// than the joined snapshot.
    pub fn subject_of(&self, task: &Task) -> Option<&Subject> {
        self.subject(task.subject_id)
    }

    pub fn pending(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|task| !task.completed).collect()
    }

    /// Completed tasks in the order they were completed.
    pub fn completed(&self) -> Vec<&Task> {
        let mut done: Vec<&Task> = self.tasks.iter().filter(|task| task.completed).collect();
        done.sort_by_key(|task| self.completed_rank.get(&task.id).copied().unwrap_or(u64::MAX));
        done
    }

    pub fn tasks_by(&self, filter: TaskFilter) -> Vec<&Task> {
        match filter {
            TaskFilter::All => self.tasks.iter().collect(),
            TaskFilter::Pending => self.pending(),
            TaskFilter::Completed => self.completed(),
        }
    }

    /// Replaces the whole mirror with the store's contents. On failure the
    /// previously loaded state is kept.
    pub async fn load(&mut self) -> Result<(), SyncError> {
        let subjects = self.store.select_subjects().await.map_err(|err| {
            warn!(error = %err, "failed to load subjects");
            SyncError::LoadFailed(err)
        })?;
        let tasks = self.store.select_tasks().await.map_err(|err| {
            warn!(error = %err, "failed to load tasks");
            SyncError::LoadFailed(err)
        })?;

        self.subjects = subjects;
        self.tasks = tasks;
        self.completed_rank.clear();
        self.next_rank = 0;
        let done: Vec<i64> = self
            .tasks
            .iter()
            .filter(|task| task.completed)
            .map(|task| task.id)
            .collect();
        for id in done {
            self.push_completed(id);
        }
        self.loaded = true;
        debug!(
            subjects = self.subjects.len(),
            tasks = self.tasks.len(),
            "loaded tracker state"
        );
        Ok(())
    }

    /// Creates a subject with a palette colour. A blank name is a no-op.
    pub async fn add_subject(&mut self, name: &str) -> Result<Option<Subject>, SyncError> {
        let name = name.trim();
        if name.is_empty() {
            debug!("add_subject skipped: empty name");
            return Ok(None);
        }

        let color = (self.pick_color)();
        let created = self
            .store
            .insert_subject(NewSubject {
                name: name.to_string(),
                color,
            })
            .await
            .map_err(|err| {
                warn!(error = %err, subject_name = name, "failed to insert subject");
                SyncError::InsertFailed(err)
            })?;

        debug!(subject_id = created.id, "added subject");
        self.subjects.push(created.clone());
        Ok(Some(created))
    }

    /// Creates a pending task under a known subject. A blank name, a missing
    /// subject id or a subject absent from the mirror is a no-op.
    pub async fn add_task(
        &mut self,
        name: &str,
        subject_id: Option<i64>,
    ) -> Result<Option<Task>, SyncError> {
        let name = name.trim();
        let Some(subject_id) = subject_id else {
            debug!("add_task skipped: no subject");
            return Ok(None);
        };
        if name.is_empty() {
            debug!("add_task skipped: empty name");
            return Ok(None);
        }
        if self.subject(subject_id).is_none() {
            debug!(subject_id, "add_task skipped: unknown subject");
            return Ok(None);
        }

        let created = self
            .store
            .insert_task(NewTask {
                subject_id,
                name: name.to_string(),
            })
            .await
            .map_err(|err| {
                warn!(error = %err, subject_id, "failed to insert task");
                SyncError::InsertFailed(err)
            })?;

        debug!(task_id = created.id, "added task");
        self.tasks.insert(0, created.clone());
        Ok(Some(created))
    }

    /// Renames and/or reassigns a task. A blank name keeps the current name and
    /// `None` keeps the current subject. Unknown task ids are a no-op.
    pub async fn edit_task(
        &mut self,
        task_id: i64,
        new_name: &str,
        new_subject_id: Option<i64>,
    ) -> Result<Option<Task>, SyncError> {
        let Some(current) = self.task(task_id) else {
            debug!(task_id, "edit_task skipped: unknown task");
            return Ok(None);
        };
        let new_name = new_name.trim();
        let name = if new_name.is_empty() {
            current.name.clone()
        } else {
            new_name.to_string()
        };
        let subject_id = new_subject_id.unwrap_or(current.subject_id);

        self.store
            .update_task(
                task_id,
                TaskPatch {
                    name: Some(name.clone()),
                    subject_id: Some(subject_id),
                    completed: None,
                },
            )
            .await
            .map_err(|err| {
                warn!(error = %err, task_id, "failed to update task");
                SyncError::UpdateFailed(err)
            })?;

        let snapshot = self.subject(subject_id).map(SubjectRef::from);
        let Some(task) = self.task_mut(task_id) else {
            return Ok(None);
        };
        task.name = name;
        task.subject_id = subject_id;
        task.subject = snapshot;
        debug!(task_id, subject_id, "edited task");
        Ok(Some(task.clone()))
    }

    /// Sets the completion flag and moves the task between the views.
    /// Unknown task ids are a no-op.
    pub async fn toggle_completion(
        &mut self,
        task_id: i64,
        completed: bool,
    ) -> Result<Option<Task>, SyncError> {
        if self.task(task_id).is_none() {
            debug!(task_id, "toggle_completion skipped: unknown task");
            return Ok(None);
        }

        self.store
            .update_task(
                task_id,
                TaskPatch {
                    completed: Some(completed),
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| {
                warn!(error = %err, task_id, completed, "failed to update completion");
                SyncError::UpdateFailed(err)
            })?;

        let Some(task) = self.task_mut(task_id) else {
            return Ok(None);
        };
        let was_completed = task.completed;
        task.completed = completed;
        let updated = task.clone();
        if completed && !was_completed {
            self.push_completed(task_id);
        } else if !completed {
            self.completed_rank.remove(&task_id);
        }
        debug!(task_id, completed, "toggled task");
        Ok(Some(updated))
    }

    /// Deletes a task remotely, then drops it locally. The remote call is made
    /// even for ids the mirror does not hold, so a repeated delete reports the
    /// store's not-found error.
    pub async fn delete_task(&mut self, task_id: i64) -> Result<(), SyncError> {
        self.store.delete_task(task_id).await.map_err(|err| {
            warn!(error = %err, task_id, "failed to delete task");
            SyncError::DeleteFailed(err)
        })?;

        self.tasks.retain(|task| task.id != task_id);
        self.completed_rank.remove(&task_id);
        debug!(task_id, "deleted task");
        Ok(())
    }

    fn task_mut(&mut self, id: i64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    fn push_completed(&mut self, id: i64) {
        self.completed_rank.insert(id, self.next_rank);
        self.next_rank += 1;
    }
}

pub fn random_palette_color() -> String {
    PALETTE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(PALETTE[0])
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use sea_orm::DbErr;
    use tempfile::TempDir;

    use super::*;
    use crate::error::StoreError;
    use crate::store::tests::setup_store;
    use crate::store::SqliteStore;

    /// Delegates to SQLite but fails every call while `fail` is set.
    struct FlakyStore {
        inner: SqliteStore,
        fail: Arc<AtomicBool>,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Db(DbErr::Custom("connection reset".to_string())));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RowStore for FlakyStore {
        async fn select_subjects(&self) -> Result<Vec<Subject>, StoreError> {
            self.check()?;
            self.inner.select_subjects().await
        }

        async fn select_tasks(&self) -> Result<Vec<Task>, StoreError> {
            self.check()?;
            self.inner.select_tasks().await
        }

        async fn insert_subject(&self, input: NewSubject) -> Result<Subject, StoreError> {
            self.check()?;
            self.inner.insert_subject(input).await
        }

        async fn insert_task(&self, input: NewTask) -> Result<Task, StoreError> {
            self.check()?;
            self.inner.insert_task(input).await
        }

        async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<(), StoreError> {
            self.check()?;
            self.inner.update_task(id, patch).await
        }

        async fn delete_task(&self, id: i64) -> Result<(), StoreError> {
            self.check()?;
            self.inner.delete_task(id).await
        }
    }

    async fn setup_tracker() -> (TempDir, Tracker<SqliteStore>) {
        let (dir, store) = setup_store().await;
        let mut tracker = Tracker::new(store);
        tracker.load().await.expect("load");
        (dir, tracker)
    }

    async fn setup_flaky() -> (TempDir, Tracker<FlakyStore>, Arc<AtomicBool>) {
        let (dir, inner) = setup_store().await;
        let fail = Arc::new(AtomicBool::new(false));
        let store = FlakyStore {
            inner,
            fail: Arc::clone(&fail),
        };
        let mut tracker = Tracker::new(store);
        tracker.load().await.expect("load");
        (dir, tracker, fail)
    }

    async fn add_subject<S: RowStore>(tracker: &mut Tracker<S>, name: &str) -> Subject {
        tracker
            .add_subject(name)
            .await
            .expect("add subject")
            .expect("subject created")
    }

    async fn add_task<S: RowStore>(tracker: &mut Tracker<S>, name: &str, subject_id: i64) -> Task {
        tracker
            .add_task(name, Some(subject_id))
            .await
            .expect("add task")
            .expect("task created")
    }

    fn assert_partitioned<S: RowStore>(tracker: &Tracker<S>) {
        let all: HashSet<i64> = tracker.tasks().iter().map(|task| task.id).collect();
        let pending: HashSet<i64> = tracker.pending().iter().map(|task| task.id).collect();
        let completed: HashSet<i64> = tracker.completed().iter().map(|task| task.id).collect();
        assert!(pending.is_disjoint(&completed));
        let union: HashSet<i64> = pending.union(&completed).copied().collect();
        assert_eq!(union, all);
        assert_eq!(all.len(), tracker.tasks().len());
    }

    #[tokio::test]
    async fn add_subject_uses_palette_color() {
        let (_dir, mut tracker) = setup_tracker().await;
        let subject = add_subject(&mut tracker, "Math").await;
        assert_eq!(subject.name, "Math");
        assert!(PALETTE.contains(&subject.color.as_str()));
        assert_eq!(tracker.subjects(), &[subject]);
    }

    #[tokio::test]
    async fn add_subject_trims_and_uses_picker() {
        let (_dir, store) = setup_store().await;
        let mut tracker = Tracker::with_color_picker(store, || "#8b5cf6".to_string());
        let subject = add_subject(&mut tracker, "  History ").await;
        assert_eq!(subject.name, "History");
        assert_eq!(subject.color, "#8b5cf6");
    }

    #[tokio::test]
    async fn blank_subject_name_is_noop() {
        let (_dir, mut tracker) = setup_tracker().await;
        assert!(tracker.add_subject("").await.expect("empty").is_none());
        assert!(tracker.add_subject("   ").await.expect("blank").is_none());
        assert!(tracker.subjects().is_empty());

        tracker.load().await.expect("reload");
        assert!(tracker.subjects().is_empty());
    }

    #[tokio::test]
    async fn subjects_keep_creation_order() {
        let (_dir, mut tracker) = setup_tracker().await;
        add_subject(&mut tracker, "Math").await;
        add_subject(&mut tracker, "Physics").await;
        tracker.load().await.expect("reload");
        let names: Vec<_> = tracker.subjects().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Math", "Physics"]);
    }

    #[tokio::test]
    async fn add_task_prepends_to_pending() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let first = add_task(&mut tracker, "Problem set", math.id).await;
        let second = add_task(&mut tracker, "Read ch.1", math.id).await;

        assert!(!second.completed);
        assert_eq!(second.subject.as_ref().map(|s| s.name.as_str()), Some("Math"));
        let ids: Vec<_> = tracker.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        let pending: Vec<_> = tracker.pending().iter().map(|t| t.id).collect();
        assert_eq!(pending, vec![second.id, first.id]);
        assert!(tracker.completed().is_empty());
        assert_partitioned(&tracker);
    }

    #[tokio::test]
    async fn add_task_without_name_or_subject_is_noop() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        assert!(tracker.add_task("Read", None).await.expect("no subject").is_none());
        assert!(tracker.add_task("", Some(math.id)).await.expect("no name").is_none());
        assert!(tracker.add_task("  ", Some(math.id)).await.expect("blank").is_none());
        assert!(tracker
            .add_task("Read", Some(math.id + 100))
            .await
            .expect("unknown subject")
            .is_none());
        assert!(tracker.tasks().is_empty());
    }

    #[tokio::test]
    async fn toggle_moves_task_between_views() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let task = add_task(&mut tracker, "Read", math.id).await;

        let done = tracker
            .toggle_completion(task.id, true)
            .await
            .expect("toggle")
            .expect("task exists");
        assert!(done.completed);
        assert!(tracker.pending().is_empty());
        assert_eq!(tracker.completed().len(), 1);
        assert!(tracker.task(task.id).expect("task").completed);
        assert_partitioned(&tracker);

        tracker.load().await.expect("reload");
        assert!(tracker.task(task.id).expect("task").completed);
    }

    #[tokio::test]
    async fn toggle_back_restores_task() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let task = add_task(&mut tracker, "Read", math.id).await;

        tracker.toggle_completion(task.id, true).await.expect("done");
        tracker.toggle_completion(task.id, false).await.expect("reopen");

        let restored = tracker.task(task.id).expect("task");
        assert_eq!(restored, &task);
        let pending: Vec<_> = tracker.pending().iter().map(|t| t.id).collect();
        assert_eq!(pending, vec![task.id]);
        assert!(tracker.completed().is_empty());
    }

    #[tokio::test]
    async fn completed_view_follows_completion_order() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let older = add_task(&mut tracker, "Older", math.id).await;
        let newer = add_task(&mut tracker, "Newer", math.id).await;

        tracker.toggle_completion(older.id, true).await.expect("older");
        tracker.toggle_completion(newer.id, true).await.expect("newer");

        let completed: Vec<_> = tracker.completed().iter().map(|t| t.id).collect();
        assert_eq!(completed, vec![older.id, newer.id]);
        assert_partitioned(&tracker);
    }

    #[tokio::test]
    async fn toggle_unknown_task_is_noop() {
        let (_dir, mut tracker) = setup_tracker().await;
        assert!(tracker
            .toggle_completion(99, true)
            .await
            .expect("unknown")
            .is_none());
    }

    #[tokio::test]
    async fn edit_with_blank_name_keeps_name() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let physics = add_subject(&mut tracker, "Physics").await;
        let task = add_task(&mut tracker, "Old", math.id).await;

        let edited = tracker
            .edit_task(task.id, "", Some(physics.id))
            .await
            .expect("edit")
            .expect("task exists");
        assert_eq!(edited.name, "Old");
        assert_eq!(edited.subject_id, physics.id);
        assert_eq!(
            edited.subject.as_ref().map(|s| s.name.as_str()),
            Some("Physics")
        );
        let resolved = tracker.subject_of(&edited).expect("subject");
        assert_eq!(resolved.id, physics.id);

        tracker.load().await.expect("reload");
        let stored = tracker.task(task.id).expect("task");
        assert_eq!(stored.name, "Old");
        assert_eq!(stored.subject_id, physics.id);
    }

    #[tokio::test]
    async fn edit_without_subject_keeps_subject() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let task = add_task(&mut tracker, "Old", math.id).await;
        tracker.toggle_completion(task.id, true).await.expect("done");

        let edited = tracker
            .edit_task(task.id, "New", None)
            .await
            .expect("edit")
            .expect("task exists");
        assert_eq!(edited.name, "New");
        assert_eq!(edited.subject_id, math.id);
        assert!(edited.completed);
        assert_eq!(tracker.completed()[0].name, "New");
        assert_partitioned(&tracker);
    }

    #[tokio::test]
    async fn edit_to_unknown_subject_fails_without_local_change() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let task = add_task(&mut tracker, "Old", math.id).await;

        let err = tracker
            .edit_task(task.id, "New", Some(math.id + 50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::UpdateFailed(StoreError::Constraint(_))
        ));
        assert_eq!(tracker.task(task.id).expect("task"), &task);
    }

    #[tokio::test]
    async fn delete_removes_task_everywhere() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let keep = add_task(&mut tracker, "Keep", math.id).await;
        let gone = add_task(&mut tracker, "Gone", math.id).await;
        tracker.toggle_completion(gone.id, true).await.expect("done");

        tracker.delete_task(gone.id).await.expect("delete");
        assert!(tracker.task(gone.id).is_none());
        assert!(tracker.completed().is_empty());
        let pending: Vec<_> = tracker.pending().iter().map(|t| t.id).collect();
        assert_eq!(pending, vec![keep.id]);
        assert_partitioned(&tracker);
    }

    #[tokio::test]
    async fn second_delete_reports_not_found() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let task = add_task(&mut tracker, "Read", math.id).await;

        tracker.delete_task(task.id).await.expect("first delete");
        let err = tracker.delete_task(task.id).await.unwrap_err();
        match err {
            SyncError::DeleteFailed(inner) => assert!(inner.is_not_found()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(tracker.tasks().is_empty());
        assert_partitioned(&tracker);
    }

    #[tokio::test]
    async fn failed_operations_leave_mirror_untouched() {
        let (_dir, mut tracker, fail) = setup_flaky().await;
        let math = add_subject(&mut tracker, "Math").await;
        let task = add_task(&mut tracker, "Read", math.id).await;
        let subjects_before = tracker.subjects().to_vec();
        let tasks_before = tracker.tasks().to_vec();

        fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            tracker.add_subject("Physics").await.unwrap_err(),
            SyncError::InsertFailed(_)
        ));
        assert!(matches!(
            tracker.add_task("Write", Some(math.id)).await.unwrap_err(),
            SyncError::InsertFailed(_)
        ));
        assert!(matches!(
            tracker.edit_task(task.id, "Renamed", None).await.unwrap_err(),
            SyncError::UpdateFailed(_)
        ));
        assert!(matches!(
            tracker.toggle_completion(task.id, true).await.unwrap_err(),
            SyncError::UpdateFailed(_)
        ));
        assert!(matches!(
            tracker.delete_task(task.id).await.unwrap_err(),
            SyncError::DeleteFailed(_)
        ));
        assert!(matches!(
            tracker.load().await.unwrap_err(),
            SyncError::LoadFailed(_)
        ));

        assert_eq!(tracker.subjects(), subjects_before.as_slice());
        assert_eq!(tracker.tasks(), tasks_before.as_slice());
        assert_eq!(tracker.pending().len(), 1);
        assert!(tracker.completed().is_empty());
        assert!(tracker.is_loaded());
    }

    #[tokio::test]
    async fn partition_holds_across_mixed_operations() {
        let (_dir, mut tracker) = setup_tracker().await;
        let math = add_subject(&mut tracker, "Math").await;
        let physics = add_subject(&mut tracker, "Physics").await;
        let mut ids = Vec::new();
        for idx in 0..6 {
            let subject_id = if idx % 2 == 0 { math.id } else { physics.id };
            ids.push(add_task(&mut tracker, &format!("Task {idx}"), subject_id).await.id);
            assert_partitioned(&tracker);
        }

        for (idx, id) in ids.iter().enumerate() {
            tracker
                .toggle_completion(*id, idx % 3 != 0)
                .await
                .expect("toggle");
            assert_partitioned(&tracker);
        }
        tracker.edit_task(ids[1], "", Some(math.id)).await.expect("edit");
        tracker.delete_task(ids[2]).await.expect("delete");
        tracker.toggle_completion(ids[4], false).await.expect("reopen");
        assert_partitioned(&tracker);

        let pending_before: Vec<_> = tracker.pending().iter().map(|t| t.id).collect();
        tracker.load().await.expect("reload");
        assert_partitioned(&tracker);
        let pending_after: Vec<_> = tracker.pending().iter().map(|t| t.id).collect();
        assert_eq!(pending_before, pending_after);
        assert_eq!(tracker.tasks().len(), 5);
    }
}
