use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::coordinator::{ChangeSet, Observer};
use crate::error::AppError;
use crate::model::{Plan, Task, TaskChanges, TaskId};
use crate::store::EntityStore;

/// Storage collaborator. Calls may fail; the core never retries them.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn create_task(&self, task: &Task) -> Result<Task, AppError>;
    async fn update_task(&self, id: TaskId, patch: &TaskChanges) -> Result<Task, AppError>;
    async fn delete_task(&self, id: TaskId) -> Result<(), AppError>;
    async fn list_tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>, AppError>;
    async fn list_tasks(&self) -> Result<Vec<Task>, AppError>;
    async fn load_plan(&self) -> Result<Option<Plan>, AppError>;
    async fn save_plan(&self, plan: &Plan) -> Result<(), AppError>;
}

#[derive(Clone, Debug)]
pub enum PersistOp {
    CreateTask(Task),
    UpdateTask(TaskId, TaskChanges),
    DeleteTask(TaskId),
    SavePlan(Box<Plan>),
}

impl PersistOp {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateTask(_) => "create task",
            Self::UpdateTask(..) => "update task",
            Self::DeleteTask(_) => "delete task",
            Self::SavePlan(_) => "save plan",
        }
    }

    async fn apply(&self, persistence: &dyn Persistence) -> Result<(), AppError> {
        match self {
            Self::CreateTask(task) => persistence.create_task(task).await.map(|_| ()),
            Self::UpdateTask(id, patch) => persistence.update_task(*id, patch).await.map(|_| ()),
            Self::DeleteTask(id) => persistence.delete_task(*id).await,
            Self::SavePlan(plan) => persistence.save_plan(plan).await,
        }
    }
}

/// Translates a change set into storage operations: task rows first, then one
/// plan save if any cell, link or todo changed. Link rows reference tasks, so
/// creates must land before the plan that links them.
pub fn ops_for(changes: &ChangeSet, store: &EntityStore) -> Vec<PersistOp> {
    let mut ops = Vec::new();
    for task in &changes.created_tasks {
        ops.push(PersistOp::CreateTask(task.clone()));
    }
    for (id, patch) in &changes.updated_tasks {
        ops.push(PersistOp::UpdateTask(*id, patch.clone()));
    }
    for id in &changes.deleted_tasks {
        ops.push(PersistOp::DeleteTask(*id));
    }
    if changes.plan_changed {
        ops.push(PersistOp::SavePlan(Box::new(store.plan().clone())));
    }
    ops
}

#[derive(Debug)]
pub struct PersistFailure {
    pub op: &'static str,
    pub error: AppError,
}

/// Observer that hands storage work to the worker without waiting for it.
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistOp>,
}

impl Observer for PersistQueue {
    fn notify(&mut self, changes: &ChangeSet, store: &EntityStore) {
        for op in ops_for(changes, store) {
            let label = op.label();
            if self.tx.send(op).is_err() {
                tracing::warn!(op = label, "persistence worker stopped; dropping operation");
            }
        }
    }
}

/// Background task applying queued operations in order. Failures are logged
/// and reported on their own channel; local state is left as is.
pub struct PersistWorker {
    handle: JoinHandle<usize>,
    failures: mpsc::UnboundedReceiver<PersistFailure>,
}

pub fn spawn_persist_worker(persistence: Arc<dyn Persistence>) -> (PersistQueue, PersistWorker) {
    let (tx, mut rx) = mpsc::unbounded_channel::<PersistOp>();
    let (failure_tx, failures) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        let mut applied = 0usize;
        while let Some(op) = rx.recv().await {
            match op.apply(persistence.as_ref()).await {
                Ok(()) => {
                    applied += 1;
                    tracing::debug!(op = op.label(), "persisted");
                }
                Err(error) => {
                    tracing::warn!(op = op.label(), %error, "persistence failed");
                    let _ = failure_tx.send(PersistFailure {
                        op: op.label(),
                        error,
                    });
                }
            }
        }
        applied
    });
    (PersistQueue { tx }, PersistWorker { handle, failures })
}

impl PersistWorker {
    /// Failures reported so far. Does not wait for queued operations and
    /// leaves the worker running.
    pub fn drain_failures(&mut self) -> Vec<PersistFailure> {
        let mut drained = Vec::new();
        while let Ok(failure) = self.failures.try_recv() {
            drained.push(failure);
        }
        drained
    }

    /// Waits until every queue handle is dropped and all operations ran, then
    /// returns the failures not yet drained.
    pub async fn finish(mut self) -> Result<Vec<PersistFailure>, AppError> {
        let applied = (&mut self.handle)
            .await
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        let failures = self.drain_failures();
        tracing::debug!(applied, failed = failures.len(), "persistence worker finished");
        Ok(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::Coordinator;
    use crate::model::TaskInput;
    use crate::store::default_categories;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
        fail_saves: bool,
    }

    impl Journal {
        fn record(&self, call: String) {
            self.calls.lock().expect("lock").push(call);
        }
    }

    #[async_trait]
    impl Persistence for Journal {
        async fn create_task(&self, task: &Task) -> Result<Task, AppError> {
            self.record(format!("create {}", task.title));
            Ok(task.clone())
        }

        async fn update_task(&self, id: TaskId, _patch: &TaskChanges) -> Result<Task, AppError> {
            self.record("update".to_string());
            Err(AppError::NotFound(format!("task id {id}")))
        }

        async fn delete_task(&self, _id: TaskId) -> Result<(), AppError> {
            self.record("delete".to_string());
            Ok(())
        }

        async fn list_tasks_for_date(&self, _date: NaiveDate) -> Result<Vec<Task>, AppError> {
            Ok(Vec::new())
        }

        async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
            Ok(Vec::new())
        }

        async fn load_plan(&self) -> Result<Option<Plan>, AppError> {
            Ok(None)
        }

        async fn save_plan(&self, _plan: &Plan) -> Result<(), AppError> {
            self.record("save".to_string());
            if self.fail_saves {
                return Err(AppError::InvalidInput("disk full".to_string()));
            }
            Ok(())
        }
    }

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 2, 2).expect("date"),
            start_time: None,
            duration: None,
        }
    }

    #[test]
    fn ops_put_task_rows_before_plan_save() {
        let mut app = Coordinator::create_plan(default_categories()).expect("plan");
        let (_, changes) = app.create_task(input("Run"), Some((0, 0))).expect("create");

        let ops = ops_for(&changes, app.store());
        let labels: Vec<&str> = ops.iter().map(PersistOp::label).collect();
        assert_eq!(labels, vec!["create task", "save plan"]);

        let (_, changes) = app.create_task(input("Swim"), None).expect("create");
        let labels: Vec<&str> = ops_for(&changes, app.store())
            .iter()
            .map(PersistOp::label)
            .collect();
        assert_eq!(labels, vec!["create task"]);
    }

    #[tokio::test]
    async fn worker_applies_operations_in_order() {
        let journal = Arc::new(Journal::default());
        let (queue, worker) = spawn_persist_worker(journal.clone());
        let mut app = Coordinator::create_plan(default_categories()).expect("plan");
        app.subscribe(Box::new(queue));

        let (task, _) = app.create_task(input("Run"), Some((1, 1))).expect("create");
        app.delete_task(task.id).expect("delete");
        drop(app);

        let failures = worker.finish().await.expect("finish");
        assert!(failures.is_empty());
        let calls = journal.calls.lock().expect("lock").clone();
        assert_eq!(calls, vec!["create Run", "save", "delete", "save"]);
    }

    #[tokio::test]
    async fn failures_are_reported_without_touching_local_state() {
        let journal = Arc::new(Journal {
            fail_saves: true,
            ..Default::default()
        });
        let (queue, worker) = spawn_persist_worker(journal.clone());
        let mut app = Coordinator::create_plan(default_categories()).expect("plan");
        app.subscribe(Box::new(queue));

        let (task, _) = app.create_task(input("Run"), Some((2, 0))).expect("create");
        app.toggle_task(task.id).expect("toggle");
        assert_eq!(app.cell(2, 0).expect("cell").progress, 100);
        drop(app);

        let failures = worker.finish().await.expect("finish");
        let ops: Vec<&str> = failures.iter().map(|failure| failure.op).collect();
        assert_eq!(ops, vec!["save plan", "update task"]);
        assert!(matches!(failures[0].error, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn failures_can_be_drained_while_worker_runs() {
        let journal = Arc::new(Journal {
            fail_saves: true,
            ..Default::default()
        });
        let (queue, mut worker) = spawn_persist_worker(journal.clone());
        let mut app = Coordinator::create_plan(default_categories()).expect("plan");
        app.subscribe(Box::new(queue));

        app.set_cell_text(0, 0, "Sleep eight hours".to_string())
            .expect("text");

        let mut seen = Vec::new();
        for _ in 0..200 {
            seen = worker.drain_failures();
            if !seen.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].op, "save plan");
        assert_eq!(app.cell(0, 0).expect("cell").text, "Sleep eight hours");

        app.add_todo(0, 0, "Dim lights".to_string()).expect("todo");
        drop(app);
        let remaining = worker.finish().await.expect("finish");
        let ops: Vec<&str> = remaining.iter().map(|failure| failure.op).collect();
        assert_eq!(ops, vec!["save plan"]);
    }
}
