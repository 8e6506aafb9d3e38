use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::PlanError;
use crate::links::{LinkIndex, LinkOutcome};
use crate::model::{
    ensure_non_empty, normalize_start_time, validate_duration, Category, Cell, CellRef, Plan,
    Task, TaskChanges, TaskId, TaskInput, Todo, TodoId,
};
use crate::progress;
use crate::promotion::convert_todo_to_task;
use crate::store::{create_plan, EntityStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellProgressChange {
    pub cell: CellRef,
    pub from: u8,
    pub to: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridProgressChange {
    pub grid: usize,
    pub from: u8,
    pub to: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relink {
    pub task_id: TaskId,
    pub from: Option<CellRef>,
    pub to: Option<CellRef>,
}

/// Everything one coordinator call changed. Observers and the persistence
/// queue are driven from this; callers use it to report derived updates.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    pub cells: Vec<CellRef>,
    pub cell_progress: Vec<CellProgressChange>,
    pub grid_progress: Vec<GridProgressChange>,
    pub created_tasks: Vec<Task>,
    pub updated_tasks: Vec<(TaskId, TaskChanges)>,
    pub deleted_tasks: Vec<TaskId>,
    pub relinks: Vec<Relink>,
    pub plan_changed: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
            && self.cell_progress.is_empty()
            && self.grid_progress.is_empty()
            && self.created_tasks.is_empty()
            && self.updated_tasks.is_empty()
            && self.deleted_tasks.is_empty()
            && self.relinks.is_empty()
            && !self.plan_changed
    }

    fn touch(&mut self, cell: CellRef) {
        if !self.cells.contains(&cell) {
            self.cells.push(cell);
        }
        self.plan_changed = true;
    }
}

/// Receives every non-empty `ChangeSet`, synchronously, after the state it
/// describes has been applied.
pub trait Observer {
    fn notify(&mut self, changes: &ChangeSet, store: &EntityStore);
}

/// Single entry point for mutations. Each call validates its input, applies
/// the change to the store and link index, refreshes only the affected
/// progress values and then notifies observers.
pub struct Coordinator {
    store: EntityStore,
    links: LinkIndex,
    observers: Vec<Box<dyn Observer>>,
}

impl Coordinator {
    /// Wraps a loaded plan. Fails if a task is linked twice or a link points
    /// at an unknown task.
    pub fn new(plan: Plan, tasks: Vec<Task>) -> Result<Self, PlanError> {
        let links = LinkIndex::build(&plan)?;
        let mut store = EntityStore::new(plan, tasks);
        for (at, cell) in store.plan().cells() {
            if let Some(missing) = cell
                .linked_task_ids
                .iter()
                .find(|id| store.task(**id).is_none())
            {
                return Err(PlanError::Validation(format!(
                    "cell {at} links unknown task {missing}"
                )));
            }
        }
        let (plan, tasks) = store.parts_mut();
        progress::recompute_all(plan, tasks);
        Ok(Self {
            store,
            links,
            observers: Vec::new(),
        })
    }

    pub fn create_plan(categories: Vec<Category>) -> Result<Self, PlanError> {
        Self::new(create_plan(categories)?, Vec::new())
    }

    pub fn subscribe(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn plan(&self) -> &Plan {
        self.store.plan()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.store.task(id)
    }

    pub fn tasks(&self) -> Vec<&Task> {
        self.store.tasks()
    }

    pub fn tasks_for_date(&self, date: NaiveDate) -> Vec<&Task> {
        self.store.tasks_for_date(date)
    }

    pub fn cell(&self, grid: usize, cell: usize) -> Result<&Cell, PlanError> {
        self.store.cell(grid, cell)
    }

    pub fn locate(&self, task_id: TaskId) -> Option<CellRef> {
        self.links.locate(task_id)
    }

    pub fn find_todo(&self, id: TodoId) -> Option<(CellRef, &Todo)> {
        self.store.find_todo(id)
    }

    pub fn plan_progress(&self) -> u8 {
        progress::plan_progress(self.store.plan())
    }

    pub fn set_cell_text(
        &mut self,
        grid: usize,
        cell: usize,
        text: String,
    ) -> Result<ChangeSet, PlanError> {
        self.store.set_cell_text(grid, cell, text)?;
        let mut changes = ChangeSet::default();
        changes.touch(CellRef { grid, cell });
        self.publish(&changes);
        Ok(changes)
    }

    pub fn toggle_cell_completion(
        &mut self,
        grid: usize,
        cell: usize,
    ) -> Result<(bool, ChangeSet), PlanError> {
        let completed = self.store.toggle_cell_completion(grid, cell)?;
        let mut changes = ChangeSet::default();
        changes.touch(CellRef { grid, cell });
        self.publish(&changes);
        Ok((completed, changes))
    }

    pub fn set_grid_title(&mut self, grid: usize, title: String) -> Result<ChangeSet, PlanError> {
        let touched = self.store.set_grid_title(grid, title)?;
        let mut changes = ChangeSet::default();
        for at in touched {
            changes.touch(at);
        }
        self.publish(&changes);
        Ok(changes)
    }

    /// Creates a task, optionally linked to a cell in the same step.
    pub fn create_task(
        &mut self,
        input: TaskInput,
        link: Option<(usize, usize)>,
    ) -> Result<(Task, ChangeSet), PlanError> {
        ensure_non_empty("task title", &input.title)?;
        let start_time = input
            .start_time
            .as_deref()
            .map(normalize_start_time)
            .transpose()?;
        if let Some(duration) = input.duration {
            validate_duration(duration)?;
        }
        let target = link
            .map(|(grid, cell)| CellRef::new(grid, cell))
            .transpose()?;

        let task = Task {
            id: Uuid::new_v4(),
            title: input.title,
            is_completed: false,
            scheduled_date: input.scheduled_date,
            start_time,
            duration: input.duration,
            created_at: Utc::now(),
        };
        self.store.insert_task(task.clone());
        let mut changes = ChangeSet::default();
        changes.created_tasks.push(task.clone());
        if let Some(target) = target {
            self.apply_link(task.id, target, &mut changes)?;
        }
        tracing::debug!(task_id = %task.id, linked = target.is_some(), "task created");
        self.publish(&changes);
        Ok((task, changes))
    }

    pub fn update_task(
        &mut self,
        id: TaskId,
        changes: TaskChanges,
    ) -> Result<(Task, ChangeSet), PlanError> {
        self.store.require_task(id)?;
        if let Some(title) = changes.title.as_deref() {
            ensure_non_empty("task title", title)?;
        }
        let start_time = changes
            .start_time
            .as_deref()
            .map(normalize_start_time)
            .transpose()?;
        if let Some(duration) = changes.duration {
            validate_duration(duration)?;
        }
        let patch = TaskChanges {
            start_time,
            ..changes
        };

        let task = self.store.task_mut(id)?;
        let completion_changed = patch
            .is_completed
            .is_some_and(|completed| completed != task.is_completed);
        if let Some(title) = patch.title.clone() {
            task.title = title;
        }
        if let Some(completed) = patch.is_completed {
            task.is_completed = completed;
        }
        if let Some(date) = patch.scheduled_date {
            task.scheduled_date = date;
        }
        if let Some(start_time) = patch.start_time.clone() {
            task.start_time = Some(start_time);
        }
        if let Some(duration) = patch.duration {
            task.duration = Some(duration);
        }
        let updated = task.clone();

        let mut changes = ChangeSet::default();
        if !patch.is_empty() {
            changes.updated_tasks.push((id, patch));
        }
        if completion_changed {
            if let Some(at) = self.links.locate(id) {
                self.refresh(&[at], &mut changes);
            }
        }
        self.publish(&changes);
        Ok((updated, changes))
    }

    pub fn toggle_task(&mut self, id: TaskId) -> Result<(Task, ChangeSet), PlanError> {
        let completed = !self.store.require_task(id)?.is_completed;
        tracing::debug!(task_id = %id, completed, "toggling task");
        self.update_task(
            id,
            TaskChanges {
                is_completed: Some(completed),
                ..Default::default()
            },
        )
    }

    /// Deletes a task and drops its link, so no cell keeps a dangling id.
    pub fn delete_task(&mut self, id: TaskId) -> Result<ChangeSet, PlanError> {
        self.store.require_task(id)?;
        let mut changes = ChangeSet::default();
        let (plan, _) = self.store.parts_mut();
        let unlinked = self.links.unlink_task(plan, id);
        self.store.remove_task(id);
        changes.deleted_tasks.push(id);
        if let Some(from) = unlinked {
            changes.relinks.push(Relink {
                task_id: id,
                from: Some(from),
                to: None,
            });
            changes.touch(from);
            self.refresh(&[from], &mut changes);
        }
        tracing::debug!(task_id = %id, was_linked = unlinked.is_some(), "task deleted");
        self.publish(&changes);
        Ok(changes)
    }

    pub fn link_task(
        &mut self,
        id: TaskId,
        grid: usize,
        cell: usize,
    ) -> Result<ChangeSet, PlanError> {
        let target = CellRef::new(grid, cell)?;
        self.store.require_task(id)?;
        let mut changes = ChangeSet::default();
        self.apply_link(id, target, &mut changes)?;
        self.publish(&changes);
        Ok(changes)
    }

    pub fn unlink_task(&mut self, id: TaskId) -> Result<ChangeSet, PlanError> {
        self.store.require_task(id)?;
        let mut changes = ChangeSet::default();
        let (plan, _) = self.store.parts_mut();
        if let Some(from) = self.links.unlink_task(plan, id) {
            changes.relinks.push(Relink {
                task_id: id,
                from: Some(from),
                to: None,
            });
            changes.touch(from);
            self.refresh(&[from], &mut changes);
        }
        self.publish(&changes);
        Ok(changes)
    }

    pub fn add_todo(
        &mut self,
        grid: usize,
        cell: usize,
        text: String,
    ) -> Result<(Todo, ChangeSet), PlanError> {
        let at = CellRef::new(grid, cell)?;
        ensure_non_empty("todo text", &text)?;
        let todo = Todo::new(text);
        self.store.plan_mut().cell_mut(at).todos.push(todo.clone());
        let mut changes = ChangeSet::default();
        changes.touch(at);
        self.publish(&changes);
        Ok((todo, changes))
    }

    /// Converted todos are historical records and cannot be toggled.
    pub fn toggle_todo(&mut self, id: TodoId) -> Result<(Todo, ChangeSet), PlanError> {
        let (at, todo) = self.store.todo_mut(id)?;
        if let Some(task_id) = todo.converted_task_id {
            return Err(PlanError::Conversion {
                todo_id: todo.id,
                task_id,
            });
        }
        todo.is_completed = !todo.is_completed;
        let todo = todo.clone();
        let mut changes = ChangeSet::default();
        changes.touch(at);
        self.publish(&changes);
        Ok((todo, changes))
    }

    pub fn delete_todo(&mut self, id: TodoId) -> Result<ChangeSet, PlanError> {
        let (at, _) = self.store.remove_todo(id)?;
        let mut changes = ChangeSet::default();
        changes.touch(at);
        self.publish(&changes);
        Ok(changes)
    }

    /// Promotes a todo into a new unlinked task.
    pub fn convert_todo(
        &mut self,
        id: TodoId,
        scheduled_date: NaiveDate,
    ) -> Result<(Task, ChangeSet), PlanError> {
        let (at, todo) = self.store.todo_mut(id)?;
        let task = convert_todo_to_task(todo, scheduled_date)?;
        self.store.insert_task(task.clone());
        let mut changes = ChangeSet::default();
        changes.created_tasks.push(task.clone());
        changes.touch(at);
        tracing::debug!(todo_id = %id, task_id = %task.id, "todo converted");
        self.publish(&changes);
        Ok((task, changes))
    }

    fn apply_link(
        &mut self,
        id: TaskId,
        target: CellRef,
        changes: &mut ChangeSet,
    ) -> Result<(), PlanError> {
        let (plan, _) = self.store.parts_mut();
        let outcome = self.links.link_task(plan, id, target.grid, target.cell)?;
        let from = match outcome {
            LinkOutcome::Unchanged => return Ok(()),
            LinkOutcome::Linked => None,
            LinkOutcome::Moved { from } => {
                tracing::debug!(task_id = %id, %from, to = %target, "task moved between cells");
                changes.touch(from);
                Some(from)
            }
        };
        changes.touch(target);
        changes.relinks.push(Relink {
            task_id: id,
            from,
            to: Some(target),
        });
        let affected: Vec<CellRef> = from.into_iter().chain([target]).collect();
        self.refresh(&affected, changes);
        Ok(())
    }

    /// Recomputes the given cells and then each owning grid once.
    fn refresh(&mut self, cells: &[CellRef], changes: &mut ChangeSet) {
        let (plan, tasks) = self.store.parts_mut();
        let mut grids = BTreeSet::new();
        for at in cells {
            let (from, to) = progress::refresh_cell(plan, *at, tasks);
            if from != to {
                changes.cell_progress.push(CellProgressChange {
                    cell: *at,
                    from,
                    to,
                });
            }
            grids.insert(at.grid);
        }
        for grid in grids {
            let (from, to) = progress::refresh_grid(plan, grid);
            if from != to {
                changes.grid_progress.push(GridProgressChange { grid, from, to });
            }
        }
    }

    fn publish(&mut self, changes: &ChangeSet) {
        if changes.is_empty() {
            return;
        }
        for observer in self.observers.iter_mut() {
            observer.notify(changes, &self.store);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CENTER;
    use crate::store::default_categories;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn coordinator() -> Coordinator {
        Coordinator::create_plan(default_categories()).expect("create plan")
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).expect("date")
    }

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            scheduled_date: date(),
            start_time: None,
            duration: None,
        }
    }

    fn add_task(app: &mut Coordinator, title: &str, link: Option<(usize, usize)>) -> Task {
        app.create_task(input(title), link).expect("create task").0
    }

    fn holders(app: &Coordinator, id: TaskId) -> Vec<CellRef> {
        app.plan()
            .cells()
            .filter(|(_, cell)| cell.linked_task_ids.contains(&id))
            .map(|(at, _)| at)
            .collect()
    }

    struct Recorder(Rc<RefCell<Vec<ChangeSet>>>);

    impl Observer for Recorder {
        fn notify(&mut self, changes: &ChangeSet, _store: &EntityStore) {
            self.0.borrow_mut().push(changes.clone());
        }
    }

    #[test]
    fn new_plan_has_zero_progress_everywhere() {
        let app = coordinator();
        assert_eq!(app.plan().grids.len(), 9);
        assert!(app
            .plan()
            .grids
            .iter()
            .all(|grid| grid.cells.len() == 9 && grid.sub_goal_progress == Some(0)));
        assert_eq!(app.plan_progress(), 0);
    }

    #[test]
    fn cell_progress_tracks_completion_sequence() {
        let mut app = coordinator();
        let first = add_task(&mut app, "A", Some((0, 0)));
        add_task(&mut app, "B", Some((0, 0)));
        app.toggle_task(first.id).expect("toggle");
        assert_eq!(app.cell(0, 0).expect("cell").progress, 50);

        let third = add_task(&mut app, "C", Some((0, 0)));
        assert_eq!(app.cell(0, 0).expect("cell").progress, 33);

        let (task, changes) = app.toggle_task(third.id).expect("toggle");
        assert!(task.is_completed);
        assert_eq!(app.cell(0, 0).expect("cell").progress, 67);
        assert_eq!(
            changes.cell_progress,
            vec![CellProgressChange {
                cell: CellRef { grid: 0, cell: 0 },
                from: 33,
                to: 67
            }]
        );
        // 67 / 8 = 8.375
        assert_eq!(app.plan().grids[0].sub_goal_progress, Some(8));
        // 33 / 8 = 4.125
        assert_eq!(
            changes.grid_progress,
            vec![GridProgressChange {
                grid: 0,
                from: 4,
                to: 8
            }]
        );
    }

    #[test]
    fn reloaded_plan_reports_grid_progress_from_stored_value() {
        let mut app = coordinator();
        let task = add_task(&mut app, "A", Some((6, 1)));
        app.toggle_task(task.id).expect("toggle");
        let plan = app.plan().clone();
        let tasks: Vec<Task> = app.tasks().into_iter().cloned().collect();

        let mut reloaded = Coordinator::new(plan, tasks).expect("reload");
        assert_eq!(reloaded.plan().grids[6].sub_goal_progress, Some(13));
        let (_, changes) = reloaded.toggle_task(task.id).expect("toggle");
        assert_eq!(
            changes.grid_progress,
            vec![GridProgressChange {
                grid: 6,
                from: 13,
                to: 0
            }]
        );
    }

    #[test]
    fn relink_moves_task_and_recomputes_both_cells() {
        let mut app = coordinator();
        let done = add_task(&mut app, "done", Some((1, 0)));
        let open = add_task(&mut app, "open", Some((1, 0)));
        app.toggle_task(done.id).expect("toggle");
        add_task(&mut app, "other", Some((2, 5)));
        assert_eq!(app.cell(1, 0).expect("cell").progress, 50);

        let changes = app.link_task(done.id, 2, 5).expect("relink");

        assert_eq!(holders(&app, done.id), vec![CellRef { grid: 2, cell: 5 }]);
        assert_eq!(app.cell(1, 0).expect("cell").linked_task_ids, vec![open.id]);
        assert_eq!(app.cell(1, 0).expect("cell").progress, 0);
        assert_eq!(app.cell(2, 5).expect("cell").progress, 50);
        assert_eq!(app.locate(done.id), Some(CellRef { grid: 2, cell: 5 }));
        assert_eq!(
            changes.relinks,
            vec![Relink {
                task_id: done.id,
                from: Some(CellRef { grid: 1, cell: 0 }),
                to: Some(CellRef { grid: 2, cell: 5 }),
            }]
        );
        let grids: Vec<usize> = changes.grid_progress.iter().map(|c| c.grid).collect();
        assert_eq!(grids, vec![1, 2]);
    }

    #[test]
    fn repeated_link_is_idempotent_and_silent() {
        let mut app = coordinator();
        let task = add_task(&mut app, "A", Some((3, 3)));
        let changes = app.link_task(task.id, 3, 3).expect("link");
        assert!(changes.is_empty());
        assert_eq!(app.cell(3, 3).expect("cell").linked_task_ids, vec![task.id]);
    }

    #[test]
    fn link_rejects_bad_indices_and_unknown_tasks() {
        let mut app = coordinator();
        let task = add_task(&mut app, "A", None);
        assert!(matches!(
            app.link_task(task.id, 9, 0),
            Err(PlanError::Range { label: "grid", .. })
        ));
        assert!(matches!(
            app.link_task(Uuid::new_v4(), 0, 0),
            Err(PlanError::NotFound(_))
        ));
        assert!(matches!(
            app.create_task(input("B"), Some((0, 10))),
            Err(PlanError::Range { label: "cell", .. })
        ));
        assert_eq!(app.tasks().len(), 1);
    }

    #[test]
    fn deleting_linked_task_resets_cell_progress() {
        let mut app = coordinator();
        let task = add_task(&mut app, "only", Some((5, 2)));
        app.toggle_task(task.id).expect("toggle");
        assert_eq!(app.cell(5, 2).expect("cell").progress, 100);

        let changes = app.delete_task(task.id).expect("delete");

        assert!(app.cell(5, 2).expect("cell").linked_task_ids.is_empty());
        assert_eq!(app.cell(5, 2).expect("cell").progress, 0);
        assert_eq!(app.plan().grids[5].sub_goal_progress, Some(0));
        assert_eq!(app.locate(task.id), None);
        assert_eq!(changes.deleted_tasks, vec![task.id]);
        assert!(app.task(task.id).is_none());
    }

    #[test]
    fn deleting_one_of_several_tasks_recomputes_remaining() {
        let mut app = coordinator();
        let done = add_task(&mut app, "done", Some((6, 6)));
        let open = add_task(&mut app, "open", Some((6, 6)));
        app.toggle_task(done.id).expect("toggle");

        app.delete_task(open.id).expect("delete");

        assert_eq!(app.cell(6, 6).expect("cell").linked_task_ids, vec![done.id]);
        assert_eq!(app.cell(6, 6).expect("cell").progress, 100);
    }

    #[test]
    fn unlink_of_unlinked_task_is_noop() {
        let mut app = coordinator();
        let task = add_task(&mut app, "A", None);
        let changes = app.unlink_task(task.id).expect("unlink");
        assert!(changes.is_empty());

        app.link_task(task.id, 0, 1).expect("link");
        let changes = app.unlink_task(task.id).expect("unlink");
        assert_eq!(changes.cells, vec![CellRef { grid: 0, cell: 1 }]);
        assert_eq!(app.locate(task.id), None);
    }

    #[test]
    fn convert_todo_twice_fails_and_keeps_reference() {
        let mut app = coordinator();
        let (todo, _) = app
            .add_todo(2, 1, "Find a climbing gym".to_string())
            .expect("add todo");

        let (task, changes) = app.convert_todo(todo.id, date()).expect("convert");
        assert_eq!(task.title, "Find a climbing gym");
        assert_eq!(app.locate(task.id), None);
        assert_eq!(changes.created_tasks.len(), 1);

        let err = app.convert_todo(todo.id, date()).unwrap_err();
        assert!(matches!(err, PlanError::Conversion { .. }));
        let (_, stored) = app.find_todo(todo.id).expect("todo");
        assert_eq!(stored.converted_task_id, Some(task.id));
        assert_eq!(app.tasks().len(), 1);
    }

    #[test]
    fn converted_todo_cannot_be_toggled() {
        let mut app = coordinator();
        let (todo, _) = app.add_todo(0, 0, "Stretch".to_string()).expect("add");
        let (toggled, _) = app.toggle_todo(todo.id).expect("toggle");
        assert!(toggled.is_completed);

        app.convert_todo(todo.id, date()).expect("convert");
        assert!(matches!(
            app.toggle_todo(todo.id),
            Err(PlanError::Conversion { .. })
        ));
        let (_, stored) = app.find_todo(todo.id).expect("todo");
        assert!(stored.is_completed);
    }

    #[test]
    fn cell_edits_do_not_touch_links_or_progress() {
        let mut app = coordinator();
        let task = add_task(&mut app, "A", Some((4, 0)));
        app.toggle_task(task.id).expect("toggle");

        let changes = app
            .set_cell_text(4, 0, "Health".to_string())
            .expect("set text");
        assert!(changes.cell_progress.is_empty());
        let (completed, _) = app.toggle_cell_completion(4, 0).expect("toggle");
        assert!(completed);

        let cell = app.cell(4, 0).expect("cell");
        assert_eq!(cell.text, "Health");
        assert_eq!(cell.linked_task_ids, vec![task.id]);
        assert_eq!(cell.progress, 100);
        assert!(matches!(
            app.set_cell_text(0, 9, "x".to_string()),
            Err(PlanError::Range { .. })
        ));
    }

    #[test]
    fn update_task_validates_before_applying() {
        let mut app = coordinator();
        let task = add_task(&mut app, "A", None);
        let err = app
            .update_task(
                task.id,
                TaskChanges {
                    title: Some("Renamed".to_string()),
                    start_time: Some("29:99".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
        assert_eq!(app.task(task.id).expect("task").title, "A");

        let (updated, changes) = app
            .update_task(
                task.id,
                TaskChanges {
                    start_time: Some("9:05".to_string()),
                    duration: Some(45),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.start_time.as_deref(), Some("09:05"));
        assert_eq!(updated.duration, Some(45));
        assert_eq!(changes.updated_tasks.len(), 1);
        assert!(changes.cell_progress.is_empty());
    }

    #[test]
    fn observers_receive_each_non_empty_change() {
        let mut app = coordinator();
        let seen = Rc::new(RefCell::new(Vec::new()));
        app.subscribe(Box::new(Recorder(seen.clone())));

        let task = add_task(&mut app, "A", Some((7, 7)));
        app.link_task(task.id, 7, 7).expect("noop link");
        app.toggle_task(task.id).expect("toggle");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].created_tasks.len(), 1);
        assert_eq!(seen[1].updated_tasks[0].1.is_completed, Some(true));
    }

    #[test]
    fn loading_rejects_dangling_links() {
        let mut plan = create_plan(default_categories()).expect("plan");
        plan.cell_mut(CellRef {
            grid: CENTER,
            cell: 0,
        })
        .linked_task_ids
        .push(Uuid::new_v4());
        assert!(matches!(
            Coordinator::new(plan, Vec::new()),
            Err(PlanError::Validation(_))
        ));
    }
}
