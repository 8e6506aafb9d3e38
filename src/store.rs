use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::error::PlanError;
use crate::model::{
    check_index, Category, Cell, CellRef, Grid, Plan, Task, TaskId, Todo, TodoId, CENTER,
    GRID_COUNT,
};

/// Colors used when a plan is created without explicit categories.
pub const DEFAULT_CATEGORY_COLORS: [&str; 8] = [
    "#f87171", "#fb923c", "#facc15", "#4ade80", "#2dd4bf", "#60a5fa", "#a78bfa", "#f472b6",
];

/// Builds the fixed 9x9 skeleton. Exactly one category per non-center grid.
pub fn create_plan(categories: Vec<Category>) -> Result<Plan, PlanError> {
    if categories.len() != GRID_COUNT - 1 {
        return Err(PlanError::Validation(format!(
            "expected {} categories (one per sub-goal), got {}",
            GRID_COUNT - 1,
            categories.len()
        )));
    }
    let mut seen = HashSet::new();
    for category in &categories {
        check_index("category grid", category.grid)?;
        if category.grid == CENTER {
            return Err(PlanError::Validation(
                "the center grid cannot carry a category".to_string(),
            ));
        }
        if !seen.insert(category.grid) {
            return Err(PlanError::Validation(format!(
                "duplicate category for grid {}",
                category.grid
            )));
        }
    }

    let mut categories = categories;
    categories.sort_by_key(|category| category.grid);
    Ok(Plan {
        grids: std::array::from_fn(Grid::empty),
        categories,
    })
}

pub fn default_categories() -> Vec<Category> {
    (0..GRID_COUNT)
        .filter(|grid| *grid != CENTER)
        .zip(DEFAULT_CATEGORY_COLORS)
        .map(|(grid, color)| Category {
            grid,
            color: color.to_string(),
        })
        .collect()
}

/// Canonical in-memory state: the plan plus every task keyed by id. Todos
/// live inside the cell they were added to.
#[derive(Clone, Debug)]
pub struct EntityStore {
    plan: Plan,
    tasks: HashMap<TaskId, Task>,
}

impl EntityStore {
    pub fn new(plan: Plan, tasks: Vec<Task>) -> Self {
        let tasks = tasks.into_iter().map(|task| (task.id, task)).collect();
        Self { plan, tasks }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub(crate) fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }

    pub fn tasks_by_id(&self) -> &HashMap<TaskId, Task> {
        &self.tasks
    }

    /// Split borrow used by the aggregator, which writes cells while reading tasks.
    pub(crate) fn parts_mut(&mut self) -> (&mut Plan, &HashMap<TaskId, Task>) {
        (&mut self.plan, &self.tasks)
    }

    pub fn cell(&self, grid: usize, cell: usize) -> Result<&Cell, PlanError> {
        let at = CellRef::new(grid, cell)?;
        Ok(self.plan.cell(at))
    }

    pub fn set_cell_text(&mut self, grid: usize, cell: usize, text: String) -> Result<(), PlanError> {
        let at = CellRef::new(grid, cell)?;
        self.plan.cell_mut(at).text = text;
        Ok(())
    }

    /// Flips the user-set completion flag and returns the new value.
    pub fn toggle_cell_completion(&mut self, grid: usize, cell: usize) -> Result<bool, PlanError> {
        let at = CellRef::new(grid, cell)?;
        let target = self.plan.cell_mut(at);
        target.is_completed = !target.is_completed;
        Ok(target.is_completed)
    }

    /// Sets a sub-goal title and mirrors it into the grid's center cell and,
    /// for outer grids, into the matching cell of the center grid.
    pub fn set_grid_title(&mut self, grid: usize, title: String) -> Result<Vec<CellRef>, PlanError> {
        check_index("grid", grid)?;
        let mut touched = vec![CellRef { grid, cell: CENTER }];
        if grid != CENTER {
            touched.push(CellRef {
                grid: CENTER,
                cell: grid,
            });
        }
        for at in &touched {
            self.plan.cell_mut(*at).text = title.clone();
        }
        self.plan.grids[grid].title = title;
        Ok(touched)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn require_task(&self, id: TaskId) -> Result<&Task, PlanError> {
        self.tasks
            .get(&id)
            .ok_or_else(|| PlanError::NotFound(format!("task id {id}")))
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, PlanError> {
        self.tasks
            .get_mut(&id)
            .ok_or_else(|| PlanError::NotFound(format!("task id {id}")))
    }

    pub(crate) fn insert_task(&mut self, task: Task) {
        self.tasks.insert(task.id, task);
    }

    pub(crate) fn remove_task(&mut self, id: TaskId) -> Option<Task> {
        self.tasks.remove(&id)
    }

    pub fn tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        sort_tasks(&mut tasks);
        tasks
    }

    pub fn tasks_for_date(&self, date: NaiveDate) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .values()
            .filter(|task| task.scheduled_date == date)
            .collect();
        sort_tasks(&mut tasks);
        tasks
    }

    pub fn find_todo(&self, id: TodoId) -> Option<(CellRef, &Todo)> {
        self.plan.cells().find_map(|(at, cell)| {
            cell.todos
                .iter()
                .find(|todo| todo.id == id)
                .map(|todo| (at, todo))
        })
    }

    pub(crate) fn todo_mut(&mut self, id: TodoId) -> Result<(CellRef, &mut Todo), PlanError> {
        let (at, _) = self
            .find_todo(id)
            .ok_or_else(|| PlanError::NotFound(format!("todo id {id}")))?;
        let todo = self
            .plan
            .cell_mut(at)
            .todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or_else(|| PlanError::NotFound(format!("todo id {id}")))?;
        Ok((at, todo))
    }

    pub(crate) fn remove_todo(&mut self, id: TodoId) -> Result<(CellRef, Todo), PlanError> {
        let (at, _) = self
            .find_todo(id)
            .ok_or_else(|| PlanError::NotFound(format!("todo id {id}")))?;
        let todos = &mut self.plan.cell_mut(at).todos;
        let position = todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or_else(|| PlanError::NotFound(format!("todo id {id}")))?;
        Ok((at, todos.remove(position)))
    }
}

fn sort_tasks(tasks: &mut [&Task]) {
    tasks.sort_by(|a, b| task_order(a, b));
}

/// Scheduled date, then start time with untimed tasks last, then creation.
pub fn task_order(a: &Task, b: &Task) -> Ordering {
    a.scheduled_date
        .cmp(&b.scheduled_date)
        .then_with(|| match (a.start(), b.start()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
}
