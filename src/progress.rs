//! Completion percentages derived from task state.
//!
//! Everything here is a pure function of the plan and the task map. Stored
//! `progress`/`sub_goal_progress` fields are only ever written by the
//! `refresh_*` helpers, which the coordinator calls after each mutation.

use std::collections::HashMap;

use crate::model::{Cell, CellRef, Grid, Plan, Task, TaskId, CENTER};

/// `round(100 * done / total)`, half away from zero, 0 for an empty set.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done * 200 + total) / (total * 2)) as u8
}

fn rounded_average(values: impl Iterator<Item = u8>) -> u8 {
    let (sum, count) = values.fold((0usize, 0usize), |(sum, count), value| {
        (sum + value as usize, count + 1)
    });
    if count == 0 {
        return 0;
    }
    ((sum * 2 + count) / (count * 2)) as u8
}

pub fn cell_progress(cell: &Cell, tasks_by_id: &HashMap<TaskId, Task>) -> u8 {
    let done = cell
        .linked_task_ids
        .iter()
        .filter(|id| tasks_by_id.get(*id).is_some_and(|task| task.is_completed))
        .count();
    percent(done, cell.linked_task_ids.len())
}

/// Average of the eight non-center cells. The center cell mirrors the
/// sub-goal title and does not count towards its own grid.
pub fn grid_progress(grid: &Grid) -> u8 {
    rounded_average(
        grid.cells
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != CENTER)
            .map(|(_, cell)| cell.progress),
    )
}

/// Average of all nine grids, each weighted equally.
pub fn plan_progress(plan: &Plan) -> u8 {
    rounded_average(plan.grids.iter().map(grid_progress))
}

/// Recomputes one cell. Returns `(before, after)`.
pub fn refresh_cell(
    plan: &mut Plan,
    at: CellRef,
    tasks_by_id: &HashMap<TaskId, Task>,
) -> (u8, u8) {
    let cell = plan.cell_mut(at);
    let before = cell.progress;
    cell.progress = cell_progress(cell, tasks_by_id);
    (before, cell.progress)
}

/// Recomputes one grid's sub-goal progress. Returns `(before, after)`.
pub fn refresh_grid(plan: &mut Plan, grid: usize) -> (u8, u8) {
    let target = &mut plan.grids[grid];
    let before = target.sub_goal_progress.unwrap_or_default();
    let after = grid_progress(target);
    target.sub_goal_progress = Some(after);
    (before, after)
}

/// Full recomputation, used after loading a plan from storage.
pub fn recompute_all(plan: &mut Plan, tasks_by_id: &HashMap<TaskId, Task>) {
    for grid in plan.grids.iter_mut() {
        for cell in grid.cells.iter_mut() {
            cell.progress = cell_progress(cell, tasks_by_id);
        }
        grid.sub_goal_progress = Some(grid_progress(grid));
    }
}
