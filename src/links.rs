use std::collections::HashMap;

use crate::error::PlanError;
use crate::model::{CellRef, Plan, TaskId};

/// What `link_task` did. A task already linked elsewhere is moved, never
/// rejected, so the conflict is resolved here and reported as `Moved`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkOutcome {
    Linked,
    Unchanged,
    Moved { from: CellRef },
}

/// Reverse index task id -> owning cell. Kept in lockstep with the
/// `linked_task_ids` vectors of the plan it was built from.
#[derive(Clone, Debug, Default)]
pub struct LinkIndex {
    locations: HashMap<TaskId, CellRef>,
}

impl LinkIndex {
    /// Rebuilds the index from a plan, rejecting plans where a task is linked
    /// from two cells.
    pub fn build(plan: &Plan) -> Result<Self, PlanError> {
        let mut locations = HashMap::new();
        for (at, cell) in plan.cells() {
            for task_id in &cell.linked_task_ids {
                if let Some(existing) = locations.insert(*task_id, at) {
                    return Err(PlanError::Validation(format!(
                        "task {task_id} is linked from both cell {existing} and cell {at}"
                    )));
                }
            }
        }
        Ok(Self { locations })
    }

    pub fn locate(&self, task_id: TaskId) -> Option<CellRef> {
        self.locations.get(&task_id).copied()
    }

    pub fn link_task(
        &mut self,
        plan: &mut Plan,
        task_id: TaskId,
        grid: usize,
        cell: usize,
    ) -> Result<LinkOutcome, PlanError> {
        let target = CellRef::new(grid, cell)?;
        let outcome = match self.locate(task_id) {
            Some(current) if current == target => LinkOutcome::Unchanged,
            Some(current) => {
                plan.cell_mut(current)
                    .linked_task_ids
                    .retain(|id| *id != task_id);
                LinkOutcome::Moved { from: current }
            }
            None => LinkOutcome::Linked,
        };

        let linked = &mut plan.cell_mut(target).linked_task_ids;
        if !linked.contains(&task_id) {
            linked.push(task_id);
        }
        self.locations.insert(task_id, target);
        Ok(outcome)
    }

    /// Removes the task from its cell and returns where it was. Unlinked
    /// tasks are a no-op.
    pub fn unlink_task(&mut self, plan: &mut Plan, task_id: TaskId) -> Option<CellRef> {
        let current = self.locations.remove(&task_id)?;
        plan.cell_mut(current)
            .linked_task_ids
            .retain(|id| *id != task_id);
        Some(current)
    }
}
