use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlanError;

pub const GRID_COUNT: usize = 9;
pub const CELLS_PER_GRID: usize = 9;
/// Index of the center grid, and of the center cell inside every grid.
pub const CENTER: usize = 4;

pub const START_TIME_FORMAT: &str = "%H:%M";

pub type TaskId = Uuid;
pub type TodoId = Uuid;

/// Validated address of a cell. Both indices are in `0..=8`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub grid: usize,
    pub cell: usize,
}

impl CellRef {
    pub fn new(grid: usize, cell: usize) -> Result<Self, PlanError> {
        check_index("grid", grid)?;
        check_index("cell", cell)?;
        Ok(Self { grid, cell })
    }
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.grid, self.cell)
    }
}

pub fn check_index(label: &'static str, index: usize) -> Result<(), PlanError> {
    if index >= GRID_COUNT {
        return Err(PlanError::Range { label, index });
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub grids: [Grid; GRID_COUNT],
    pub categories: Vec<Category>,
}

impl Plan {
    pub fn cell(&self, at: CellRef) -> &Cell {
        &self.grids[at.grid].cells[at.cell]
    }

    pub fn cell_mut(&mut self, at: CellRef) -> &mut Cell {
        &mut self.grids[at.grid].cells[at.cell]
    }

    pub fn category_color(&self, grid: usize) -> Option<&str> {
        self.categories
            .iter()
            .find(|category| category.grid == grid)
            .map(|category| category.color.as_str())
    }

    /// Every cell with its address, grid-major.
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.grids.iter().enumerate().flat_map(|(grid_idx, grid)| {
            grid.cells.iter().enumerate().map(move |(cell_idx, cell)| {
                (
                    CellRef {
                        grid: grid_idx,
                        cell: cell_idx,
                    },
                    cell,
                )
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    pub id: usize,
    pub title: String,
    pub cells: [Cell; CELLS_PER_GRID],
    pub sub_goal_progress: Option<u8>,
}

impl Grid {
    pub fn empty(id: usize) -> Self {
        Self {
            id,
            title: String::new(),
            cells: Default::default(),
            sub_goal_progress: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub text: String,
    pub is_completed: bool,
    pub linked_task_ids: Vec<TaskId>,
    pub todos: Vec<Todo>,
    pub progress: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub is_completed: bool,
    pub scheduled_date: NaiveDate,
    pub start_time: Option<String>,
    pub duration: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn start(&self) -> Option<NaiveTime> {
        self.start_time
            .as_deref()
            .and_then(|value| NaiveTime::parse_from_str(value, START_TIME_FORMAT).ok())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub converted_task_id: Option<TaskId>,
}

impl Todo {
    pub fn new(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            is_completed: false,
            created_at: Utc::now(),
            converted_task_id: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub grid: usize,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,
    pub scheduled_date: NaiveDate,
    pub start_time: Option<String>,
    pub duration: Option<u32>,
}

/// Partial task update; also the patch handed to `Persistence::update_task`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
    pub scheduled_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub duration: Option<u32>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.is_completed.is_none()
            && self.scheduled_date.is_none()
            && self.start_time.is_none()
            && self.duration.is_none()
    }
}

/// Parses a "HH:MM" start time and returns it zero-padded.
pub fn normalize_start_time(value: &str) -> Result<String, PlanError> {
    NaiveTime::parse_from_str(value.trim(), START_TIME_FORMAT)
        .map(|time| time.format(START_TIME_FORMAT).to_string())
        .map_err(|_| PlanError::Validation(format!("start time must be HH:MM, got {value:?}")))
}

/// Longest accepted task duration: one week.
pub const MAX_DURATION_MINUTES: u32 = 7 * 24 * 60;

pub fn validate_duration(minutes: u32) -> Result<(), PlanError> {
    if minutes == 0 {
        return Err(PlanError::Validation(
            "duration must be at least one minute".to_string(),
        ));
    }
    if minutes > MAX_DURATION_MINUTES {
        return Err(PlanError::Validation(format!(
            "duration must be at most {MAX_DURATION_MINUTES} minutes, got {minutes}"
        )));
    }
    Ok(())
}

pub fn ensure_non_empty(label: &str, value: &str) -> Result<(), PlanError> {
    if value.trim().is_empty() {
        return Err(PlanError::Validation(format!("{label} cannot be empty")));
    }
    Ok(())
}
