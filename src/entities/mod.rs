pub mod cell;
pub mod cell_task;
pub mod grid;
pub mod task;
pub mod todo;
