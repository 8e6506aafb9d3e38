use chrono::{DateTime, Utc};

use crate::coordinator::Coordinator;
use crate::model::{Cell, CellRef, Grid, Task, Todo, CENTER};
use crate::progress;
use crate::store::EntityStore;

fn checkbox(done: bool) -> &'static str {
    if done {
        "x"
    } else {
        " "
    }
}

fn or_untitled(text: &str) -> &str {
    if text.trim().is_empty() {
        "(untitled)"
    } else {
        text
    }
}

fn collapse_heading(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let parts: Vec<&str> = normalized
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();
    if parts.is_empty() {
        "(untitled)".to_string()
    } else {
        parts.join(" / ")
    }
}

fn push_line(lines: &mut Vec<String>, indent: usize, text: &str) {
    let mut line = String::new();
    line.push_str(&" ".repeat(indent));
    line.push_str(text);
    lines.push(line);
}

fn push_blank(lines: &mut Vec<String>) {
    lines.push(String::new());
}

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_schedule(task: &Task) -> String {
    let mut output = task.scheduled_date.format("%Y-%m-%d").to_string();
    if let Some(start) = task.start_time.as_deref() {
        output.push(' ');
        output.push_str(start);
    }
    if let Some(minutes) = task.duration {
        output.push_str(&format!(" ({minutes} min)"));
    }
    output
}

pub fn format_task_line(task: &Task, location: Option<CellRef>) -> String {
    let mut output = format!(
        "- [{}] {} ({}, id {}",
        checkbox(task.is_completed),
        task.title,
        format_schedule(task),
        task.id
    );
    if let Some(at) = location {
        output.push_str(&format!(", cell {at}"));
    }
    output.push(')');
    output
}

pub fn format_task_detail(task: &Task, location: Option<CellRef>) -> String {
    let mut output = String::new();
    output.push_str(&format!("Task ID: {}\n", task.id));
    output.push_str(&format!("Title: {}\n", task.title));
    output.push_str(&format!(
        "Status: {}\n",
        if task.is_completed { "done" } else { "todo" }
    ));
    output.push_str(&format!("Scheduled: {}\n", format_schedule(task)));
    match location {
        Some(at) => output.push_str(&format!("Cell: {at}\n")),
        None => output.push_str("Cell: (unlinked)\n"),
    }
    output.push_str(&format!("Created: {}\n", format_datetime(task.created_at)));
    output.trim_end().to_string()
}

fn format_todo_line(todo: &Todo) -> String {
    match todo.converted_task_id {
        Some(task_id) => format!(
            "- [{}] {} (todo id {}, converted to task {})",
            checkbox(todo.is_completed),
            todo.text,
            todo.id,
            task_id
        ),
        None => format!(
            "- [{}] {} (todo id {})",
            checkbox(todo.is_completed),
            todo.text,
            todo.id
        ),
    }
}

pub fn format_cell_detail(store: &EntityStore, at: CellRef, cell: &Cell) -> String {
    let mut output = String::new();
    output.push_str(&format!("Cell: {at}\n"));
    output.push_str(&format!("Text: {}\n", or_untitled(&cell.text)));
    output.push_str(&format!("Marked done: {}\n", cell.is_completed));
    output.push_str(&format!("Progress: {}%\n", cell.progress));
    output.push('\n');
    if cell.linked_task_ids.is_empty() {
        output.push_str("Tasks: (none)\n");
    } else {
        output.push_str("Tasks:\n");
        for id in &cell.linked_task_ids {
            if let Some(task) = store.task(*id) {
                output.push_str(&format_task_line(task, None));
                output.push('\n');
            }
        }
    }
    output.push('\n');
    if cell.todos.is_empty() {
        output.push_str("Todos: (none)");
        return output;
    }
    output.push_str("Todos:\n");
    for todo in &cell.todos {
        output.push_str(&format_todo_line(todo));
        output.push('\n');
    }
    output.trim_end().to_string()
}

fn grid_summary(store: &EntityStore, grid: &Grid) -> String {
    let mut output = format!("Grid {}: {}", grid.id, or_untitled(&grid.title));
    if let Some(color) = store.plan().category_color(grid.id) {
        output.push_str(&format!(" [{color}]"));
    }
    if let Some(progress) = grid.sub_goal_progress {
        output.push_str(&format!(" {progress}%"));
    }
    output
}

pub fn format_plan_detail(store: &EntityStore) -> String {
    let plan = store.plan();
    let mut output = String::new();
    output.push_str(&format!("Goal: {}\n", or_untitled(&plan.grids[CENTER].title)));
    output.push_str(&format!("Progress: {}%\n", progress::plan_progress(plan)));
    for grid in &plan.grids {
        output.push('\n');
        output.push_str(&grid_summary(store, grid));
        output.push('\n');
        for (idx, cell) in grid.cells.iter().enumerate() {
            if idx == CENTER || (cell.text.is_empty() && cell.linked_task_ids.is_empty()) {
                continue;
            }
            output.push_str(&format!(
                "  {idx}. [{}] {} ({}%, tasks {}, todos {})\n",
                checkbox(cell.is_completed),
                or_untitled(&cell.text),
                cell.progress,
                cell.linked_task_ids.len(),
                cell.todos.len()
            ));
        }
    }
    output.trim_end().to_string()
}

/// Renders the whole board as Markdown: one section per grid with its cells,
/// their linked tasks and todos, followed by tasks not linked to any cell.
pub fn format_board_markdown(app: &Coordinator) -> String {
    let store = app.store();
    let plan = store.plan();
    let mut lines = Vec::new();
    push_line(&mut lines, 0, "# Mandalart");
    push_blank(&mut lines);
    push_line(
        &mut lines,
        0,
        &format!("## Goal: {}", collapse_heading(&plan.grids[CENTER].title)),
    );
    push_blank(&mut lines);
    push_line(
        &mut lines,
        0,
        &format!("- **Progress:** {}%", progress::plan_progress(plan)),
    );
    push_line(
        &mut lines,
        0,
        &format!("- **Tasks:** {}", store.tasks_by_id().len()),
    );

    for grid in &plan.grids {
        push_blank(&mut lines);
        let mut heading = format!("### Grid {}: {}", grid.id, collapse_heading(&grid.title));
        if let Some(progress) = grid.sub_goal_progress {
            heading.push_str(&format!(" ({progress}%)"));
        }
        push_line(&mut lines, 0, &heading);
        push_blank(&mut lines);
        if let Some(color) = plan.category_color(grid.id) {
            push_line(&mut lines, 0, &format!("- **Color:** `{color}`"));
        }

        for (idx, cell) in grid.cells.iter().enumerate() {
            if idx == CENTER {
                continue;
            }
            push_line(
                &mut lines,
                0,
                &format!(
                    "- [{}] **{}** *(cell {}/{}, {}%)*",
                    checkbox(cell.is_completed),
                    collapse_heading(&cell.text),
                    grid.id,
                    idx,
                    cell.progress
                ),
            );
            for id in &cell.linked_task_ids {
                if let Some(task) = store.task(*id) {
                    push_line(&mut lines, 2, &format_task_line(task, None));
                }
            }
            for todo in &cell.todos {
                push_line(&mut lines, 2, &format_todo_line(todo));
            }
        }
    }

    let unlinked: Vec<&Task> = store
        .tasks()
        .into_iter()
        .filter(|task| app.locate(task.id).is_none())
        .collect();
    push_blank(&mut lines);
    push_line(&mut lines, 0, "### Unlinked tasks");
    push_blank(&mut lines);
    if unlinked.is_empty() {
        push_line(&mut lines, 0, "*No tasks*");
    }
    for task in unlinked {
        push_line(&mut lines, 0, &format_task_line(task, None));
    }

    lines.join("\n").trim_end().to_string()
}
