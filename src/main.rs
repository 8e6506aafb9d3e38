mod cli;

use std::fs;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::cli::{
    CellAt, CellCommand, CellText, Cli, Command, PlanCommand, PlanExport, PlanInit, PlanShow,
    PlanTitle, TaskAdd, TaskCommand, TaskDue, TaskId, TaskLink, TaskList, TaskShow, TaskUpdate,
    TodoAdd, TodoCommand, TodoConvert, TodoId,
};
use mandalart::config;
use mandalart::coordinator::{ChangeSet, Coordinator};
use mandalart::db;
use mandalart::error::AppError;
use mandalart::model::{Category, CellRef, TaskChanges, TaskInput, CENTER};
use mandalart::persist::{spawn_persist_worker, PersistFailure, Persistence};
use mandalart::schedule::due_tasks;
use mandalart::sqlite::SqlitePersistence;
use mandalart::store::default_categories;
use mandalart::util::{
    format_board_markdown, format_cell_detail, format_plan_detail, format_task_detail,
    format_task_line,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const AT_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_new(config::log_filter())
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), AppError> {
    let Cli { home, command } = Cli::parse();
    let home = config::resolve_home(home.as_deref())?;
    let db_path = db::resolve_db_path(&home);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;
    let persistence = Arc::new(SqlitePersistence::new(db));
    tracing::debug!(home = %home.display(), "opened data directory");

    let mut app = match &command {
        Command::Plan(PlanCommand::Init(args)) => {
            if persistence.load_plan().await?.is_some() {
                return Err(AppError::InvalidInput(format!(
                    "a plan already exists in {}",
                    home.display()
                )));
            }
            Coordinator::create_plan(parse_categories(&args.categories)?)?
        }
        _ => {
            let plan = persistence.load_plan().await?.ok_or_else(|| {
                AppError::NotFound("plan (run `mandalart plan init <GOAL>` first)".to_string())
            })?;
            let tasks = persistence.list_tasks().await?;
            Coordinator::new(plan, tasks)?
        }
    };

    let (queue, worker) = spawn_persist_worker(persistence);
    app.subscribe(Box::new(queue));

    let should_sync = is_mutation(&command);
    let result = dispatch(&mut app, command);
    let board = match &result {
        Ok(()) if should_sync => Some(format_board_markdown(&app)),
        _ => None,
    };
    drop(app);

    let failures = worker.finish().await?;
    if let Some(markdown) = board {
        let board_path = db::resolve_board_path(&home);
        fs::write(&board_path, markdown)?;
    }
    result?;
    report_failures(&failures)
}

fn is_mutation(command: &Command) -> bool {
    match command {
        Command::Plan(command) => matches!(command, PlanCommand::Init(_) | PlanCommand::Title(_)),
        Command::Cell(command) => matches!(command, CellCommand::Text(_) | CellCommand::Toggle(_)),
        Command::Task(command) => !matches!(
            command,
            TaskCommand::List(_) | TaskCommand::Show(_) | TaskCommand::Due(_)
        ),
        Command::Todo(_) => true,
    }
}

fn dispatch(app: &mut Coordinator, command: Command) -> Result<(), AppError> {
    match command {
        Command::Plan(command) => handle_plan(app, command),
        Command::Cell(command) => handle_cell(app, command),
        Command::Task(command) => handle_task(app, command),
        Command::Todo(command) => handle_todo(app, command),
    }
}

fn handle_plan(app: &mut Coordinator, command: PlanCommand) -> Result<(), AppError> {
    match command {
        PlanCommand::Init(args) => handle_plan_init(app, args),
        PlanCommand::Show(args) => handle_plan_show(app, args),
        PlanCommand::Export(args) => handle_plan_export(app, args),
        PlanCommand::Title(args) => handle_plan_title(app, args),
        PlanCommand::Progress => handle_plan_progress(app),
    }
}

fn handle_cell(app: &mut Coordinator, command: CellCommand) -> Result<(), AppError> {
    match command {
        CellCommand::Show(args) => handle_cell_show(app, args),
        CellCommand::Text(args) => handle_cell_text(app, args),
        CellCommand::Toggle(args) => handle_cell_toggle(app, args),
    }
}

fn handle_task(app: &mut Coordinator, command: TaskCommand) -> Result<(), AppError> {
    match command {
        TaskCommand::Add(args) => handle_task_add(app, args),
        TaskCommand::List(args) => handle_task_list(app, args),
        TaskCommand::Show(args) => handle_task_show(app, args),
        TaskCommand::Update(args) => handle_task_update(app, args),
        TaskCommand::Toggle(args) => handle_task_toggle(app, args),
        TaskCommand::Remove(args) => handle_task_remove(app, args),
        TaskCommand::Link(args) => handle_task_link(app, args),
        TaskCommand::Unlink(args) => handle_task_unlink(app, args),
        TaskCommand::Due(args) => handle_task_due(app, args),
    }
}

fn handle_todo(app: &mut Coordinator, command: TodoCommand) -> Result<(), AppError> {
    match command {
        TodoCommand::Add(args) => handle_todo_add(app, args),
        TodoCommand::Toggle(args) => handle_todo_toggle(app, args),
        TodoCommand::Remove(args) => handle_todo_remove(app, args),
        TodoCommand::Convert(args) => handle_todo_convert(app, args),
    }
}

fn handle_plan_init(app: &mut Coordinator, args: PlanInit) -> Result<(), AppError> {
    let changes = app.set_grid_title(CENTER, args.goal.clone())?;
    println!("Created plan: {}", args.goal);
    print_progress_changes(&changes);
    Ok(())
}

fn handle_plan_show(app: &mut Coordinator, args: PlanShow) -> Result<(), AppError> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(app.plan())?);
    } else {
        println!("{}", format_plan_detail(app.store()));
    }
    Ok(())
}

fn handle_plan_export(app: &mut Coordinator, args: PlanExport) -> Result<(), AppError> {
    db::ensure_parent_dir(&args.path)?;
    fs::write(&args.path, format_board_markdown(app))?;
    println!("Exported plan to {}", args.path.display());
    Ok(())
}

fn handle_plan_title(app: &mut Coordinator, args: PlanTitle) -> Result<(), AppError> {
    let changes = app.set_grid_title(args.grid, args.title.clone())?;
    println!("Updated grid {} title: {}", args.grid, args.title);
    print_progress_changes(&changes);
    Ok(())
}

fn handle_plan_progress(app: &mut Coordinator) -> Result<(), AppError> {
    println!("Plan progress: {}%", app.plan_progress());
    for grid in &app.plan().grids {
        println!(
            "- Grid {}: {}%",
            grid.id,
            grid.sub_goal_progress.unwrap_or_default()
        );
    }
    Ok(())
}

fn handle_cell_show(app: &mut Coordinator, args: CellAt) -> Result<(), AppError> {
    let at = CellRef::new(args.grid, args.cell)?;
    println!("{}", format_cell_detail(app.store(), at, app.plan().cell(at)));
    Ok(())
}

fn handle_cell_text(app: &mut Coordinator, args: CellText) -> Result<(), AppError> {
    let changes = app.set_cell_text(args.grid, args.cell, args.text)?;
    println!("Updated cell {}/{}.", args.grid, args.cell);
    print_progress_changes(&changes);
    Ok(())
}

fn handle_cell_toggle(app: &mut Coordinator, args: CellAt) -> Result<(), AppError> {
    let (completed, changes) = app.toggle_cell_completion(args.grid, args.cell)?;
    println!(
        "Cell {}/{} marked {}.",
        args.grid,
        args.cell,
        if completed { "done" } else { "not done" }
    );
    print_progress_changes(&changes);
    Ok(())
}

fn handle_task_add(app: &mut Coordinator, args: TaskAdd) -> Result<(), AppError> {
    let link = match args.cell.as_deref() {
        Some([grid, cell]) => Some((*grid, *cell)),
        Some(_) => {
            return Err(AppError::InvalidInput(
                "--cell expects GRID and CELL".to_string(),
            ))
        }
        None => None,
    };
    let input = TaskInput {
        title: args.title,
        scheduled_date: parse_date_or_today(args.date.as_deref())?,
        start_time: args.time,
        duration: args.duration,
    };
    let (task, changes) = app.create_task(input, link)?;
    println!("Created task ID: {}: {}", task.id, task.title);
    if let Some(at) = app.locate(task.id) {
        println!("Linked to cell {at}.");
    }
    print_progress_changes(&changes);
    Ok(())
}

fn handle_task_list(app: &mut Coordinator, args: TaskList) -> Result<(), AppError> {
    let tasks = match args.date.as_deref() {
        Some(value) => app.tasks_for_date(parse_date(value)?),
        None => app.tasks(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    for task in tasks {
        println!("{}", format_task_line(task, app.locate(task.id)));
    }
    Ok(())
}

fn handle_task_show(app: &mut Coordinator, args: TaskShow) -> Result<(), AppError> {
    let id = parse_id("task", &args.id)?;
    let task = app
        .task(id)
        .ok_or_else(|| AppError::NotFound(format!("task id {id}")))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        println!("{}", format_task_detail(task, app.locate(id)));
    }
    Ok(())
}

fn handle_task_update(app: &mut Coordinator, args: TaskUpdate) -> Result<(), AppError> {
    let id = parse_id("task", &args.id)?;
    let changes = TaskChanges {
        title: args.title,
        is_completed: None,
        scheduled_date: args.date.as_deref().map(parse_date).transpose()?,
        start_time: args.time,
        duration: args.duration,
    };
    if changes.is_empty() {
        return Err(AppError::InvalidInput(
            "task update requires at least one of --title, --date, --time, --duration"
                .to_string(),
        ));
    }
    let (task, changes) = app.update_task(id, changes)?;
    println!("Updated task ID: {}: {}", task.id, task.title);
    print_progress_changes(&changes);
    Ok(())
}

fn handle_task_toggle(app: &mut Coordinator, args: TaskId) -> Result<(), AppError> {
    let id = parse_id("task", &args.id)?;
    let (task, changes) = app.toggle_task(id)?;
    println!(
        "Task ID: {} marked {}.",
        task.id,
        if task.is_completed { "done" } else { "todo" }
    );
    print_progress_changes(&changes);
    Ok(())
}

fn handle_task_remove(app: &mut Coordinator, args: TaskId) -> Result<(), AppError> {
    let id = parse_id("task", &args.id)?;
    let changes = app.delete_task(id)?;
    println!("Removed task ID: {id}.");
    print_progress_changes(&changes);
    Ok(())
}

fn handle_task_link(app: &mut Coordinator, args: TaskLink) -> Result<(), AppError> {
    let id = parse_id("task", &args.id)?;
    let changes = app.link_task(id, args.grid, args.cell)?;
    match changes.relinks.first().and_then(|relink| relink.from) {
        Some(from) => println!(
            "Moved task ID: {id} from cell {from} to cell {}/{}.",
            args.grid, args.cell
        ),
        None => println!("Linked task ID: {id} to cell {}/{}.", args.grid, args.cell),
    }
    print_progress_changes(&changes);
    Ok(())
}

fn handle_task_unlink(app: &mut Coordinator, args: TaskId) -> Result<(), AppError> {
    let id = parse_id("task", &args.id)?;
    let changes = app.unlink_task(id)?;
    if changes.relinks.is_empty() {
        println!("Task ID: {id} is not linked to a cell.");
    } else {
        println!("Unlinked task ID: {id}.");
    }
    print_progress_changes(&changes);
    Ok(())
}

fn handle_task_due(app: &mut Coordinator, args: TaskDue) -> Result<(), AppError> {
    let at = match args.at.as_deref() {
        Some(value) => NaiveDateTime::parse_from_str(value.trim(), AT_FORMAT).map_err(|_| {
            AppError::InvalidInput(format!("--at must be YYYY-MM-DDTHH:MM, got {value:?}"))
        })?,
        None => Local::now().naive_local(),
    };
    let due = due_tasks(app.tasks(), at);
    if due.is_empty() {
        println!("No tasks due at {}.", at.format(AT_FORMAT));
        return Ok(());
    }
    for task in due {
        println!("{}", format_task_line(task, app.locate(task.id)));
    }
    Ok(())
}

fn handle_todo_add(app: &mut Coordinator, args: TodoAdd) -> Result<(), AppError> {
    let (todo, changes) = app.add_todo(args.grid, args.cell, args.text)?;
    println!("Created todo ID: {}: {}", todo.id, todo.text);
    print_progress_changes(&changes);
    Ok(())
}

fn handle_todo_toggle(app: &mut Coordinator, args: TodoId) -> Result<(), AppError> {
    let id = parse_id("todo", &args.id)?;
    let (todo, changes) = app.toggle_todo(id)?;
    println!(
        "Todo ID: {} marked {}.",
        todo.id,
        if todo.is_completed { "done" } else { "open" }
    );
    print_progress_changes(&changes);
    Ok(())
}

fn handle_todo_remove(app: &mut Coordinator, args: TodoId) -> Result<(), AppError> {
    let id = parse_id("todo", &args.id)?;
    let changes = app.delete_todo(id)?;
    println!("Removed todo ID: {id}.");
    print_progress_changes(&changes);
    Ok(())
}

fn handle_todo_convert(app: &mut Coordinator, args: TodoConvert) -> Result<(), AppError> {
    let id = parse_id("todo", &args.id)?;
    let date = parse_date_or_today(args.date.as_deref())?;
    let (task, changes) = app.convert_todo(id, date)?;
    println!(
        "Converted todo ID: {id} to task ID: {}: {}",
        task.id, task.title
    );
    print_progress_changes(&changes);
    Ok(())
}

fn parse_categories(values: &[String]) -> Result<Vec<Category>, AppError> {
    if values.is_empty() {
        return Ok(default_categories());
    }
    values
        .iter()
        .map(|value| {
            let (grid, color) = value.split_once('=').ok_or_else(|| {
                AppError::InvalidInput(format!("category must be GRID=COLOR, got {value:?}"))
            })?;
            let grid = grid.trim().parse::<usize>().map_err(|_| {
                AppError::InvalidInput(format!("category grid must be a number, got {grid:?}"))
            })?;
            let color = color.trim();
            if color.is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "category color for grid {grid} cannot be empty"
                )));
            }
            Ok(Category {
                grid,
                color: color.to_string(),
            })
        })
        .collect()
}

fn parse_id(label: &str, value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::InvalidInput(format!("invalid {label} id {value:?}")))
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| AppError::InvalidInput(format!("date must be YYYY-MM-DD, got {value:?}")))
}

fn parse_date_or_today(value: Option<&str>) -> Result<NaiveDate, AppError> {
    match value {
        Some(value) => parse_date(value),
        None => Ok(Local::now().date_naive()),
    }
}

fn print_progress_changes(changes: &ChangeSet) {
    if changes.cell_progress.is_empty() && changes.grid_progress.is_empty() {
        return;
    }

    println!("Progress updates:");
    for change in &changes.cell_progress {
        println!(
            "- Cell {} progress changed from {}% to {}%.",
            change.cell, change.from, change.to
        );
    }
    for change in &changes.grid_progress {
        println!(
            "- Grid {} progress changed from {}% to {}%.",
            change.grid, change.from, change.to
        );
    }
}

fn report_failures(failures: &[PersistFailure]) -> Result<(), AppError> {
    if failures.is_empty() {
        return Ok(());
    }
    let lines: Vec<String> = failures
        .iter()
        .map(|failure| format!("- {}: {}", failure.op, failure.error))
        .collect();
    Err(AppError::Persistence(format!(
        "{} change(s) were not saved\n{}",
        failures.len(),
        lines.join("\n")
    )))
}
