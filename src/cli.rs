use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mandalart",
    version,
    about = "Plan goals on a 9x9 Mandalart board backed by SQLite"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Data directory (defaults to $MANDALART_HOME or ~/.mandalart)"
    )]
    pub home: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Plan(PlanCommand),
    #[command(subcommand)]
    Cell(CellCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Todo(TodoCommand),
}

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    Init(PlanInit),
    Show(PlanShow),
    Export(PlanExport),
    Title(PlanTitle),
    Progress,
}

#[derive(Subcommand, Debug)]
pub enum CellCommand {
    Show(CellAt),
    Text(CellText),
    Toggle(CellAt),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    Add(TaskAdd),
    List(TaskList),
    Show(TaskShow),
    Update(TaskUpdate),
    Toggle(TaskId),
    Remove(TaskId),
    Link(TaskLink),
    Unlink(TaskId),
    Due(TaskDue),
}

#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    Add(TodoAdd),
    Toggle(TodoId),
    Remove(TodoId),
    Convert(TodoConvert),
}

#[derive(Args, Debug)]
pub struct PlanInit {
    pub goal: String,
    #[arg(
        long = "category",
        value_name = "GRID=COLOR",
        help = "Color for a sub-goal grid; give all eight or none for the default palette"
    )]
    pub categories: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PlanShow {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PlanExport {
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct PlanTitle {
    pub grid: usize,
    pub title: String,
}

#[derive(Args, Debug)]
pub struct CellAt {
    pub grid: usize,
    pub cell: usize,
}

#[derive(Args, Debug)]
pub struct CellText {
    pub grid: usize,
    pub cell: usize,
    pub text: String,
}

#[derive(Args, Debug)]
pub struct TaskAdd {
    pub title: String,
    #[arg(long, value_name = "YYYY-MM-DD", help = "Scheduled date (defaults to today)")]
    pub date: Option<String>,
    #[arg(long, value_name = "HH:MM")]
    pub time: Option<String>,
    #[arg(long, value_name = "MINUTES")]
    pub duration: Option<u32>,
    #[arg(long, num_args = 2, value_names = ["GRID", "CELL"])]
    pub cell: Option<Vec<usize>>,
}

#[derive(Args, Debug)]
pub struct TaskList {
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TaskShow {
    pub id: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TaskUpdate {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<String>,
    #[arg(long, value_name = "HH:MM")]
    pub time: Option<String>,
    #[arg(long, value_name = "MINUTES")]
    pub duration: Option<u32>,
}

#[derive(Args, Debug)]
pub struct TaskId {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct TaskLink {
    pub id: String,
    pub grid: usize,
    pub cell: usize,
}

#[derive(Args, Debug)]
pub struct TaskDue {
    #[arg(long, value_name = "YYYY-MM-DDTHH:MM", help = "Defaults to the current local minute")]
    pub at: Option<String>,
}

#[derive(Args, Debug)]
pub struct TodoAdd {
    pub grid: usize,
    pub cell: usize,
    pub text: String,
}

#[derive(Args, Debug)]
pub struct TodoId {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct TodoConvert {
    pub id: String,
    #[arg(long, value_name = "YYYY-MM-DD", help = "Scheduled date (defaults to today)")]
    pub date: Option<String>,
}
