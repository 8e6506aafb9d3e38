use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema, Statement};
use url::Url;

use crate::entities::{cell, cell_task, grid, task, todo};
use crate::error::AppError;

pub fn resolve_db_path(home: &Path) -> PathBuf {
    home.join("mandalart.db")
}

pub fn resolve_board_path(home: &Path) -> PathBuf {
    home.join("board.md")
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Lock file next to the database; holding it marks the single active session.
pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::InvalidInput(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await?;

    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut grid_stmt = schema.create_table_from_entity(grid::Entity);
    grid_stmt.if_not_exists();
    db.execute(builder.build(&grid_stmt)).await?;

    let mut cell_stmt = schema.create_table_from_entity(cell::Entity);
    cell_stmt.if_not_exists();
    db.execute(builder.build(&cell_stmt)).await?;

    let mut task_stmt = schema.create_table_from_entity(task::Entity);
    task_stmt.if_not_exists();
    db.execute(builder.build(&task_stmt)).await?;

    let mut link_stmt = schema.create_table_from_entity(cell_task::Entity);
    link_stmt.if_not_exists();
    db.execute(builder.build(&link_stmt)).await?;

    let mut todo_stmt = schema.create_table_from_entity(todo::Entity);
    todo_stmt.if_not_exists();
    db.execute(builder.build(&todo_stmt)).await?;

    let mut date_index = Index::create()
        .name("idx_tasks_scheduled_date")
        .table(task::Entity)
        .col(task::Column::ScheduledDate)
        .to_owned();
    date_index.if_not_exists();
    db.execute(builder.build(&date_index)).await?;

    let mut link_index = Index::create()
        .name("idx_cell_tasks_cell")
        .table(cell_task::Entity)
        .col(cell_task::Column::GridIdx)
        .col(cell_task::Column::CellIdx)
        .col(cell_task::Column::Position)
        .to_owned();
    link_index.if_not_exists();
    db.execute(builder.build(&link_index)).await?;

    let mut todo_index = Index::create()
        .name("idx_todos_cell")
        .table(todo::Entity)
        .col(todo::Column::GridIdx)
        .col(todo::Column::CellIdx)
        .col(todo::Column::Position)
        .to_owned();
    todo_index.if_not_exists();
    db.execute(builder.build(&todo_index)).await?;

    Ok(())
}
