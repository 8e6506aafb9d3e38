use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{cell, cell_task, grid, task, todo};
use crate::error::{AppError, PlanError};
use crate::model::{
    check_index, Category, CellRef, Grid, Plan, Task, TaskChanges, TaskId, Todo, CENTER, GRID_COUNT,
};
use crate::persist::Persistence;
use crate::store::task_order;

/// `Persistence` backed by a SQLite database through sea-orm.
#[derive(Clone)]
pub struct SqlitePersistence {
    db: DatabaseConnection,
}

impl SqlitePersistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn write_plan(&self, txn: &DatabaseTransaction, plan: &Plan) -> Result<(), AppError> {
        cell_task::Entity::delete_many().exec(txn).await?;
        todo::Entity::delete_many().exec(txn).await?;
        cell::Entity::delete_many().exec(txn).await?;
        grid::Entity::delete_many().exec(txn).await?;

        let grids: Vec<grid::ActiveModel> = plan
            .grids
            .iter()
            .map(|item| grid::ActiveModel {
                id: Set(item.id as i32),
                title: Set(item.title.clone()),
                color: Set(plan.category_color(item.id).map(str::to_string)),
            })
            .collect();
        grid::Entity::insert_many(grids)
            .exec_without_returning(txn)
            .await?;

        let mut cells = Vec::new();
        let mut links = Vec::new();
        let mut todos = Vec::new();
        for (at, item) in plan.cells() {
            let (grid_idx, cell_idx) = (at.grid as i32, at.cell as i32);
            cells.push(cell::ActiveModel {
                grid_idx: Set(grid_idx),
                cell_idx: Set(cell_idx),
                text: Set(item.text.clone()),
                is_completed: Set(item.is_completed),
            });
            for (position, task_id) in item.linked_task_ids.iter().enumerate() {
                links.push(cell_task::ActiveModel {
                    task_id: Set(task_id.to_string()),
                    grid_idx: Set(grid_idx),
                    cell_idx: Set(cell_idx),
                    position: Set(position as i32),
                });
            }
            for (position, entry) in item.todos.iter().enumerate() {
                todos.push(todo::ActiveModel {
                    id: Set(entry.id.to_string()),
                    grid_idx: Set(grid_idx),
                    cell_idx: Set(cell_idx),
                    position: Set(position as i32),
                    text: Set(entry.text.clone()),
                    is_completed: Set(entry.is_completed),
                    created_at: Set(entry.created_at),
                    converted_task_id: Set(entry.converted_task_id.map(|id| id.to_string())),
                });
            }
        }
        cell::Entity::insert_many(cells)
            .exec_without_returning(txn)
            .await?;
        if !links.is_empty() {
            cell_task::Entity::insert_many(links)
                .exec_without_returning(txn)
                .await?;
        }
        if !todos.is_empty() {
            todo::Entity::insert_many(todos)
                .exec_without_returning(txn)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Persistence for SqlitePersistence {
    async fn create_task(&self, task: &Task) -> Result<Task, AppError> {
        let duration = task.duration.map(duration_to_db).transpose()?;
        let active = task::ActiveModel {
            id: Set(task.id.to_string()),
            title: Set(task.title.clone()),
            is_completed: Set(task.is_completed),
            scheduled_date: Set(task.scheduled_date),
            start_time: Set(task.start_time.clone()),
            duration: Set(duration),
            created_at: Set(task.created_at),
        };
        let model = active.insert(&self.db).await?;
        task_from_model(model)
    }

    async fn update_task(&self, id: TaskId, patch: &TaskChanges) -> Result<Task, AppError> {
        let mut active = task::ActiveModel {
            id: Set(id.to_string()),
            ..Default::default()
        };
        if let Some(title) = patch.title.clone() {
            active.title = Set(title);
        }
        if let Some(completed) = patch.is_completed {
            active.is_completed = Set(completed);
        }
        if let Some(date) = patch.scheduled_date {
            active.scheduled_date = Set(date);
        }
        if let Some(start_time) = patch.start_time.clone() {
            active.start_time = Set(Some(start_time));
        }
        if let Some(duration) = patch.duration {
            active.duration = Set(Some(duration_to_db(duration)?));
        }

        match active.update(&self.db).await {
            Ok(model) => task_from_model(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound(format!("task id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), AppError> {
        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            cell_task::Entity::delete_many()
                .filter(cell_task::Column::TaskId.eq(id.to_string()))
                .exec(&txn)
                .await?;
            let deleted = task::Entity::delete_by_id(id.to_string())
                .exec(&txn)
                .await?;
            if deleted.rows_affected == 0 {
                return Err(AppError::NotFound(format!("task id {id}")));
            }
            Ok(())
        }
        .await;

        finalize_transaction(txn, result).await
    }

    async fn list_tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>, AppError> {
        let models = task::Entity::find()
            .filter(task::Column::ScheduledDate.eq(date))
            .order_by_asc(task::Column::CreatedAt)
            .all(&self.db)
            .await?;
        tasks_from_models(models)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        let models = task::Entity::find()
            .order_by_asc(task::Column::ScheduledDate)
            .order_by_asc(task::Column::CreatedAt)
            .all(&self.db)
            .await?;
        tasks_from_models(models)
    }

    async fn load_plan(&self) -> Result<Option<Plan>, AppError> {
        let grids = grid::Entity::find()
            .order_by_asc(grid::Column::Id)
            .all(&self.db)
            .await?;
        if grids.is_empty() {
            return Ok(None);
        }
        if grids.len() != GRID_COUNT {
            return Err(PlanError::Validation(format!(
                "stored plan has {} grids, expected {}",
                grids.len(),
                GRID_COUNT
            ))
            .into());
        }

        let mut plan = Plan {
            grids: std::array::from_fn(Grid::empty),
            categories: Vec::new(),
        };
        for row in grids {
            let idx = index_from_db("grid", row.id)?;
            plan.grids[idx].title = row.title;
            if let Some(color) = row.color {
                if idx != CENTER {
                    plan.categories.push(Category { grid: idx, color });
                }
            }
        }

        let cells = cell::Entity::find().all(&self.db).await?;
        for row in cells {
            let at = cell_ref_from_db(row.grid_idx, row.cell_idx)?;
            let target = plan.cell_mut(at);
            target.text = row.text;
            target.is_completed = row.is_completed;
        }

        let links = cell_task::Entity::find()
            .order_by_asc(cell_task::Column::GridIdx)
            .order_by_asc(cell_task::Column::CellIdx)
            .order_by_asc(cell_task::Column::Position)
            .all(&self.db)
            .await?;
        for row in links {
            let at = cell_ref_from_db(row.grid_idx, row.cell_idx)?;
            let task_id = parse_id("task", &row.task_id)?;
            plan.cell_mut(at).linked_task_ids.push(task_id);
        }

        let todos = todo::Entity::find()
            .order_by_asc(todo::Column::GridIdx)
            .order_by_asc(todo::Column::CellIdx)
            .order_by_asc(todo::Column::Position)
            .all(&self.db)
            .await?;
        for row in todos {
            let at = cell_ref_from_db(row.grid_idx, row.cell_idx)?;
            let converted_task_id = row
                .converted_task_id
                .as_deref()
                .map(|id| parse_id("task", id))
                .transpose()?;
            plan.cell_mut(at).todos.push(Todo {
                id: parse_id("todo", &row.id)?,
                text: row.text,
                is_completed: row.is_completed,
                created_at: row.created_at,
                converted_task_id,
            });
        }

        Ok(Some(plan))
    }

    async fn save_plan(&self, plan: &Plan) -> Result<(), AppError> {
        let txn = self.db.begin().await?;
        let result = self.write_plan(&txn, plan).await;
        finalize_transaction(txn, result).await
    }
}

async fn finalize_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

fn index_from_db(label: &'static str, value: i32) -> Result<usize, AppError> {
    let index = usize::try_from(value).unwrap_or(usize::MAX);
    check_index(label, index)?;
    Ok(index)
}

fn cell_ref_from_db(grid: i32, cell: i32) -> Result<CellRef, AppError> {
    Ok(CellRef {
        grid: index_from_db("grid", grid)?,
        cell: index_from_db("cell", cell)?,
    })
}

fn parse_id(label: &str, value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value)
        .map_err(|err| AppError::InvalidInput(format!("invalid {label} id {value:?}: {err}")))
}

fn duration_to_db(minutes: u32) -> Result<i32, AppError> {
    i32::try_from(minutes).map_err(|_| {
        AppError::InvalidInput(format!("duration {minutes} does not fit in the tasks table"))
    })
}

fn task_from_model(model: task::Model) -> Result<Task, AppError> {
    let duration = model
        .duration
        .map(|minutes| {
            u32::try_from(minutes).map_err(|_| {
                AppError::InvalidInput(format!(
                    "task {} has negative duration {minutes}",
                    model.id
                ))
            })
        })
        .transpose()?;
    Ok(Task {
        id: parse_id("task", &model.id)?,
        title: model.title,
        is_completed: model.is_completed,
        scheduled_date: model.scheduled_date,
        start_time: model.start_time,
        duration,
        created_at: model.created_at,
    })
}

fn tasks_from_models(models: Vec<task::Model>) -> Result<Vec<Task>, AppError> {
    let mut tasks = models
        .into_iter()
        .map(task_from_model)
        .collect::<Result<Vec<_>, _>>()?;
    tasks.sort_by(task_order);
    Ok(tasks)
}
