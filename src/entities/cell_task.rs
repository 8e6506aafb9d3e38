use sea_orm::entity::prelude::*;

use super::task;

/// One row per linked task; keying on the task id keeps a task in at most
/// one cell.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "cell_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub task_id: String,
    pub grid_idx: i32,
    pub cell_idx: i32,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Task,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Task => Entity::belongs_to(task::Entity)
                .from(Column::TaskId)
                .to(task::Column::Id)
                .into(),
        }
    }
}

impl Related<task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
