use sea_orm::entity::prelude::*;

use super::cell_task;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub is_completed: bool,
    pub scheduled_date: Date,
    pub start_time: Option<String>,
    pub duration: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    CellTask,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::CellTask => Entity::has_many(cell_task::Entity).into(),
        }
    }
}

impl Related<cell_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CellTask.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
