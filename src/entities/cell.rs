use sea_orm::entity::prelude::*;

use super::grid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "cells")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub grid_idx: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub cell_idx: i32,
    pub text: String,
    pub is_completed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Grid,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Grid => Entity::belongs_to(grid::Entity)
                .from(Column::GridIdx)
                .to(grid::Column::Id)
                .into(),
        }
    }
}

impl Related<grid::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grid.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
