use crudscope::CrudResource;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub label: String,
    pub at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Global resource with a UTC timestamp
pub struct Events;

impl CrudResource for Events {
    type EntityType = Entity;
    type Model = Model;
    type ActiveModelType = ActiveModel;
    type Id = i32;

    const RESOURCE_NAME_SINGULAR: &'static str = "event";
    const RESOURCE_NAME_PLURAL: &'static str = "events";
    const DEFAULT_SORT_COLUMN: Option<&'static str> = Some("at");
}
