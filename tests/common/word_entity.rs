use crudscope::CrudResource;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "words")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub word: String,
    pub level: String,
    pub count: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Words belong to the user in `user_id`
pub struct Words;

impl CrudResource for Words {
    type EntityType = Entity;
    type Model = Model;
    type ActiveModelType = ActiveModel;
    type Id = i32;

    const RESOURCE_NAME_SINGULAR: &'static str = "word";
    const RESOURCE_NAME_PLURAL: &'static str = "words";
    const OWNER_COLUMN: Option<&'static str> = Some("user_id");
    const DEFAULT_SORT_COLUMN: Option<&'static str> = Some("created_at");
}
