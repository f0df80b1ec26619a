#![allow(dead_code)]

use axum::{
    Extension, Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::{DateTime, Duration};
use crudscope::{CrudState, Principal, crud_router};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use sea_orm_migration::prelude::*;
use serde_json::Value;
use tower::ServiceExt;

pub mod event_entity;
pub mod user_entity;
pub mod word_entity;

pub use event_entity::Events;
pub use user_entity::Users;
pub use word_entity::Words;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Insert words for `user_id`, one minute apart and after every existing row
pub async fn seed_words(
    db: &DatabaseConnection,
    user_id: i32,
    rows: &[(&str, &str)],
) -> Vec<word_entity::Model> {
    let base = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap();
    let existing = word_entity::Entity::find().count(db).await.unwrap();
    let mut models = Vec::with_capacity(rows.len());
    for (offset, (word, level)) in (existing..).zip(rows) {
        let model = word_entity::ActiveModel {
            user_id: Set(user_id),
            word: Set((*word).to_owned()),
            level: Set((*level).to_owned()),
            count: Set(0),
            created_at: Set(base + Duration::minutes(<i64 as TryFrom<u64>>::try_from(offset).unwrap())),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
        models.push(model);
    }
    models
}

/// All resources under `/api/v1`, optionally as a fixed caller
pub fn setup_test_app(db: DatabaseConnection, principal: Option<Principal>) -> Router {
    let api = Router::new()
        .nest(
            "/users",
            crud_router(CrudState::<Users>::new(db.clone()).unwrap()),
        )
        .nest(
            "/events",
            crud_router(CrudState::<Events>::new(db.clone()).unwrap()),
        )
        .nest("/words", crud_router(CrudState::<Words>::new(db).unwrap()));
    let api = match principal {
        Some(principal) => api.layer(Extension(principal)),
        None => api,
    };
    Router::new().nest("/api/v1", api)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(CreateUsersTable),
            Box::new(CreateWordsTable),
            Box::new(CreateEventsTable),
        ]
    }
}

#[derive(DeriveIden)]
enum UsersTable {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Email,
    DisplayName,
}

#[derive(DeriveIden)]
enum WordsTable {
    #[sea_orm(iden = "words")]
    Table,
    Id,
    UserId,
    Word,
    Level,
    Count,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EventsTable {
    #[sea_orm(iden = "events")]
    Table,
    Id,
    Label,
    At,
}

pub struct CreateUsersTable;

impl MigrationName for CreateUsersTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_users_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateUsersTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsersTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsersTable::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UsersTable::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(UsersTable::DisplayName).string().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsersTable::Table).to_owned())
            .await
    }
}

pub struct CreateWordsTable;

impl MigrationName for CreateWordsTable {
    fn name(&self) -> &'static str {
        "m20240101_000002_create_words_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateWordsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WordsTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WordsTable::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WordsTable::UserId).integer().not_null())
                    .col(ColumnDef::new(WordsTable::Word).string().not_null())
                    .col(ColumnDef::new(WordsTable::Level).string().not_null())
                    .col(
                        ColumnDef::new(WordsTable::Count)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WordsTable::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WordsTable::Table).to_owned())
            .await
    }
}

pub struct CreateEventsTable;

impl MigrationName for CreateEventsTable {
    fn name(&self) -> &'static str {
        "m20240101_000003_create_events_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateEventsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventsTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventsTable::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventsTable::Label).string().not_null())
                    .col(
                        ColumnDef::new(EventsTable::At)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventsTable::Table).to_owned())
            .await
    }
}
