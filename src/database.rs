use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use std::time::Duration;

use crate::config::Settings;

/// Open the connection pool described by `settings`
///
/// # Errors
/// When the database cannot be reached
pub async fn connect(settings: &Settings) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(settings.database_url.clone());
    options
        .max_connections(settings.max_connections)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(settings.sqlx_logging);
    // A second pooled connection to `sqlite::memory:` would see an empty database
    if settings.database_url.starts_with("sqlite::memory:") {
        options.max_connections(1);
    }

    let db = Database::connect(options).await?;
    tracing::info!(
        backend = ?db.get_database_backend(),
        max_connections = settings.max_connections,
        "Connected to database"
    );
    Ok(db)
}
