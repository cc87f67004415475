//! Persistence layer: sqlx/Postgres models and repositories for the
//! translation sync state (projects, source files, project settings).

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub use models::file::TranslationFile;
pub use models::project::Project;
pub use models::settings::{CreateProjectSettings, ProjectSettings};
pub use repositories::{
    FileRepository, PgFileRepository, PgProjectRepository, PgSettingsRepository,
    ProjectRepository, SettingsRepository, StoreError,
};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Apply pending migrations from the embedded `migrations/` directory.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
