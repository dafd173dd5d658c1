use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;

use crate::error::AppError;
use crate::settings::DatabaseSettings;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn init_pool(settings: &DatabaseSettings) -> Result<DbPool, AppError> {
    let manager = ConnectionManager::<SqliteConnection>::new(settings.url.as_str());
    let pool = Pool::builder()
        .max_size(settings.pool_size.max(1))
        .connection_timeout(Duration::from_secs(settings.timeout_seconds))
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;
    Ok(pool)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), AppError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| AppError::Internal(format!("migrations failed: {err}")))?;
    for version in applied {
        tracing::info!(%version, "applied migration");
    }
    Ok(())
}
