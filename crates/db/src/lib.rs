use std::{str::FromStr, time::Duration};

use sqlx::{
    Error, Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};
use utils::assets::database_path;

pub mod models;

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    fn pool_options() -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(20)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(300))
            .acquire_timeout(Duration::from_secs(30))
    }

    fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, Error> {
        Ok(SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30))
            .synchronous(SqliteSynchronous::Normal))
    }

    /// Default on-disk database inside the asset directory.
    pub fn default_url() -> String {
        format!("sqlite://{}", database_path().to_string_lossy())
    }

    pub async fn new(database_url: Option<&str>) -> Result<DBService, Error> {
        let database_url = database_url
            .map(str::to_string)
            .unwrap_or_else(Self::default_url);
        tracing::debug!("Connecting to {}", database_url);
        let pool = Self::pool_options()
            .connect_with(Self::connect_options(&database_url)?)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        sqlx::query("PRAGMA optimize").execute(&pool).await?;
        Ok(DBService { pool })
    }

    /// Single-connection in-memory database with migrations applied.
    pub async fn new_in_memory() -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(DBService { pool })
    }
}
