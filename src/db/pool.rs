use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::db::DbError;

/// Build a pool without connecting
///
/// The first query opens the connection, so an unreachable database surfaces
/// as a request error instead of preventing startup.
pub fn connect_lazy(database_url: &str) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy(database_url)?;
    Ok(pool)
}
