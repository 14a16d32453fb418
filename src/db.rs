use anyhow::Result;
use sea_orm::{Database, DatabaseConnection, DbErr, SqlErr};

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let conn = Database::connect(database_url).await?;
    Ok(conn)
}

/// Apply the SQL files under `migrations/` through the underlying sqlx pool.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(conn.get_postgres_connection_pool())
        .await?;
    Ok(())
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}
