use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sqlx::postgres::PgPoolOptions;

use crate::schema::CatalogSchema;

pub type DbPool = sqlx::PgPool;
pub type OrmConn = DatabaseConnection;

/// Create a raw sqlx pool.
pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5));
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Creates the catalog tables named by `schema` if they do not exist yet.
pub async fn run_migrations(conn: &DatabaseConnection, schema: &CatalogSchema) -> Result<()> {
    let backend = conn.get_database_backend();
    // Postgres prepared statements cannot contain multiple commands,
    // so every DDL statement is sent on its own.
    let statements = schema.migration_statements();
    for statement in &statements {
        conn.execute(Statement::from_string(backend, statement.clone()))
            .await?;
    }

    tracing::info!(
        statements = statements.len(),
        categories = %schema.categories_table,
        pivot = %schema.category_products_table,
        "catalog schema ready"
    );
    Ok(())
}
