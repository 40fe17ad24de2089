use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult, schema::{CatalogSchema, quote_ident}};

pub async fn log_audit(
    pool: &DbPool,
    schema: &CatalogSchema,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    let sql = format!(
        r#"
        INSERT INTO {} (id, action, resource, metadata)
        VALUES ($1, $2, $3, $4)
        "#,
        quote_ident(&schema.audit_table)
    );
    sqlx::query(&sql)
        .bind(id)
        .bind(action)
        .bind(resource)
        .bind(metadata)
        .execute(pool)
        .await?;

    Ok(())
}
