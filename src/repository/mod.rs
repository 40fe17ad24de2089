//! Query layer over the catalog tables.
//!
//! Statements are built with `sea_query` against the table names carried by
//! [`crate::schema::CatalogSchema`] and executed on any sea-orm connection or
//! transaction.

pub mod categories;
pub mod products;

pub use categories::CategoryRepository;
pub use products::ProductRepository;

use sea_orm::sea_query::{Alias, Asterisk, Condition, ConditionalStatement, Expr, Func, Query};
use sea_orm::{ConnectionTrait, FromQueryResult};

use crate::error::AppResult;

/// One page of a listing plus the total row count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

pub(crate) async fn count_rows<C: ConnectionTrait>(
    conn: &C,
    table: Alias,
    condition: Condition,
) -> AppResult<i64> {
    let stmt = Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("total"))
        .from(table)
        .cond_where(condition)
        .to_owned();
    let row = CountRow::find_by_statement(conn.get_database_backend().build(&stmt))
        .one(conn)
        .await?;
    Ok(row.map(|r| r.total).unwrap_or(0))
}
