use sea_orm::sea_query::{Condition, ConditionalStatement, Expr, Order, Query, SelectStatement};
use sea_orm::{ConnectionTrait, FromQueryResult};
use uuid::Uuid;

use super::{Page, count_rows};
use crate::{
    dto::products::CreateProductRequest,
    entity::{
        categories::{self, Column as CategoryColumn},
        category_products::Column as LinkColumn,
        products::{self, Column},
    },
    error::{AppError, AppResult},
    models::{Category, Product},
    routes::params::Pagination,
    schema::CatalogSchema,
    validation::validate_name,
};

pub struct ProductRepository<'a, C> {
    conn: &'a C,
    schema: &'a CatalogSchema,
}

impl<'a, C> ProductRepository<'a, C>
where
    C: ConnectionTrait,
{
    pub fn new(conn: &'a C, schema: &'a CatalogSchema) -> Self {
        Self { conn, schema }
    }

    pub async fn create(&self, payload: CreateProductRequest) -> AppResult<Product> {
        let name = validate_name(&payload.name)?;
        if payload.price < 0 {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
        if payload.stock < 0 {
            return Err(AppError::BadRequest("stock must not be negative".into()));
        }

        let stmt = Query::insert()
            .into_table(self.schema.products())
            .columns([
                Column::Id,
                Column::Name,
                Column::Description,
                Column::Price,
                Column::Stock,
            ])
            .values([
                Uuid::new_v4().into(),
                name.into(),
                payload.description.into(),
                payload.price.into(),
                payload.stock.into(),
            ])
            .map_err(|err| AppError::Internal(err.into()))?
            .returning_all()
            .to_owned();

        let backend = self.conn.get_database_backend();
        let row = products::Model::find_by_statement(backend.build(&stmt))
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("insert returned no row")))?;

        tracing::debug!(product_id = %row.id, "product created");
        Ok(row.into())
    }

    pub async fn find(&self, id: Uuid) -> AppResult<Option<Product>> {
        let stmt = self
            .select()
            .and_where(Expr::col((self.schema.products(), Column::Id)).eq(id))
            .to_owned();
        let backend = self.conn.get_database_backend();
        let row = products::Model::find_by_statement(backend.build(&stmt))
            .one(self.conn)
            .await?;
        Ok(row.map(Product::from))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        self.find(id).await?.ok_or(AppError::NotFound)
    }

    /// Newest first.
    pub async fn list(&self, pagination: &Pagination) -> AppResult<Page<Product>> {
        let (page, per_page, offset) = pagination.normalize();
        let total = count_rows(self.conn, self.schema.products(), Condition::all()).await?;

        let table = self.schema.products();
        let stmt = self
            .select()
            .order_by((table.clone(), Column::CreatedAt), Order::Desc)
            .order_by((table, Column::Id), Order::Asc)
            .limit(per_page as u64)
            .offset(offset as u64)
            .to_owned();
        let backend = self.conn.get_database_backend();
        let items = products::Model::find_by_statement(backend.build(&stmt))
            .all(self.conn)
            .await?
            .into_iter()
            .map(Product::from)
            .collect();

        Ok(Page {
            items,
            page,
            per_page,
            total,
        })
    }

    /// Refuses to delete a product that is still linked to a category.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let links = count_rows(
            self.conn,
            self.schema.category_products(),
            Condition::all().add(Expr::col(LinkColumn::ProductId).eq(id)),
        )
        .await?;
        if links > 0 {
            return Err(AppError::Conflict(format!(
                "product is linked to {links} categories; detach it first"
            )));
        }

        let stmt = Query::delete()
            .from_table(self.schema.products())
            .and_where(Expr::col(Column::Id).eq(id))
            .to_owned();
        let backend = self.conn.get_database_backend();
        let result = self.conn.execute(backend.build(&stmt)).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Categories linked to the product, the inverse of
    /// [`super::CategoryRepository::products`].
    pub async fn categories(&self, id: Uuid) -> AppResult<Vec<Category>> {
        self.get(id).await?;

        let category_table = self.schema.categories();
        let pivot = self.schema.category_products();
        let stmt = Query::select()
            .columns(CategoryColumn::ALL.map(|col| (category_table.clone(), col)))
            .from(category_table.clone())
            .inner_join(
                pivot.clone(),
                Expr::col((pivot.clone(), LinkColumn::CategoryId))
                    .equals((category_table.clone(), CategoryColumn::Id)),
            )
            .and_where(Expr::col((pivot, LinkColumn::ProductId)).eq(id))
            .order_by((category_table.clone(), CategoryColumn::Name), Order::Asc)
            .order_by((category_table, CategoryColumn::Id), Order::Asc)
            .to_owned();

        let backend = self.conn.get_database_backend();
        let rows = categories::Model::find_by_statement(backend.build(&stmt))
            .all(self.conn)
            .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    fn select(&self) -> SelectStatement {
        let table = self.schema.products();
        Query::select()
            .columns(Column::ALL.map(|col| (table.clone(), col)))
            .from(table)
            .to_owned()
    }
}
