use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{
    Condition, ConditionalStatement, Expr, LockType, OnConflict, Order, Query, SelectStatement,
};
use sea_orm::{ConnectionTrait, FromQueryResult, TransactionTrait};
use uuid::Uuid;

use super::{Page, ProductRepository, count_rows};
use crate::{
    dto::categories::CategoryTree,
    entity::{
        categories::{self, Column},
        category_products::Column as LinkColumn,
        products::{self, Column as ProductColumn},
    },
    error::{AppError, AppResult},
    mass_assignment::{CategoryAttributes, NewCategory},
    models::{Category, Product},
    routes::params::{CategoryQuery, CategorySortBy, Pagination, SortOrder},
    schema::{CatalogSchema, quote_ident},
    validation::escape_like,
};

/// Category reads and writes over the tables named by a [`CatalogSchema`].
///
/// `C` is either the shared connection or an open transaction. Writes that
/// span several statements open their own (possibly nested) transaction.
pub struct CategoryRepository<'a, C> {
    conn: &'a C,
    schema: &'a CatalogSchema,
}

impl<'a, C> CategoryRepository<'a, C>
where
    C: ConnectionTrait + TransactionTrait,
{
    pub fn new(conn: &'a C, schema: &'a CatalogSchema) -> Self {
        Self { conn, schema }
    }

    pub async fn create(&self, new: NewCategory) -> AppResult<Category> {
        if let Some(parent_id) = new.parent_id {
            self.ensure_parent_exists(parent_id).await?;
        }
        self.ensure_slug_available(&new.slug, None).await?;

        let stmt = Query::insert()
            .into_table(self.schema.categories())
            .columns([Column::Id, Column::ParentId, Column::Slug, Column::Name])
            .values([
                Uuid::new_v4().into(),
                new.parent_id.into(),
                new.slug.into(),
                new.name.into(),
            ])
            .map_err(|err| AppError::Internal(err.into()))?
            .returning_all()
            .to_owned();

        let backend = self.conn.get_database_backend();
        let row = categories::Model::find_by_statement(backend.build(&stmt))
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("insert returned no row")))?;

        tracing::debug!(category_id = %row.id, slug = %row.slug, "category created");
        Ok(row.into())
    }

    pub async fn find(&self, id: Uuid) -> AppResult<Option<Category>> {
        let stmt = self
            .select()
            .and_where(self.col(Column::Id).eq(id))
            .to_owned();
        self.fetch_optional(stmt).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Category>> {
        let stmt = self
            .select()
            .and_where(self.col(Column::Slug).eq(slug))
            .to_owned();
        self.fetch_optional(stmt).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Category> {
        self.find(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list(&self, query: &CategoryQuery) -> AppResult<Page<Category>> {
        let (page, per_page, offset) = query.pagination().normalize();

        let mut condition = Condition::all();
        if let Some(parent_id) = query.parent_id {
            condition = condition.add(self.col(Column::ParentId).eq(parent_id));
        }
        if query.roots_only.unwrap_or(false) {
            condition = condition.add(self.col(Column::ParentId).is_null());
        }
        if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            condition = condition.add(
                Condition::any()
                    .add(self.col(Column::Name).ilike(pattern.clone()))
                    .add(self.col(Column::Slug).ilike(pattern)),
            );
        }

        let sort_col = match query.sort_by.unwrap_or(CategorySortBy::Name) {
            CategorySortBy::Name => Column::Name,
            CategorySortBy::Slug => Column::Slug,
            CategorySortBy::CreatedAt => Column::CreatedAt,
        };
        let order = match query.sort_order.unwrap_or(SortOrder::Asc) {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        let total = count_rows(self.conn, self.schema.categories(), condition.clone()).await?;

        let table = self.schema.categories();
        let stmt = self
            .select()
            .cond_where(condition)
            .order_by((table.clone(), sort_col), order)
            .order_by((table, Column::Id), Order::Asc)
            .limit(per_page as u64)
            .offset(offset as u64)
            .to_owned();
        let items = self.fetch_all(stmt).await?;

        Ok(Page {
            items,
            page,
            per_page,
            total,
        })
    }

    /// Applies exactly the supplied attributes. Moving a category checks that
    /// the new parent exists and is not one of its descendants.
    pub async fn update(&self, id: Uuid, attrs: CategoryAttributes) -> AppResult<Category> {
        let txn = self.conn.begin().await?;
        let updated = CategoryRepository::new(&txn, self.schema)
            .apply_update(id, attrs)
            .await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Refuses to delete a category that still has children or product links.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let txn = self.conn.begin().await?;
        CategoryRepository::new(&txn, self.schema)
            .apply_delete(id)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    /// The category referenced by `parent_id`, if any.
    pub async fn parent(&self, id: Uuid) -> AppResult<Option<Category>> {
        let category = self.get(id).await?;
        match category.parent_id {
            Some(parent_id) => self.find(parent_id).await,
            None => Ok(None),
        }
    }

    pub async fn children(&self, id: Uuid) -> AppResult<Vec<Category>> {
        let table = self.schema.categories();
        let stmt = self
            .select()
            .and_where(self.col(Column::ParentId).eq(id))
            .order_by((table.clone(), Column::Name), Order::Asc)
            .order_by((table, Column::Id), Order::Asc)
            .to_owned();
        self.fetch_all(stmt).await
    }

    /// Parent first, root last.
    pub async fn ancestors(&self, id: Uuid) -> AppResult<Vec<Category>> {
        let category = self.get(id).await?;
        let mut chain = Vec::new();
        let mut seen = HashSet::from([category.id]);
        let mut next = category.parent_id;
        while let Some(parent_id) = next {
            if !seen.insert(parent_id) {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "category hierarchy contains a cycle at {parent_id}"
                )));
            }
            let Some(parent) = self.find(parent_id).await? else {
                break;
            };
            next = parent.parent_id;
            chain.push(parent);
        }
        Ok(chain)
    }

    pub async fn tree(&self) -> AppResult<Vec<CategoryTree>> {
        let table = self.schema.categories();
        let stmt = self
            .select()
            .order_by((table.clone(), Column::Name), Order::Asc)
            .order_by((table, Column::Id), Order::Asc)
            .to_owned();
        Ok(CategoryTree::build_forest(self.fetch_all(stmt).await?))
    }

    pub async fn products(&self, id: Uuid, pagination: &Pagination) -> AppResult<Page<Product>> {
        let (page, per_page, offset) = pagination.normalize();
        let product_table = self.schema.products();
        let pivot = self.schema.category_products();

        let linked =
            Condition::all().add(Expr::col((pivot.clone(), LinkColumn::CategoryId)).eq(id));
        let total = count_rows(self.conn, pivot.clone(), linked.clone()).await?;

        let stmt = Query::select()
            .columns(ProductColumn::ALL.map(|col| (product_table.clone(), col)))
            .from(product_table.clone())
            .inner_join(
                pivot.clone(),
                Expr::col((pivot, LinkColumn::ProductId))
                    .equals((product_table.clone(), ProductColumn::Id)),
            )
            .cond_where(linked)
            .order_by((product_table.clone(), ProductColumn::Name), Order::Asc)
            .order_by((product_table, ProductColumn::Id), Order::Asc)
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

    /// Links a product; returns false when the link already existed.
    pub async fn attach_product(&self, id: Uuid, product_id: Uuid) -> AppResult<bool> {
        self.get(id).await?;
        ProductRepository::new(self.conn, self.schema)
            .get(product_id)
            .await?;

        let stmt = Query::insert()
            .into_table(self.schema.category_products())
            .columns([LinkColumn::ProductId, LinkColumn::CategoryId])
            .values([product_id.into(), id.into()])
            .map_err(|err| AppError::Internal(err.into()))?
            .on_conflict(
                OnConflict::columns([LinkColumn::ProductId, LinkColumn::CategoryId])
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();

        let backend = self.conn.get_database_backend();
        let result = self.conn.execute(backend.build(&stmt)).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn detach_product(&self, id: Uuid, product_id: Uuid) -> AppResult<()> {
        let stmt = Query::delete()
            .from_table(self.schema.category_products())
            .and_where(Expr::col(LinkColumn::CategoryId).eq(id))
            .and_where(Expr::col(LinkColumn::ProductId).eq(product_id))
            .to_owned();

        let backend = self.conn.get_database_backend();
        let result = self.conn.execute(backend.build(&stmt)).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn apply_update(&self, id: Uuid, attrs: CategoryAttributes) -> AppResult<Category> {
        // Serialize re-parenting so two moves cannot close a loop together.
        if matches!(attrs.parent_id, Some(Some(_))) {
            self.lock_hierarchy().await?;
        }

        let existing = self.lock_row(id).await?;
        if attrs.is_empty() {
            return Ok(existing);
        }

        let mut stmt = Query::update();
        stmt.table(self.schema.categories());

        if let Some(parent_id) = attrs.parent_id {
            if let Some(new_parent) = parent_id.filter(|p| Some(*p) != existing.parent_id) {
                self.ensure_acyclic(id, new_parent).await?;
                self.ensure_parent_exists(new_parent).await?;
            }
            stmt.value(Column::ParentId, parent_id);
        }
        if let Some(slug) = attrs.slug {
            self.ensure_slug_available(&slug, Some(id)).await?;
            stmt.value(Column::Slug, slug);
        }
        if let Some(name) = attrs.name {
            stmt.value(Column::Name, name);
        }
        stmt.value(Column::UpdatedAt, Utc::now())
            .and_where(Expr::col(Column::Id).eq(id))
            .returning_all();

        let backend = self.conn.get_database_backend();
        let row = categories::Model::find_by_statement(backend.build(&stmt))
            .one(self.conn)
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::debug!(category_id = %row.id, parent_id = ?row.parent_id, "category updated");
        Ok(row.into())
    }

    async fn apply_delete(&self, id: Uuid) -> AppResult<()> {
        self.lock_row(id).await?;

        let children = count_rows(
            self.conn,
            self.schema.categories(),
            Condition::all().add(Expr::col(Column::ParentId).eq(id)),
        )
        .await?;
        if children > 0 {
            return Err(AppError::Conflict(format!(
                "category has {children} child categories; move or delete them first"
            )));
        }

        let links = count_rows(
            self.conn,
            self.schema.category_products(),
            Condition::all().add(Expr::col(LinkColumn::CategoryId).eq(id)),
        )
        .await?;
        if links > 0 {
            return Err(AppError::Conflict(format!(
                "category is linked to {links} products; detach them first"
            )));
        }

        let stmt = Query::delete()
            .from_table(self.schema.categories())
            .and_where(Expr::col(Column::Id).eq(id))
            .to_owned();
        let backend = self.conn.get_database_backend();
        self.conn.execute(backend.build(&stmt)).await?;

        tracing::debug!(category_id = %id, "category deleted");
        Ok(())
    }

    async fn lock_row(&self, id: Uuid) -> AppResult<Category> {
        let stmt = self
            .select()
            .and_where(self.col(Column::Id).eq(id))
            .lock(LockType::Update)
            .to_owned();
        self.fetch_optional(stmt).await?.ok_or(AppError::NotFound)
    }

    async fn lock_hierarchy(&self) -> AppResult<()> {
        let sql = format!(
            "LOCK TABLE {} IN SHARE ROW EXCLUSIVE MODE",
            quote_ident(&self.schema.categories_table)
        );
        self.conn.execute_unprepared(&sql).await?;
        Ok(())
    }

    async fn ensure_parent_exists(&self, parent_id: Uuid) -> AppResult<()> {
        match self.find(parent_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::BadRequest(format!(
                "parent category {parent_id} does not exist"
            ))),
        }
    }

    async fn ensure_slug_available(&self, slug: &str, owner: Option<Uuid>) -> AppResult<()> {
        match self.find_by_slug(slug).await? {
            Some(existing) if Some(existing.id) != owner => Err(AppError::Conflict(format!(
                "slug `{slug}` is already taken"
            ))),
            _ => Ok(()),
        }
    }

    /// Walks up from `parent_id`; reaching `id` means the move would close a loop.
    async fn ensure_acyclic(&self, id: Uuid, parent_id: Uuid) -> AppResult<()> {
        if parent_id == id {
            return Err(AppError::BadRequest(
                "a category cannot be its own parent".into(),
            ));
        }

        let mut seen = HashSet::new();
        let mut cursor = Some(parent_id);
        while let Some(current) = cursor {
            if current == id {
                return Err(AppError::BadRequest(format!(
                    "category {id} cannot be moved under its own descendant {parent_id}"
                )));
            }
            if !seen.insert(current) {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "category hierarchy contains a cycle at {current}"
                )));
            }
            cursor = self.find(current).await?.and_then(|c| c.parent_id);
        }
        Ok(())
    }

    fn select(&self) -> SelectStatement {
        let table = self.schema.categories();
        Query::select()
            .columns(Column::ALL.map(|col| (table.clone(), col)))
            .from(table)
            .to_owned()
    }

    fn col(&self, column: Column) -> Expr {
        Expr::col((self.schema.categories(), column))
    }

    async fn fetch_optional(&self, stmt: SelectStatement) -> AppResult<Option<Category>> {
        let backend = self.conn.get_database_backend();
        let row = categories::Model::find_by_statement(backend.build(&stmt))
            .one(self.conn)
            .await?;
        Ok(row.map(Category::from))
    }

    async fn fetch_all(&self, stmt: SelectStatement) -> AppResult<Vec<Category>> {
        let backend = self.conn.get_database_backend();
        let rows = categories::Model::find_by_statement(backend.build(&stmt))
            .all(self.conn)
            .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }
}
