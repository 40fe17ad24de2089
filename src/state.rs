use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    repository::{CategoryRepository, ProductRepository},
    schema::CatalogSchema,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub schema: Arc<CatalogSchema>,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, schema: CatalogSchema) -> Self {
        Self {
            pool,
            orm,
            schema: Arc::new(schema),
        }
    }

    pub fn categories(&self) -> CategoryRepository<'_, OrmConn> {
        CategoryRepository::new(&self.orm, &self.schema)
    }

    pub fn products(&self) -> ProductRepository<'_, OrmConn> {
        ProductRepository::new(&self.orm, &self.schema)
    }
}
