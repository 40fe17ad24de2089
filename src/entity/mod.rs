//! Row shapes and column identifiers for the catalog tables.
//!
//! Table names are not fixed at compile time (they come from
//! [`crate::schema::CatalogSchema`]), so rows are read with `FromQueryResult`
//! and columns are referenced through `DeriveIden` enums.

pub mod categories;
pub mod category_products;
pub mod products;
