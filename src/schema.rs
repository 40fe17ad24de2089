//! Table names and mass-assignment policy for the catalog.
//!
//! Everything the persistence layer needs to know about where categories,
//! products and their links live is carried by [`CatalogSchema`], which is
//! built once at startup (see [`crate::config::AppConfig`]) and shared through
//! [`crate::state::AppState`].

use std::collections::HashSet;

use anyhow::bail;
use sea_orm::sea_query::Alias;

/// Fields of a category that can ever be mass assigned.
pub const CATEGORY_FIELDS: [&str; 3] = ["parent_id", "slug", "name"];

pub const DEFAULT_CATEGORIES_TABLE: &str = "shop_categories";
pub const DEFAULT_PRODUCTS_TABLE: &str = "shop_products";
/// Kept with its historical spelling so existing databases keep working.
pub const DEFAULT_CATEGORY_PRODUCTS_TABLE: &str = "shop_cathegories_products";
pub const DEFAULT_AUDIT_TABLE: &str = "shop_audit_logs";

// Postgres truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MassAssignmentPolicy {
    pub fillable: Vec<String>,
    /// Reject unknown or guarded fields instead of dropping them.
    pub strict: bool,
}

impl Default for MassAssignmentPolicy {
    fn default() -> Self {
        Self {
            fillable: CATEGORY_FIELDS.iter().map(|f| f.to_string()).collect(),
            strict: false,
        }
    }
}

impl MassAssignmentPolicy {
    /// Every category field is fillable and typos are errors. Used by the
    /// factory, which sets attributes from trusted code.
    pub fn unguarded() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn is_fillable(&self, field: &str) -> bool {
        CATEGORY_FIELDS.contains(&field) && self.fillable.iter().any(|f| f == field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSchema {
    pub categories_table: String,
    pub products_table: String,
    pub category_products_table: String,
    pub audit_table: String,
    pub mass_assignment: MassAssignmentPolicy,
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self {
            categories_table: DEFAULT_CATEGORIES_TABLE.to_string(),
            products_table: DEFAULT_PRODUCTS_TABLE.to_string(),
            category_products_table: DEFAULT_CATEGORY_PRODUCTS_TABLE.to_string(),
            audit_table: DEFAULT_AUDIT_TABLE.to_string(),
            mass_assignment: MassAssignmentPolicy::default(),
        }
    }
}

impl CatalogSchema {
    /// Default table names prefixed with `{prefix}_`, e.g. for isolated test runs.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            categories_table: format!("{prefix}_{DEFAULT_CATEGORIES_TABLE}"),
            products_table: format!("{prefix}_{DEFAULT_PRODUCTS_TABLE}"),
            category_products_table: format!("{prefix}_{DEFAULT_CATEGORY_PRODUCTS_TABLE}"),
            audit_table: format!("{prefix}_{DEFAULT_AUDIT_TABLE}"),
            mass_assignment: MassAssignmentPolicy::default(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let tables = self.table_names();
        for table in tables {
            if !is_identifier(table) {
                bail!("invalid table name `{table}`");
            }
        }

        let distinct: HashSet<&str> = tables.iter().copied().collect();
        if distinct.len() != tables.len() {
            bail!("catalog table names must be distinct");
        }

        if self.mass_assignment.fillable.is_empty() {
            bail!("at least one category field must be fillable");
        }
        for field in &self.mass_assignment.fillable {
            if !CATEGORY_FIELDS.contains(&field.as_str()) {
                bail!("`{field}` is not a category field");
            }
        }

        Ok(())
    }

    pub fn table_names(&self) -> [&str; 4] {
        [
            self.categories_table.as_str(),
            self.products_table.as_str(),
            self.category_products_table.as_str(),
            self.audit_table.as_str(),
        ]
    }

    pub fn categories(&self) -> Alias {
        Alias::new(&self.categories_table)
    }

    pub fn products(&self) -> Alias {
        Alias::new(&self.products_table)
    }

    pub fn category_products(&self) -> Alias {
        Alias::new(&self.category_products_table)
    }

    /// DDL for the configured tables, one statement per entry.
    pub fn migration_statements(&self) -> Vec<String> {
        let categories = quote_ident(&self.categories_table);
        let products = quote_ident(&self.products_table);
        let pivot = quote_ident(&self.category_products_table);
        let audit = quote_ident(&self.audit_table);
        let parent_idx = quote_ident(&format!("{}_parent_id_idx", self.categories_table));
        let pivot_idx = quote_ident(&format!("{}_category_id_idx", self.category_products_table));

        vec![
            format!(
                r#"CREATE TABLE IF NOT EXISTS {categories} (
    id UUID PRIMARY KEY,
    parent_id UUID NULL REFERENCES {categories} (id) ON DELETE RESTRICT,
    slug VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK (parent_id IS NULL OR parent_id <> id)
)"#
            ),
            format!("CREATE INDEX IF NOT EXISTS {parent_idx} ON {categories} (parent_id)"),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {products} (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    description TEXT NULL,
    price BIGINT NOT NULL CHECK (price >= 0),
    stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)"#
            ),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {pivot} (
    product_id UUID NOT NULL REFERENCES {products} (id) ON DELETE RESTRICT,
    category_id UUID NOT NULL REFERENCES {categories} (id) ON DELETE RESTRICT,
    PRIMARY KEY (product_id, category_id)
)"#
            ),
            format!("CREATE INDEX IF NOT EXISTS {pivot_idx} ON {pivot} (category_id)"),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {audit} (
    id UUID PRIMARY KEY,
    action VARCHAR(64) NOT NULL,
    resource VARCHAR(64) NULL,
    metadata JSONB NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)"#
            ),
        ]
    }
}

/// Double-quotes an identifier that already passed [`CatalogSchema::validate`].
pub fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    first_ok
        && name.len() <= MAX_IDENTIFIER_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
