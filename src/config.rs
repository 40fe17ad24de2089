use std::env;

use crate::schema::CatalogSchema;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub schema: CatalogSchema,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let schema = schema_from(|key| env::var(key).ok())?;
        Ok(Self {
            port,
            database_url,
            host,
            schema,
        })
    }
}

/// Reads the `CATALOG_*` overrides through `lookup` and validates the result.
pub fn schema_from(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<CatalogSchema> {
    let mut schema = CatalogSchema::default();
    if let Some(table) = lookup("CATALOG_CATEGORIES_TABLE") {
        schema.categories_table = table;
    }
    if let Some(table) = lookup("CATALOG_PRODUCTS_TABLE") {
        schema.products_table = table;
    }
    if let Some(table) = lookup("CATALOG_CATEGORY_PRODUCTS_TABLE") {
        schema.category_products_table = table;
    }
    if let Some(table) = lookup("CATALOG_AUDIT_TABLE") {
        schema.audit_table = table;
    }
    schema.mass_assignment.strict = lookup("CATALOG_STRICT_MASS_ASSIGNMENT")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    schema.validate()?;
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let schema = schema_from(lookup(&[])).unwrap();
        assert_eq!(schema, CatalogSchema::default());
    }

    #[test]
    fn reads_overrides() {
        let schema = schema_from(lookup(&[
            ("CATALOG_CATEGORY_PRODUCTS_TABLE", "shop_categories_products"),
            ("CATALOG_STRICT_MASS_ASSIGNMENT", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(schema.category_products_table, "shop_categories_products");
        assert!(schema.mass_assignment.strict);
    }

    #[test]
    fn rejects_invalid_overrides() {
        assert!(schema_from(lookup(&[("CATALOG_PRODUCTS_TABLE", "bad name")])).is_err());
    }
}
