//! Test and seed data for categories.
//!
//! ```ignore
//! let shirts = CategoryFactory::new()
//!     .named("Shirts")
//!     .child_of(apparel.id)
//!     .create(&repo)
//!     .await?;
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::{
    error::AppResult,
    mass_assignment::{CategoryAttributes, NewCategory},
    models::Category,
    repository::CategoryRepository,
    schema::MassAssignmentPolicy,
    validation::slugify,
};

const ADJECTIVES: [&str; 10] = [
    "Everyday", "Outdoor", "Vintage", "Premium", "Classic", "Urban", "Handmade", "Eco",
    "Compact", "Seasonal",
];

const NOUNS: [&str; 12] = [
    "Apparel", "Books", "Mugs", "Stickers", "Hoodies", "Gadgets", "Bags", "Footwear",
    "Stationery", "Toys", "Kitchenware", "Accessories",
];

/// Builds category attributes from a default definition plus overrides.
///
/// Overrides go through the same mass-assignment path as API input, with an
/// unguarded policy: every category field is settable and unknown keys are
/// errors.
#[derive(Debug, Clone)]
pub struct CategoryFactory {
    overrides: Map<String, Value>,
    rng: StdRng,
}

impl Default for CategoryFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryFactory {
    pub fn new() -> Self {
        Self {
            overrides: Map::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic names and slugs, for reproducible fixtures.
    pub fn seeded(seed: u64) -> Self {
        Self {
            overrides: Map::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Default state: a two-word name and a matching slug with a random suffix
    /// so repeated rows do not collide on the unique slug.
    pub fn definition(&mut self) -> Map<String, Value> {
        let adjective = ADJECTIVES[self.rng.gen_range(0..ADJECTIVES.len())];
        let noun = NOUNS[self.rng.gen_range(0..NOUNS.len())];
        let name = format!("{adjective} {noun}");
        let slug = self.unique_slug(&name);

        let mut attributes = Map::new();
        attributes.insert("name".into(), json!(name));
        attributes.insert("slug".into(), json!(slug));
        attributes
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.to_string(), value.into());
        self
    }

    pub fn named(self, name: &str) -> Self {
        self.with("name", name)
    }

    pub fn child_of(self, parent_id: Uuid) -> Self {
        self.with("parent_id", parent_id.to_string())
    }

    pub fn root(self) -> Self {
        self.with("parent_id", Value::Null)
    }

    /// Definition merged with overrides. An overridden name without an
    /// overridden slug gets a slug derived from that name.
    pub fn attributes(&mut self) -> Map<String, Value> {
        let mut attributes = self.definition();
        if !self.overrides.contains_key("slug") {
            if let Some(Value::String(name)) = self.overrides.get("name").cloned() {
                let slug = self.unique_slug(&name);
                attributes.insert("slug".into(), json!(slug));
            }
        }
        attributes.extend(self.overrides.clone());
        attributes
    }

    /// Builds without persisting.
    pub fn make(&mut self) -> AppResult<NewCategory> {
        let attributes = self.attributes();
        let attrs = CategoryAttributes::fill(&attributes, &MassAssignmentPolicy::unguarded())?;
        NewCategory::try_from(attrs)
    }

    pub async fn create<C>(&mut self, repo: &CategoryRepository<'_, C>) -> AppResult<Category>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let new = self.make()?;
        repo.create(new).await
    }

    pub async fn create_many<C>(
        &mut self,
        repo: &CategoryRepository<'_, C>,
        count: usize,
    ) -> AppResult<Vec<Category>>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            created.push(self.create(repo).await?);
        }
        Ok(created)
    }

    fn unique_slug(&mut self, name: &str) -> String {
        let suffix: u32 = self.rng.gen_range(0..0x100_0000);
        let base = slugify(name);
        if base.is_empty() {
            format!("category-{suffix:06x}")
        } else {
            format!("{base}-{suffix:06x}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_slug;

    #[test]
    fn definition_fills_required_fields() {
        let attributes = CategoryFactory::new().definition();
        let name = attributes["name"].as_str().unwrap();
        let slug = attributes["slug"].as_str().unwrap();
        assert!(!name.is_empty());
        assert!(slug.starts_with(&slugify(name)));
        assert!(validate_slug(slug).is_ok());
        assert!(!attributes.contains_key("parent_id"));
    }

    #[test]
    fn seeded_factories_are_reproducible() {
        let a = CategoryFactory::seeded(42).make().unwrap();
        let b = CategoryFactory::seeded(42).make().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn overrides_win_over_definition() {
        let parent = Uuid::new_v4();
        let new = CategoryFactory::seeded(1)
            .named("Ferris Mugs")
            .with("slug", "ferris-mugs")
            .child_of(parent)
            .make()
            .unwrap();
        assert_eq!(new.name, "Ferris Mugs");
        assert_eq!(new.slug, "ferris-mugs");
        assert_eq!(new.parent_id, Some(parent));
    }

    #[test]
    fn overridden_name_drives_slug() {
        let new = CategoryFactory::seeded(7).named("Rust Books").make().unwrap();
        assert!(new.slug.starts_with("rust-books-"));
    }

    #[test]
    fn root_clears_parent() {
        let new = CategoryFactory::seeded(3)
            .child_of(Uuid::new_v4())
            .root()
            .make()
            .unwrap();
        assert_eq!(new.parent_id, None);
    }

    #[test]
    fn unknown_override_is_an_error() {
        let result = CategoryFactory::new().with("colour", "red").make();
        assert!(result.is_err());
    }
}
