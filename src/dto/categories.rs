use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, Product};

/// Documents the mass-assignable body of create and update requests.
/// Handlers read the raw JSON object so unknown keys can be reported.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryInput {
    /// UUID of the parent, or `null` for a root category.
    pub parent_id: Option<Uuid>,
    /// Derived from `name` on create when omitted.
    pub slug: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductLink {
    pub category_id: Uuid,
    pub product_id: Uuid,
    /// False when the link already existed.
    pub created: bool,
}

/// Response DTO for the category tree (hierarchical structure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(no_recursion)]
pub struct CategoryTree {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub slug: String,
    pub name: String,
    pub children: Vec<CategoryTree>,
}

impl CategoryTree {
    /// Build a forest from a flat list. Categories whose parent is not in the
    /// list are treated as roots; siblings keep the input order.
    pub fn build_forest(categories: Vec<Category>) -> Vec<CategoryTree> {
        let ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
        let mut by_parent: HashMap<Option<Uuid>, Vec<Category>> = HashMap::new();
        for category in categories {
            let key = category.parent_id.filter(|p| ids.contains(p));
            by_parent.entry(key).or_default().push(category);
        }

        let roots = by_parent.remove(&None).unwrap_or_default();
        let forest = roots
            .into_iter()
            .map(|root| Self::build_node(root, &mut by_parent))
            .collect();

        let unreachable: usize = by_parent.values().map(Vec::len).sum();
        if unreachable > 0 {
            tracing::warn!(count = unreachable, "categories unreachable from any root");
        }

        forest
    }

    fn build_node(
        category: Category,
        by_parent: &mut HashMap<Option<Uuid>, Vec<Category>>,
    ) -> CategoryTree {
        let children = by_parent
            .remove(&Some(category.id))
            .unwrap_or_default()
            .into_iter()
            .map(|child| Self::build_node(child, by_parent))
            .collect();

        CategoryTree {
            id: category.id,
            parent_id: category.parent_id,
            slug: category.slug,
            name: category.name,
            children,
        }
    }
}
