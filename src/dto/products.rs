use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Category, Product};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub stock: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductCategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}
