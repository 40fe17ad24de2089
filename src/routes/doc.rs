use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        categories::{CategoryInput, CategoryList, CategoryProductList, CategoryTree, ProductLink},
        products::{CreateProductRequest, ProductCategoryList, ProductList},
    },
    models::{Category, Product},
    response::{ApiResponse, Meta},
    routes::{categories, health, params, products},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        categories::list_categories,
        categories::category_tree,
        categories::get_category,
        categories::get_category_by_slug,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        categories::get_parent,
        categories::list_children,
        categories::list_ancestors,
        categories::list_category_products,
        categories::attach_product,
        categories::detach_product,
        products::list_products,
        products::get_product,
        products::create_product,
        products::delete_product,
        products::list_product_categories,
    ),
    components(
        schemas(
            Category,
            Product,
            CategoryInput,
            CategoryList,
            CategoryProductList,
            CategoryTree,
            ProductLink,
            CreateProductRequest,
            ProductList,
            ProductCategoryList,
            health::HealthData,
            params::Pagination,
            params::CategoryQuery,
            params::CategorySortBy,
            params::SortOrder,
            Meta,
            ApiResponse<Category>,
            ApiResponse<Product>,
            ApiResponse<CategoryList>,
            ApiResponse<ProductList>,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Categories", description = "Category hierarchy and product links"),
        (name = "Products", description = "Product endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
