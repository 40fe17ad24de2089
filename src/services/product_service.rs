use serde_json::{Value, json};
use uuid::Uuid;

use super::record_audit;
use crate::{
    dto::products::{CreateProductRequest, ProductCategoryList, ProductList},
    error::AppResult,
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

const RESOURCE: &str = "products";

pub async fn list_products(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let page = state.products().list(&pagination).await?;
    let meta = Meta::for_page(&page);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items: page.items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = state.products().get(id).await?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let product = state.products().create(payload).await?;

    record_audit(
        state,
        "product_create",
        RESOURCE,
        json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Value>> {
    state.products().delete(id).await?;

    record_audit(
        state,
        "product_delete",
        RESOURCE,
        json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Deleted", json!({}), Some(Meta::empty())))
}

pub async fn list_categories(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<ProductCategoryList>> {
    let items = state.products().categories(id).await?;
    Ok(ApiResponse::success(
        "Product categories",
        ProductCategoryList { items },
        None,
    ))
}
