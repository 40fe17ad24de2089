use serde_json::{Value, json};
use uuid::Uuid;

use super::record_audit;
use crate::{
    dto::categories::{CategoryList, CategoryProductList, CategoryTree, ProductLink},
    error::{AppError, AppResult},
    mass_assignment::{CategoryAttributes, NewCategory},
    models::Category,
    response::{ApiResponse, Meta},
    routes::params::{CategoryQuery, Pagination},
    state::AppState,
};

const RESOURCE: &str = "categories";

pub async fn list_categories(
    state: &AppState,
    query: CategoryQuery,
) -> AppResult<ApiResponse<CategoryList>> {
    let page = state.categories().list(&query).await?;
    let meta = Meta::for_page(&page);
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items: page.items },
        Some(meta),
    ))
}

pub async fn category_tree(state: &AppState) -> AppResult<ApiResponse<Vec<CategoryTree>>> {
    let tree = state.categories().tree().await?;
    Ok(ApiResponse::success("Category tree", tree, Some(Meta::empty())))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = state.categories().get(id).await?;
    Ok(ApiResponse::success("Category", category, None))
}

pub async fn get_category_by_slug(
    state: &AppState,
    slug: &str,
) -> AppResult<ApiResponse<Category>> {
    let category = state
        .categories()
        .find_by_slug(slug)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Category", category, None))
}

pub async fn create_category(
    state: &AppState,
    payload: Value,
) -> AppResult<ApiResponse<Category>> {
    let attrs = CategoryAttributes::from_value(&payload, &state.schema.mass_assignment)?;
    if !attrs.ignored.is_empty() {
        tracing::info!(fields = ?attrs.ignored, "guarded fields dropped from category create");
    }
    let new = NewCategory::try_from(attrs)?;
    let category = state.categories().create(new).await?;

    record_audit(
        state,
        "category_create",
        RESOURCE,
        json!({ "category_id": category.id, "slug": category.slug }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category,
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    id: Uuid,
    payload: Value,
) -> AppResult<ApiResponse<Category>> {
    let attrs = CategoryAttributes::from_value(&payload, &state.schema.mass_assignment)?;
    if !attrs.ignored.is_empty() {
        tracing::info!(category_id = %id, fields = ?attrs.ignored, "guarded fields dropped from category update");
    }
    let changed = !attrs.is_empty();
    let category = state.categories().update(id, attrs).await?;

    if changed {
        record_audit(
            state,
            "category_update",
            RESOURCE,
            json!({ "category_id": category.id }),
        )
        .await;
    }

    Ok(ApiResponse::success(
        "Updated",
        category,
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Value>> {
    state.categories().delete(id).await?;

    record_audit(
        state,
        "category_delete",
        RESOURCE,
        json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Deleted", json!({}), Some(Meta::empty())))
}

pub async fn get_parent(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Option<Category>>> {
    let parent = state.categories().parent(id).await?;
    Ok(ApiResponse::success("Parent category", parent, None))
}

pub async fn list_children(state: &AppState, id: Uuid) -> AppResult<ApiResponse<CategoryList>> {
    let categories = state.categories();
    categories.get(id).await?;
    let items = categories.children(id).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Child categories",
        CategoryList { items },
        Some(Meta {
            page: None,
            per_page: None,
            total: Some(total),
        }),
    ))
}

pub async fn list_ancestors(state: &AppState, id: Uuid) -> AppResult<ApiResponse<CategoryList>> {
    let items = state.categories().ancestors(id).await?;
    Ok(ApiResponse::success(
        "Ancestor categories",
        CategoryList { items },
        None,
    ))
}

pub async fn list_products(
    state: &AppState,
    id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<CategoryProductList>> {
    let categories = state.categories();
    categories.get(id).await?;
    let page = categories.products(id, &pagination).await?;
    let meta = Meta::for_page(&page);
    Ok(ApiResponse::success(
        "Category products",
        CategoryProductList { items: page.items },
        Some(meta),
    ))
}

pub async fn attach_product(
    state: &AppState,
    id: Uuid,
    product_id: Uuid,
) -> AppResult<ApiResponse<ProductLink>> {
    let created = state.categories().attach_product(id, product_id).await?;

    if created {
        record_audit(
            state,
            "category_product_attach",
            RESOURCE,
            json!({ "category_id": id, "product_id": product_id }),
        )
        .await;
    }

    let message = if created { "Product attached" } else { "Product already attached" };
    Ok(ApiResponse::success(
        message,
        ProductLink {
            category_id: id,
            product_id,
            created,
        },
        Some(Meta::empty()),
    ))
}

pub async fn detach_product(
    state: &AppState,
    id: Uuid,
    product_id: Uuid,
) -> AppResult<ApiResponse<Value>> {
    state.categories().detach_product(id, product_id).await?;

    record_audit(
        state,
        "category_product_detach",
        RESOURCE,
        json!({ "category_id": id, "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product detached",
        json!({}),
        Some(Meta::empty()),
    ))
}
