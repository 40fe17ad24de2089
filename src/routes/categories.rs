use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::categories::{CategoryInput, CategoryList, CategoryProductList, CategoryTree, ProductLink},
    error::AppResult,
    models::Category,
    response::ApiResponse,
    routes::params::{CategoryQuery, Pagination},
    services::category_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/tree", get(category_tree))
        .route("/slug/{slug}", get(get_category_by_slug))
        .route(
            "/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/{id}/parent", get(get_parent))
        .route("/{id}/children", get(list_children))
        .route("/{id}/ancestors", get(list_ancestors))
        .route("/{id}/products", get(list_category_products))
        .route(
            "/{id}/products/{product_id}",
            put(attach_product).delete(detach_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/categories",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20, max 100"),
        ("parent_id" = Option<Uuid>, Query, description = "Only direct children of this category"),
        ("roots_only" = Option<bool>, Query, description = "Only categories without a parent"),
        ("q" = Option<String>, Query, description = "Case-insensitive match on name or slug"),
        ("sort_by" = Option<String>, Query, description = "name | slug | created_at"),
        ("sort_order" = Option<String>, Query, description = "asc | desc"),
    ),
    responses(
        (status = 200, description = "List categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = category_service::list_categories(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/tree",
    responses(
        (status = 200, description = "Whole hierarchy, roots first", body = ApiResponse<Vec<CategoryTree>>)
    ),
    tag = "Categories"
)]
pub async fn category_tree(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<CategoryTree>>>> {
    let resp = category_service::category_tree(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Get category", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::get_category(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/slug/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Get category by slug", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Categories"
)]
pub async fn get_category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::get_category_by_slug(&state, &slug).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Create category", body = ApiResponse<Category>),
        (status = 400, description = "Invalid or guarded fields, or the parent does not exist"),
        (status = 409, description = "Slug already taken"),
    ),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<(StatusCode, Json<ApiResponse<Category>>)> {
    let resp = category_service::create_category(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Updated category", body = ApiResponse<Category>),
        (status = 400, description = "Invalid fields, missing parent, or the move would create a cycle"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Slug already taken"),
    ),
    tag = "Categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::update_category(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Deleted category", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has children or products"),
    ),
    tag = "Categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = category_service::delete_category(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/parent",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Parent category, null for a root", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Categories"
)]
pub async fn get_parent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Option<Category>>>> {
    let resp = category_service::get_parent(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/children",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Direct children", body = ApiResponse<CategoryList>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Categories"
)]
pub async fn list_children(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = category_service::list_children(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/ancestors",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Ancestors, nearest first", body = ApiResponse<CategoryList>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Categories"
)]
pub async fn list_ancestors(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = category_service::list_ancestors(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/products",
    params(
        ("id" = Uuid, Path, description = "Category ID"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20, max 100"),
    ),
    responses(
        (status = 200, description = "Products linked to the category", body = ApiResponse<CategoryProductList>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Categories"
)]
pub async fn list_category_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<CategoryProductList>>> {
    let resp = category_service::list_products(&state, id, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}/products/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Category ID"),
        ("product_id" = Uuid, Path, description = "Product ID"),
    ),
    responses(
        (status = 200, description = "Product linked; `created` is false if it already was", body = ApiResponse<ProductLink>),
        (status = 404, description = "Category or product not found"),
    ),
    tag = "Categories"
)]
pub async fn attach_product(
    State(state): State<AppState>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<ProductLink>>> {
    let resp = category_service::attach_product(&state, id, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}/products/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Category ID"),
        ("product_id" = Uuid, Path, description = "Product ID"),
    ),
    responses(
        (status = 200, description = "Product unlinked", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Link not found"),
    ),
    tag = "Categories"
)]
pub async fn detach_product(
    State(state): State<AppState>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let resp = category_service::detach_product(&state, id, product_id).await?;
    Ok(Json(resp))
}
