use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use models::category::CategoryId;
use models::product::ProductId;
use models::{Category, CategoryDraft, Product, ProductDraft, Profile};
use serde::{Deserialize, Serialize};
use service::auth::SessionContext;
use service::pagination::Pagination;
use service::services::user_service::filter_by_name;
use uuid::Uuid;

use super::auth::{session_of, ServerState};
use super::profile::{upload_from, FileQuery};
use super::ListingView;
use crate::errors::ApiError;

pub async fn list_products(
    State(state): State<ServerState>,
    Query(p): Query<Pagination>,
) -> Result<Json<ListingView<Product>>, ApiError> {
    let sf = &state.storefront;
    let (page, limit) = p.normalize(sf.listing.products_per_page);
    Ok(Json(sf.products.list_page(page, limit).await?.into()))
}

pub async fn get_product(
    State(state): State<ServerState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.storefront.products.get(id).await?))
}

pub async fn create_product(
    State(state): State<ServerState>,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let created = state.storefront.products.create(draft, None).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_product(
    State(state): State<ServerState>,
    Path(id): Path<ProductId>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.storefront.products.update(id, draft, None).await?))
}

pub async fn delete_product(
    State(state): State<ServerState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    state.storefront.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct ImageOutput {
    pub image_url: String,
}

/// Raw image body; the returned URL goes into the product form.
pub async fn upload_product_image(
    State(state): State<ServerState>,
    Query(q): Query<FileQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ImageOutput>), ApiError> {
    let upload = upload_from(q.file_name, &headers, body)?;
    let image_url = state.storefront.products.upload_image(upload).await?;
    Ok((StatusCode::CREATED, Json(ImageOutput { image_url })))
}

pub async fn list_categories(
    State(state): State<ServerState>,
    Query(p): Query<Pagination>,
) -> Result<Json<ListingView<Category>>, ApiError> {
    let sf = &state.storefront;
    let (page, limit) = p.normalize(sf.listing.categories_per_page);
    Ok(Json(sf.categories.list_page(page, limit).await?.into()))
}

pub async fn get_category(
    State(state): State<ServerState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.storefront.categories.get(id).await?))
}

pub async fn create_category(
    State(state): State<ServerState>,
    Json(draft): Json<CategoryDraft>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let created = state.storefront.categories.create(draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_category(
    State(state): State<ServerState>,
    Path(id): Path<CategoryId>,
    Json(draft): Json<CategoryDraft>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.storefront.categories.update(id, draft).await?))
}

pub async fn delete_category(
    State(state): State<ServerState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, ApiError> {
    state.storefront.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, alias = "per_page")]
    pub limit: Option<u32>,
    /// Name filter applied to the fetched page.
    #[serde(default)]
    pub q: Option<String>,
}

pub async fn list_users(
    State(state): State<ServerState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ListingView<Profile>>, ApiError> {
    let sf = &state.storefront;
    let pagination = Pagination { page: query.page.unwrap_or(1), limit: query.limit };
    let (page, limit) = pagination.normalize(sf.listing.users_per_page);
    let mut view: ListingView<Profile> = sf.users.list_page(page, limit).await?.into();
    if let Some(q) = query.q.as_deref() {
        view.items = filter_by_name(&view.items, q);
    }
    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct AdminFlag {
    pub is_admin: bool,
}

pub async fn set_admin(
    State(state): State<ServerState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<Uuid>,
    Json(flag): Json<AdminFlag>,
) -> Result<Json<Profile>, ApiError> {
    let actor = session_of(&ctx)?.user.id;
    Ok(Json(state.storefront.users.set_admin(actor, id, flag.is_admin).await?))
}

pub async fn delete_user(
    State(state): State<ServerState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let actor = session_of(&ctx)?.user.id;
    state.storefront.users.delete_user(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
