use axum::{
    extract::{Path, Query, State},
    Json,
};
use models::product::ProductId;
use models::Product;
use serde::{Deserialize, Serialize};
use service::format::{format_phone, format_price};
use service::pagination::Pagination;

use super::auth::ServerState;
use super::ListingView;
use crate::errors::ApiError;

/// Product as shown on the storefront, with its price already formatted.
#[derive(Debug, Serialize)]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: Product,
    pub price_label: String,
}

impl From<Product> for ProductCard {
    fn from(product: Product) -> Self {
        let price_label = format_price(product.price);
        Self { product, price_label }
    }
}

pub async fn list_products(
    State(state): State<ServerState>,
    Query(p): Query<Pagination>,
) -> Result<Json<ListingView<ProductCard>>, ApiError> {
    let sf = &state.storefront;
    let (page, limit) = p.normalize(sf.listing.storefront_per_page);
    let listing = sf.products.list_page(page, limit).await?;
    Ok(Json(listing.map(ProductCard::from).into()))
}

pub async fn get_product(
    State(state): State<ServerState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductCard>, ApiError> {
    let product = state.storefront.products.get(id).await?;
    Ok(Json(product.into()))
}

#[derive(Deserialize)]
pub struct PhoneQuery {
    #[serde(default)]
    pub raw: String,
}

#[derive(Serialize)]
pub struct PhoneOutput {
    pub formatted: String,
}

pub async fn phone_format(Query(q): Query<PhoneQuery>) -> Json<PhoneOutput> {
    Json(PhoneOutput { formatted: format_phone(&q.raw) })
}
