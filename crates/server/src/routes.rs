pub mod admin;
pub mod auth;
pub mod catalog;
pub mod profile;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use common::types::Health;
use serde::Serialize;
use service::pager::PagerView;
use service::pagination::Page;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use auth::ServerState;

pub async fn health() -> Json<Health> {
    Json(Health::ok("storefront"))
}

/// Listing payload: one page plus the pager, which is null when there is a
/// single page or none.
#[derive(Debug, Serialize)]
pub struct ListingView<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub total_pages: u32,
    pub page: u32,
    pub pager: Option<PagerView>,
}

impl<T> From<Page<T>> for ListingView<T> {
    fn from(page: Page<T>) -> Self {
        let pager = page.pager();
        Self { items: page.items, total: page.total, total_pages: page.total_pages, page: page.page, pager }
    }
}

/// Build the full application router: public catalog, auth, profile and admin.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/products", get(catalog::list_products))
        .route("/api/products/:id", get(catalog::get_product))
        .route("/api/phone-format", get(catalog::phone_format))
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/forgot-password", post(auth::forgot_password));

    let signed_in = Router::new()
        .route("/auth/update-password", post(auth::update_password))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/profile/avatar", post(profile::upload_avatar))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session));

    let admin_routes = Router::new()
        .route("/admin/products", get(admin::list_products).post(admin::create_product))
        .route(
            "/admin/products/:id",
            get(admin::get_product).put(admin::update_product).delete(admin::delete_product),
        )
        .route("/admin/products/image", post(admin::upload_product_image))
        .route("/admin/categories", get(admin::list_categories).post(admin::create_category))
        .route(
            "/admin/categories/:id",
            get(admin::get_category).put(admin::update_category).delete(admin::delete_category),
        )
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id", axum::routing::delete(admin::delete_user))
        .route("/admin/users/:id/admin", put(admin::set_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    public
        .merge(signed_in)
        .merge(admin_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
