use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use models::forms::{LoginForm, PasswordForm, RegisterForm};
use serde::{Deserialize, Serialize};
use service::auth::domain::Session;
use service::auth::{guard, Access, GuardOutcome, RedirectTo, SessionContext};
use service::{ServiceError, Storefront};
use tracing::warn;
use uuid::Uuid;

use crate::errors::ApiError;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerState {
    pub storefront: Arc<Storefront>,
}

impl ServerState {
    pub fn new(storefront: Storefront) -> Self {
        Self { storefront: Arc::new(storefront) }
    }
}

#[derive(Serialize)]
pub struct LoginOutput {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub full_name: String,
    pub access_token: String,
}

#[derive(Serialize)]
pub struct RegisterOutput {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct ForgotPasswordInput {
    pub email: String,
}

/// Token from `Authorization: Bearer`, falling back to the auth cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
    }
    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// The session a guarded handler runs under.
pub fn session_of(ctx: &SessionContext) -> Result<Session, ApiError> {
    ctx.get_session().ok_or(ApiError::Guard(RedirectTo::Login))
}

async fn authorize(state: &ServerState, req: &mut Request, access: Access) -> Result<(), ApiError> {
    let Some(token) = access_token(req.headers()) else {
        warn!(path = %req.uri().path(), "missing bearer token and auth cookie");
        return Err(ApiError::Guard(RedirectTo::Login));
    };
    let ctx = match state.storefront.auth.session_for_token(&token).await {
        Ok(ctx) => ctx,
        Err(ServiceError::Unauthorized) => return Err(ApiError::Guard(RedirectTo::Login)),
        Err(err) => return Err(err.into()),
    };
    match guard(access, &ctx.state()) {
        GuardOutcome::Allow => {
            req.extensions_mut().insert(ctx);
            Ok(())
        }
        GuardOutcome::Loading => Err(ApiError::Loading),
        GuardOutcome::Redirect(to) => Err(ApiError::Guard(to)),
    }
}

/// Middleware: a signed-in user is required.
pub async fn require_session(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, &mut req, Access::Authenticated).await?;
    Ok(next.run(req).await)
}

/// Middleware: a signed-in admin is required.
pub async fn require_admin(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, &mut req, Access::Admin).await?;
    Ok(next.run(req).await)
}

pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginForm>,
) -> Result<(CookieJar, Json<LoginOutput>), ApiError> {
    let session = state.storefront.auth.login(input).await?;
    let mut cookie = Cookie::new(AUTH_COOKIE, session.access_token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    let out = LoginOutput {
        user_id: session.user.id,
        email: session.user.email.clone(),
        full_name: session.user.full_name().to_string(),
        access_token: session.access_token,
    };
    Ok((jar.add(cookie), Json(out)))
}

pub async fn register(
    State(state): State<ServerState>,
    Json(input): Json<RegisterForm>,
) -> Result<(StatusCode, Json<RegisterOutput>), ApiError> {
    let user = state.storefront.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(RegisterOutput { user_id: user.id })))
}

pub async fn logout(
    State(state): State<ServerState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    if let Some(token) = access_token(&headers) {
        if let Err(err) = state.storefront.auth.logout(&token).await {
            warn!(error = %err, "sign out failed; clearing cookie anyway");
        }
    }
    (jar.remove(Cookie::build(AUTH_COOKIE).path("/")), StatusCode::NO_CONTENT)
}

pub async fn forgot_password(
    State(state): State<ServerState>,
    Json(input): Json<ForgotPasswordInput>,
) -> Result<StatusCode, ApiError> {
    state.storefront.auth.forgot_password(&input.email).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn update_password(
    State(state): State<ServerState>,
    Extension(ctx): Extension<SessionContext>,
    Json(input): Json<PasswordForm>,
) -> Result<StatusCode, ApiError> {
    let session = session_of(&ctx)?;
    state.storefront.auth.update_password(&session.access_token, input).await?;
    Ok(StatusCode::NO_CONTENT)
}
