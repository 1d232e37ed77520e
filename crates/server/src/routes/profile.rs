use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    Extension, Json,
};
use models::{Profile, ProfileForm};
use serde::Deserialize;
use service::auth::SessionContext;
use service::services::Upload;

use super::auth::{session_of, ServerState};
use crate::errors::ApiError;

#[derive(Deserialize)]
pub struct FileQuery {
    pub file_name: String,
}

/// Build an upload from a raw request body.
pub fn upload_from(file_name: String, headers: &HeaderMap, body: Bytes) -> Result<Upload, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty file".into()));
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Ok(Upload { file_name, content_type, bytes: body.to_vec() })
}

pub async fn get_profile(
    State(state): State<ServerState>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<Profile>, ApiError> {
    if let Some(profile) = ctx.state().profile.clone() {
        return Ok(Json(profile));
    }
    let session = session_of(&ctx)?;
    Ok(Json(state.storefront.profiles.get_profile(&session.user).await?))
}

pub async fn update_profile(
    State(state): State<ServerState>,
    Extension(ctx): Extension<SessionContext>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<Profile>, ApiError> {
    let session = session_of(&ctx)?;
    let saved = state.storefront.profiles.update_profile(&session, form, None).await?;
    ctx.set_profile(Some(saved.clone()));
    Ok(Json(saved))
}

/// Replace the avatar, keeping the current name and phone.
pub async fn upload_avatar(
    State(state): State<ServerState>,
    Extension(ctx): Extension<SessionContext>,
    Query(q): Query<FileQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Profile>, ApiError> {
    let session = session_of(&ctx)?;
    let upload = upload_from(q.file_name, &headers, body)?;
    let current = match ctx.state().profile.clone() {
        Some(p) => p,
        None => state.storefront.profiles.get_profile(&session.user).await?,
    };
    let form = ProfileForm { full_name: current.full_name, phone: current.phone };
    let saved = state.storefront.profiles.update_profile(&session, form, Some(upload)).await?;
    ctx.set_profile(Some(saved.clone()));
    Ok(Json(saved))
}
