use std::sync::Arc;

use models::profile::NewProfile;
use models::{Profile, ProfileForm};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{decode, Upload};
use crate::auth::domain::{AuthUser, Session, UserUpdate};
use crate::backend::{Backend, Collection, ObjectStorage};
use crate::errors::ServiceError;
use crate::listing::run_mutation;
use crate::notify::Notifier;
use crate::query_cache::QueryCache;

/// Turns stored avatar keys into displayable URLs.
#[derive(Clone)]
pub struct Avatars {
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
    placeholder: String,
}

impl Avatars {
    pub fn new(storage: Arc<dyn ObjectStorage>, bucket: &str, placeholder: &str) -> Self {
        Self { storage, bucket: bucket.to_string(), placeholder: placeholder.to_string() }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL for `key`; the placeholder when there is none. Values that
    /// are already absolute URLs pass through.
    pub fn url(&self, key: Option<&str>) -> String {
        match key.map(str::trim) {
            None | Some("") => self.placeholder.clone(),
            Some(k) if models::validation::is_http_url(k) => k.to_string(),
            Some(k) => self.storage.public_url(&self.bucket, k),
        }
    }

    pub fn resolve(&self, mut profile: Profile) -> Profile {
        profile.avatar_url = Some(self.url(profile.avatar_url.as_deref()));
        profile
    }
}

/// The signed-in user's own profile.
#[derive(Clone)]
pub struct ProfileService {
    backend: Backend,
    cache: Arc<QueryCache>,
    notifier: Notifier,
    avatars: Avatars,
}

impl ProfileService {
    pub fn new(backend: Backend, cache: Arc<QueryCache>, notifier: Notifier, avatars: Avatars) -> Self {
        Self { backend, cache, notifier, avatars }
    }

    pub fn avatar_url(&self, key: Option<&str>) -> String {
        self.avatars.url(key)
    }

    /// Stored profile row, without URL resolution.
    pub async fn find(&self, id: Uuid) -> Result<Option<Profile>, ServiceError> {
        match self.backend.data.get(Collection::Profiles, &id.to_string()).await? {
            Some(row) => Ok(Some(decode(row)?)),
            None => Ok(None),
        }
    }

    /// Profile for `user` with its avatar resolved. A user without a row
    /// gets a default profile built from the auth metadata.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn get_profile(&self, user: &AuthUser) -> Result<Profile, ServiceError> {
        let profile = self
            .find(user.id)
            .await?
            .unwrap_or_else(|| Profile::fallback(user.id, user.full_name()));
        Ok(self.avatars.resolve(profile))
    }

    /// Save name, phone and optionally a new avatar. The auth user's
    /// `full_name` metadata is kept in step with the row.
    #[instrument(skip(self, session, form, avatar), fields(user_id = %session.user.id))]
    pub async fn update_profile(
        &self,
        session: &Session,
        form: ProfileForm,
        avatar: Option<Upload>,
    ) -> Result<Profile, ServiceError> {
        form.validate()?;
        let user_id = session.user.id;
        run_mutation(&self.cache, &self.notifier, Collection::Profiles, "Profile updated", async {
            let avatar_key = match avatar {
                Some(upload) => {
                    let key = format!("{}/{}", user_id, upload.storage_key());
                    Some(
                        self.backend
                            .storage
                            .upload(self.avatars.bucket(), &key, upload.bytes, upload.content_type.as_deref())
                            .await?,
                    )
                }
                None => None,
            };

            let update = UserUpdate { password: None, data: Some(json!({ "full_name": form.full_name.trim() })) };
            self.backend.auth.update_user(&session.access_token, &update).await?;

            let id = user_id.to_string();
            let patch = serde_json::to_value(form.changes(avatar_key.clone()))?;
            let row = match self.backend.data.update(Collection::Profiles, &id, patch).await? {
                Some(row) => row,
                None => {
                    let new_row: NewProfile = form.new_row(user_id, avatar_key);
                    self.backend.data.insert(Collection::Profiles, serde_json::to_value(new_row)?).await?
                }
            };
            info!(user_id = %user_id, "profile_updated");
            Ok::<_, ServiceError>(self.avatars.resolve(decode(row)?))
        })
        .await
    }

    /// Create the first row for a freshly registered user. Failures are
    /// logged and swallowed.
    pub(crate) async fn insert_initial(&self, user_id: Uuid, full_name: &str, phone: &str) {
        let form = ProfileForm { full_name: full_name.to_string(), phone: phone.to_string() };
        let row = match serde_json::to_value(form.new_row(user_id, None)) {
            Ok(row) => row,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "profile row encoding failed");
                return;
            }
        };
        match self.backend.data.insert(Collection::Profiles, row).await {
            Ok(_) => self.cache.invalidate(Collection::Profiles),
            Err(err) => warn!(user_id = %user_id, error = %err, "initial profile insert failed"),
        }
    }
}
