use std::sync::Arc;

use models::Profile;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::decode;
use super::profile_service::Avatars;
use crate::backend::{Backend, Collection};
use crate::errors::ServiceError;
use crate::listing::{fetch_page, run_mutation};
use crate::notify::Notifier;
use crate::pagination::Page;
use crate::query_cache::QueryCache;

/// Stored procedure that removes an auth user together with their profile.
pub const DELETE_USER_FN: &str = "delete_user";

/// Admin view over registered users (profile rows).
#[derive(Clone)]
pub struct UserAdminService {
    backend: Backend,
    cache: Arc<QueryCache>,
    notifier: Notifier,
    avatars: Avatars,
}

impl UserAdminService {
    pub fn new(backend: Backend, cache: Arc<QueryCache>, notifier: Notifier, avatars: Avatars) -> Self {
        Self { backend, cache, notifier, avatars }
    }

    /// Profiles ordered by name, avatars resolved.
    pub async fn list_page(&self, page: u32, limit: u32) -> Result<Page<Profile>, ServiceError> {
        let page = fetch_page::<Profile>(self.backend.data.as_ref(), &self.cache, Collection::Profiles, page, limit).await?;
        Ok(page.map(|p| self.avatars.resolve(p)))
    }

    #[instrument(skip(self))]
    pub async fn set_admin(&self, actor: Uuid, id: Uuid, make_admin: bool) -> Result<Profile, ServiceError> {
        if actor == id {
            return Err(ServiceError::Forbidden("you cannot change your own admin flag".into()));
        }
        let message = if make_admin { "User promoted to admin" } else { "Admin rights removed" };
        run_mutation(&self.cache, &self.notifier, Collection::Profiles, message, async {
            let row = self
                .backend
                .data
                .update(Collection::Profiles, &id.to_string(), json!({ "is_admin": make_admin }))
                .await?
                .ok_or_else(|| ServiceError::not_found("user"))?;
            info!(user_id = %id, is_admin = make_admin, "admin_flag_changed");
            Ok::<_, ServiceError>(self.avatars.resolve(decode(row)?))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, actor: Uuid, id: Uuid) -> Result<(), ServiceError> {
        if actor == id {
            return Err(ServiceError::Forbidden("you cannot delete your own account".into()));
        }
        run_mutation(&self.cache, &self.notifier, Collection::Profiles, "User deleted", async {
            self.backend.data.call(DELETE_USER_FN, json!({ "user_id": id })).await?;
            info!(user_id = %id, "user_deleted");
            Ok::<_, ServiceError>(())
        })
        .await
    }
}

/// Case-insensitive substring match on `full_name`. A blank query keeps
/// everything.
pub fn filter_by_name(profiles: &[Profile], query: &str) -> Vec<Profile> {
    let needle = query.trim().to_lowercase();
    profiles
        .iter()
        .filter(|p| needle.is_empty() || p.full_name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_support::fixture;

    fn seed(fx: &crate::test_support::Fixture) -> (Uuid, Uuid) {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        fx.mem.data.seed(
            Collection::Profiles,
            [
                json!({"id": a, "full_name": "Bruno", "is_admin": true, "avatar_url": "b.png"}),
                json!({"id": b, "full_name": "ana", "phone": "(11) 98765-4321"}),
            ],
        );
        (a, b)
    }

    #[tokio::test]
    async fn listing_resolves_avatars() -> anyhow::Result<()> {
        let fx = fixture();
        seed(&fx);
        let page = fx.storefront.users.list_page(1, 12).await?;
        assert_eq!(page.items[0].full_name, "ana");
        assert_eq!(page.items[0].avatar_url.as_deref(), Some(configs::PLACEHOLDER_AVATAR_URL));
        assert_eq!(
            page.items[1].avatar_url.as_deref(),
            Some("http://storage.local/storage/v1/object/public/avatars/b.png")
        );
        Ok(())
    }

    #[tokio::test]
    async fn admin_cannot_demote_or_delete_self() {
        let fx = fixture();
        let (admin, _) = seed(&fx);
        let users = &fx.storefront.users;
        assert!(matches!(users.set_admin(admin, admin, false).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(users.delete_user(admin, admin).await, Err(ServiceError::Forbidden(_))));
        assert_eq!(fx.mem.data.rows(Collection::Profiles).len(), 2);
    }

    #[tokio::test]
    async fn promote_and_delete_refresh_listing() -> anyhow::Result<()> {
        let fx = fixture();
        let (admin, other) = seed(&fx);
        let users = &fx.storefront.users;
        users.list_page(1, 12).await?;

        let promoted = users.set_admin(admin, other, true).await?;
        assert!(promoted.is_admin);
        assert!(users.list_page(1, 12).await?.items.iter().all(|p| p.is_admin));

        users.delete_user(admin, other).await?;
        let page = users.list_page(1, 12).await?;
        assert_eq!(page.total, 1);
        assert_eq!(fx.mem.data.list_calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let fx = fixture();
        let err = fx.storefront.users.set_admin(Uuid::new_v4(), Uuid::new_v4(), true).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let people: Vec<Profile> = ["Ana Souza", "Bruno", "Mariana"]
            .into_iter()
            .map(|n| Profile::fallback(Uuid::new_v4(), n))
            .collect();
        let names = |v: Vec<Profile>| v.into_iter().map(|p| p.full_name).collect::<Vec<_>>();
        assert_eq!(names(filter_by_name(&people, "ANA")), vec!["Ana Souza", "Mariana"]);
        assert_eq!(names(filter_by_name(&people, "  ")).len(), 3);
        assert!(filter_by_name(&people, "zé").is_empty());
    }
}
