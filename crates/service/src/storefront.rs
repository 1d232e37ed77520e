//! Wiring of every storefront service over one backend.

use std::sync::Arc;

use configs::{AppConfig, ListingConfig};

use crate::auth::AuthService;
use crate::backend::rest::RestBackend;
use crate::backend::Backend;
use crate::notify::Notifier;
use crate::query_cache::QueryCache;
use crate::services::profile_service::Avatars;
use crate::services::{CategoryService, ProductService, ProfileService, UserAdminService};

/// All services sharing one listing cache and one notification channel.
#[derive(Clone)]
pub struct Storefront {
    pub products: ProductService,
    pub categories: CategoryService,
    pub users: UserAdminService,
    pub profiles: ProfileService,
    pub auth: AuthService,
    pub cache: Arc<QueryCache>,
    pub notifier: Notifier,
    pub listing: ListingConfig,
}

impl Storefront {
    pub fn new(backend: Backend, cfg: &AppConfig) -> Self {
        let cache = Arc::new(QueryCache::from_config(&cfg.listing));
        let notifier = Notifier::default();
        let avatars = Avatars::new(
            backend.storage.clone(),
            &cfg.storage.avatar_bucket,
            &cfg.storage.placeholder_avatar_url,
        );
        let profiles = ProfileService::new(backend.clone(), cache.clone(), notifier.clone(), avatars.clone());
        Self {
            products: ProductService::new(backend.clone(), cache.clone(), notifier.clone(), &cfg.storage.product_bucket),
            categories: CategoryService::new(backend.clone(), cache.clone(), notifier.clone()),
            users: UserAdminService::new(backend.clone(), cache.clone(), notifier.clone(), avatars),
            auth: AuthService::new(backend, cache.clone(), profiles.clone(), &cfg.auth.password_reset_redirect),
            profiles,
            cache,
            notifier,
            listing: cfg.listing.clone(),
        }
    }

    /// Storefront over the REST platform described by `cfg.backend`.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, crate::errors::RemoteError> {
        let rest = RestBackend::from_config(&cfg.backend)?;
        Ok(Self::new(Backend::rest(rest), cfg))
    }
}
