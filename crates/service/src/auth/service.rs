use std::sync::Arc;

use models::forms::{LoginForm, PasswordForm, RegisterForm};
use models::{validation, FieldErrors};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::domain::{AuthUser, Credentials, Session, UserUpdate};
use super::session::SessionContext;
use crate::backend::Backend;
use crate::errors::{RemoteError, ServiceError};
use crate::query_cache::QueryCache;
use crate::services::ProfileService;

/// Sign-in, sign-up and password flows against the auth platform.
#[derive(Clone)]
pub struct AuthService {
    backend: Backend,
    cache: Arc<QueryCache>,
    profiles: ProfileService,
    reset_redirect: String,
}

fn unauthorized_or_remote(err: RemoteError) -> ServiceError {
    match err.status {
        Some(401) | Some(403) => ServiceError::Unauthorized,
        _ => ServiceError::Remote(err),
    }
}

impl AuthService {
    pub fn new(backend: Backend, cache: Arc<QueryCache>, profiles: ProfileService, reset_redirect: &str) -> Self {
        Self { backend, cache, profiles, reset_redirect: reset_redirect.to_string() }
    }

    /// Sign in with email and password.
    ///
    /// # Examples
    /// ```
    /// use service::backend::repository::mock::MemoryBackend;
    /// use service::storefront::Storefront;
    /// use models::forms::LoginForm;
    /// let mem = MemoryBackend::new();
    /// mem.auth.add_user("ana@loja.com", "secret1", serde_json::json!({"full_name": "Ana"}));
    /// let sf = Storefront::new(mem.backend(), &configs::AppConfig::default());
    /// let form = LoginForm { email: "ana@loja.com".into(), password: "secret1".into() };
    /// let session = tokio_test::block_on(sf.auth.login(form)).unwrap();
    /// assert_eq!(session.user.full_name(), "Ana");
    /// ```
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn login(&self, form: LoginForm) -> Result<Session, ServiceError> {
        form.validate()?;
        let creds = Credentials { email: form.email.trim().to_string(), password: form.password };
        let session = self.backend.auth.sign_in(&creds).await?;
        info!(user_id = %session.user.id, "user_logged_in");
        Ok(session)
    }

    /// End the session and drop every cached listing.
    #[instrument(skip_all)]
    pub async fn logout(&self, access_token: &str) -> Result<(), ServiceError> {
        let result = self.backend.auth.sign_out(access_token).await;
        self.cache.clear();
        result?;
        info!("user_logged_out");
        Ok(())
    }

    /// Create an account. The profile row is written afterwards on a
    /// best-effort basis.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: RegisterForm) -> Result<AuthUser, ServiceError> {
        form.validate()?;
        let creds = Credentials { email: form.email.trim().to_string(), password: form.password.clone() };
        let metadata = json!({ "full_name": form.full_name.trim(), "phone": form.phone });
        let user = self.backend.auth.sign_up(&creds, metadata).await?;
        self.profiles.insert_initial(user.id, &form.full_name, &form.phone).await;
        info!(user_id = %user.id, "user_registered");
        Ok(user)
    }

    /// Send the reset e-mail; the link returns to the configured page.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let email = email.trim();
        if !validation::is_valid_email(email) {
            let mut errors = FieldErrors::new();
            errors.add("email", "invalid e-mail");
            return Err(ServiceError::Validation(errors));
        }
        self.backend.auth.reset_password_for_email(email, &self.reset_redirect).await?;
        info!("password_reset_requested");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn update_password(&self, access_token: &str, form: PasswordForm) -> Result<AuthUser, ServiceError> {
        form.validate()?;
        let update = UserUpdate { password: Some(form.password), data: None };
        let user = self
            .backend
            .auth
            .update_user(access_token, &update)
            .await
            .map_err(unauthorized_or_remote)?;
        info!(user_id = %user.id, "password_updated");
        Ok(user)
    }

    /// Resolve a bearer token into a settled session context with the
    /// user's profile loaded.
    #[instrument(skip_all)]
    pub async fn session_for_token(&self, access_token: &str) -> Result<SessionContext, ServiceError> {
        let user = self.backend.auth.get_user(access_token).await.map_err(|e| {
            warn!(status = ?e.status, "token rejected");
            unauthorized_or_remote(e)
        })?;
        let ctx = SessionContext::new(Some(Session {
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_in: None,
            user,
        }));
        ctx.refresh_profile(&self.profiles).await?;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::backend::Collection;
    use crate::query_cache::QueryKey;
    use crate::test_support::fixture;

    fn register_form() -> RegisterForm {
        RegisterForm {
            full_name: "Ana".into(),
            email: "ana@loja.com".into(),
            phone: "(11) 98765-4321".into(),
            password: "secret1".into(),
            confirm: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login() -> anyhow::Result<()> {
        let fx = fixture();
        let user = fx.storefront.auth.register(register_form()).await?;
        assert_eq!(user.full_name(), "Ana");
        assert_eq!(fx.mem.data.rows(Collection::Profiles).len(), 1);

        let session = fx
            .storefront
            .auth
            .login(LoginForm { email: "ana@loja.com".into(), password: "secret1".into() })
            .await?;
        assert_eq!(session.user.id, user.id);
        Ok(())
    }

    #[tokio::test]
    async fn profile_insert_failure_does_not_fail_registration() -> anyhow::Result<()> {
        let fx = fixture();
        fx.mem.data.fail_next(crate::errors::RemoteError::with_status(500, "boom"));
        fx.storefront.auth.register(register_form()).await?;
        assert!(fx.mem.data.rows(Collection::Profiles).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_registration_surfaces_platform_message() {
        let fx = fixture();
        fx.storefront.auth.register(register_form()).await.unwrap();
        let err = fx.storefront.auth.register(register_form()).await.unwrap_err();
        assert_eq!(err.user_message(), "User already registered");
    }

    #[tokio::test]
    async fn wrong_password_is_remote_error() {
        let fx = fixture();
        fx.storefront.auth.register(register_form()).await.unwrap();
        let err = fx
            .storefront
            .auth
            .login(LoginForm { email: "ana@loja.com".into(), password: "nope".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Remote(ref r) if r.status == Some(400)));
    }

    #[tokio::test]
    async fn logout_clears_listing_cache() -> anyhow::Result<()> {
        let fx = fixture();
        let sf = &fx.storefront;
        sf.auth.register(register_form()).await?;
        let session = sf.auth.login(LoginForm { email: "ana@loja.com".into(), password: "secret1".into() }).await?;
        sf.products.list_page(1, 8).await?;

        sf.auth.logout(&session.access_token).await?;
        assert!(!sf.cache.contains(QueryKey { collection: Collection::Products, page: 1, limit: 8 }));
        assert!(matches!(sf.auth.session_for_token(&session.access_token).await, Err(ServiceError::Unauthorized)));
        Ok(())
    }

    #[tokio::test]
    async fn forgot_password_uses_configured_redirect() -> anyhow::Result<()> {
        let fx = fixture();
        fx.storefront.auth.forgot_password(" ana@loja.com ").await?;
        let requests = fx.mem.auth.recovery_requests();
        assert_eq!(requests, vec![("ana@loja.com".to_string(), "http://localhost:5173/update-password".to_string())]);
        assert!(matches!(fx.storefront.auth.forgot_password("ana").await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn session_for_token_loads_admin_flag() -> anyhow::Result<()> {
        let fx = fixture();
        let user = fx.mem.auth.add_user("root@loja.com", "secret1", serde_json::json!({}));
        fx.mem.data.seed(Collection::Profiles, [serde_json::json!({"id": user.id, "full_name": "Root", "is_admin": true})]);
        let token = fx.mem.auth.issue_token("root@loja.com").unwrap();

        let ctx = fx.storefront.auth.session_for_token(&token).await?;
        let state = ctx.state();
        assert!(!state.loading);
        assert!(state.is_admin());
        assert_eq!(state.access_token(), Some(token.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn update_password_takes_effect() -> anyhow::Result<()> {
        let fx = fixture();
        let sf = &fx.storefront;
        sf.auth.register(register_form()).await?;
        let session = sf.auth.login(LoginForm { email: "ana@loja.com".into(), password: "secret1".into() }).await?;
        sf.auth
            .update_password(&session.access_token, PasswordForm { password: "newpass".into(), confirm: "newpass".into() })
            .await?;
        sf.auth.login(LoginForm { email: "ana@loja.com".into(), password: "newpass".into() }).await?;
        Ok(())
    }
}
