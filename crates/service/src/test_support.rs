#![cfg(test)]
use configs::AppConfig;

use crate::auth::domain::{Credentials, Session};
use crate::backend::repository::mock::MemoryBackend;
use crate::backend::AuthProvider;
use crate::storefront::Storefront;

/// Storefront over in-memory collaborators, with handles for assertions.
pub struct Fixture {
    pub mem: MemoryBackend,
    pub storefront: Storefront,
}

pub fn fixture() -> Fixture {
    let mem = MemoryBackend::new();
    let storefront = Storefront::new(mem.backend(), &AppConfig::default());
    Fixture { mem, storefront }
}

/// Create an account named `full_name` and sign it in.
pub async fn signed_in(fx: &Fixture, email: &str, full_name: &str) -> Session {
    fx.mem.auth.add_user(email, "secret1", serde_json::json!({ "full_name": full_name }));
    fx.mem
        .auth
        .sign_in(&Credentials { email: email.into(), password: "secret1".into() })
        .await
        .expect("sign in test user")
}
