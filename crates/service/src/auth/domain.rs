use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Email/password pair sent to the auth platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// User as known to the auth platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    pub fn full_name(&self) -> &str {
        self.user_metadata.get("full_name").and_then(Value::as_str).unwrap_or("")
    }
}

/// Signed-in session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Fields changed on the auth user. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Auth state transitions observed by a session context.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    UserUpdated(Session),
    TokenRefreshed(Session),
    PasswordRecovery(Session),
}

impl AuthEvent {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedOut => None,
            Self::SignedIn(s) | Self::UserUpdated(s) | Self::TokenRefreshed(s) | Self::PasswordRecovery(s) => Some(s),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedIn(_) => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::UserUpdated(_) => "USER_UPDATED",
            Self::TokenRefreshed(_) => "TOKEN_REFRESHED",
            Self::PasswordRecovery(_) => "PASSWORD_RECOVERY",
        }
    }
}
