use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{FieldErrors, ModelError};
use crate::validation;

pub const TABLE: &str = "profiles";
pub const ORDER_COLUMN: &str = "full_name";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    /// Storage key as stored; services replace it with a public URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl Profile {
    /// Profile shown for an authenticated user whose row does not exist yet.
    pub fn fallback(id: Uuid, full_name: impl Into<String>) -> Self {
        Self { id, full_name: full_name.into(), phone: String::new(), avatar_url: None, is_admin: false }
    }
}

/// Row written when a profile is first created.
#[derive(Clone, Debug, Serialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Patch for an existing profile row. `avatar_url` is left untouched when `None`.
#[derive(Clone, Debug, Serialize)]
pub struct ProfileChanges {
    pub full_name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
}

impl ProfileForm {
    /// Name is required; phone is optional but must be fully masked when given.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut errors = FieldErrors::new();
        if validation::is_blank(&self.full_name) {
            errors.add("full_name", "name is required");
        }
        if !self.phone.is_empty() && !validation::is_valid_phone(&self.phone) {
            errors.add("phone", "phone must have the format (99) 99999-9999");
        }
        errors.into_result()
    }

    pub fn changes(&self, avatar_key: Option<String>) -> ProfileChanges {
        ProfileChanges {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.clone(),
            avatar_url: avatar_key,
            updated_at: Utc::now(),
        }
    }

    pub fn new_row(&self, id: Uuid, avatar_key: Option<String>) -> NewProfile {
        let now = Utc::now();
        NewProfile {
            id,
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.clone(),
            avatar_url: avatar_key,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_row_decodes_with_defaults() {
        let id = Uuid::new_v4();
        let p: Profile = serde_json::from_value(serde_json::json!({"id": id})).unwrap();
        assert_eq!(p, Profile::fallback(id, ""));
    }

    #[test]
    fn empty_phone_allowed_partial_phone_rejected() {
        let ok = ProfileForm { full_name: "Ana".into(), phone: String::new() };
        assert!(ok.validate().is_ok());
        let bad = ProfileForm { full_name: "Ana".into(), phone: "(11) 9".into() };
        assert!(matches!(bad.validate(), Err(ModelError::Validation(e)) if e.contains("phone")));
    }

    #[test]
    fn changes_skip_absent_avatar() {
        let form = ProfileForm { full_name: " Ana ".into(), phone: "(11) 98765-4321".into() };
        let v = serde_json::to_value(form.changes(None)).unwrap();
        assert_eq!(v["full_name"], "Ana");
        assert!(v.get("avatar_url").is_none());
    }
}
