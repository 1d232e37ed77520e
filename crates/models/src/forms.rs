//! Authentication forms.

use serde::{Deserialize, Serialize};

use crate::errors::{FieldErrors, ModelError};
use crate::validation::{self, MIN_PASSWORD_LEN};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut errors = FieldErrors::new();
        if !validation::is_valid_email(&self.email) {
            errors.add("email", "invalid e-mail");
        }
        if self.password.is_empty() {
            errors.add("password", "password is required");
        }
        errors.into_result()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut errors = FieldErrors::new();
        if validation::is_blank(&self.full_name) {
            errors.add("full_name", "name is required");
        }
        if !validation::is_valid_email(&self.email) {
            errors.add("email", "invalid e-mail");
        }
        if !validation::is_valid_phone(&self.phone) {
            errors.add("phone", "phone must have the format (99) 99999-9999");
        }
        check_new_password(&mut errors, &self.password, &self.confirm);
        errors.into_result()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PasswordForm {
    pub password: String,
    pub confirm: String,
}

impl PasswordForm {
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut errors = FieldErrors::new();
        check_new_password(&mut errors, &self.password, &self.confirm);
        errors.into_result()
    }
}

fn check_new_password(errors: &mut FieldErrors, password: &str, confirm: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", format!("password must have at least {MIN_PASSWORD_LEN} characters"));
    }
    if password != confirm {
        errors.add("confirm", "passwords do not match");
    }
}
