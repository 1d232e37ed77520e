use serde::{Deserialize, Serialize};

use crate::errors::{FieldErrors, ModelError};
use crate::validation;

pub const TABLE: &str = "categories";
pub const ORDER_COLUMN: &str = "name";

pub type CategoryId = i64;

/// Canonical category record. The label lives in `name`; rows that only
/// carry `nm_categoria` or `title` fail to decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryDraft {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewCategory {
    pub name: String,
}

impl CategoryDraft {
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut errors = FieldErrors::new();
        if validation::is_blank(&self.name) {
            errors.add("name", "category name is required");
        }
        errors.into_result()
    }

    pub fn into_new(self) -> Result<NewCategory, ModelError> {
        self.validate()?;
        Ok(NewCategory { name: self.name.trim().to_string() })
    }
}
