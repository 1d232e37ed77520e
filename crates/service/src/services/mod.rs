//! Entity services: paged listings and mutations per collection.

pub mod category_service;
pub mod product_service;
pub mod profile_service;
pub mod user_service;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::ServiceError;

pub use category_service::CategoryService;
pub use product_service::ProductService;
pub use profile_service::ProfileService;
pub use user_service::UserAdminService;

/// File attached to a form.
#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), content_type: None, bytes }
    }

    /// Fresh random object key that keeps the original extension.
    pub fn storage_key(&self) -> String {
        let id = Uuid::new_v4();
        match Path::new(&self.file_name).extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("{id}.{}", ext.to_lowercase()),
            _ => id.to_string(),
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(row: Value) -> Result<T, ServiceError> {
    Ok(serde_json::from_value(row)?)
}
