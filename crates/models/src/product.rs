use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FieldErrors, ModelError};
use crate::validation;

pub const TABLE: &str = "products";
pub const ORDER_COLUMN: &str = "title";

pub type ProductId = i64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Product form as submitted by the admin screens, before validation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Validated row payload for insert and update.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
}

impl ProductDraft {
    /// Collect every field violation. `has_upload` is true when an image file
    /// accompanies the form, in which case `image_url` may be empty.
    pub fn validate(&self, has_upload: bool) -> Result<(), ModelError> {
        let mut errors = FieldErrors::new();
        if validation::is_blank(&self.title) {
            errors.add("title", "title is required");
        }
        if validation::is_blank(&self.description) {
            errors.add("description", "description is required");
        }
        match self.price {
            None => errors.add("price", "price is required"),
            Some(p) if !validation::is_positive_price(p) => errors.add("price", "price must be a positive number"),
            Some(_) => {}
        }
        if !has_upload {
            match self.image_url.as_deref().map(str::trim) {
                None | Some("") => errors.add("image_url", "select an image or provide its URL"),
                Some(url) if !validation::is_http_url(url) => errors.add("image_url", "invalid image URL"),
                Some(_) => {}
            }
        }
        errors.into_result()
    }

    /// Validate and produce the row payload. An uploaded image URL replaces
    /// whatever the form carried.
    pub fn into_new(self, uploaded_image_url: Option<String>) -> Result<NewProduct, ModelError> {
        self.validate(uploaded_image_url.is_some())?;
        Ok(NewProduct {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            price: self.price.unwrap_or_default(),
            image_url: uploaded_image_url.or_else(|| self.image_url.map(|u| u.trim().to_string())),
        })
    }
}

impl From<&Product> for ProductDraft {
    fn from(p: &Product) -> Self {
        Self {
            title: p.title.clone(),
            description: p.description.clone(),
            price: Some(p.price),
            image_url: p.image_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            title: "Caneca".into(),
            description: "Caneca de cerâmica".into(),
            price: Some(39.9),
            image_url: Some("https://cdn.example.com/caneca.png".into()),
        }
    }

    #[test]
    fn valid_draft_passes() {
        let p = draft().into_new(None).unwrap();
        assert_eq!(p.title, "Caneca");
        assert_eq!(p.image_url.as_deref(), Some("https://cdn.example.com/caneca.png"));
    }

    #[test]
    fn collects_all_field_errors() {
        let d = ProductDraft { title: "  ".into(), description: String::new(), price: Some(0.0), image_url: None };
        let Err(ModelError::Validation(errs)) = d.validate(false) else { panic!("expected validation error") };
        assert_eq!(errs.len(), 4);
        assert_eq!(errs.get("price"), Some("price must be a positive number"));
    }

    #[test]
    fn missing_price_is_required_not_positive() {
        let d = ProductDraft { price: None, ..draft() };
        let Err(ModelError::Validation(errs)) = d.validate(false) else { panic!() };
        assert_eq!(errs.get("price"), Some("price is required"));
    }

    #[test]
    fn upload_satisfies_image_requirement() {
        let d = ProductDraft { image_url: None, ..draft() };
        assert!(d.validate(false).is_err());
        let p = d.into_new(Some("https://store/p/1.png".into())).unwrap();
        assert_eq!(p.image_url.as_deref(), Some("https://store/p/1.png"));
    }

    #[test]
    fn non_http_image_url_rejected() {
        let d = ProductDraft { image_url: Some("caneca.png".into()), ..draft() };
        let Err(ModelError::Validation(errs)) = d.validate(false) else { panic!() };
        assert_eq!(errs.get("image_url"), Some("invalid image URL"));
    }
}
