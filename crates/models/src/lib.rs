//! Typed storefront records and their form validation.

pub mod errors;
pub mod validation;
pub mod product;
pub mod category;
pub mod profile;
pub mod forms;

pub use category::{Category, CategoryDraft, NewCategory};
pub use errors::{FieldErrors, ModelError};
pub use product::{NewProduct, Product, ProductDraft};
pub use profile::{Profile, ProfileForm};
