//! Input rules shared by the storefront forms.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r".+@.+\..+").expect("email pattern"));
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\d{2}\) \d{5}-\d{4}$").expect("phone pattern"));
static HTTP_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://.+").expect("url pattern"));

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Fully masked phone, `(DD) DDDDD-DDDD`.
pub fn is_valid_phone(value: &str) -> bool {
    PHONE.is_match(value)
}

pub fn is_http_url(value: &str) -> bool {
    HTTP_URL.is_match(value)
}

pub fn is_positive_price(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
