use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

pub const PLACEHOLDER_AVATAR_URL: &str = "https://placehold.co/40?text=A";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4), log_format: default_log_format() }
    }
}

/// Backend-as-a-service endpoint. URL and key may come from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { url: String::new(), api_key: String::new(), request_timeout_secs: default_request_timeout() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_product_bucket")]
    pub product_bucket: String,
    #[serde(default = "default_avatar_bucket")]
    pub avatar_bucket: String,
    #[serde(default = "default_placeholder_avatar")]
    pub placeholder_avatar_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            product_bucket: default_product_bucket(),
            avatar_bucket: default_avatar_bucket(),
            placeholder_avatar_url: default_placeholder_avatar(),
        }
    }
}

/// Page sizes per listing view and query cache sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_admin_page_size")]
    pub products_per_page: u32,
    #[serde(default = "default_page_size")]
    pub storefront_per_page: u32,
    #[serde(default = "default_page_size")]
    pub categories_per_page: u32,
    #[serde(default = "default_page_size")]
    pub users_per_page: u32,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            products_per_page: default_admin_page_size(),
            storefront_per_page: default_page_size(),
            categories_per_page: default_page_size(),
            users_per_page: default_page_size(),
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_reset_redirect")]
    pub password_reset_redirect: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { password_reset_redirect: default_reset_redirect() }
    }
}

fn default_log_format() -> String {
    "compact".into()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_product_bucket() -> String {
    "products".into()
}

fn default_avatar_bucket() -> String {
    "avatars".into()
}

fn default_placeholder_avatar() -> String {
    PLACEHOLDER_AVATAR_URL.into()
}

fn default_admin_page_size() -> u32 {
    8
}

fn default_page_size() -> u32 {
    12
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_capacity() -> u64 {
    1_000
}

fn default_reset_redirect() -> String {
    "http://localhost:5173/update-password".into()
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults plus
    /// environment when the file is missing, then validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default().unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.backend.normalize_from_env();
        self.backend.validate()?;
        self.listing.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl BackendConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("BACKEND_URL") {
                self.url = url;
            }
        }
        if self.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("BACKEND_API_KEY") {
                self.api_key = key;
            }
        }
        self.url = self.url.trim().trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(anyhow!("backend.url is empty; set it in config.toml or BACKEND_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("backend.url must start with http:// or https://"));
        }
        if self.api_key.trim().is_empty() {
            return Err(anyhow!("backend.api_key is empty; set it in config.toml or BACKEND_API_KEY"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("backend.request_timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

impl ListingConfig {
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("products_per_page", self.products_per_page),
            ("storefront_per_page", self.storefront_per_page),
            ("categories_per_page", self.categories_per_page),
            ("users_per_page", self.users_per_page),
        ];
        for (name, size) in sizes {
            if size == 0 {
                return Err(anyhow!("listing.{name} must be >= 1"));
            }
        }
        if self.cache_capacity == 0 {
            return Err(anyhow!("listing.cache_capacity must be >= 1"));
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.product_bucket.trim().is_empty() || self.avatar_bucket.trim().is_empty() {
            return Err(anyhow!("storage bucket names must not be empty"));
        }
        Ok(())
    }
}
