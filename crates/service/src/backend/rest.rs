//! HTTP client for a PostgREST + GoTrue + Storage platform.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{AuthProvider, Collection, DataStore, ObjectStorage, OrderBy, RawPage};
use crate::auth::domain::{AuthUser, Credentials, Session, UserUpdate};
use crate::errors::RemoteError;
use crate::pagination::PageWindow;

pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::transport)?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key: api_key.to_string() })
    }

    pub fn from_config(cfg: &configs::BackendConfig) -> Result<Self, RemoteError> {
        Self::new(&cfg.url, &cfg.api_key, Duration::from_secs(cfg.request_timeout_secs))
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Request authorised with the project key.
    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.http.request(method, url).header("apikey", &self.api_key).bearer_auth(&self.api_key)
    }

    /// Request authorised as the user owning `access_token`.
    fn user_request(&self, method: Method, url: String, access_token: &str) -> RequestBuilder {
        self.http.request(method, url).header("apikey", &self.api_key).bearer_auth(access_token)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = req.send().await.map_err(RemoteError::transport)?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(error_from_response(resp).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, RemoteError> {
        let resp = self.send(req).await?;
        resp.json::<T>().await.map_err(RemoteError::transport)
    }
}

async fn error_from_response(resp: Response) -> RemoteError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let message = ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|k| parsed.get(*k).and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    let code = ["code", "error_code"]
        .iter()
        .find_map(|k| parsed.get(*k))
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()));
    warn!(status = status.as_u16(), %message, "backend request failed");
    RemoteError { status: Some(status.as_u16()), code, message }
}

/// Total from a `Content-Range: 0-7/17` header; `*` totals fall back to the row count.
fn parse_content_range(value: Option<&str>, fallback: usize) -> u64 {
    value
        .and_then(|v| v.rsplit_once('/'))
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
        .unwrap_or(fallback as u64)
}

fn eq_filter(id: &str) -> String {
    format!("eq.{id}")
}

#[async_trait]
impl DataStore for RestBackend {
    async fn list(&self, collection: Collection, window: PageWindow, order: &OrderBy) -> Result<RawPage, RemoteError> {
        let direction = if order.ascending { "asc" } else { "desc" };
        let req = self
            .request(Method::GET, self.table_url(collection))
            .header("Prefer", "count=exact")
            .query(&[
                ("select", "*".to_string()),
                ("order", format!("{}.{}", order.column, direction)),
                ("offset", window.from.to_string()),
                ("limit", window.len().to_string()),
            ]);
        let resp = self.send(req).await?;
        let range = resp
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let rows: Vec<Value> = resp.json().await.map_err(RemoteError::transport)?;
        let total = parse_content_range(range.as_deref(), rows.len());
        debug!(%collection, from = window.from, to = window.to, total, "listed rows");
        Ok(RawPage { rows, total })
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, RemoteError> {
        let req = self
            .request(Method::GET, self.table_url(collection))
            .query(&[("select", "*".to_string()), ("id", eq_filter(id))]);
        let rows: Vec<Value> = self.send_json(req).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, collection: Collection, row: Value) -> Result<Value, RemoteError> {
        let req = self
            .request(Method::POST, self.table_url(collection))
            .header("Prefer", "return=representation")
            .json(&vec![row]);
        let rows: Vec<Value> = self.send_json(req).await?;
        rows.into_iter().next().ok_or_else(|| RemoteError::new("insert returned no rows"))
    }

    async fn update(&self, collection: Collection, id: &str, patch: Value) -> Result<Option<Value>, RemoteError> {
        let req = self
            .request(Method::PATCH, self.table_url(collection))
            .header("Prefer", "return=representation")
            .query(&[("id", eq_filter(id))])
            .json(&patch);
        let rows: Vec<Value> = self.send_json(req).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), RemoteError> {
        let req = self.request(Method::DELETE, self.table_url(collection)).query(&[("id", eq_filter(id))]);
        self.send(req).await?;
        Ok(())
    }

    async fn call(&self, function: &str, args: Value) -> Result<Value, RemoteError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let resp = self.send(self.request(Method::POST, url).json(&args)).await?;
        let body = resp.text().await.map_err(RemoteError::transport)?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| RemoteError::new(e.to_string()))
    }
}

#[async_trait]
impl ObjectStorage for RestBackend {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<String, RemoteError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, key);
        let req = self
            .request(Method::POST, url)
            .header(header::CONTENT_TYPE, content_type.unwrap_or("application/octet-stream"))
            .body(bytes);
        self.send(req).await?;
        Ok(key.to_string())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<(), RemoteError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, key);
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, key)
    }
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, RemoteError> {
        let req = self
            .request(Method::POST, self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(credentials);
        self.send_json(req).await
    }

    async fn sign_up(&self, credentials: &Credentials, metadata: Value) -> Result<AuthUser, RemoteError> {
        let body = json!({ "email": credentials.email, "password": credentials.password, "data": metadata });
        let value: Value = self.send_json(self.request(Method::POST, self.auth_url("signup")).json(&body)).await?;
        // With auto-confirm the platform answers with a session wrapping the user.
        let user = match value.get("user") {
            Some(u) if u.is_object() => u.clone(),
            _ => value,
        };
        serde_json::from_value(user).map_err(|e| RemoteError::new(e.to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError> {
        self.send(self.user_request(Method::POST, self.auth_url("logout"), access_token)).await?;
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), RemoteError> {
        let req = self
            .request(Method::POST, self.auth_url("recover"))
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }));
        self.send(req).await?;
        Ok(())
    }

    async fn update_user(&self, access_token: &str, update: &UserUpdate) -> Result<AuthUser, RemoteError> {
        self.send_json(self.user_request(Method::PUT, self.auth_url("user"), access_token).json(update)).await
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, RemoteError> {
        self.send_json(self.user_request(Method::GET, self.auth_url("user"), access_token)).await
    }
}
