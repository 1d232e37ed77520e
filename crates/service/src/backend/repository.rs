use async_trait::async_trait;
use serde_json::Value;

use super::{Collection, OrderBy, RawPage};
use crate::auth::domain::{AuthUser, Credentials, Session, UserUpdate};
use crate::errors::RemoteError;
use crate::pagination::PageWindow;

/// Table access on the platform. Rows travel as JSON objects; services
/// decode them into typed records.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn list(&self, collection: Collection, window: PageWindow, order: &OrderBy) -> Result<RawPage, RemoteError>;
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, RemoteError>;
    async fn insert(&self, collection: Collection, row: Value) -> Result<Value, RemoteError>;
    /// Returns the updated row, or `None` if no row has that id.
    async fn update(&self, collection: Collection, id: &str, patch: Value) -> Result<Option<Value>, RemoteError>;
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), RemoteError>;
    /// Call a stored procedure.
    async fn call(&self, function: &str, args: Value) -> Result<Value, RemoteError>;
}

/// Object storage buckets.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`; returns the stored key.
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<String, RemoteError>;
    async fn remove(&self, bucket: &str, key: &str) -> Result<(), RemoteError>;
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Auth platform. Calls acting on a user take that user's access token.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, RemoteError>;
    async fn sign_up(&self, credentials: &Credentials, metadata: Value) -> Result<AuthUser, RemoteError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError>;
    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), RemoteError>;
    async fn update_user(&self, access_token: &str, update: &UserUpdate) -> Result<AuthUser, RemoteError>;
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, RemoteError>;
}

/// In-memory platform doubles for tests and local runs.
pub mod mock {
    use super::*;
    use std::cmp::Ordering;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::{Arc, Mutex};

    use uuid::Uuid;

    use crate::backend::Backend;

    fn row_id(row: &Value) -> Option<String> {
        match row.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn compare_column(a: &Value, b: &Value, column: &str) -> Ordering {
        match (a.get(column), b.get(column)) {
            (Some(Value::String(x)), Some(Value::String(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
            (Some(Value::Number(x)), Some(Value::Number(y))) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
            (Some(Value::Null) | None, _) => Ordering::Greater,
            (_, Some(Value::Null) | None) => Ordering::Less,
            _ => Ordering::Equal,
        }
    }

    #[derive(Default)]
    pub struct MemoryDataStore {
        tables: Mutex<HashMap<Collection, Vec<Value>>>,
        next_id: AtomicI64,
        list_calls: AtomicUsize,
        fail_next: Mutex<Option<RemoteError>>,
    }

    impl MemoryDataStore {
        pub fn new() -> Self {
            Self { next_id: AtomicI64::new(1), ..Default::default() }
        }

        /// Insert rows directly, bypassing call counting and failure injection.
        pub fn seed(&self, collection: Collection, rows: impl IntoIterator<Item = Value>) {
            let mut tables = self.tables.lock().unwrap();
            let table = tables.entry(collection).or_default();
            for mut row in rows {
                if row.get("id").is_none() {
                    row["id"] = Value::from(self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
                }
                table.push(row);
            }
        }

        /// Number of `list` calls that reached the store.
        pub fn list_calls(&self) -> usize {
            self.list_calls.load(AtomicOrdering::SeqCst)
        }

        /// Make the next call fail with `err`.
        pub fn fail_next(&self, err: RemoteError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        pub fn rows(&self, collection: Collection) -> Vec<Value> {
            self.tables.lock().unwrap().get(&collection).cloned().unwrap_or_default()
        }

        fn take_failure(&self) -> Result<(), RemoteError> {
            match self.fail_next.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl DataStore for MemoryDataStore {
        async fn list(&self, collection: Collection, window: PageWindow, order: &OrderBy) -> Result<RawPage, RemoteError> {
            self.list_calls.fetch_add(1, AtomicOrdering::SeqCst);
            self.take_failure()?;
            let mut rows = self.rows(collection);
            rows.sort_by(|a, b| {
                let ord = compare_column(a, b, &order.column);
                if order.ascending { ord } else { ord.reverse() }
            });
            let total = rows.len() as u64;
            let page = rows
                .into_iter()
                .skip(window.from as usize)
                .take(window.len() as usize)
                .collect();
            Ok(RawPage { rows: page, total })
        }

        async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, RemoteError> {
            self.take_failure()?;
            Ok(self.rows(collection).into_iter().find(|r| row_id(r).as_deref() == Some(id)))
        }

        async fn insert(&self, collection: Collection, mut row: Value) -> Result<Value, RemoteError> {
            self.take_failure()?;
            let mut tables = self.tables.lock().unwrap();
            let table = tables.entry(collection).or_default();
            if row.get("id").is_none() {
                row["id"] = Value::from(self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
            }
            let id = row_id(&row);
            if table.iter().any(|r| row_id(r) == id) {
                return Err(RemoteError::with_status(409, "duplicate key value violates unique constraint").with_code("23505"));
            }
            table.push(row.clone());
            Ok(row)
        }

        async fn update(&self, collection: Collection, id: &str, patch: Value) -> Result<Option<Value>, RemoteError> {
            self.take_failure()?;
            let mut tables = self.tables.lock().unwrap();
            let Some(row) = tables
                .get_mut(&collection)
                .and_then(|t| t.iter_mut().find(|r| row_id(r).as_deref() == Some(id)))
            else {
                return Ok(None);
            };
            if let (Some(target), Value::Object(fields)) = (row.as_object_mut(), patch) {
                for (k, v) in fields {
                    target.insert(k, v);
                }
            }
            Ok(Some(row.clone()))
        }

        async fn delete(&self, collection: Collection, id: &str) -> Result<(), RemoteError> {
            self.take_failure()?;
            let mut tables = self.tables.lock().unwrap();
            if let Some(table) = tables.get_mut(&collection) {
                table.retain(|r| row_id(r).as_deref() != Some(id));
            }
            Ok(())
        }

        async fn call(&self, function: &str, args: Value) -> Result<Value, RemoteError> {
            self.take_failure()?;
            match function {
                "delete_user" => {
                    let id = args.get("user_id").and_then(Value::as_str).unwrap_or_default().to_string();
                    let mut tables = self.tables.lock().unwrap();
                    if let Some(table) = tables.get_mut(&Collection::Profiles) {
                        table.retain(|r| row_id(r).as_deref() != Some(id.as_str()));
                    }
                    Ok(Value::Null)
                }
                other => Err(RemoteError::with_status(404, format!("function {other} does not exist")).with_code("PGRST202")),
            }
        }
    }

    pub struct MemoryStorage {
        base_url: String,
        objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    }

    impl MemoryStorage {
        pub fn new(base_url: &str) -> Self {
            Self { base_url: base_url.trim_end_matches('/').to_string(), objects: Mutex::new(HashMap::new()) }
        }

        pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(&(bucket.to_string(), key.to_string())).cloned()
        }

        pub fn len(&self) -> usize {
            self.objects.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl Default for MemoryStorage {
        fn default() -> Self {
            Self::new("http://storage.local")
        }
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, _content_type: Option<&str>) -> Result<String, RemoteError> {
            let mut objects = self.objects.lock().unwrap();
            let slot = (bucket.to_string(), key.to_string());
            if objects.contains_key(&slot) {
                return Err(RemoteError::with_status(409, "The resource already exists"));
            }
            objects.insert(slot, bytes);
            Ok(key.to_string())
        }

        async fn remove(&self, bucket: &str, key: &str) -> Result<(), RemoteError> {
            self.objects
                .lock()
                .unwrap()
                .remove(&(bucket.to_string(), key.to_string()))
                .map(|_| ())
                .ok_or_else(|| RemoteError::with_status(404, "Object not found"))
        }

        fn public_url(&self, bucket: &str, key: &str) -> String {
            format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, key)
        }
    }

    struct Account {
        user: AuthUser,
        password: String,
    }

    #[derive(Default)]
    pub struct MemoryAuth {
        accounts: Mutex<HashMap<String, Account>>, // key: email
        tokens: Mutex<HashMap<String, String>>,    // token -> email
        recovery_requests: Mutex<Vec<(String, String)>>,
    }

    impl MemoryAuth {
        pub fn new() -> Self {
            Self::default()
        }

        /// Create an account directly and return its user.
        pub fn add_user(&self, email: &str, password: &str, metadata: Value) -> AuthUser {
            let user = AuthUser { id: Uuid::new_v4(), email: Some(email.to_string()), user_metadata: metadata };
            self.accounts
                .lock()
                .unwrap()
                .insert(email.to_string(), Account { user: user.clone(), password: password.to_string() });
            user
        }

        /// Issue a token for an existing account without a password check.
        pub fn issue_token(&self, email: &str) -> Option<String> {
            if !self.accounts.lock().unwrap().contains_key(email) {
                return None;
            }
            let token = Uuid::new_v4().simple().to_string();
            self.tokens.lock().unwrap().insert(token.clone(), email.to_string());
            Some(token)
        }

        pub fn recovery_requests(&self) -> Vec<(String, String)> {
            self.recovery_requests.lock().unwrap().clone()
        }

        fn email_for(&self, token: &str) -> Result<String, RemoteError> {
            self.tokens
                .lock()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or_else(|| RemoteError::with_status(401, "invalid JWT: unable to parse or verify signature"))
        }
    }

    #[async_trait]
    impl AuthProvider for MemoryAuth {
        async fn sign_in(&self, credentials: &Credentials) -> Result<Session, RemoteError> {
            let user = {
                let accounts = self.accounts.lock().unwrap();
                match accounts.get(&credentials.email) {
                    Some(acc) if acc.password == credentials.password => acc.user.clone(),
                    _ => return Err(RemoteError::with_status(400, "Invalid login credentials").with_code("invalid_credentials")),
                }
            };
            let token = self.issue_token(&credentials.email).unwrap_or_default();
            Ok(Session { access_token: token, refresh_token: None, expires_in: Some(3600), user })
        }

        async fn sign_up(&self, credentials: &Credentials, metadata: Value) -> Result<AuthUser, RemoteError> {
            if self.accounts.lock().unwrap().contains_key(&credentials.email) {
                return Err(RemoteError::with_status(422, "User already registered").with_code("user_already_exists"));
            }
            Ok(self.add_user(&credentials.email, &credentials.password, metadata))
        }

        async fn sign_out(&self, access_token: &str) -> Result<(), RemoteError> {
            self.tokens.lock().unwrap().remove(access_token);
            Ok(())
        }

        async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), RemoteError> {
            self.recovery_requests.lock().unwrap().push((email.to_string(), redirect_to.to_string()));
            Ok(())
        }

        async fn update_user(&self, access_token: &str, update: &UserUpdate) -> Result<AuthUser, RemoteError> {
            let email = self.email_for(access_token)?;
            let mut accounts = self.accounts.lock().unwrap();
            let acc = accounts.get_mut(&email).ok_or_else(|| RemoteError::with_status(404, "User not found"))?;
            if let Some(password) = &update.password {
                acc.password = password.clone();
            }
            if let Some(Value::Object(data)) = &update.data {
                if !acc.user.user_metadata.is_object() {
                    acc.user.user_metadata = Value::Object(Default::default());
                }
                if let Some(meta) = acc.user.user_metadata.as_object_mut() {
                    for (k, v) in data {
                        meta.insert(k.clone(), v.clone());
                    }
                }
            }
            Ok(acc.user.clone())
        }

        async fn get_user(&self, access_token: &str) -> Result<AuthUser, RemoteError> {
            let email = self.email_for(access_token)?;
            let accounts = self.accounts.lock().unwrap();
            accounts
                .get(&email)
                .map(|a| a.user.clone())
                .ok_or_else(|| RemoteError::with_status(404, "User not found"))
        }
    }

    /// Concrete handles to an in-memory backend, kept for assertions.
    pub struct MemoryBackend {
        pub data: Arc<MemoryDataStore>,
        pub storage: Arc<MemoryStorage>,
        pub auth: Arc<MemoryAuth>,
    }

    impl MemoryBackend {
        pub fn new() -> Self {
            Self {
                data: Arc::new(MemoryDataStore::new()),
                storage: Arc::new(MemoryStorage::default()),
                auth: Arc::new(MemoryAuth::new()),
            }
        }

        pub fn backend(&self) -> Backend {
            Backend { data: self.data.clone(), storage: self.storage.clone(), auth: self.auth.clone() }
        }
    }

    impl Default for MemoryBackend {
        fn default() -> Self {
            Self::new()
        }
    }
}
