//! Collaborator seams: the backend platform's data, storage and auth APIs.
//!
//! `repository` holds the traits plus in-memory doubles; `rest` talks to a
//! PostgREST/GoTrue/Storage style HTTP platform.

pub mod repository;
pub mod rest;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

pub use repository::{AuthProvider, DataStore, ObjectStorage};

/// Entity collections stored on the platform. Each has its own listing cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Products,
    Categories,
    Profiles,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Products, Collection::Categories, Collection::Profiles];

    pub fn table(&self) -> &'static str {
        match self {
            Self::Products => models::product::TABLE,
            Self::Categories => models::category::TABLE,
            Self::Profiles => models::profile::TABLE,
        }
    }

    /// Column listings are sorted by, ascending.
    pub fn default_order(&self) -> OrderBy {
        let column = match self {
            Self::Products => models::product::ORDER_COLUMN,
            Self::Categories => models::category::ORDER_COLUMN,
            Self::Profiles => models::profile::ORDER_COLUMN,
        };
        OrderBy::asc(column)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        Self { column: column.to_string(), ascending: true }
    }
}

/// Rows of one page as returned by the platform, plus the exact row count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPage {
    pub rows: Vec<Value>,
    pub total: u64,
}

/// Handles to the three platform APIs.
#[derive(Clone)]
pub struct Backend {
    pub data: Arc<dyn DataStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Backend {
    /// All three APIs served by one REST client.
    pub fn rest(client: rest::RestBackend) -> Self {
        let client = Arc::new(client);
        Self { data: client.clone(), storage: client.clone(), auth: client }
    }
}
