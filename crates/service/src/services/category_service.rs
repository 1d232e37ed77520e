use std::sync::Arc;

use models::category::CategoryId;
use models::{Category, CategoryDraft};
use tracing::{info, instrument};

use super::decode;
use crate::backend::{Backend, Collection};
use crate::errors::ServiceError;
use crate::listing::{fetch_page, run_mutation};
use crate::notify::Notifier;
use crate::pagination::Page;
use crate::query_cache::QueryCache;

#[derive(Clone)]
pub struct CategoryService {
    backend: Backend,
    cache: Arc<QueryCache>,
    notifier: Notifier,
}

impl CategoryService {
    pub fn new(backend: Backend, cache: Arc<QueryCache>, notifier: Notifier) -> Self {
        Self { backend, cache, notifier }
    }

    pub async fn list_page(&self, page: u32, limit: u32) -> Result<Page<Category>, ServiceError> {
        fetch_page(self.backend.data.as_ref(), &self.cache, Collection::Categories, page, limit).await
    }

    pub async fn get(&self, id: CategoryId) -> Result<Category, ServiceError> {
        let row = self
            .backend
            .data
            .get(Collection::Categories, &id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("category"))?;
        decode(row)
    }

    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: CategoryDraft) -> Result<Category, ServiceError> {
        let row = serde_json::to_value(draft.into_new()?)?;
        run_mutation(&self.cache, &self.notifier, Collection::Categories, "Category created", async {
            let category: Category = decode(self.backend.data.insert(Collection::Categories, row).await?)?;
            info!(category_id = category.id, "category_created");
            Ok::<_, ServiceError>(category)
        })
        .await
    }

    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category, ServiceError> {
        let row = serde_json::to_value(draft.into_new()?)?;
        run_mutation(&self.cache, &self.notifier, Collection::Categories, "Category updated", async {
            let updated = self
                .backend
                .data
                .update(Collection::Categories, &id.to_string(), row)
                .await?
                .ok_or_else(|| ServiceError::not_found("category"))?;
            decode(updated)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), ServiceError> {
        run_mutation(&self.cache, &self.notifier, Collection::Categories, "Category deleted", async {
            self.backend.data.delete(Collection::Categories, &id.to_string()).await?;
            info!(category_id = id, "category_deleted");
            Ok::<_, ServiceError>(())
        })
        .await
    }
}
