use std::sync::Arc;

use models::product::ProductId;
use models::{Product, ProductDraft};
use tracing::{info, instrument, warn};

use super::{decode, Upload};
use crate::backend::{Backend, Collection};
use crate::errors::ServiceError;
use crate::listing::{fetch_page, run_mutation};
use crate::notify::Notifier;
use crate::pagination::Page;
use crate::query_cache::QueryCache;

/// Product catalog: storefront listing and admin CRUD.
#[derive(Clone)]
pub struct ProductService {
    backend: Backend,
    cache: Arc<QueryCache>,
    notifier: Notifier,
    bucket: String,
}

impl ProductService {
    pub fn new(backend: Backend, cache: Arc<QueryCache>, notifier: Notifier, bucket: &str) -> Self {
        Self { backend, cache, notifier, bucket: bucket.to_string() }
    }

    /// Products ordered by title.
    pub async fn list_page(&self, page: u32, limit: u32) -> Result<Page<Product>, ServiceError> {
        fetch_page(self.backend.data.as_ref(), &self.cache, Collection::Products, page, limit).await
    }

    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        let row = self
            .backend
            .data
            .get(Collection::Products, &id.to_string())
            .await?
            .ok_or_else(|| ServiceError::not_found("product"))?;
        decode(row)
    }

    /// Store a product image; returns its public URL.
    pub async fn upload_image(&self, upload: Upload) -> Result<String, ServiceError> {
        Ok(self.store_image(upload).await?.1)
    }

    #[instrument(skip(self, draft, image), fields(title = %draft.title))]
    pub async fn create(&self, draft: ProductDraft, image: Option<Upload>) -> Result<Product, ServiceError> {
        draft.validate(image.is_some())?;
        run_mutation(&self.cache, &self.notifier, Collection::Products, "Product created", async {
            let (key, image_url) = self.store_optional(image).await?.unzip();
            let saved = async {
                let row = serde_json::to_value(draft.into_new(image_url)?)?;
                let product: Product = decode(self.backend.data.insert(Collection::Products, row).await?)?;
                info!(product_id = product.id, "product_created");
                Ok::<_, ServiceError>(product)
            }
            .await;
            self.discard_on_error(&saved, key.as_deref()).await;
            saved
        })
        .await
    }

    #[instrument(skip(self, draft, image))]
    pub async fn update(&self, id: ProductId, draft: ProductDraft, image: Option<Upload>) -> Result<Product, ServiceError> {
        draft.validate(image.is_some())?;
        run_mutation(&self.cache, &self.notifier, Collection::Products, "Product updated", async {
            let (key, image_url) = self.store_optional(image).await?.unzip();
            let saved = async {
                let row = serde_json::to_value(draft.into_new(image_url)?)?;
                let updated = self
                    .backend
                    .data
                    .update(Collection::Products, &id.to_string(), row)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("product"))?;
                info!(product_id = id, "product_updated");
                decode::<Product>(updated)
            }
            .await;
            self.discard_on_error(&saved, key.as_deref()).await;
            saved
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        run_mutation(&self.cache, &self.notifier, Collection::Products, "Product deleted", async {
            self.backend.data.delete(Collection::Products, &id.to_string()).await?;
            info!(product_id = id, "product_deleted");
            Ok::<_, ServiceError>(())
        })
        .await
    }
}

impl ProductService {
    /// Returns the stored key and its public URL.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.bytes.len()))]
    async fn store_image(&self, upload: Upload) -> Result<(String, String), ServiceError> {
        let key = upload.storage_key();
        let stored = self
            .backend
            .storage
            .upload(&self.bucket, &key, upload.bytes, upload.content_type.as_deref())
            .await?;
        let url = self.backend.storage.public_url(&self.bucket, &stored);
        Ok((stored, url))
    }

    async fn store_optional(&self, image: Option<Upload>) -> Result<Option<(String, String)>, ServiceError> {
        match image {
            Some(upload) => Ok(Some(self.store_image(upload).await?)),
            None => Ok(None),
        }
    }

    /// Best effort: an image uploaded for a write that failed is removed.
    async fn discard_on_error<T>(&self, saved: &Result<T, ServiceError>, key: Option<&str>) {
        let (Err(_), Some(key)) = (saved, key) else { return };
        if let Err(e) = self.backend.storage.remove(&self.bucket, key).await {
            warn!(bucket = %self.bucket, key, error = %e, "orphaned product image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::errors::RemoteError;
    use crate::test_support::fixture;

    fn draft(title: &str) -> ProductDraft {
        ProductDraft {
            title: title.into(),
            description: "desc".into(),
            price: Some(10.0),
            image_url: Some("https://cdn.example.com/p.png".into()),
        }
    }

    #[tokio::test]
    async fn delete_is_visible_on_next_read() -> anyhow::Result<()> {
        let fx = fixture();
        fx.mem.data.seed(Collection::Products, (1..=3).map(|i| json!({"id": i, "title": format!("P{i}"), "price": 1.0})));
        let products = &fx.storefront.products;

        let before = products.list_page(1, 8).await?;
        assert_eq!(before.total, 3);

        products.delete(2).await?;
        let after = products.list_page(1, 8).await?;
        assert_eq!(after.total, 2);
        assert!(after.items.iter().all(|p| p.id != 2));
        assert_eq!(fx.mem.data.list_calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn unchanged_listing_is_cached() -> anyhow::Result<()> {
        let fx = fixture();
        fx.mem.data.seed(Collection::Products, [json!({"id": 1, "title": "A", "price": 1.0})]);
        fx.storefront.products.list_page(1, 8).await?;
        fx.storefront.products.list_page(1, 8).await?;
        assert_eq!(fx.mem.data.list_calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn create_with_upload_stores_public_url() -> anyhow::Result<()> {
        let fx = fixture();
        let upload = Upload::new("caneca.jpg", vec![0xff, 0xd8]);
        let created = fx
            .storefront
            .products
            .create(ProductDraft { image_url: None, ..draft("Caneca") }, Some(upload))
            .await?;
        let url = created.image_url.unwrap();
        assert!(url.starts_with("http://storage.local/storage/v1/object/public/products/"));
        assert!(url.ends_with(".jpg"));
        assert_eq!(fx.mem.storage.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_insert_removes_uploaded_image() {
        let fx = fixture();
        fx.mem.data.fail_next(RemoteError::with_status(409, "duplicate key value violates unique constraint"));
        let upload = Upload::new("caneca.jpg", vec![0xff, 0xd8]);
        let err = fx
            .storefront
            .products
            .create(ProductDraft { image_url: None, ..draft("Caneca") }, Some(upload))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Remote(_)));
        assert!(fx.mem.storage.is_empty());
    }

    #[tokio::test]
    async fn failed_update_removes_uploaded_image() {
        let fx = fixture();
        let upload = Upload::new("caneca.png", vec![0x89]);
        let err = fx.storefront.products.update(42, draft("X"), Some(upload)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(fx.mem.storage.is_empty());
    }

    #[tokio::test]
    async fn invalid_draft_blocks_submission() {
        let fx = fixture();
        let err = fx.storefront.products.create(ProductDraft { price: Some(-1.0), ..draft("X") }, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref f) if f.contains("price")));
        assert!(fx.mem.data.rows(Collection::Products).is_empty());
    }

    #[tokio::test]
    async fn update_missing_product_is_not_found() {
        let fx = fixture();
        let err = fx.storefront.products.update(42, draft("X"), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_replaces_fields_and_refreshes_listing() -> anyhow::Result<()> {
        let fx = fixture();
        fx.mem.data.seed(Collection::Products, [json!({"id": 1, "title": "Old", "price": 1.0})]);
        fx.storefront.products.list_page(1, 8).await?;
        fx.storefront.products.update(1, draft("New"), None).await?;
        let page = fx.storefront.products.list_page(1, 8).await?;
        assert_eq!(page.items[0].title, "New");
        assert_eq!(fx.storefront.products.get(1).await?.price, 10.0);
        Ok(())
    }
}
