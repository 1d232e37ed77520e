//! Paged listing reads and the mutation side that invalidates them.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use crate::backend::{Collection, DataStore, RawPage};
use crate::errors::ServiceError;
use crate::notify::Notifier;
use crate::pagination::{compute_total_pages, compute_window, Page};
use crate::query_cache::{QueryCache, QueryKey};

/// Fetch one page of `collection`, through the listing cache. A page past
/// the last one is served as the last page; `Page::page` is the page served.
#[instrument(skip(store, cache), fields(collection = %collection))]
pub async fn fetch_page<T: DeserializeOwned>(
    store: &dyn DataStore,
    cache: &QueryCache,
    collection: Collection,
    page: u32,
    limit: u32,
) -> Result<Page<T>, ServiceError> {
    let requested = page.max(1);
    let mut raw = fetch_raw(store, cache, collection, requested, limit).await?;
    let total_pages = compute_total_pages(raw.total, limit)?;
    let mut page = requested;
    if total_pages > 0 && requested > total_pages {
        debug!(requested, last_page = total_pages, "page past the end, serving last page");
        page = total_pages;
        raw = fetch_raw(store, cache, collection, page, limit).await?;
    }
    let items = raw
        .rows
        .iter()
        .cloned()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()?;
    Ok(Page { items, total: raw.total, total_pages: compute_total_pages(raw.total, limit)?, page, limit })
}

async fn fetch_raw(
    store: &dyn DataStore,
    cache: &QueryCache,
    collection: Collection,
    page: u32,
    limit: u32,
) -> Result<Arc<RawPage>, ServiceError> {
    let window = compute_window(page, limit)?;
    let order = collection.default_order();
    cache
        .get_or_fetch(QueryKey { collection, page, limit }, async {
            store.list(collection, window, &order).await
        })
        .await
        .map_err(|e| {
            error!(error = %e, "listing fetch failed");
            ServiceError::Remote(e)
        })
}

/// Run a create/update/delete. On success the collection's listings are
/// marked stale and `success` is published; on failure the error is
/// published (validation failures stay inline) and returned unchanged.
/// Nothing is retried.
pub async fn run_mutation<T, Fut>(
    cache: &QueryCache,
    notifier: &Notifier,
    collection: Collection,
    success: &str,
    op: Fut,
) -> Result<T, ServiceError>
where
    Fut: Future<Output = Result<T, ServiceError>>,
{
    match op.await {
        Ok(value) => {
            cache.invalidate(collection);
            notifier.success(success);
            Ok(value)
        }
        Err(err) => {
            if !matches!(err, ServiceError::Validation(_)) {
                error!(%collection, error = %err, "mutation failed");
                notifier.error(format!("Error: {}", err.user_message()));
            }
            Err(err)
        }
    }
}
