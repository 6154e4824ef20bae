//! Menu catalog reads with a short-lived in-memory cache.
//!
//! Menu data changes rarely and is the same for every user, so results are
//! cached with `moka` for the configured TTL (5 minutes by default). Cart,
//! order and profile data is never cached.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use catering_core::MenuItemId;
use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::backend::{BackendError, Collection, DataService, Query, decode_rows};
use crate::cancel::{CancelToken, Cancelled};
use crate::error::{Alert, backend_message, cancelled_alert};
use crate::models::{Category, MenuItem};

/// Number of items shown in the home screen's featured strip.
const FEATURED_LIMIT: usize = 10;

/// Errors that can occur while reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("menu item {0} not found")]
    NotFound(MenuItemId),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("catalog request failed: {0}")]
    Remote(#[from] BackendError),
}

impl CatalogError {
    #[must_use]
    pub fn alert(&self) -> Alert {
        match self {
            Self::NotFound(_) => Alert::error("Menu tidak ditemukan"),
            Self::Cancelled(_) => cancelled_alert(),
            Self::Remote(e) => {
                Alert::error(format!("Gagal memuat detail menu: {}", backend_message(e)))
            }
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
    Featured,
    MenuCategories,
    ItemsByCategory(String),
    AllItems,
    Item(MenuItemId),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Names(Arc<Vec<String>>),
    Items(Arc<Vec<MenuItem>>),
    Item(Box<MenuItem>),
}

#[derive(Deserialize)]
struct CategoryColumn {
    #[serde(default)]
    category: Option<String>,
}

/// Read-only access to categories and menu items.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    data: Arc<dyn DataService>,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogService {
    /// Create a catalog reader whose results live for `ttl`.
    #[must_use]
    pub fn new(data: Arc<dyn DataService>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(CatalogInner { data, cache }),
        }
    }

    /// Home screen categories, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the backend request fails.
    #[instrument(skip(self, cancel))]
    pub async fn categories(&self, cancel: &CancelToken) -> Result<Arc<Vec<Category>>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let query = Query::all().order_by("id", true);
        let categories: Arc<Vec<Category>> =
            Arc::new(self.fetch(Collection::Categories, &query, cancel).await?);

        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    /// Up to ten available menu items for the home screen.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the backend request fails.
    #[instrument(skip(self, cancel))]
    pub async fn featured_items(&self, cancel: &CancelToken) -> Result<Arc<Vec<MenuItem>>, CatalogError> {
        let query = Query::all()
            .eq("is_available", true)
            .limit(FEATURED_LIMIT);
        self.items(CacheKey::Featured, &query, cancel).await
    }

    /// Distinct, non-empty `menu_items.category` values in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the backend request fails.
    #[instrument(skip(self, cancel))]
    pub async fn menu_categories(&self, cancel: &CancelToken) -> Result<Arc<Vec<String>>, CatalogError> {
        if let Some(CacheValue::Names(names)) =
            self.inner.cache.get(&CacheKey::MenuCategories).await
        {
            debug!("Cache hit for menu categories");
            return Ok(names);
        }

        let query = Query::select("category")?;
        let rows: Vec<CategoryColumn> = self.fetch(Collection::MenuItems, &query, cancel).await?;

        let mut seen = HashSet::new();
        let names: Vec<String> = rows
            .into_iter()
            .filter_map(|row| row.category)
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect();
        let names = Arc::new(names);

        self.inner
            .cache
            .insert(CacheKey::MenuCategories, CacheValue::Names(names.clone()))
            .await;
        Ok(names)
    }

    /// Menu items in `category`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the backend request fails.
    #[instrument(skip(self, cancel))]
    pub async fn items_by_category(
        &self,
        category: &str,
        cancel: &CancelToken,
    ) -> Result<Arc<Vec<MenuItem>>, CatalogError> {
        let query = Query::all()
            .eq("category", category)
            .order_by("name", true);
        self.items(CacheKey::ItemsByCategory(category.to_string()), &query, cancel)
            .await
    }

    /// Every menu item, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the backend request fails.
    #[instrument(skip(self, cancel))]
    pub async fn all_items(&self, cancel: &CancelToken) -> Result<Arc<Vec<MenuItem>>, CatalogError> {
        let query = Query::all().order_by("name", true);
        self.items(CacheKey::AllItems, &query, cancel).await
    }

    /// One menu item by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id does not exist, `Remote` on backend failure.
    #[instrument(skip(self, cancel))]
    pub async fn item(&self, id: MenuItemId, cancel: &CancelToken) -> Result<MenuItem, CatalogError> {
        let key = CacheKey::Item(id);
        if let Some(CacheValue::Item(item)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for menu item");
            return Ok(*item);
        }

        let query = Query::all().eq("id", id.as_i64());
        let item = self
            .fetch::<MenuItem>(Collection::MenuItems, &query, cancel)
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound(id))?;

        self.inner
            .cache
            .insert(key, CacheValue::Item(Box::new(item.clone())))
            .await;
        Ok(item)
    }

    /// Drop every cached result.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    async fn items(
        &self,
        key: CacheKey,
        query: &Query,
        cancel: &CancelToken,
    ) -> Result<Arc<Vec<MenuItem>>, CatalogError> {
        if let Some(CacheValue::Items(items)) = self.inner.cache.get(&key).await {
            debug!(key = ?key, "Cache hit for menu items");
            return Ok(items);
        }

        let items = Arc::new(self.fetch(Collection::MenuItems, query, cancel).await?);
        self.inner
            .cache
            .insert(key, CacheValue::Items(items.clone()))
            .await;
        Ok(items)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        collection: Collection,
        query: &Query,
        cancel: &CancelToken,
    ) -> Result<Vec<T>, CatalogError> {
        cancel.check()?;
        let rows = cancel
            .run_until_cancelled(self.inner.data.select(collection, query))
            .await??;
        Ok(decode_rows(rows)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use catering_core::{CategoryId, Price};
    use serde_json::json;

    use super::*;
    use crate::backend::{MemoryBackend, Operation};

    async fn seeded() -> (MemoryBackend, CatalogService) {
        let backend = MemoryBackend::new();
        backend
            .seed(
                Collection::Categories,
                vec![
                    json!({"id": 2, "name": "Prasmanan"}),
                    json!({"id": 1, "name": "Nasi Box", "image_url": "https://img/box.png"}),
                ],
            )
            .await
            .unwrap();
        backend
            .seed(
                Collection::MenuItems,
                vec![
                    json!({"id": 1, "name": "Soto Ayam", "price": 18000, "category": "Nasi Box", "is_available": true}),
                    json!({"id": 2, "name": "Ayam Bakar", "price": 20000, "category": "Nasi Box", "is_available": true}),
                    json!({"id": 3, "name": "Es Teh", "price": 5000, "category": "Minuman", "is_available": false}),
                    json!({"id": 4, "name": "Kue Lapis", "price": 3000, "category": null, "is_available": true}),
                    json!({"id": 5, "name": "Rendang", "price": 30000, "category": "", "is_available": true}),
                ],
            )
            .await
            .unwrap();
        let catalog = CatalogService::new(Arc::new(backend.clone()), Duration::from_secs(300));
        (backend, catalog)
    }

    fn names(items: &[MenuItem]) -> Vec<&str> {
        items.iter().map(|item| item.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_categories_ordered_by_id() {
        let (_backend, catalog) = seeded().await;
        let categories = catalog.categories(&CancelToken::new()).await.unwrap();
        let ids: Vec<CategoryId> = categories.iter().map(|c| c.id).collect();
        assert_eq!(ids, [CategoryId::new(1), CategoryId::new(2)]);
        assert_eq!(categories[0].image_url.as_deref(), Some("https://img/box.png"));
    }

    #[tokio::test]
    async fn test_featured_items_only_available() {
        let (_backend, catalog) = seeded().await;
        let featured = catalog.featured_items(&CancelToken::new()).await.unwrap();
        assert_eq!(featured.len(), 4);
        assert!(featured.iter().all(|item| item.is_available));
    }

    #[tokio::test]
    async fn test_featured_items_capped_at_ten() {
        let backend = MemoryBackend::new();
        let rows = (1..=12)
            .map(|id| json!({"id": id, "name": format!("Menu {id}"), "price": 1000, "is_available": true}))
            .collect();
        backend.seed(Collection::MenuItems, rows).await.unwrap();
        let catalog = CatalogService::new(Arc::new(backend), Duration::from_secs(300));
        assert_eq!(catalog.featured_items(&CancelToken::new()).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_menu_categories_distinct_and_non_empty() {
        let (_backend, catalog) = seeded().await;
        let categories = catalog.menu_categories(&CancelToken::new()).await.unwrap();
        assert_eq!(*categories, ["Nasi Box", "Minuman"]);
    }

    #[tokio::test]
    async fn test_items_by_category_sorted_by_name() {
        let (_backend, catalog) = seeded().await;
        let items = catalog
            .items_by_category("Nasi Box", &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(names(&items), ["Ayam Bakar", "Soto Ayam"]);

        let all = catalog.all_items(&CancelToken::new()).await.unwrap();
        assert_eq!(
            names(&all),
            ["Ayam Bakar", "Es Teh", "Kue Lapis", "Rendang", "Soto Ayam"]
        );
    }

    #[tokio::test]
    async fn test_item_by_id() {
        let (_backend, catalog) = seeded().await;
        let item = catalog
            .item(MenuItemId::new(2), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(item.price, Price::from_whole(20_000));

        let err = catalog
            .item(MenuItemId::new(42), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_results_are_cached() {
        let (backend, catalog) = seeded().await;
        let cancel = CancelToken::new();
        catalog.all_items(&cancel).await.unwrap();
        catalog.all_items(&cancel).await.unwrap();
        assert_eq!(backend.calls().await.len(), 1);

        catalog.invalidate_all().await;
        catalog.all_items(&cancel).await.unwrap();
        assert_eq!(backend.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (backend, catalog) = seeded().await;
        backend.fail_next(Operation::Select, Collection::Categories).await;
        let cancel = CancelToken::new();

        let err = catalog.categories(&cancel).await.unwrap_err();
        assert!(matches!(err, CatalogError::Remote(_)));
        assert!(err.alert().message.starts_with("Gagal memuat detail menu"));
        assert_eq!(catalog.categories(&cancel).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let (backend, catalog) = seeded().await;
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = catalog.all_items(&cancel).await.unwrap_err();
        assert!(matches!(err, CatalogError::Cancelled(_)));
        assert!(backend.calls().await.is_empty());
    }
}
