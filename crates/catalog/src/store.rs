//! Capability interface of the underlying catalog store.
//!
//! The authorization layer only relies on what is declared here; index
//! layout, query execution and pagination are the store's business.

use crate::aggregation::{Aggregation, AggregationKind};
use crate::search::{BBox, DatetimeInterval};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use terra_stac_core::{Collection, Item, Result};

/// Durability of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
    /// Visible after the store's next refresh
    #[default]
    No,
    /// Visible to readers before the call returns
    WaitFor,
}

/// Paginated collection listing with the role filter pushed down
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionQuery {
    /// Only collections whose `_auth.read` shares a role with this set;
    /// `None` lists every collection
    pub readable_by: Option<BTreeSet<String>>,
    /// Top-level fields to return besides `id` and `_auth`
    pub fields: Option<Vec<String>>,
    pub limit: usize,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionPage {
    pub collections: Vec<Collection>,
    pub next: Option<String>,
}

/// Item search parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    /// `None` searches all collections, an empty list matches nothing
    pub collections: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
    pub bbox: Option<BBox>,
    pub datetime: Option<DatetimeInterval>,
    pub limit: usize,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub next: Option<String>,
    /// Exact number of matches, when the store knows it from the data query
    pub total: Option<u64>,
}

/// Document store holding collections and their items
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_collection(&self, collection_id: &str) -> Result<Collection>;

    async fn list_collections(&self, query: &CollectionQuery) -> Result<CollectionPage>;

    async fn create_collection(&self, collection: Collection) -> Result<()>;

    /// Replace a collection; a different `collection.id` renames it
    async fn update_collection(&self, collection_id: &str, collection: Collection) -> Result<()>;

    /// Delete a collection together with all of its items
    async fn delete_collection(&self, collection_id: &str) -> Result<()>;

    async fn find_item(&self, collection_id: &str, item_id: &str) -> Result<Item>;

    async fn create_item(&self, item: Item, refresh: Refresh) -> Result<()>;

    /// Create several new items at once. Nothing is written when any of
    /// them conflicts with a stored item or with another item of the batch.
    async fn create_items(&self, items: Vec<Item>, refresh: Refresh) -> Result<()>;

    async fn update_item(&self, collection_id: &str, item_id: &str, item: Item) -> Result<()>;

    /// Apply a JSON merge patch to an item and return the result
    async fn patch_item(&self, collection_id: &str, item_id: &str, patch: &Value)
        -> Result<Item>;

    async fn delete_item(&self, collection_id: &str, item_id: &str) -> Result<()>;

    /// Insert or replace items of one collection
    async fn bulk_insert(
        &self,
        collection_id: &str,
        items: Vec<Item>,
        refresh: Refresh,
    ) -> Result<usize>;

    async fn search_items(&self, query: &ItemQuery) -> Result<ItemPage>;

    async fn count_items(&self, query: &ItemQuery) -> Result<u64>;

    async fn aggregate(
        &self,
        query: &ItemQuery,
        aggregations: &[AggregationKind],
    ) -> Result<Vec<Aggregation>>;

    /// Make all pending writes visible
    async fn refresh(&self) -> Result<()>;
}
