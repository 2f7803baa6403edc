//! In-process catalog store.
//!
//! Writes made without `Refresh::WaitFor` are buffered and only become
//! visible on the next refresh, the way a search index behaves.

use crate::aggregation::{Aggregation, AggregationKind};
use crate::search::{item_time_range, BBox};
use crate::store::{
    CatalogStore, CollectionPage, CollectionQuery, ItemPage, ItemQuery, Refresh,
};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::path::Path;
use terra_stac_core::{Collection, Error, Item, Result};
use terra_stac_security::policy::any_role_match;

type ItemKey = (String, String);

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<String, Collection>,
    items: BTreeMap<ItemKey, Item>,
    pending: Vec<Item>,
}

impl State {
    fn flush(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let flushed = pending.len();
        for item in pending {
            // Items of a collection deleted in the meantime are dropped
            if let Some(key) = item_key(&item) {
                if self.collections.contains_key(&key.0) {
                    self.items.insert(key, item);
                }
            }
        }
        flushed
    }

    fn require_collection(&self, collection_id: &str) -> Result<()> {
        if self.collections.contains_key(collection_id) {
            Ok(())
        } else {
            Err(Error::collection_not_found(collection_id))
        }
    }

    fn contains_item(&self, key: &ItemKey) -> bool {
        self.items.contains_key(key)
            || self
                .pending
                .iter()
                .any(|item| item_key(item).as_ref() == Some(key))
    }

    fn write(&mut self, item: Item, refresh: Refresh) {
        match refresh {
            Refresh::WaitFor => {
                self.flush();
                if let Some(key) = item_key(&item) {
                    self.items.insert(key, item);
                }
            }
            Refresh::No => self.pending.push(item),
        }
    }

    fn matching<'a>(&'a self, query: &'a ItemQuery) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.values().filter(move |item| matches(item, query))
    }
}

/// Catalog store keeping every document in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load documents from `dir/collections/*.json` and `dir/items/*.json`.
    ///
    /// Item files hold a single item or a `FeatureCollection`. Returns the
    /// number of collections and items loaded.
    pub fn load_dir(&self, dir: &Path) -> Result<(usize, usize)> {
        let collections: Vec<Collection> = read_documents(&dir.join("collections"))?;
        let mut items = Vec::new();
        for document in read_documents::<Value>(&dir.join("items"))? {
            match document.get("features") {
                Some(Value::Array(features)) => {
                    for feature in features {
                        items.push(serde_json::from_value::<Item>(feature.clone())?);
                    }
                }
                _ => items.push(serde_json::from_value(document)?),
            }
        }

        let mut state = self.state.write();
        let collection_count = collections.len();
        for collection in collections {
            state.collections.insert(collection.id.clone(), collection);
        }
        let mut item_count = 0;
        for item in items {
            let key = item_key(&item).ok_or_else(|| {
                Error::bad_request(format!("item '{}' does not name its collection", item.id))
            })?;
            state.require_collection(&key.0)?;
            state.items.insert(key, item);
            item_count += 1;
        }

        tracing::info!(
            path = %dir.display(),
            collections = collection_count,
            items = item_count,
            "loaded catalog documents"
        );
        Ok((collection_count, item_count))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_collection(&self, collection_id: &str) -> Result<Collection> {
        self.state
            .read()
            .collections
            .get(collection_id)
            .cloned()
            .ok_or_else(|| Error::collection_not_found(collection_id))
    }

    async fn list_collections(&self, query: &CollectionQuery) -> Result<CollectionPage> {
        let after: Option<String> = query.token.as_deref().map(decode_token).transpose()?;
        let state = self.state.read();
        let lower = match &after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        let limit = query.limit.max(1);

        let mut collections: Vec<Collection> = state
            .collections
            .range::<String, _>((lower, Bound::Unbounded))
            .map(|(_, collection)| collection)
            .filter(|collection| {
                query
                    .readable_by
                    .as_ref()
                    .map_or(true, |roles| any_role_match(roles, &collection.auth.read))
            })
            .take(limit + 1)
            .cloned()
            .collect();

        let next = if collections.len() > limit {
            collections.truncate(limit);
            collections.last().map(|c| encode_token(&c.id)).transpose()?
        } else {
            None
        };

        if let Some(fields) = &query.fields {
            collections = collections.into_iter().map(|c| c.project(fields)).collect();
        }

        Ok(CollectionPage { collections, next })
    }

    async fn create_collection(&self, collection: Collection) -> Result<()> {
        let mut state = self.state.write();
        if state.collections.contains_key(&collection.id) {
            return Err(Error::conflict("collection", collection.id));
        }
        state.collections.insert(collection.id.clone(), collection);
        Ok(())
    }

    async fn update_collection(&self, collection_id: &str, collection: Collection) -> Result<()> {
        let mut state = self.state.write();
        state.require_collection(collection_id)?;

        if collection.id != collection_id {
            if state.collections.contains_key(&collection.id) {
                return Err(Error::conflict("collection", collection.id));
            }
            state.flush();
            state.collections.remove(collection_id);

            let keys: Vec<ItemKey> = state
                .items
                .keys()
                .filter(|(c, _)| c == collection_id)
                .cloned()
                .collect();
            for key in keys {
                if let Some(mut item) = state.items.remove(&key) {
                    item.collection = Some(collection.id.clone());
                    state.items.insert((collection.id.clone(), key.1), item);
                }
            }
            tracing::debug!(from = collection_id, to = %collection.id, "renamed collection");
        }

        state.collections.insert(collection.id.clone(), collection);
        Ok(())
    }

    async fn delete_collection(&self, collection_id: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.collections.remove(collection_id).is_none() {
            return Err(Error::collection_not_found(collection_id));
        }
        state.items.retain(|(c, _), _| c != collection_id);
        state
            .pending
            .retain(|item| item.collection_id() != Some(collection_id));
        Ok(())
    }

    async fn find_item(&self, collection_id: &str, item_id: &str) -> Result<Item> {
        let state = self.state.read();
        state.require_collection(collection_id)?;
        state
            .items
            .get(&(collection_id.to_string(), item_id.to_string()))
            .cloned()
            .ok_or_else(|| Error::item_not_found(collection_id, item_id))
    }

    async fn create_item(&self, item: Item, refresh: Refresh) -> Result<()> {
        let key = item_key(&item).ok_or_else(|| {
            Error::bad_request(format!("item '{}' does not name its collection", item.id))
        })?;
        let mut state = self.state.write();
        state.require_collection(&key.0)?;
        if state.contains_item(&key) {
            return Err(Error::conflict("item", format!("{}/{}", key.0, key.1)));
        }
        state.write(item, refresh);
        Ok(())
    }

    async fn create_items(&self, items: Vec<Item>, refresh: Refresh) -> Result<()> {
        let mut state = self.state.write();
        let mut keys: BTreeSet<ItemKey> = BTreeSet::new();
        for item in &items {
            let key = item_key(item).ok_or_else(|| {
                Error::bad_request(format!("item '{}' does not name its collection", item.id))
            })?;
            state.require_collection(&key.0)?;
            if state.contains_item(&key) || keys.contains(&key) {
                return Err(Error::conflict("item", format!("{}/{}", key.0, key.1)));
            }
            keys.insert(key);
        }
        for item in items {
            state.write(item, refresh);
        }
        Ok(())
    }

    async fn update_item(&self, collection_id: &str, item_id: &str, item: Item) -> Result<()> {
        let mut state = self.state.write();
        state.require_collection(collection_id)?;
        let key = (collection_id.to_string(), item_id.to_string());
        if !state.items.contains_key(&key) {
            return Err(Error::item_not_found(collection_id, item_id));
        }
        state.items.insert(key, item);
        Ok(())
    }

    async fn patch_item(
        &self,
        collection_id: &str,
        item_id: &str,
        patch: &Value,
    ) -> Result<Item> {
        let mut state = self.state.write();
        state.require_collection(collection_id)?;
        let key = (collection_id.to_string(), item_id.to_string());
        let current = state
            .items
            .get(&key)
            .ok_or_else(|| Error::item_not_found(collection_id, item_id))?;

        let mut document = serde_json::to_value(current)?;
        merge_patch(&mut document, patch);
        let patched: Item = serde_json::from_value(document)?;
        state.items.insert(key, patched.clone());
        Ok(patched)
    }

    async fn delete_item(&self, collection_id: &str, item_id: &str) -> Result<()> {
        let mut state = self.state.write();
        state.require_collection(collection_id)?;
        state
            .items
            .remove(&(collection_id.to_string(), item_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::item_not_found(collection_id, item_id))
    }

    async fn bulk_insert(
        &self,
        collection_id: &str,
        items: Vec<Item>,
        refresh: Refresh,
    ) -> Result<usize> {
        let mut state = self.state.write();
        state.require_collection(collection_id)?;
        let count = items.len();
        for mut item in items {
            item.collection = Some(collection_id.to_string());
            state.pending.push(item);
        }
        if refresh == Refresh::WaitFor {
            state.flush();
        }
        Ok(count)
    }

    async fn search_items(&self, query: &ItemQuery) -> Result<ItemPage> {
        let after: Option<ItemKey> = query.token.as_deref().map(decode_token).transpose()?;
        let state = self.state.read();
        let lower = match &after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        let limit = query.limit.max(1);

        let mut items: Vec<Item> = state
            .items
            .range::<ItemKey, _>((lower, Bound::Unbounded))
            .map(|(_, item)| item)
            .filter(|item| matches(item, query))
            .take(limit + 1)
            .cloned()
            .collect();

        let next = if items.len() > limit {
            items.truncate(limit);
            items
                .last()
                .and_then(item_key)
                .map(|key| encode_token(&key))
                .transpose()?
        } else {
            None
        };

        // Totals are left to `count_items`
        Ok(ItemPage {
            items,
            next,
            total: None,
        })
    }

    async fn count_items(&self, query: &ItemQuery) -> Result<u64> {
        Ok(self.state.read().matching(query).count() as u64)
    }

    async fn aggregate(
        &self,
        query: &ItemQuery,
        aggregations: &[AggregationKind],
    ) -> Result<Vec<Aggregation>> {
        let state = self.state.read();
        let items: Vec<&Item> = state.matching(query).collect();
        Ok(aggregations
            .iter()
            .map(|kind| kind.compute(items.iter().copied()))
            .collect())
    }

    async fn refresh(&self) -> Result<()> {
        let flushed = self.state.write().flush();
        tracing::trace!(flushed, "refreshed memory store");
        Ok(())
    }
}

fn item_key(item: &Item) -> Option<ItemKey> {
    item.collection_id()
        .map(|collection| (collection.to_string(), item.id.clone()))
}

fn matches(item: &Item, query: &ItemQuery) -> bool {
    if let Some(collections) = &query.collections {
        if !item
            .collection_id()
            .is_some_and(|c| collections.iter().any(|requested| requested == c))
        {
            return false;
        }
    }
    if let Some(ids) = &query.ids {
        if !ids.contains(&item.id) {
            return false;
        }
    }
    if let Some(bbox) = &query.bbox {
        if !BBox::of_item(item).is_some_and(|b| b.intersects(bbox)) {
            return false;
        }
    }
    if let Some(interval) = &query.datetime {
        if !item_time_range(item).is_some_and(|(start, end)| interval.overlaps(start, end)) {
            return false;
        }
    }
    true
}

/// RFC 7386 JSON merge patch
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

fn encode_token<T: serde::Serialize>(position: &T) -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(position)?))
}

fn decode_token<T: DeserializeOwned>(token: &str) -> Result<T> {
    URL_SAFE_NO_PAD
        .decode(token)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or_else(|| Error::bad_request(format!("invalid pagination token '{token}'")))
}

fn read_documents<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let read_error = |e: std::io::Error| Error::store("load", format!("{}: {e}", dir.display()));

    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .map_err(read_error)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path).map_err(read_error)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::store("load", format!("{}: {e}", path.display()))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use terra_stac_core::CollectionAuth;

    fn collection(id: &str, read: &[&str]) -> Collection {
        serde_json::from_value(json!({
            "id": id,
            "title": format!("{id} title"),
            "description": "test collection",
            "_auth": {"read": read, "write": ["editor"]}
        }))
        .unwrap()
    }

    fn item(collection: &str, id: &str, datetime: &str) -> Item {
        serde_json::from_value(json!({
            "type": "Feature",
            "id": id,
            "collection": collection,
            "bbox": [0.0, 0.0, 1.0, 1.0],
            "properties": {"datetime": datetime}
        }))
        .unwrap()
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_collection(collection("a", &["anonymous"])).await.unwrap();
        store.create_collection(collection("b", &["team"])).await.unwrap();
        store.create_collection(collection("c", &["team", "other"])).await.unwrap();
        store
    }

    fn roles(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_collection_listing_is_filtered_and_paginated() {
        let store = store().await;
        let mut query = CollectionQuery {
            readable_by: Some(roles(&["team"])),
            fields: Some(vec!["title".to_string()]),
            limit: 1,
            token: None,
        };

        let first = store.list_collections(&query).await.unwrap();
        assert_eq!(first.collections[0].id, "b");
        assert_eq!(first.collections[0].fields.len(), 1);
        assert!(first.next.is_some());

        query.token = first.next;
        let second = store.list_collections(&query).await.unwrap();
        assert_eq!(second.collections[0].id, "c");
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn test_listing_without_filter_returns_all() {
        let store = store().await;
        let page = store
            .list_collections(&CollectionQuery {
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.collections.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let store = store().await;
        let result = store
            .list_collections(&CollectionQuery {
                limit: 10,
                token: Some("!!".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_collection_conflicts() {
        let store = store().await;
        let result = store.create_collection(collection("a", &[])).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_refresh_controls_visibility() {
        let store = store().await;
        store
            .create_item(item("a", "i1", "2020-01-01T00:00:00Z"), Refresh::No)
            .await
            .unwrap();
        assert!(store.find_item("a", "i1").await.is_err());
        store.refresh().await.unwrap();
        assert!(store.find_item("a", "i1").await.is_ok());

        store
            .bulk_insert(
                "a",
                vec![item("a", "i2", "2020-01-01T00:00:00Z")],
                Refresh::WaitFor,
            )
            .await
            .unwrap();
        assert!(store.find_item("a", "i2").await.is_ok());
    }

    #[tokio::test]
    async fn test_item_requires_existing_collection() {
        let store = store().await;
        let result = store
            .create_item(item("missing", "i1", "2020-01-01T00:00:00Z"), Refresh::WaitFor)
            .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_items_is_all_or_nothing() {
        let store = store().await;
        let t = "2020-01-01T00:00:00Z";
        store.create_item(item("a", "i1", t), Refresh::WaitFor).await.unwrap();

        let result = store
            .create_items(vec![item("a", "i2", t), item("a", "i1", t)], Refresh::WaitFor)
            .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        let result = store
            .create_items(vec![item("a", "i3", t), item("a", "i3", t)], Refresh::WaitFor)
            .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        assert!(store.find_item("a", "i2").await.is_err());
        assert!(store.find_item("a", "i3").await.is_err());

        store
            .create_items(vec![item("a", "i2", t), item("b", "i2", t)], Refresh::WaitFor)
            .await
            .unwrap();
        assert!(store.find_item("a", "i2").await.is_ok());
        assert!(store.find_item("b", "i2").await.is_ok());
    }

    #[tokio::test]
    async fn test_search_filters_and_pages() {
        let store = store().await;
        let items = (0..5)
            .map(|i| item("a", &format!("i{i}"), &format!("2020-0{}-01T00:00:00Z", i + 1)))
            .collect();
        store.bulk_insert("a", items, Refresh::WaitFor).await.unwrap();
        store
            .bulk_insert(
                "b",
                vec![item("b", "x", "2020-01-01T00:00:00Z")],
                Refresh::WaitFor,
            )
            .await
            .unwrap();

        let mut query = ItemQuery {
            collections: Some(vec!["a".to_string()]),
            limit: 2,
            ..Default::default()
        };
        let page = store.search_items(&query).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.total.is_none());
        assert_eq!(store.count_items(&query).await.unwrap(), 5);

        query.token = page.next;
        let page = store.search_items(&query).await.unwrap();
        assert_eq!(page.items[0].id, "i2");

        let empty = ItemQuery {
            collections: Some(Vec::new()),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(store.count_items(&empty).await.unwrap(), 0);

        let dated = ItemQuery {
            datetime: Some(
                crate::search::DatetimeInterval::parse("2020-04-15T00:00:00Z/..").unwrap(),
            ),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(store.count_items(&dated).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_collection_cascades() {
        let store = store().await;
        store
            .bulk_insert(
                "a",
                vec![item("a", "i1", "2020-01-01T00:00:00Z")],
                Refresh::WaitFor,
            )
            .await
            .unwrap();
        store.delete_collection("a").await.unwrap();
        assert!(store.find_collection("a").await.is_err());
        assert_eq!(
            store
                .count_items(&ItemQuery {
                    limit: 10,
                    ..Default::default()
                })
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_rename_collection_moves_items() {
        let store = store().await;
        store
            .bulk_insert(
                "a",
                vec![item("a", "i1", "2020-01-01T00:00:00Z")],
                Refresh::WaitFor,
            )
            .await
            .unwrap();
        let renamed = Collection::new("z", CollectionAuth::new(["r"], ["w"]), Default::default());
        store.update_collection("a", renamed).await.unwrap();

        assert!(store.find_collection("a").await.is_err());
        let item = store.find_item("z", "i1").await.unwrap();
        assert_eq!(item.collection_id(), Some("z"));

        let clash = Collection::new("b", CollectionAuth::default(), Default::default());
        assert!(matches!(
            store.update_collection("z", clash).await,
            Err(Error::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_patch_item() {
        let store = store().await;
        store
            .create_item(item("a", "i1", "2020-01-01T00:00:00Z"), Refresh::WaitFor)
            .await
            .unwrap();
        let patched = store
            .patch_item(
                "a",
                "i1",
                &json!({"properties": {"cloud_cover": 10, "datetime": null}}),
            )
            .await
            .unwrap();
        assert_eq!(patched.fields["properties"], json!({"cloud_cover": 10}));
    }

    #[tokio::test]
    async fn test_aggregate() {
        let store = store().await;
        store
            .bulk_insert(
                "a",
                vec![
                    item("a", "i1", "2020-01-01T00:00:00Z"),
                    item("a", "i2", "2020-02-01T00:00:00Z"),
                ],
                Refresh::WaitFor,
            )
            .await
            .unwrap();
        let result = store
            .aggregate(
                &ItemQuery {
                    limit: 10,
                    ..Default::default()
                },
                &[AggregationKind::TotalCount, AggregationKind::DatetimeFrequency],
            )
            .await
            .unwrap();
        assert_eq!(result[0].value, Some(2));
        assert_eq!(result[1].buckets.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_merge_patch() {
        let mut target = json!({"a": 1, "b": {"c": 2, "d": 3}});
        merge_patch(&mut target, &json!({"a": null, "b": {"c": 4}, "e": [1]}));
        assert_eq!(target, json!({"b": {"c": 4, "d": 3}, "e": [1]}));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("collections")).unwrap();
        std::fs::create_dir_all(dir.path().join("items")).unwrap();
        std::fs::write(
            dir.path().join("collections/a.json"),
            serde_json::to_string(&collection("a", &["anonymous"])).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("items/a.json"),
            json!({
                "type": "FeatureCollection",
                "features": [
                    item("a", "i1", "2020-01-01T00:00:00Z"),
                    item("a", "i2", "2020-01-01T00:00:00Z")
                ]
            })
            .to_string(),
        )
        .unwrap();

        let store = MemoryStore::new();
        assert_eq!(store.load_dir(dir.path()).unwrap(), (1, 2));
    }
}
