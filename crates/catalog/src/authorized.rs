//! Enforcement wrappers around the catalog store.
//!
//! Every operation reaching the store from the API goes through
//! `AuthorizedCatalog`. Each wrapper finishes its authorization checks before
//! it issues any mutating store call, so a rejected request changes nothing.

use crate::aggregation::{Aggregation, AggregationDescriptor, AggregationKind};
use crate::store::{CatalogStore, CollectionPage, CollectionQuery, ItemPage, ItemQuery, Refresh};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use terra_stac_config::Settings;
use terra_stac_core::{
    AccessType, AuthDraft, Collection, CollectionDraft, Error, Item, Principal, Result,
};
use terra_stac_security::{AccessPolicy, AuthMetadataValidator};

/// Catalog operations with access control applied
#[derive(Clone)]
pub struct AuthorizedCatalog {
    store: Arc<dyn CatalogStore>,
    policy: AccessPolicy,
    validator: AuthMetadataValidator,
    editor_role: String,
    page_size: usize,
}

impl AuthorizedCatalog {
    pub fn new(store: Arc<dyn CatalogStore>, settings: &Settings) -> Self {
        Self {
            store,
            policy: AccessPolicy::from_settings(settings),
            validator: AuthMetadataValidator::from_settings(settings),
            editor_role: settings.role_editor.clone(),
            page_size: settings.collections_page_size,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Look up a collection and check that the principal holds `access` on it.
    ///
    /// # Returns
    /// * `Ok(collection)` - The collection, including its `_auth` metadata
    /// * `Err(Error::NotFound)` - No collection with this id exists
    /// * `Err(Error::Unauthorized)` - Denied for an anonymous principal
    /// * `Err(Error::Forbidden)` - Denied for an authenticated principal
    pub async fn ensure_authorized(
        &self,
        principal: &Principal,
        collection_id: &str,
        access: AccessType,
    ) -> Result<Collection> {
        let collection = self.store.find_collection(collection_id).await?;
        if self
            .policy
            .is_authorized(principal.scopes(), &collection.auth, access)
        {
            Ok(collection)
        } else {
            tracing::warn!(
                collection = collection_id,
                %access,
                username = principal.username().unwrap_or("anonymous"),
                "access denied"
            );
            Err(principal.deny(format!(
                "{access} access to collection '{collection_id}' is not allowed"
            )))
        }
    }

    /// All collections readable with `scopes`, projected to `fields`.
    ///
    /// Administrators get every collection. For anyone else the role filter
    /// is pushed down to the store, whose pages are walked to the end.
    pub async fn authorized_collections(
        &self,
        scopes: &BTreeSet<String>,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<Collection>> {
        let mut query = CollectionQuery {
            readable_by: self.readable_by(scopes),
            fields,
            limit: self.page_size,
            token: None,
        };

        let mut collections = Vec::new();
        loop {
            let page = self.store.list_collections(&query).await?;
            collections.extend(page.collections);
            match page.next {
                Some(token) => query.token = Some(token),
                None => break,
            }
        }
        Ok(collections)
    }

    /// Ids of the collections readable with `scopes`
    pub async fn authorized_collection_ids(
        &self,
        scopes: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        Ok(self
            .authorized_collections(scopes, Some(Vec::new()))
            .await?
            .into_iter()
            .map(|collection| collection.id)
            .collect())
    }

    /// One page of the collection listing, limited to readable collections
    pub async fn all_collections(
        &self,
        principal: &Principal,
        limit: Option<usize>,
        token: Option<String>,
    ) -> Result<CollectionPage> {
        let limit = match limit {
            Some(0) => return Err(Error::bad_request("limit must be positive")),
            Some(limit) => limit.min(self.page_size),
            None => self.page_size,
        };
        self.store
            .list_collections(&CollectionQuery {
                readable_by: self.readable_by(principal.scopes()),
                fields: None,
                limit,
                token,
            })
            .await
    }

    pub async fn get_collection(&self, principal: &Principal, collection_id: &str) -> Result<Collection> {
        self.ensure_authorized(principal, collection_id, AccessType::Read)
            .await
    }

    pub async fn get_item(
        &self,
        principal: &Principal,
        collection_id: &str,
        item_id: &str,
    ) -> Result<Item> {
        self.ensure_authorized(principal, collection_id, AccessType::Read)
            .await?;
        self.store.find_item(collection_id, item_id).await
    }

    /// Items of one collection
    pub async fn item_collection(
        &self,
        principal: &Principal,
        collection_id: &str,
        mut query: ItemQuery,
    ) -> Result<ItemPage> {
        self.ensure_authorized(principal, collection_id, AccessType::Read)
            .await?;
        query.collections = Some(vec![collection_id.to_string()]);
        self.run_search(&query).await
    }

    /// Cross-collection item search.
    ///
    /// Without named collections the search is limited to the readable ones
    /// and yields nothing, without querying the store, when there are none.
    /// Named collections must all be readable.
    pub async fn search(&self, principal: &Principal, mut query: ItemQuery) -> Result<ItemPage> {
        let collections = self
            .resolve_collections(principal, query.collections.take())
            .await?;
        if collections.as_ref().is_some_and(Vec::is_empty) {
            return Ok(ItemPage {
                total: Some(0),
                ..ItemPage::default()
            });
        }
        query.collections = collections;
        self.run_search(&query).await
    }

    /// Aggregate over the items of one collection, the named collections or
    /// every readable collection. Aggregating over zero collections is denied.
    pub async fn aggregate(
        &self,
        principal: &Principal,
        collection_id: Option<&str>,
        mut query: ItemQuery,
        aggregations: &[AggregationKind],
    ) -> Result<Vec<Aggregation>> {
        let collections = match collection_id {
            Some(collection_id) => {
                self.ensure_authorized(principal, collection_id, AccessType::Read)
                    .await?;
                Some(vec![collection_id.to_string()])
            }
            None => {
                self.resolve_collections(principal, query.collections.take())
                    .await?
            }
        };
        let empty = match &collections {
            Some(collections) => collections.is_empty(),
            // unscoped administrator request
            None => self
                .authorized_collection_ids(principal.scopes())
                .await?
                .is_empty(),
        };
        if empty {
            return Err(principal.deny("no collections are available for aggregation"));
        }
        query.collections = collections;
        self.store.aggregate(&query, aggregations).await
    }

    /// Aggregations offered for the whole catalog or for one collection
    pub async fn aggregations(
        &self,
        principal: &Principal,
        collection_id: Option<&str>,
    ) -> Result<Vec<AggregationDescriptor>> {
        if let Some(collection_id) = collection_id {
            self.ensure_authorized(principal, collection_id, AccessType::Read)
                .await?;
        }
        Ok(AggregationKind::ALL
            .iter()
            .map(AggregationKind::descriptor)
            .collect())
    }

    /// Create a collection. Requires the administrator or editor role and
    /// valid authorization metadata.
    pub async fn create_collection(
        &self,
        principal: &Principal,
        draft: CollectionDraft,
        overrides: &AuthDraft,
    ) -> Result<Collection> {
        if !principal.has_any_role(&[self.policy.admin_role(), self.editor_role.as_str()]) {
            return Err(principal.deny("creating collections requires an administrator or editor role"));
        }
        let collection = self
            .validator
            .ensure_auth_present(draft, overrides, principal)?;
        self.store.create_collection(collection.clone()).await?;

        tracing::info!(
            collection = %collection.id,
            username = principal.username().unwrap_or("anonymous"),
            "created collection"
        );
        Ok(collection)
    }

    /// Replace a collection. WRITE is checked against the collection as it
    /// is stored now, then the new metadata is validated.
    pub async fn update_collection(
        &self,
        principal: &Principal,
        collection_id: &str,
        draft: CollectionDraft,
        overrides: &AuthDraft,
    ) -> Result<Collection> {
        self.ensure_authorized(principal, collection_id, AccessType::Write)
            .await?;
        let collection = self
            .validator
            .ensure_auth_present(draft, overrides, principal)?;
        self.store
            .update_collection(collection_id, collection.clone())
            .await?;

        tracing::info!(
            collection = collection_id,
            username = principal.username().unwrap_or("anonymous"),
            "updated collection"
        );
        Ok(collection)
    }

    pub async fn delete_collection(&self, principal: &Principal, collection_id: &str) -> Result<()> {
        self.ensure_authorized(principal, collection_id, AccessType::Write)
            .await?;
        self.store.delete_collection(collection_id).await?;
        tracing::info!(
            collection = collection_id,
            username = principal.username().unwrap_or("anonymous"),
            "deleted collection"
        );
        Ok(())
    }

    pub async fn create_item(
        &self,
        principal: &Principal,
        collection_id: &str,
        mut item: Item,
    ) -> Result<Item> {
        self.ensure_authorized(principal, collection_id, AccessType::Write)
            .await?;
        check_collection_reference(&item, collection_id)?;
        item.collection = Some(collection_id.to_string());
        self.store.create_item(item.clone(), Refresh::WaitFor).await?;
        tracing::debug!(collection = collection_id, item = %item.id, "created item");
        Ok(item)
    }

    /// Create every item of a feature collection, or none of them. All
    /// items are checked before the store is written.
    pub async fn create_items(
        &self,
        principal: &Principal,
        collection_id: &str,
        mut items: Vec<Item>,
    ) -> Result<Vec<Item>> {
        self.ensure_authorized(principal, collection_id, AccessType::Write)
            .await?;
        for item in &mut items {
            check_collection_reference(item, collection_id)?;
            item.collection = Some(collection_id.to_string());
        }
        self.store
            .create_items(items.clone(), Refresh::WaitFor)
            .await?;
        tracing::debug!(collection = collection_id, count = items.len(), "created items");
        Ok(items)
    }

    pub async fn update_item(
        &self,
        principal: &Principal,
        collection_id: &str,
        item_id: &str,
        mut item: Item,
    ) -> Result<Item> {
        self.ensure_authorized(principal, collection_id, AccessType::Write)
            .await?;
        if item.id != item_id {
            return Err(Error::bad_request(format!(
                "item id '{}' does not match path item id '{item_id}'",
                item.id
            )));
        }
        check_collection_reference(&item, collection_id)?;
        item.collection = Some(collection_id.to_string());
        self.store
            .update_item(collection_id, item_id, item.clone())
            .await?;
        Ok(item)
    }

    /// Apply a JSON merge patch to an item. The patch may not move the item
    /// to another id or collection.
    pub async fn patch_item(
        &self,
        principal: &Principal,
        collection_id: &str,
        item_id: &str,
        patch: &Value,
    ) -> Result<Item> {
        self.ensure_authorized(principal, collection_id, AccessType::Write)
            .await?;
        let Some(fields) = patch.as_object() else {
            return Err(Error::bad_request("item patch must be a JSON object"));
        };
        for (key, expected) in [("id", item_id), ("collection", collection_id)] {
            if fields.get(key).is_some_and(|value| value.as_str() != Some(expected)) {
                return Err(Error::bad_request(format!("item patch cannot change '{key}'")));
            }
        }
        self.store.patch_item(collection_id, item_id, patch).await
    }

    pub async fn delete_item(
        &self,
        principal: &Principal,
        collection_id: &str,
        item_id: &str,
    ) -> Result<()> {
        self.ensure_authorized(principal, collection_id, AccessType::Write)
            .await?;
        self.store.delete_item(collection_id, item_id).await
    }

    /// Insert a batch of items into one collection. Every item must name
    /// that collection; the batch is visible once this returns.
    pub async fn bulk_insert(
        &self,
        principal: &Principal,
        collection_id: &str,
        items: Vec<Item>,
    ) -> Result<usize> {
        self.ensure_authorized(principal, collection_id, AccessType::Write)
            .await?;
        if let Some(item) = items
            .iter()
            .find(|item| item.collection_id() != Some(collection_id))
        {
            return Err(Error::bad_request(format!(
                "item '{}' does not belong to collection '{collection_id}'",
                item.id
            )));
        }

        let inserted = self
            .store
            .bulk_insert(collection_id, items, Refresh::WaitFor)
            .await?;
        tracing::info!(
            collection = collection_id,
            inserted,
            username = principal.username().unwrap_or("anonymous"),
            "bulk inserted items"
        );
        Ok(inserted)
    }

    fn readable_by(&self, scopes: &BTreeSet<String>) -> Option<BTreeSet<String>> {
        (!self.policy.is_admin(scopes)).then(|| scopes.clone())
    }

    /// Collections a search or aggregation is limited to; `None` means all
    async fn resolve_collections(
        &self,
        principal: &Principal,
        requested: Option<Vec<String>>,
    ) -> Result<Option<Vec<String>>> {
        if self.policy.is_admin(principal.scopes()) {
            return Ok(requested);
        }

        let authorized = self.authorized_collection_ids(principal.scopes()).await?;
        match requested {
            Some(requested) => {
                if let Some(denied) = requested.iter().find(|id| !authorized.contains(*id)) {
                    return Err(principal.deny(format!(
                        "read access to collection '{denied}' is not allowed"
                    )));
                }
                Ok(Some(requested))
            }
            None => Ok(Some(authorized.into_iter().collect())),
        }
    }

    async fn run_search(&self, query: &ItemQuery) -> Result<ItemPage> {
        let (page, count) = futures::join!(
            self.store.search_items(query),
            self.store.count_items(query)
        );
        let mut page = page?;
        if page.total.is_none() {
            page.total = Some(count?);
        }
        Ok(page)
    }
}

fn check_collection_reference(item: &Item, collection_id: &str) -> Result<()> {
    match item.collection_id() {
        Some(reference) if reference != collection_id => Err(Error::bad_request(format!(
            "item '{}' references collection '{reference}' instead of '{collection_id}'",
            item.id
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde_json::json;

    const PROTECTED: &str = "protected";
    const PUBLIC: &str = "terrascope_s2_toc_v2";

    fn settings() -> Settings {
        Settings {
            collections_page_size: 1,
            ..Settings::default()
        }
    }

    fn item(collection: &str, id: &str) -> Item {
        serde_json::from_value(json!({
            "type": "Feature",
            "id": id,
            "collection": collection,
            "bbox": [0.0, 0.0, 1.0, 1.0],
            "properties": {"datetime": "2021-06-01T00:00:00Z"}
        }))
        .unwrap()
    }

    async fn catalog() -> AuthorizedCatalog {
        let store = MemoryStore::new();
        for value in [
            json!({"id": PROTECTED, "_auth": {"read": ["protected-role"], "write": ["protected-role"]}}),
            json!({"id": PUBLIC, "_auth": {"read": ["anonymous"], "write": ["sentinel2"]}}),
        ] {
            store
                .create_collection(serde_json::from_value(value).unwrap())
                .await
                .unwrap();
        }
        store
            .bulk_insert(PROTECTED, vec![item(PROTECTED, "p1")], Refresh::WaitFor)
            .await
            .unwrap();
        store
            .bulk_insert(
                PUBLIC,
                vec![item(PUBLIC, "s1"), item(PUBLIC, "s2")],
                Refresh::WaitFor,
            )
            .await
            .unwrap();
        AuthorizedCatalog::new(Arc::new(store), &settings())
    }

    fn anonymous() -> Principal {
        Principal::anonymous("anonymous")
    }

    fn user(roles: &[&str]) -> Principal {
        Principal::authenticated(Some("tester".to_string()), roles.iter().copied(), "anonymous")
    }

    fn query() -> ItemQuery {
        ItemQuery {
            limit: 10,
            ..ItemQuery::default()
        }
    }

    fn draft(value: Value) -> CollectionDraft {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_authorized_distinguishes_401_and_403() {
        let catalog = catalog().await;
        let result = catalog
            .ensure_authorized(&anonymous(), PROTECTED, AccessType::Read)
            .await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        let result = catalog
            .ensure_authorized(&user(&["other"]), PROTECTED, AccessType::Read)
            .await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let result = catalog
            .ensure_authorized(&user(&["other"]), "missing", AccessType::Read)
            .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        let collection = catalog
            .ensure_authorized(&user(&["protected-role"]), PROTECTED, AccessType::Write)
            .await
            .unwrap();
        assert!(collection.auth.write.contains("protected-role"));
    }

    #[tokio::test]
    async fn test_write_does_not_imply_read() {
        let catalog = catalog().await;
        let principal = user(&["sentinel2"]);
        assert!(catalog
            .ensure_authorized(&principal, PUBLIC, AccessType::Write)
            .await
            .is_ok());
        assert!(catalog
            .ensure_authorized(&principal, PROTECTED, AccessType::Read)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_authorized_collections_walks_all_pages() {
        let catalog = catalog().await;
        let admin = user(&["stac-admin"]);
        let all = catalog
            .authorized_collection_ids(admin.scopes())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let public = catalog
            .authorized_collection_ids(anonymous().scopes())
            .await
            .unwrap();
        assert_eq!(public, BTreeSet::from([PUBLIC.to_string()]));
    }

    #[tokio::test]
    async fn test_unscoped_search_is_limited_to_readable_collections() {
        let catalog = catalog().await;
        let page = catalog.search(&anonymous(), query()).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(2));
        assert!(page
            .items
            .iter()
            .all(|item| item.collection_id() == Some(PUBLIC)));

        let page = catalog
            .search(&user(&["stac-admin"]), query())
            .await
            .unwrap();
        assert_eq!(page.total, Some(3));
    }

    #[tokio::test]
    async fn test_unscoped_search_without_readable_collections_is_empty() {
        let store = MemoryStore::new();
        store
            .create_collection(
                serde_json::from_value(json!({"id": "private", "_auth": {"read": [], "write": []}}))
                    .unwrap(),
            )
            .await
            .unwrap();
        let catalog = AuthorizedCatalog::new(Arc::new(store), &settings());
        let page = catalog.search(&anonymous(), query()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, Some(0));
    }

    #[tokio::test]
    async fn test_scoped_search_requires_every_collection() {
        let catalog = catalog().await;
        let scoped = ItemQuery {
            collections: Some(vec![PUBLIC.to_string(), PROTECTED.to_string()]),
            ..query()
        };
        let result = catalog.search(&anonymous(), scoped.clone()).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        let result = catalog.search(&user(&["sentinel2"]), scoped.clone()).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let page = catalog
            .search(&user(&["protected-role"]), scoped)
            .await
            .unwrap();
        assert_eq!(page.total, Some(3));
    }

    #[tokio::test]
    async fn test_item_access_follows_collection() {
        let catalog = catalog().await;
        assert!(catalog.get_item(&anonymous(), PUBLIC, "s1").await.is_ok());
        assert!(matches!(
            catalog.get_item(&anonymous(), PROTECTED, "p1").await,
            Err(Error::Unauthorized { .. })
        ));
        let page = catalog
            .item_collection(&user(&["protected-role"]), PROTECTED, query())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_aggregate() {
        let catalog = catalog().await;
        let result = catalog
            .aggregate(&anonymous(), None, query(), &[AggregationKind::TotalCount])
            .await
            .unwrap();
        assert_eq!(result[0].value, Some(2));

        let result = catalog
            .aggregate(
                &anonymous(),
                Some(PROTECTED),
                query(),
                &[AggregationKind::TotalCount],
            )
            .await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_aggregate_over_no_collections_is_denied() {
        let catalog = AuthorizedCatalog::new(Arc::new(MemoryStore::new()), &settings());
        let result = catalog
            .aggregate(&anonymous(), None, query(), &[AggregationKind::TotalCount])
            .await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        let result = catalog
            .aggregate(&user(&["x"]), None, query(), &[AggregationKind::TotalCount])
            .await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_admin_aggregate_over_empty_catalog_is_denied() {
        let catalog = AuthorizedCatalog::new(Arc::new(MemoryStore::new()), &settings());
        let admin = user(&["stac-admin"]);
        let result = catalog
            .aggregate(&admin, None, query(), &[AggregationKind::TotalCount])
            .await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let catalog = self::catalog().await;
        let result = catalog
            .aggregate(&admin, None, query(), &[AggregationKind::TotalCount])
            .await
            .unwrap();
        assert_eq!(result[0].value, Some(3));
    }

    #[tokio::test]
    async fn test_create_collection_requires_editor_or_admin() {
        let catalog = catalog().await;
        let body = json!({"id": "new", "_auth": {"read": ["team"], "write": ["team"]}});

        let result = catalog
            .create_collection(&user(&["team"]), draft(body.clone()), &AuthDraft::default())
            .await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        let created = catalog
            .create_collection(&user(&["stac-editor"]), draft(body.clone()), &AuthDraft::default())
            .await
            .unwrap();
        assert_eq!(created.id, "new");

        let result = catalog
            .create_collection(&user(&["stac-admin"]), draft(body), &AuthDraft::default())
            .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_collection_checks_existing_write_then_validates() {
        let catalog = catalog().await;
        let body = json!({"id": PROTECTED, "_auth": {"read": ["anonymous"], "write": ["protected-role"]}});

        let result = catalog
            .update_collection(&user(&["other"]), PROTECTED, draft(body.clone()), &AuthDraft::default())
            .await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        // WRITE holder without publish rights cannot make it public
        let result = catalog
            .update_collection(
                &user(&["protected-role"]),
                PROTECTED,
                draft(body),
                &AuthDraft::default(),
            )
            .await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));

        let unchanged = catalog
            .ensure_authorized(&user(&["stac-admin"]), PROTECTED, AccessType::Read)
            .await
            .unwrap();
        assert!(!unchanged.auth.read.contains("anonymous"));
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let catalog = catalog().await;
        assert!(matches!(
            catalog.delete_collection(&anonymous(), PROTECTED).await,
            Err(Error::Unauthorized { .. })
        ));
        catalog
            .delete_collection(&user(&["protected-role"]), PROTECTED)
            .await
            .unwrap();
        assert!(matches!(
            catalog
                .get_collection(&user(&["protected-role"]), PROTECTED)
                .await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_bulk_insert_rejects_foreign_items_before_writing() {
        let catalog = catalog().await;
        let principal = user(&["protected-role"]);
        let result = catalog
            .bulk_insert(
                &principal,
                PROTECTED,
                vec![item(PROTECTED, "p2"), item(PUBLIC, "s3")],
            )
            .await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));
        assert!(catalog.get_item(&principal, PROTECTED, "p2").await.is_err());

        let inserted = catalog
            .bulk_insert(&principal, PROTECTED, vec![item(PROTECTED, "p2")])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        assert!(catalog.get_item(&principal, PROTECTED, "p2").await.is_ok());
    }

    #[tokio::test]
    async fn test_item_writes() {
        let catalog = catalog().await;
        let writer = user(&["sentinel2"]);

        assert!(matches!(
            catalog.create_item(&user(&["other"]), PUBLIC, item(PUBLIC, "s3")).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            catalog.create_item(&writer, PUBLIC, item(PROTECTED, "s3")).await,
            Err(Error::BadRequest { .. })
        ));
        catalog
            .create_item(&writer, PUBLIC, item(PUBLIC, "s3"))
            .await
            .unwrap();

        assert!(matches!(
            catalog.update_item(&writer, PUBLIC, "s3", item(PUBLIC, "other")).await,
            Err(Error::BadRequest { .. })
        ));
        catalog
            .update_item(&writer, PUBLIC, "s3", item(PUBLIC, "s3"))
            .await
            .unwrap();

        assert!(matches!(
            catalog
                .patch_item(&writer, PUBLIC, "s3", &json!({"collection": PROTECTED}))
                .await,
            Err(Error::BadRequest { .. })
        ));
        let patched = catalog
            .patch_item(&writer, PUBLIC, "s3", &json!({"properties": {"gsd": 10}}))
            .await
            .unwrap();
        assert_eq!(patched.fields["properties"]["gsd"], 10);

        catalog.delete_item(&writer, PUBLIC, "s3").await.unwrap();
        assert!(matches!(
            catalog.get_item(&writer, PUBLIC, "s3").await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_items_writes_nothing_when_one_item_is_rejected() {
        let catalog = catalog().await;
        let writer = user(&["sentinel2"]);

        let result = catalog
            .create_items(&writer, PUBLIC, vec![item(PUBLIC, "s3"), item(PROTECTED, "s4")])
            .await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));
        let result = catalog
            .create_items(&writer, PUBLIC, vec![item(PUBLIC, "s3"), item(PUBLIC, "s1")])
            .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        assert!(matches!(
            catalog.get_item(&writer, PUBLIC, "s3").await,
            Err(Error::NotFound { .. })
        ));

        let created = catalog
            .create_items(&writer, PUBLIC, vec![item(PUBLIC, "s3"), item(PUBLIC, "s4")])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert!(catalog.get_item(&writer, PUBLIC, "s4").await.is_ok());
    }

    #[tokio::test]
    async fn test_collection_listing_is_filtered() {
        let catalog = catalog().await;
        let page = catalog
            .all_collections(&anonymous(), None, None)
            .await
            .unwrap();
        assert_eq!(page.collections.len(), 1);
        assert_eq!(page.collections[0].id, PUBLIC);
        assert!(page.next.is_none());

        let again = catalog
            .all_collections(&anonymous(), None, None)
            .await
            .unwrap();
        assert_eq!(again, page);
        let principal = user(&["protected-role"]);
        assert_eq!(
            catalog.authorized_collection_ids(principal.scopes()).await.unwrap(),
            catalog.authorized_collection_ids(principal.scopes()).await.unwrap()
        );

        let admin = user(&["stac-admin"]);
        let first = catalog.all_collections(&admin, None, None).await.unwrap();
        assert!(first.next.is_some());
        assert!(catalog.all_collections(&admin, Some(0), None).await.is_err());
    }

    #[tokio::test]
    async fn test_collection_aggregations_require_read() {
        let catalog = catalog().await;
        assert_eq!(catalog.aggregations(&anonymous(), None).await.unwrap().len(), 3);
        assert!(catalog
            .aggregations(&anonymous(), Some(PROTECTED))
            .await
            .is_err());
    }
}
