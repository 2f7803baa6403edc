//! Consumer-facing STAC JSON.
//!
//! Internal fields never leave the service: every collection passes through
//! `Serializer::collection`, which drops `_auth` and any other `_`-prefixed key.

use crate::store::{CollectionPage, ItemPage};
use serde_json::{json, Map, Value};
use terra_stac_core::{Collection, Item, Result, HIDDEN_FIELD_PREFIX};

const GENERATED_RELS: [&str; 5] = ["self", "parent", "root", "items", "collection"];

/// Builds response documents with links relative to the service base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serializer {
    base_url: String,
}

impl Serializer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn href(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn link(&self, rel: &str, path: &str, media_type: &str) -> Value {
        json!({"rel": rel, "type": media_type, "href": self.href(path)})
    }

    pub fn collection(&self, collection: Collection) -> Result<Value> {
        let id = collection.id.clone();
        let mut document = public_fields(serde_json::to_value(collection)?);
        let links = vec![
            self.link("self", &format!("collections/{id}"), "application/json"),
            self.link("parent", "", "application/json"),
            self.link("root", "", "application/json"),
            self.link("items", &format!("collections/{id}/items"), "application/geo+json"),
        ];
        merge_links(&mut document, links);
        Ok(Value::Object(document))
    }

    /// `{"collections": [...], "links": [...]}`. `next` is the link to the
    /// following page, if any.
    pub fn collections(&self, page: CollectionPage, next: Option<Value>) -> Result<Value> {
        let mut links = vec![
            self.link("root", "", "application/json"),
            self.link("self", "collections", "application/json"),
        ];
        links.extend(next);
        let collections = page
            .collections
            .into_iter()
            .map(|c| self.collection(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({"collections": collections, "links": links}))
    }

    pub fn item(&self, item: Item) -> Result<Value> {
        let id = item.id.clone();
        let collection = item.collection.clone();
        let mut document = public_fields(serde_json::to_value(item)?);

        let mut links = vec![self.link("root", "", "application/json")];
        if let Some(collection) = collection {
            links.push(self.link(
                "self",
                &format!("collections/{collection}/items/{id}"),
                "application/geo+json",
            ));
            links.push(self.link(
                "parent",
                &format!("collections/{collection}"),
                "application/json",
            ));
            links.push(self.link(
                "collection",
                &format!("collections/{collection}"),
                "application/json",
            ));
        }
        merge_links(&mut document, links);
        Ok(Value::Object(document))
    }

    /// GeoJSON `FeatureCollection` for a page of items. `next` is the link
    /// to the following page, if any.
    pub fn item_collection(&self, page: ItemPage, next: Option<Value>) -> Result<Value> {
        let returned = page.items.len();
        let features = page
            .items
            .into_iter()
            .map(|item| self.item(item))
            .collect::<Result<Vec<_>>>()?;

        let mut links = vec![self.link("root", "", "application/json")];
        links.extend(next);

        let mut document = json!({
            "type": "FeatureCollection",
            "features": features,
            "links": links,
            "numberReturned": returned,
        });
        if let Some(total) = page.total {
            document["numberMatched"] = json!(total);
        }
        Ok(document)
    }
}

/// Drop every top-level key starting with the internal prefix
fn public_fields(document: Value) -> Map<String, Value> {
    match document {
        Value::Object(mut fields) => {
            fields.retain(|key, _| !key.starts_with(HIDDEN_FIELD_PREFIX));
            fields
        }
        _ => Map::new(),
    }
}

/// Replace generated link relations, keeping any other links the document has
fn merge_links(document: &mut Map<String, Value>, generated: Vec<Value>) {
    let mut links: Vec<Value> = match document.remove("links") {
        Some(Value::Array(existing)) => existing
            .into_iter()
            .filter(|link| {
                !link
                    .get("rel")
                    .and_then(Value::as_str)
                    .is_some_and(|rel| GENERATED_RELS.contains(&rel))
            })
            .collect(),
        _ => Vec::new(),
    };
    links.extend(generated);
    document.insert("links".to_string(), Value::Array(links));
}
