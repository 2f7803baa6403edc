//! Catalog documents as seen by the authorization layer.
//!
//! Only the fields that matter for access control are typed; the remaining
//! STAC payload is carried untouched in `fields`.

use crate::principal::AccessType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Role sets attached to a persisted collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionAuth {
    pub read: BTreeSet<String>,
    pub write: BTreeSet<String>,
}

impl CollectionAuth {
    pub fn new<R, W>(read: R, write: W) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        W: IntoIterator,
        W::Item: Into<String>,
    {
        Self {
            read: read.into_iter().map(Into::into).collect(),
            write: write.into_iter().map(Into::into).collect(),
        }
    }

    /// Roles granted the given kind of access
    pub fn roles(&self, access: AccessType) -> &BTreeSet<String> {
        match access {
            AccessType::Read => &self.read,
            AccessType::Write => &self.write,
        }
    }
}

/// `_auth` object as submitted by a client; either key may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<BTreeSet<String>>,
}

impl AuthDraft {
    pub fn get(&self, access: AccessType) -> Option<&BTreeSet<String>> {
        match access {
            AccessType::Read => self.read.as_ref(),
            AccessType::Write => self.write.as_ref(),
        }
    }

    pub fn set(&mut self, access: AccessType, roles: BTreeSet<String>) {
        match access {
            AccessType::Read => self.read = Some(roles),
            AccessType::Write => self.write = Some(roles),
        }
    }
}

/// Collection body received on a write path, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDraft {
    pub id: String,
    #[serde(rename = "_auth", default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthDraft>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Collection as persisted in the catalog.
///
/// A `Collection` cannot exist without complete `_auth` metadata; drafts are
/// turned into collections only by the authorization metadata validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(rename = "_auth")]
    pub auth: CollectionAuth,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Collection {
    pub fn new(id: impl Into<String>, auth: CollectionAuth, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            auth,
            fields,
        }
    }

    /// Keep only the requested top-level fields; `id` and `_auth` always stay.
    pub fn project(mut self, fields: &[String]) -> Self {
        self.fields.retain(|key, _| fields.iter().any(|f| f == key));
        self
    }
}

/// Catalog item. Access is inherited from the parent collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Item {
    /// Parent collection id, if the item names one
    pub fn collection_id(&self) -> Option<&str> {
        self.collection.as_deref()
    }
}
