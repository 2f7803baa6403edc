//! Catalog layer for terra-stac
//!
//! This crate puts the access policy in front of every operation that reads
//! or mutates catalog data:
//! - `CatalogStore`: the capability interface of the underlying document store
//! - `MemoryStore`: an in-process store implementing that capability
//! - `AuthorizedCatalog`: enforcement wrappers around each catalog operation
//! - `serializer`: turns stored documents into consumer-facing STAC JSON

pub mod aggregation;
pub mod authorized;
pub mod memory;
pub mod search;
pub mod serializer;
pub mod store;

pub use aggregation::{Aggregation, AggregationDescriptor, AggregationKind, Bucket};
pub use authorized::AuthorizedCatalog;
pub use memory::MemoryStore;
pub use search::{AggregateRequest, BBox, DatetimeInterval, SearchRequest};
pub use store::{CatalogStore, CollectionPage, CollectionQuery, ItemPage, ItemQuery, Refresh};
pub use serializer::Serializer;
