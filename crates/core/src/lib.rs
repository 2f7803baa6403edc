//! Core domain types, errors, and constants for `terra-stac`.
//!
//! Everything that the credential resolver, the access policy and the catalog
//! enforcement layer need to agree on lives here, so that a single
//! authorization decision means the same thing in every crate.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` taxonomy and `Result` alias. Each variant maps to
//!   exactly one HTTP status at the API boundary.
//! - **`principal`**: the per-request identity (`Principal`) and the
//!   `AccessType` a caller asks for.
//! - **`documents`**: catalog documents (`Collection`, `CollectionDraft`, `Item`)
//!   together with their `_auth` metadata.
//! - **`constants`**: shared names such as the internal field prefix and the
//!   request parameters carrying role lists.

pub mod constants;
pub mod documents;
pub mod errors;
pub mod principal;

pub use self::{
    constants::*,
    documents::{AuthDraft, Collection, CollectionAuth, CollectionDraft, Item},
    errors::{Error, Result},
    principal::{AccessType, Principal},
};
