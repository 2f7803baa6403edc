//! Shared application state.

use std::sync::Arc;
use terra_stac_catalog::{AuthorizedCatalog, CatalogStore};
use terra_stac_config::Settings;
use terra_stac_security::{CredentialResolver, TokenVerifier};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub catalog: AuthorizedCatalog,
    pub resolver: CredentialResolver,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        verifier: Option<Arc<dyn TokenVerifier>>,
        settings: Settings,
    ) -> Self {
        Self {
            catalog: AuthorizedCatalog::new(store, &settings),
            resolver: CredentialResolver::new(verifier, &settings),
            settings: Arc::new(settings),
        }
    }
}
