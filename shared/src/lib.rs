pub mod admin;
pub mod config;
pub mod cors;
pub mod documents;
pub mod error;
pub mod identity;
pub mod verify_email;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use config::Config;
use documents::DocumentStore;
use identity::IdentityProvider;
use std::sync::Arc;

/// Shared application state, built once at cold start and handed to every invocation
pub struct AppState {
    pub config: Config,
    pub identity: Arc<dyn IdentityProvider>,
    /// `None` when the mirror write is disabled
    pub documents: Option<Arc<dyn DocumentStore>>,
}

impl AppState {
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        documents: Option<Arc<dyn DocumentStore>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            identity,
            documents,
        })
    }
}
