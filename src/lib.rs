pub mod api;
pub mod config;
pub mod error;
pub mod net;
pub mod providers;

use crate::config::Config;
use crate::providers::ProviderManager;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub providers: Arc<RwLock<ProviderManager>>,
}

impl AppState {
    pub fn new(config: Config, providers: ProviderManager) -> Self {
        Self {
            config: Arc::new(config),
            providers: Arc::new(RwLock::new(providers)),
        }
    }

    /// The active provider. The registry lock is released before returning,
    /// so callers never hold it across an upstream request.
    pub async fn active_provider(
        &self,
    ) -> Result<Arc<dyn providers::Provider>, providers::ProviderError> {
        self.providers.read().await.active()
    }
}
