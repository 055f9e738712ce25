//! Provider Manager
//!
//! Holds every registered [`Provider`] by name and tracks which one is active.
//! HTTP handlers resolve the active provider through the manager and never
//! depend on a concrete provider type.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::providers::{Provider, ProviderError};

// ---------------------------------------------------------------------------
// Health snapshot
// ---------------------------------------------------------------------------

/// Point-in-time status of one provider, as reported by the liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub provider: String,
    pub healthy: bool,
    pub active: bool,
    pub models: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// ProviderManager
// ---------------------------------------------------------------------------

/// Registry of providers with a single active selection.
#[derive(Default)]
pub struct ProviderManager {
    /// Provider name -> provider.
    providers: HashMap<String, Arc<dyn Provider>>,
    /// Registration order, used for init and reporting.
    order: Vec<String>,
    active: Option<String>,
}

impl ProviderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name. A provider registered under a
    /// name already in use replaces the previous one.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            warn!(provider = %name, "Provider already registered, replacing");
            self.order.retain(|o| o != &name);
        }
        debug!(provider = %name, "Provider registered");
        self.order.push(name.clone());
        self.providers.insert(name, provider);
    }

    /// Initialize every provider independently.
    ///
    /// A failing provider does not stop the others. Failures come back as
    /// human readable warnings so the caller can keep serving in a degraded
    /// state.
    pub async fn init_all_providers(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for name in &self.order {
            let Some(provider) = self.providers.get(name) else {
                continue;
            };
            match provider.init().await {
                Ok(()) => info!(provider = %name, "Provider ready"),
                Err(e) => {
                    warn!(provider = %name, error = %e, "Provider failed to initialize");
                    warnings.push(format!("{name}: {e}"));
                }
            }
        }
        warnings
    }

    /// Make `name` the active provider.
    ///
    /// Unknown names are rejected and the current selection is kept.
    pub fn select_provider(&mut self, name: &str) -> Result<(), ProviderError> {
        if !self.providers.contains_key(name) {
            return Err(ProviderError::UnknownProvider(name.to_string()));
        }
        info!(provider = %name, "Active provider selected");
        self.active = Some(name.to_string());
        Ok(())
    }

    /// The active provider.
    pub fn active(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        self.active
            .as_deref()
            .and_then(|name| self.providers.get(name))
            .cloned()
            .ok_or(ProviderError::NoActiveProvider)
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names in registration order.
    pub fn provider_names(&self) -> &[String] {
        &self.order
    }

    /// Health of every provider, in registration order.
    pub fn health(&self) -> Vec<ProviderStatus> {
        self.order
            .iter()
            .filter_map(|name| self.providers.get(name).map(|p| (name, p)))
            .map(|(name, provider)| ProviderStatus {
                provider: name.clone(),
                healthy: provider.is_healthy(),
                active: self.active.as_deref() == Some(name.as_str()),
                models: provider.list_models().iter().map(|m| m.id).collect(),
            })
            .collect()
    }

    /// Close every provider. Errors are logged and do not stop the others.
    pub async fn close_all(&self) {
        for name in &self.order {
            if let Some(provider) = self.providers.get(name)
                && let Err(e) = provider.close().await
            {
                warn!(provider = %name, error = %e, "Provider failed to close");
            }
        }
        info!(count = self.order.len(), "Providers closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::{ChatSession, ProviderFuture};
    use crate::providers::types::{
        ChatOption, GenerateOption, Message, ModelInfo, Response, SessionMetadata,
    };
    use std::sync::atomic::{AtomicBool, Ordering};

    const STUB_MODEL: ModelInfo = ModelInfo {
        id: "stub-1",
        created: 0,
        owned_by: "tests",
        provider: "stub",
    };

    // A tiny stub provider for exercising the manager.
    struct StubProvider {
        name: &'static str,
        fail_init: bool,
        healthy: AtomicBool,
    }

    impl StubProvider {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                fail_init: false,
                healthy: AtomicBool::new(false),
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                fail_init: true,
                ..Self::new(name)
            }
        }
    }

    struct StubSession;

    impl ChatSession for StubSession {
        fn send_message<'a>(
            &'a mut self,
            text: &'a str,
            _options: &'a [GenerateOption],
        ) -> ProviderFuture<'a, Response> {
            Box::pin(async move {
                Ok(Response {
                    text: text.to_string(),
                    ..Default::default()
                })
            })
        }

        fn history(&self) -> &[Message] {
            &[]
        }

        fn metadata(&self) -> SessionMetadata {
            SessionMetadata::default()
        }

        fn clear(&mut self) {}
    }

    impl Provider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn init(&self) -> ProviderFuture<'_, ()> {
            Box::pin(async move {
                if self.fail_init {
                    return Err(ProviderError::Authentication("stub failure".into()));
                }
                self.healthy.store(true, Ordering::SeqCst);
                Ok(())
            })
        }

        fn generate_content<'a>(
            &'a self,
            prompt: &'a str,
            _options: &'a [GenerateOption],
        ) -> ProviderFuture<'a, Response> {
            Box::pin(async move {
                Ok(Response {
                    text: format!("{}: {prompt}", self.name),
                    ..Default::default()
                })
            })
        }

        fn start_chat(&self, _options: &[ChatOption]) -> Box<dyn ChatSession> {
            Box::new(StubSession)
        }

        fn close(&self) -> ProviderFuture<'_, ()> {
            Box::pin(async move {
                self.healthy.store(false, Ordering::SeqCst);
                Ok(())
            })
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }

        fn list_models(&self) -> Vec<ModelInfo> {
            vec![STUB_MODEL]
        }
    }

    #[test]
    fn test_no_active_provider_initially() {
        let manager = ProviderManager::new();
        assert!(matches!(
            manager.active(),
            Err(ProviderError::NoActiveProvider)
        ));
        assert!(manager.active_name().is_none());
    }

    #[test]
    fn test_select_unknown_keeps_previous() {
        let mut manager = ProviderManager::new();
        manager.register(Arc::new(StubProvider::new("a")));
        manager.select_provider("a").unwrap();

        let err = manager.select_provider("missing").unwrap_err();
        assert!(matches!(err, ProviderError::UnknownProvider(ref n) if n == "missing"));
        assert_eq!(manager.active_name(), Some("a"));
        assert_eq!(manager.active().unwrap().name(), "a");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut manager = ProviderManager::new();
        manager.register(Arc::new(StubProvider::new("a")));
        manager.register(Arc::new(StubProvider::new("b")));
        manager.register(Arc::new(StubProvider::failing("a")));
        assert_eq!(manager.provider_names(), &["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_init_all_collects_warnings() {
        let mut manager = ProviderManager::new();
        manager.register(Arc::new(StubProvider::new("good")));
        manager.register(Arc::new(StubProvider::failing("bad")));

        let warnings = manager.init_all_providers().await;
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("bad:"));
        assert!(manager.get("good").unwrap().is_healthy());
        assert!(!manager.get("bad").unwrap().is_healthy());
    }

    #[tokio::test]
    async fn test_health_and_close_all() {
        let mut manager = ProviderManager::new();
        manager.register(Arc::new(StubProvider::new("a")));
        manager.register(Arc::new(StubProvider::new("b")));
        manager.init_all_providers().await;
        manager.select_provider("b").unwrap();

        let health = manager.health();
        assert_eq!(health.len(), 2);
        assert_eq!(health[0].provider, "a");
        assert!(!health[0].active);
        assert!(health[1].active);
        assert!(health.iter().all(|s| s.healthy));
        assert_eq!(health[0].models, vec!["stub-1"]);

        manager.close_all().await;
        assert!(manager.health().iter().all(|s| !s.healthy));
    }

    #[tokio::test]
    async fn test_active_provider_dispatch() {
        let mut manager = ProviderManager::new();
        manager.register(Arc::new(StubProvider::new("a")));
        manager.select_provider("a").unwrap();

        let provider = manager.active().unwrap();
        let reply = provider.generate_content("hi", &[]).await.unwrap();
        assert_eq!(reply.text, "a: hi");

        let mut session = provider.start_chat(&[]);
        assert_eq!(session.send_message("x", &[]).await.unwrap().text, "x");
    }
}
