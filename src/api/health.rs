use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;
use crate::providers::ProviderStatus;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub providers: Vec<ProviderStatus>,
}

/// GET /health
///
/// `ok` while the active provider is healthy, `degraded` otherwise. Always
/// answers 200 so the process itself stays observable.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let manager = state.providers.read().await;
    let providers = manager.health();
    let healthy = providers.iter().any(|p| p.active && p.healthy);

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        service: env!("CARGO_PKG_NAME"),
        providers,
    })
}
