use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::json;

use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub provider: &'static str,
    pub configured: bool,
}

/// Which external sources this deployment can actually reach. Unconfigured
/// adapters stay listed so a missing key shows up here instead of as
/// silently thinner search results.
pub async fn list(State(state): State<AppState>) -> Json<serde_json::Value> {
    let providers: Vec<ProviderInfo> = state
        .aggregator
        .registry()
        .providers()
        .iter()
        .map(|p| ProviderInfo {
            provider: p.kind().as_str(),
            configured: p.is_configured(),
        })
        .collect();

    Json(json!({ "success": true, "providers": providers }))
}
