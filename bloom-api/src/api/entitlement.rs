//! Entitlement check endpoint

use axum::extract::{Query, State};
use axum::Json;
use bloom_common::Tier;
use serde::{Deserialize, Serialize};

use crate::api::Identity;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementQuery {
    /// Tier label the feature requires; unknown labels rank as Seedling
    pub required: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    pub success: bool,
    pub granted: bool,
    pub effective_tier: Option<String>,
    /// Always true once this response exists; lets UI callers distinguish
    /// a settled denial from a check still in flight
    pub settled: bool,
}

/// GET /api/entitlement/check?required=<tier>
pub async fn check_entitlement(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<EntitlementQuery>,
) -> ApiResult<Json<EntitlementResponse>> {
    let required = query
        .required
        .as_deref()
        .map(Tier::parse_or_default)
        .unwrap_or(Tier::Seedling);

    let decision = state.gate.check_for_email(identity.email(), required).await;

    Ok(Json(EntitlementResponse {
        success: true,
        granted: decision.granted,
        effective_tier: decision.effective.map(|e| e.label().to_string()),
        settled: true,
    }))
}
