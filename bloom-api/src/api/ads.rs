//! Ad visibility endpoint
//!
//! Ad-free browsing is the entry-level paid perk: any active paid tier
//! (Nurturer or better) hides ads. Content selection itself lives with
//! the ad network, not here.

use axum::extract::State;
use axum::Json;
use bloom_common::Tier;
use serde::Serialize;

use crate::api::Identity;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdVisibilityResponse {
    pub success: bool,
    pub show_ads: bool,
}

/// GET /api/ads/visibility
pub async fn ad_visibility(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<AdVisibilityResponse>> {
    let decision = state
        .gate
        .check_for_email(identity.email(), Tier::Nurturer)
        .await;

    Ok(Json(AdVisibilityResponse {
        success: true,
        show_ads: !decision.granted,
    }))
}
