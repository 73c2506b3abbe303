//! Checkout session endpoint

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::Identity;
use crate::checkout::{CheckoutError, CheckoutRequest};
use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub price_id: String,
    #[serde(default)]
    pub plan_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub success: bool,
    pub session_url: String,
}

impl From<CheckoutError> for ApiError {
    fn from(e: CheckoutError) -> ApiError {
        match e {
            CheckoutError::MissingPrice
            | CheckoutError::UnknownPlan(_)
            | CheckoutError::AlreadyCovered(_) => ApiError::Validation(e.to_string()),
            CheckoutError::Provider(message) => ApiError::Provider(message),
        }
    }
}

/// Redirect targets must return the user to the deployment that issued
/// the session, so derive them from the request's own origin.
fn request_origin(headers: &HeaderMap) -> ApiResult<String> {
    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        return Ok(origin.to_string());
    }

    if let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        return Ok(format!("http://{}", host));
    }

    Err(ApiError::Validation("request origin could not be determined".to_string()))
}

/// POST /api/checkout/session
///
/// Identity is required and checked before anything else: no provider
/// call is ever made on behalf of an anonymous request.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    identity: Identity,
    headers: HeaderMap,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<Json<CreateSessionResponse>> {
    let email = identity.require()?;

    let user = db::users::find_by_email(&state.db, email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let origin = request_origin(&headers)?;
    let session = state
        .orchestrator
        .create_session(
            &user,
            &CheckoutRequest {
                price_id: request.price_id,
                plan_name: request.plan_name,
                origin,
            },
        )
        .await?;

    Ok(Json(CreateSessionResponse {
        success: true,
        session_url: session.url,
    }))
}
