//! Request identity extraction
//!
//! The hosting platform authenticates users upstream and forwards the
//! verified account email in a header. Identity is explicit per request;
//! there is no ambient session state. Handlers decide individually whether
//! identity is required (checkout) or optional (chat, notifications).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Header carrying the authenticated account email.
pub const IDENTITY_HEADER: &str = "x-bloom-user";

/// The caller's identity, if any. Extraction never rejects; a missing or
/// unreadable header is simply anonymous.
#[derive(Debug, Clone)]
pub struct Identity(pub Option<String>);

impl Identity {
    /// The email, or None for anonymous callers.
    pub fn email(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Require identity, failing with Unauthorized before any side effect.
    pub fn require(&self) -> ApiResult<&str> {
        self.email().ok_or(ApiError::Unauthorized)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(Identity(email))
    }
}
