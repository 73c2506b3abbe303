//! Stripe checkout API client
//!
//! Thin client for `POST /v1/checkout/sessions`. One request per
//! orchestrator call, bounded by a timeout, never retried here; the
//! idempotency key accompanies the request so provider-side retries are
//! safe.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::checkout::{CheckoutSessionParams, CreatedSession, GatewayError, PaymentGateway};

const STRIPE_BASE_URL: &str = "https://api.stripe.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Successful session creation response; only the hosted URL matters.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    url: Option<String>,
}

/// Stripe error envelope.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Stripe API client.
pub struct StripeClient {
    http_client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Result<Self, GatewayError> {
        Self::with_base_url(secret_key, STRIPE_BASE_URL.to_string())
    }

    /// Construct against an alternate endpoint (stripe-mock, tests).
    pub fn with_base_url(secret_key: String, base_url: String) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self { http_client, secret_key, base_url })
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CreatedSession, GatewayError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("customer_email".to_string(), params.customer_email),
            ("line_items[0][price]".to_string(), params.price_id),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), params.success_url),
            ("cancel_url".to_string(), params.cancel_url),
        ];
        for (key, value) in params.metadata {
            form.push((format!("metadata[{}]", key), value));
        }

        let response = self
            .http_client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &params.idempotency_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !status.is_success() {
            // Surface the provider's own message when it sent one
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("Checkout session creation failed ({})", status));
            return Err(GatewayError::Api(message));
        }

        let session: SessionResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| GatewayError::Malformed("session response missing url".to_string()))?;

        Ok(CreatedSession { url })
    }
}
