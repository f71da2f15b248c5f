//! Stripe API client for payment intents and refunds.
//!
//! Talks to the Stripe REST API directly with form-encoded requests and
//! verifies webhook signatures (`Stripe-Signature: t=...,v1=...`), so no SDK
//! dependency is needed.

use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use colibri_core::Money;

use crate::config::StripeConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Maximum age of a webhook timestamp before it is rejected (replay window).
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Webhook signature verification failed.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Failed to parse a response or event payload.
    #[error("parse error: {0}")]
    Parse(String),
}

/// A created or updated payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Stripe payment intent ID (`pi_...`).
    pub id: String,
    /// Client secret handed to the frontend to confirm the payment.
    pub client_secret: Option<String>,
    /// Intent status (`requires_payment_method`, `succeeded`, ...).
    pub status: String,
}

/// A created refund.
#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    /// Stripe refund ID (`re_...`).
    pub id: String,
    /// Refund status (`pending`, `succeeded`, ...).
    pub status: String,
}

/// A verified webhook event, reduced to what order handling needs.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event type, e.g. `payment_intent.succeeded`.
    pub event_type: String,
    /// The payment intent the event refers to.
    pub payment_intent_id: Option<String>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: RawEventObject,
}

#[derive(Deserialize)]
struct RawEventObject {
    id: Option<String>,
    payment_intent: Option<String>,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    webhook_secret: secrecy::SecretString,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| StripeError::Parse(format!("invalid secret key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    /// Create a payment intent for an order.
    ///
    /// Stripe takes amounts in minor units (centavos for MXN).
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_payment_intent(
        &self,
        amount: &Money,
        order_number: &str,
    ) -> Result<PaymentIntent, StripeError> {
        let amount_minor = amount.as_minor_units().to_string();
        let currency = amount.currency.code().to_lowercase();
        let params = [
            ("amount", amount_minor.as_str()),
            ("currency", currency.as_str()),
            ("metadata[order_number]", order_number),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        let response = self
            .client
            .post(format!("{BASE_URL}/payment_intents"))
            .form(&params)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Refund a payment intent, fully or partially.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount: &Money,
    ) -> Result<Refund, StripeError> {
        let amount_minor = amount.as_minor_units().to_string();
        let params = [
            ("payment_intent", payment_intent_id),
            ("amount", amount_minor.as_str()),
        ];

        let response = self
            .client
            .post(format!("{BASE_URL}/refunds"))
            .form(&params)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Verify a webhook signature and parse the event.
    ///
    /// Stripe signs `{timestamp}.{body}` with the endpoint's webhook secret
    /// and sends `Stripe-Signature: t=<timestamp>,v1=<hex hmac>[,v1=...]`.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidSignature` if the header is malformed,
    /// the timestamp is outside the replay window, or no `v1` signature
    /// matches.
    pub fn verify_webhook(
        &self,
        signature_header: &str,
        body: &str,
        now_unix: i64,
    ) -> Result<WebhookEvent, StripeError> {
        let mut timestamp: Option<i64> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = value.parse().ok();
                }
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| StripeError::InvalidSignature("missing timestamp".to_owned()))?;
        if signatures.is_empty() {
            return Err(StripeError::InvalidSignature(
                "missing v1 signature".to_owned(),
            ));
        }

        if (now_unix - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
            return Err(StripeError::InvalidSignature(
                "timestamp outside tolerance".to_owned(),
            ));
        }

        let signed_payload = format!("{timestamp}.{body}");
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.expose_secret().as_bytes())
            .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if !signatures
            .iter()
            .any(|sig| constant_time_compare(&expected, sig))
        {
            return Err(StripeError::InvalidSignature(
                "signature mismatch".to_owned(),
            ));
        }

        let raw: RawEvent =
            serde_json::from_str(body).map_err(|e| StripeError::Parse(e.to_string()))?;

        // payment_intent.* events carry the intent as the object itself;
        // charge.* events reference it through `payment_intent`.
        let payment_intent_id = if raw.event_type.starts_with("payment_intent.") {
            raw.data.object.id
        } else {
            raw.data.object.payment_intent
        };

        Ok(WebhookEvent {
            event_type: raw.event_type,
            payment_intent_id,
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StripeError::Parse(e.to_string()))
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn client() -> StripeClient {
        StripeClient {
            client: reqwest::Client::new(),
            webhook_secret: secrecy::SecretString::from(SECRET),
        }
    }

    fn sign(timestamp: i64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).expect("valid key length");
        mac.update(format!("{timestamp}.{body}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_verifies() {
        let body = r#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_123"}}}"#;
        let now = 1_750_000_000;
        let header = format!("t={now},v1={}", sign(now, body));

        let event = client().verify_webhook(&header, body, now).expect("valid");
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn test_charge_event_uses_payment_intent_field() {
        let body = r#"{"type":"charge.refunded","data":{"object":{"id":"ch_1","payment_intent":"pi_456"}}}"#;
        let now = 1_750_000_000;
        let header = format!("t={now},v1={}", sign(now, body));

        let event = client().verify_webhook(&header, body, now).expect("valid");
        assert_eq!(event.event_type, "charge.refunded");
        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_456"));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let body = r#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_123"}}}"#;
        let now = 1_750_000_000;
        let header = format!("t={now},v1={}", sign(now, body));

        let tampered = body.replace("pi_123", "pi_999");
        let result = client().verify_webhook(&header, &tampered, now);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_old_timestamp_rejected() {
        let body = r#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_123"}}}"#;
        let then = 1_750_000_000;
        let header = format!("t={then},v1={}", sign(then, body));

        let result = client().verify_webhook(&header, body, then + 600);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let result = client().verify_webhook("not-a-header", "{}", 0);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_second_v1_signature_accepted() {
        let body = r#"{"type":"payment_intent.payment_failed","data":{"object":{"id":"pi_1"}}}"#;
        let now = 1_750_000_000;
        let header = format!("t={now},v1=deadbeef,v1={}", sign(now, body));

        assert!(client().verify_webhook(&header, body, now).is_ok());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
