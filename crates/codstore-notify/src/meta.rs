//! Meta Conversions API adapter for Purchase events.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::NotifyError;

const DEFAULT_API_BASE: &str = "https://graph.facebook.com/v18.0";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// A Purchase event for the pixel, built from an order that was just stored.
#[derive(Debug, Clone)]
pub struct PurchaseEvent {
    pub client_ip: String,
    pub user_agent: String,
    /// Order total in minor units; XAF minor units are whole francs.
    pub value_minor: i64,
    pub currency: String,
    pub source_url: String,
    pub order_id: String,
    pub content_name: String,
    pub content_id: String,
}

/// Acknowledgement from the Conversions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseAck {
    pub events_received: i64,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events_received: i64,
    #[serde(default)]
    error: Option<MetaError>,
}

#[derive(Debug, Deserialize)]
struct MetaError {
    #[serde(default)]
    message: String,
}

/// Conversions API client bound to one pixel.
pub struct MetaCapi {
    client: Client,
    pixel_id: String,
    access_token: String,
    test_event_code: Option<String>,
    api_base: String,
}

impl MetaCapi {
    /// Creates a client for the production Graph API.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the HTTP client cannot be constructed.
    pub fn new(
        pixel_id: &str,
        access_token: &str,
        test_event_code: Option<String>,
    ) -> Result<Self, NotifyError> {
        Self::with_api_base(pixel_id, access_token, test_event_code, DEFAULT_API_BASE)
    }

    /// Creates a client with a custom API base (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the HTTP client cannot be constructed.
    pub fn with_api_base(
        pixel_id: &str,
        access_token: &str,
        test_event_code: Option<String>,
        api_base: &str,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("codstore/0.1 (conversions)")
            .build()?;

        Ok(Self {
            client,
            pixel_id: pixel_id.to_owned(),
            access_token: access_token.to_owned(),
            test_event_code,
            api_base: api_base.trim_end_matches('/').to_owned(),
        })
    }

    /// Sends one Purchase event.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::InvalidEvent`] if the value is not positive.
    /// - [`NotifyError::Api`] if the Graph API rejects the event.
    /// - [`NotifyError::Http`] on network failure.
    pub async fn send_purchase(&self, event: &PurchaseEvent) -> Result<PurchaseAck, NotifyError> {
        if event.value_minor <= 0 {
            return Err(NotifyError::InvalidEvent(format!(
                "purchase value must be positive, got {}",
                event.value_minor
            )));
        }

        let mut payload = json!({
            "data": [{
                "event_name": "Purchase",
                "event_time": Utc::now().timestamp(),
                "action_source": "website",
                "event_source_url": event.source_url,
                "user_data": {
                    "client_ip_address": event.client_ip,
                    "client_user_agent": event.user_agent,
                },
                "custom_data": {
                    "currency": event.currency,
                    "value": event.value_minor,
                    "content_type": "product",
                    "content_name": event.content_name,
                    "content_ids": [event.content_id],
                    "content_category": "Beauty & Health",
                    "order_id": event.order_id,
                },
            }],
        });
        if let Some(code) = &self.test_event_code {
            payload["test_event_code"] = json!(code);
        }

        let url = format!("{}/{}/events", self.api_base, self.pixel_id);
        let response = self
            .client
            .post(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body: EventsResponse = response.json().await?;

        if let Some(error) = body.error {
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message: error.message,
            });
        }
        if !status.is_success() {
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message: "conversions api request failed".to_string(),
            });
        }

        Ok(PurchaseAck {
            events_received: body.events_received,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_positive_value_is_rejected_before_sending() {
        let capi = MetaCapi::new("px", "tok", None).expect("client");
        let event = PurchaseEvent {
            client_ip: String::new(),
            user_agent: String::new(),
            value_minor: 0,
            currency: "XAF".to_string(),
            source_url: String::new(),
            order_id: "o-1".to_string(),
            content_name: "Hismile".to_string(),
            content_id: "hismile".to_string(),
        };

        let err = capi.send_purchase(&event).await.expect_err("zero value");
        assert!(matches!(err, NotifyError::InvalidEvent(_)));
    }
}
