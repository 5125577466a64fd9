//! Telegram Bot API notifier for new orders.
//!
//! One message per configured chat id, sent concurrently with a short
//! per-request timeout. A partial failure is still a success if at least one
//! recipient got the message.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::NotifyError;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT_SECS: u64 = 5;

/// The order fields included in the chat message.
#[derive(Debug, Clone)]
pub struct OrderNotification {
    pub name: String,
    pub phone: String,
    pub product: String,
    pub price: String,
    pub city: String,
}

/// Outcome of a fan-out to all configured chats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendSummary {
    pub sent: usize,
    pub failed: usize,
}

impl SendSummary {
    #[must_use]
    pub const fn any_delivered(self) -> bool {
        self.sent > 0
    }
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Bot-API client holding the token and recipient list.
pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_ids: Vec<String>,
    api_base: String,
}

impl TelegramNotifier {
    /// Creates a notifier for the production Bot API.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidEvent`] if `chat_ids` is empty, or
    /// [`NotifyError::Http`] if the HTTP client cannot be constructed.
    pub fn new(token: &str, chat_ids: Vec<String>) -> Result<Self, NotifyError> {
        Self::with_api_base(token, chat_ids, DEFAULT_API_BASE)
    }

    /// Creates a notifier with a custom API base (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TelegramNotifier::new`].
    pub fn with_api_base(
        token: &str,
        chat_ids: Vec<String>,
        api_base: &str,
    ) -> Result<Self, NotifyError> {
        if chat_ids.is_empty() {
            return Err(NotifyError::InvalidEvent(
                "no telegram chat ids configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("codstore/0.1 (order-notify)")
            .build()?;

        Ok(Self {
            client,
            token: token.to_owned(),
            chat_ids,
            api_base: api_base.trim_end_matches('/').to_owned(),
        })
    }

    /// Sends the order message to every configured chat, concurrently.
    ///
    /// Per-chat failures are logged and counted; the call itself only fails
    /// if the summary could not be produced at all (never, in practice).
    pub async fn send_order_notification(&self, order: &OrderNotification) -> SendSummary {
        let text = format_message(order);
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);

        let sends = self.chat_ids.iter().map(|chat_id| {
            let client = &self.client;
            let url = &url;
            let text = &text;
            async move {
                let result = send_one(client, url, chat_id, text).await;
                if let Err(ref e) = result {
                    tracing::warn!(chat_id = %chat_id, error = %e, "telegram send failed");
                }
                result.is_ok()
            }
        });

        let results = futures::future::join_all(sends).await;
        let sent = results.iter().filter(|ok| **ok).count();

        SendSummary {
            sent,
            failed: results.len() - sent,
        }
    }
}

async fn send_one(
    client: &Client,
    url: &str,
    chat_id: &str,
    text: &str,
) -> Result<(), NotifyError> {
    let response = client
        .post(url)
        .json(&json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        }))
        .send()
        .await?;

    let status = response.status();
    let body: TelegramResponse = response.json().await?;

    if !body.ok {
        return Err(NotifyError::Api {
            status: status.as_u16(),
            message: body
                .description
                .unwrap_or_else(|| "telegram rejected the message".to_string()),
        });
    }

    Ok(())
}

fn format_message(order: &OrderNotification) -> String {
    format!(
        "🛒 NOUVELLE COMMANDE\n\n\
         👤 Nom: {}\n\
         📞 Téléphone: {}\n\
         📦 Produit: {}\n\
         💰 Prix: {}\n\
         📍 Ville: {}",
        order.name, order.phone, order.product, order.price, order.city
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_contains_every_order_field() {
        let text = format_message(&OrderNotification {
            name: "Aïcha".to_string(),
            phone: "+237676778377".to_string(),
            product: "Hismile".to_string(),
            price: "14,000 FCFA".to_string(),
            city: "Douala".to_string(),
        });

        assert!(text.contains("Aïcha"));
        assert!(text.contains("+237676778377"));
        assert!(text.contains("Hismile"));
        assert!(text.contains("14,000 FCFA"));
        assert!(text.contains("Douala"));
    }

    #[test]
    fn empty_chat_list_is_rejected_at_construction() {
        let result = TelegramNotifier::new("token", Vec::new());
        assert!(matches!(result, Err(NotifyError::InvalidEvent(_))));
    }
}
