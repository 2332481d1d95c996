//! Telegram Bot API notifier (`sendMessage`)

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::error::{RelayError, RelayResult};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> RelayResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            RelayError::NotificationDelivery(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> RelayResult<()> {
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
        };

        // reqwest errors embed the URL, which carries the token
        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::NotificationDelivery(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RelayError::NotificationDelivery(format!(
                "HTTP {status}: {detail}"
            )));
        }
        Ok(())
    }
}
