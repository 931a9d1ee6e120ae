use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Result, TalonError};

const API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(45);

/// Delivers a human-readable message to a bound recipient.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, recipient: i64, message: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Minimal Bot API client: outbound messages and long-polled updates.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(CLIENT_TIMEOUT).build()?;
        Ok(Self { http, token: token.into() })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let response: ApiResponse<T> = self
            .http
            .post(self.url(method))
            .timeout(timeout)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TalonError::TelegramApi {
                method: method.to_string(),
                description: response.description.unwrap_or_else(|| "no description".into()),
            }),
        }
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let payload = serde_json::json!({ "chat_id": chat_id, "text": text });
        self.call::<serde_json::Value>("sendMessage", payload, SEND_TIMEOUT).await?;
        Ok(())
    }

    /// Long-polls for updates after `offset`, waiting up to `wait` for one to arrive.
    pub async fn get_updates(&self, offset: i64, wait: Duration) -> Result<Vec<Update>> {
        let payload = serde_json::json!({
            "offset": offset,
            "timeout": wait.as_secs(),
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", payload, wait + SEND_TIMEOUT).await
    }
}

#[async_trait]
impl AlertSink for TelegramClient {
    async fn deliver(&self, recipient: i64, message: &str) -> Result<()> {
        self.send_message(recipient, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_update_batch() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 99, "type": "private"}, "text": "/start 123456"}},
                {"update_id": 11, "edited_message": {"chat": {"id": 99}}}
            ]
        }"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let updates = response.result.unwrap();
        assert_eq!(updates.len(), 2);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 99);
        assert_eq!(message.text.as_deref(), Some("/start 123456"));
        assert!(updates[1].message.is_none());
    }

    #[test]
    fn parses_api_rejection() {
        let body = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let response: ApiResponse<serde_json::Value> = serde_json::from_str(body).unwrap();
        assert!(!response.ok);
        assert_eq!(response.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn url_embeds_token() {
        let client = TelegramClient::new("123:abc").unwrap();
        assert_eq!(client.url("getMe"), "https://api.telegram.org/bot123:abc/getMe");
    }
}
