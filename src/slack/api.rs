//! Slack Web API client
//!
//! Implements `MessageEndpoint` on top of `chat.postMessage` and
//! `chat.update`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::slack::client::{MessageEndpoint, MessageHandle, MessageStyle, SlackError};

/// Slack Web API base URL
pub const SLACK_API_URL: &str = "https://slack.com/api/";

const POST_MESSAGE: &str = "chat.postMessage";
const UPDATE_MESSAGE: &str = "chat.update";

/// Configuration for the Slack client
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Base URL the method names are appended to
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_url: SLACK_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl SlackConfig {
    /// Point the client at a different API root (e.g. a test server)
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        let mut api_url = api_url.into();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        Self {
            api_url,
            ..Default::default()
        }
    }
}

/// Slack API client
pub struct SlackClient {
    client: Client,
    token: String,
    config: SlackConfig,
}

/// Fields of a `chat.*` response that we care about
#[derive(Debug, Deserialize)]
struct ChatResponse {
    ok: bool,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl SlackClient {
    /// Create a client authenticated with a bot or user token
    pub fn new(token: impl Into<String>, config: SlackConfig) -> Result<Self, SlackError> {
        let token = token.into();
        if token.is_empty() {
            return Err(SlackError::MissingToken);
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, token, config })
    }

    /// Create a client on top of a preconfigured `reqwest::Client`.
    ///
    /// `config.timeout` is ignored; the given client's settings apply.
    pub fn with_http_client(token: impl Into<String>, config: SlackConfig, client: Client) -> Result<Self, SlackError> {
        let token = token.into();
        if token.is_empty() {
            return Err(SlackError::MissingToken);
        }
        Ok(Self { client, token, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}{}", self.config.api_url, method)
    }

    fn build_post_body(&self, channel: &str, text: &str, style: &MessageStyle) -> Value {
        let mut body = json!({
            "channel": channel,
            "text": escape_text(text),
        });
        apply_style(&mut body, style);
        body
    }

    fn build_update_body(&self, handle: &MessageHandle, text: &str, style: &MessageStyle) -> Value {
        let mut body = json!({
            "channel": handle.channel,
            "ts": handle.ts,
            "text": escape_text(text),
        });
        apply_style(&mut body, style);
        body
    }

    /// Call a `chat.*` method and check the `ok` flag
    async fn call(&self, method: &str, body: Value) -> Result<ChatResponse, SlackError> {
        let response = self
            .client
            .post(self.method_url(method))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(SlackError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SlackError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        parse_chat_response(method, &text)
    }
}

fn apply_style(body: &mut Value, style: &MessageStyle) {
    if let Some(username) = &style.username {
        body["username"] = json!(username);
    }
    if let Some(emoji) = &style.icon_emoji {
        body["icon_emoji"] = json!(emoji);
    }
    if let Some(url) = &style.icon_url {
        body["icon_url"] = json!(url);
    }
}

fn parse_chat_response(method: &str, text: &str) -> Result<ChatResponse, SlackError> {
    let parsed: ChatResponse = serde_json::from_str(text)
        .map_err(|e| SlackError::InvalidResponse(format!("{} returned unparseable body: {}", method, e)))?;

    if !parsed.ok {
        return Err(SlackError::Api {
            method: method.to_string(),
            error: parsed.error.unwrap_or_else(|| "unknown_error".to_string()),
        });
    }
    Ok(parsed)
}

/// Escape the three characters Slack treats as control sequences.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

#[async_trait]
impl MessageEndpoint for SlackClient {
    async fn create_message(
        &self,
        destination: &str,
        text: &str,
        style: &MessageStyle,
    ) -> Result<MessageHandle, SlackError> {
        let body = self.build_post_body(destination, text, style);
        let response = self.call(POST_MESSAGE, body).await?;

        match (response.channel, response.ts) {
            (Some(channel), Some(ts)) if !channel.is_empty() && !ts.is_empty() => Ok(MessageHandle { channel, ts }),
            _ => Err(SlackError::InvalidResponse(format!(
                "{} response is missing channel or ts",
                POST_MESSAGE
            ))),
        }
    }

    async fn edit_message(&self, handle: &MessageHandle, text: &str, style: &MessageStyle) -> Result<(), SlackError> {
        let body = self.build_update_body(handle, text, style);
        self.call(UPDATE_MESSAGE, body).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("api_url", &self.config.api_url)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}
