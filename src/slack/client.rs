//! Messaging endpoint trait and the types that cross it

use async_trait::async_trait;

/// Where the animated message lives: channel ID plus message timestamp.
///
/// Returned by the first successful post and reused for every edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle {
    pub channel: String,
    pub ts: String,
}

impl MessageHandle {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }
}

/// Optional overrides for how the sender is displayed.
///
/// All fields empty means "use the endpoint defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStyle {
    /// Override the bot username
    pub username: Option<String>,
    /// Override the bot icon with an emoji code, e.g. `:cat:`
    pub icon_emoji: Option<String>,
    /// Override the bot icon with an image URL
    pub icon_url: Option<String>,
}

impl MessageStyle {
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = non_empty(username.into());
        self
    }

    pub fn with_icon_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.icon_emoji = non_empty(emoji.into());
        self
    }

    pub fn with_icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = non_empty(url.into());
        self
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// A remote surface that can post a message and then edit it in place.
///
/// Calls are individually atomic; implementations do not retry.
#[async_trait]
pub trait MessageEndpoint: Send + Sync {
    /// Post a new message, returning the handle used for later edits
    async fn create_message(
        &self,
        destination: &str,
        text: &str,
        style: &MessageStyle,
    ) -> Result<MessageHandle, SlackError>;

    /// Replace the text of an existing message
    async fn edit_message(&self, handle: &MessageHandle, text: &str, style: &MessageStyle) -> Result<(), SlackError>;
}

/// Errors that can occur talking to the messaging endpoint
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("Slack API error from {method}: {error}")]
    Api { method: String, error: String },

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API token")]
    MissingToken,
}

impl SlackError {
    /// Whether the same call might succeed later.
    ///
    /// Informational only; nothing in this crate retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            SlackError::RateLimited { .. } => true,
            SlackError::Http { status, .. } => *status >= 500,
            SlackError::Network(_) => true,
            SlackError::Api { error, .. } => matches!(error.as_str(), "ratelimited" | "internal_error" | "fatal_error"),
            SlackError::InvalidResponse(_) => false,
            SlackError::MissingToken => false,
        }
    }
}
