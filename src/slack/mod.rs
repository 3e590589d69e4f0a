//! Messaging endpoint - the remote surface the animation is drawn on
//!
//! This module provides:
//! - `MessageEndpoint`, the two-call seam the updater drives
//! - `SlackClient`, a Web API implementation of it

pub mod api;
pub mod client;

pub use api::{SLACK_API_URL, SlackClient, SlackConfig, escape_text};
pub use client::{MessageEndpoint, MessageHandle, MessageStyle, SlackError};
