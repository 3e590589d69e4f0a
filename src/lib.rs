//! slacknimate - text animation for Slack messages
//!
//! Reads lines of text, posts the first one as a Slack message, and then
//! edits that message with each following line, so the message appears to
//! animate in place.

pub mod cancel;
pub mod error;
pub mod frames;
pub mod runner;
pub mod slack;

pub use cancel::{CancelReason, CancelToken};
pub use error::{Result, SlacknimateError};
