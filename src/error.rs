//! Error types for slacknimate
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::cancel::CancelReason;
use crate::frames::FrameError;
use crate::slack::SlackError;

/// Errors that end an animation run
#[derive(Debug, Error)]
pub enum SlacknimateError {
    /// The cancellation signal fired before the run finished
    #[error("Cancelled: {0}")]
    Cancelled(CancelReason),

    /// The first frame could not be posted, so there is no message to animate
    #[error("FATAL: could not post initial frame: {0}")]
    InitialPost(#[source] SlackError),

    /// The frame source stopped with an error
    #[error("Frame source error: {0}")]
    Frames(#[from] FrameError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlacknimateError {
    /// True when the run was stopped by the cancellation signal
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SlacknimateError::Cancelled(_) | SlacknimateError::Frames(FrameError::Cancelled(_))
        )
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            SlacknimateError::Cancelled(reason) => Some(*reason),
            SlacknimateError::Frames(FrameError::Cancelled(reason)) => Some(*reason),
            _ => None,
        }
    }
}

/// Result type alias for slacknimate operations
pub type Result<T> = std::result::Result<T, SlacknimateError>;
