//! Minimum spacing between frame deliveries

use std::time::Duration;

use tokio::time::Instant;

use crate::cancel::CancelToken;
use crate::error::{Result, SlacknimateError};

/// Enforces a minimum delay between the starts of successive deliveries.
///
/// The first call to `wait` returns immediately.
#[derive(Debug)]
pub struct Pacer {
    min_delay: Duration,
    last_start: Option<Instant>,
}

impl Pacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_start: None,
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait until `min_delay` has passed since the previous start, then mark
    /// a new start. Fails with the cancel reason if the token fires first.
    pub async fn wait(&mut self, cancel: &CancelToken) -> Result<()> {
        if let Some(last) = self.last_start
            && !self.min_delay.is_zero()
        {
            tokio::select! {
                biased;
                reason = cancel.cancelled() => return Err(SlacknimateError::Cancelled(reason)),
                _ = tokio::time::sleep_until(last + self.min_delay) => {}
            }
        }
        self.last_start = Some(Instant::now());
        Ok(())
    }
}
