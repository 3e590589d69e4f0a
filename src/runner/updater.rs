//! Updater - posts the first frame, then edits that message with every frame
//! after it.
//!
//! A failed initial post ends the run, since there is nothing to animate.
//! Failed edits are reported through the update callback and the run goes
//! on with the same message; endpoints are expected to fail transiently.

use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{Result, SlacknimateError};
use crate::frames::{Frame, Frames};
use crate::runner::pacing::Pacer;
use crate::slack::{MessageEndpoint, MessageHandle, MessageStyle, SlackError};

/// Result of one edit of the animated message.
#[derive(Debug)]
pub struct Update {
    /// Channel ID the message lives in
    pub dst: String,
    /// Message timestamp in Slack API format
    pub ts: String,
    /// Text sent as the message payload
    pub frame: Frame,
    pub err: Option<SlackError>,
}

impl Update {
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

/// Callback run synchronously after every edit attempt.
pub type UpdateFn = Box<dyn FnMut(Update) + Send>;

/// Optional configuration for the Updater.
#[derive(Default)]
pub struct UpdaterOptions {
    /// Minimum delay between frames; zero delivers as fast as frames arrive
    pub min_delay: Duration,
    pub style: MessageStyle,
    pub on_update: Option<UpdateFn>,
}

impl UpdaterOptions {
    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    pub fn with_style(mut self, style: MessageStyle) -> Self {
        self.style = style;
        self
    }

    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(Update) + Send + 'static,
    {
        self.on_update = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for UpdaterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdaterOptions")
            .field("min_delay", &self.min_delay)
            .field("style", &self.style)
            .field("on_update", &self.on_update.is_some())
            .finish()
    }
}

/// Where a run is in the post-then-edit protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    /// Nothing posted yet; the next frame creates the message
    NoMessage,
    /// Every further frame edits this message
    Tracking(MessageHandle),
}

/// Drives one animated message on a `MessageEndpoint`.
pub struct Updater<E>
where
    E: MessageEndpoint,
{
    endpoint: Arc<E>,
    options: UpdaterOptions,
}

impl<E> Updater<E>
where
    E: MessageEndpoint,
{
    pub fn new(endpoint: Arc<E>) -> Self {
        Self::with_options(endpoint, UpdaterOptions::default())
    }

    pub fn with_options(endpoint: Arc<E>, options: UpdaterOptions) -> Self {
        Self { endpoint, options }
    }

    /// Consume `frames` until the sequence closes, animating one message at
    /// `destination`.
    ///
    /// Each iteration:
    /// 1. Stops if the token has fired
    /// 2. Waits out the minimum delay (interruptible)
    /// 3. Posts the frame, or edits the posted message with it
    /// 4. Reports edits to the update callback
    ///
    /// Returns `Ok(())` when the sequence closes. It does not look at the
    /// sequence's own terminal error; check `frames.err()` for that.
    pub async fn run(&mut self, destination: &str, frames: &mut Frames, cancel: &CancelToken) -> Result<()> {
        let mut state = DeliveryState::NoMessage;
        let mut pacer = Pacer::new(self.options.min_delay);
        let mut delivered = 0u64;
        let mut failed = 0u64;

        loop {
            // 1. Next frame, unless we've been told to stop
            let frame = tokio::select! {
                biased;
                reason = cancel.cancelled() => return Err(SlacknimateError::Cancelled(reason)),
                frame = frames.next() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            // 2. Minimum delay since the previous delivery started
            pacer.wait(cancel).await?;

            // 3 + 4. Post or edit, then report
            let (next, ok) = self.deliver(state, destination, frame, cancel).await?;
            state = next;
            delivered += 1;
            if !ok {
                failed += 1;
            }
        }

        log::info!(
            "Animation finished: {} frames delivered, {} update errors",
            delivered,
            failed
        );
        Ok(())
    }

    /// Advance the state machine by one frame.
    ///
    /// Returns the next state and whether the delivery succeeded.
    async fn deliver(
        &mut self,
        state: DeliveryState,
        destination: &str,
        frame: Frame,
        cancel: &CancelToken,
    ) -> Result<(DeliveryState, bool)> {
        let style = &self.options.style;
        match state {
            DeliveryState::NoMessage => {
                let posted = tokio::select! {
                    biased;
                    reason = cancel.cancelled() => return Err(SlacknimateError::Cancelled(reason)),
                    posted = self.endpoint.create_message(destination, &frame, style) => posted,
                };
                let handle = posted.map_err(SlacknimateError::InitialPost)?;
                tracing::info!(channel = %handle.channel, ts = %handle.ts, frame = %frame, "Posted initial frame");
                Ok((DeliveryState::Tracking(handle), true))
            }
            DeliveryState::Tracking(handle) => {
                let edited = tokio::select! {
                    biased;
                    reason = cancel.cancelled() => return Err(SlacknimateError::Cancelled(reason)),
                    edited = self.endpoint.edit_message(&handle, &frame, style) => edited,
                };
                let ok = edited.is_ok();
                match &edited {
                    Ok(()) => tracing::debug!(channel = %handle.channel, ts = %handle.ts, frame = %frame, "Updated frame"),
                    Err(e) => tracing::warn!(
                        channel = %handle.channel,
                        ts = %handle.ts,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Frame update failed"
                    ),
                }
                if let Some(on_update) = self.options.on_update.as_mut() {
                    on_update(Update {
                        dst: handle.channel.clone(),
                        ts: handle.ts.clone(),
                        frame,
                        err: edited.err(),
                    });
                }
                Ok((DeliveryState::Tracking(handle), ok))
            }
        }
    }
}
