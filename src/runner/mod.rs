//! Frame consumers - deliver a frame sequence somewhere, one frame at a time.
//!
//! `Updater` animates a single remote message; `Previewer` draws the same
//! animation on the local terminal. Both share the `Pacer` for spacing.

pub mod pacing;
pub mod preview;
pub mod updater;

pub use pacing::Pacer;
pub use preview::Previewer;
pub use updater::{DeliveryState, Update, UpdateFn, Updater, UpdaterOptions};
