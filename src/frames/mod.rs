//! Frame sources - turn a line-oriented byte stream into animation frames
//!
//! This module provides:
//! - `Frames`, the consumer half of a frame sequence
//! - `LineScanner`, which forwards each input line once
//! - `LoopingLineScanner`, which buffers all input and replays it forever
//!
//! Each source runs as its own tokio task and hands frames over a channel
//! that holds at most one frame, so a slow consumer throttles the reader.

pub mod looping;
pub mod scanner;

pub use looping::{DEFAULT_MAX_FRAMES, LoopingLineScanner};
pub use scanner::LineScanner;

use std::io;
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::cancel::{CancelReason, CancelToken};

/// One unit of animation: a single line of text.
pub type Frame = String;

/// Frames in flight between a source task and its consumer.
const FRAME_BUFFER: usize = 1;

/// Why a frame source stopped early.
#[derive(Debug, Clone, Error)]
pub enum FrameError {
    /// The underlying reader failed
    #[error("read error: {0}")]
    Read(Arc<io::Error>),

    /// A looping source saw more lines than it is allowed to buffer
    #[error("maximum number of frames exceeded (limit {max})")]
    FrameLimitExceeded { max: usize },

    /// The cancellation signal fired before the input ran out
    #[error("{0}")]
    Cancelled(CancelReason),
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        FrameError::Read(Arc::new(err))
    }
}

/// Consumer half of a frame sequence.
///
/// `next()` returns `None` once the source has closed; `err()` then tells
/// why. A closed sequence never yields again.
#[derive(Debug)]
pub struct Frames {
    rx: mpsc::Receiver<Frame>,
    status: Arc<OnceLock<FrameError>>,
}

impl Frames {
    /// Wrap a channel fed by the caller. Its terminal error is always `None`.
    pub fn from_receiver(rx: mpsc::Receiver<Frame>) -> Self {
        Self {
            rx,
            status: Arc::new(OnceLock::new()),
        }
    }

    /// Receive the next frame, or `None` once the source has closed.
    pub async fn next(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Terminal error of the source.
    ///
    /// `None` on a clean end of input. Only final after `next()` has
    /// returned `None`.
    pub fn err(&self) -> Option<FrameError> {
        self.status.get().cloned()
    }
}

/// Producer half, owned by a source task.
pub(crate) struct FrameSink {
    tx: mpsc::Sender<Frame>,
    status: Arc<OnceLock<FrameError>>,
}

/// Result of offering a frame to the consumer.
pub(crate) enum Emit {
    Sent,
    Cancelled(CancelReason),
    /// The consumer dropped its `Frames`
    Closed,
}

/// Result of waiting for the next input line.
pub(crate) enum ReadLine {
    Line(String),
    Eof,
    Failed(io::Error),
    Cancelled(CancelReason),
}

pub(crate) fn channel() -> (FrameSink, Frames) {
    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    let status = Arc::new(OnceLock::new());
    let sink = FrameSink {
        tx,
        status: Arc::clone(&status),
    };
    (sink, Frames { rx, status })
}

impl FrameSink {
    /// Hand a frame to the consumer, giving up if the token fires first.
    pub(crate) async fn emit(&self, frame: Frame, cancel: &CancelToken) -> Emit {
        tokio::select! {
            biased;
            reason = cancel.cancelled() => Emit::Cancelled(reason),
            sent = self.tx.send(frame) => match sent {
                Ok(()) => Emit::Sent,
                Err(_) => Emit::Closed,
            },
        }
    }

    /// Record the terminal error and close the sequence.
    ///
    /// The status is written before the sender drops, so a consumer that
    /// has seen the close always sees the error too.
    pub(crate) fn close(self, err: Option<FrameError>) {
        if let Some(err) = err {
            log::debug!("Frame source closed: {}", err);
            let _ = self.status.set(err);
        } else {
            log::debug!("Frame source closed at end of input");
        }
        drop(self.tx);
    }
}

/// Splits a reader into lines.
///
/// Lines end at `\n`, with a trailing `\r` stripped; an unterminated last
/// line still counts. Bytes that are not valid UTF-8 are replaced rather than
/// treated as a read error.
pub(crate) struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Read one line, racing the read against the cancellation signal.
    pub(crate) async fn next_line(&mut self, cancel: &CancelToken) -> ReadLine {
        self.buf.clear();
        let read = tokio::select! {
            biased;
            reason = cancel.cancelled() => return ReadLine::Cancelled(reason),
            read = self.reader.read_until(b'\n', &mut self.buf) => read,
        };
        match read {
            Ok(0) => ReadLine::Eof,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                ReadLine::Line(String::from_utf8_lossy(&self.buf).into_owned())
            }
            Err(e) => ReadLine::Failed(e),
        }
    }
}
