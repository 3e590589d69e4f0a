//! Buffering frame source that replays its input forever
//!
//! A `LoopingLineScanner` first drains the whole reader into memory, then
//! cycles over the buffered lines until its cancellation token fires. It is
//! only useful for input that actually ends; `max_frames` bounds how much it
//! will hold while waiting for that end.

use tokio::io::AsyncRead;

use super::{Emit, Frame, FrameError, FrameSink, Frames, LineReader, ReadLine, channel};
use crate::cancel::CancelToken;

/// Frame limit used when none is configured
pub const DEFAULT_MAX_FRAMES: usize = 4096;

/// Drains a reader, then loops its lines as frames until cancelled.
pub struct LoopingLineScanner<R> {
    reader: R,
    max_frames: usize,
}

impl<R> LoopingLineScanner<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }

    /// Cap the number of buffered lines; 0 disables the check
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Start draining on a new task and return the frame sequence.
    ///
    /// No frame is emitted until the reader hits end of input. A read error,
    /// an exceeded limit, or cancellation during the drain closes the
    /// sequence without emitting anything.
    pub fn spawn(self, cancel: CancelToken) -> Frames {
        let (sink, frames) = channel();
        let max_frames = self.max_frames;
        let reader = self.reader;

        tokio::spawn(async move {
            let err = match drain(reader, max_frames, &cancel).await {
                Ok(buf) => {
                    log::debug!("Looping scanner buffered {} frames", buf.len());
                    replay(&sink, &buf, &cancel).await
                }
                Err(e) => Some(e),
            };
            sink.close(err);
        });

        frames
    }
}

async fn drain<R>(reader: R, max_frames: usize, cancel: &CancelToken) -> Result<Vec<Frame>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = LineReader::new(reader);
    let mut buf = Vec::new();

    loop {
        if let Some(reason) = cancel.reason() {
            return Err(FrameError::Cancelled(reason));
        }
        match lines.next_line(cancel).await {
            ReadLine::Line(line) => {
                if max_frames > 0 && buf.len() >= max_frames {
                    return Err(FrameError::FrameLimitExceeded { max: max_frames });
                }
                buf.push(line);
            }
            ReadLine::Eof => return Ok(buf),
            ReadLine::Failed(e) => return Err(e.into()),
            ReadLine::Cancelled(reason) => return Err(FrameError::Cancelled(reason)),
        }
    }
}

/// Cycle over `buf` until cancelled. Returns the terminal error, if any.
async fn replay(sink: &FrameSink, buf: &[Frame], cancel: &CancelToken) -> Option<FrameError> {
    if buf.is_empty() {
        // nothing to loop over; just wait to be told to stop
        return Some(FrameError::Cancelled(cancel.cancelled().await));
    }

    let mut cycles = 0u64;
    loop {
        for frame in buf {
            match sink.emit(frame.clone(), cancel).await {
                Emit::Sent => {}
                Emit::Cancelled(reason) => {
                    log::debug!("Looping scanner cancelled after {} full cycles", cycles);
                    return Some(FrameError::Cancelled(reason));
                }
                Emit::Closed => return None,
            }
        }
        cycles += 1;
    }
}
