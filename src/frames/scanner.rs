//! Forward-only frame source

use tokio::io::AsyncRead;

use super::{Emit, FrameError, Frames, LineReader, ReadLine, channel};
use crate::cancel::CancelToken;

/// Scans a reader line by line, emitting each line once as a frame.
///
/// The sequence closes at end of input, on a read error, or when the
/// cancellation token fires. Nothing beyond the frame in flight is buffered.
pub struct LineScanner<R> {
    reader: R,
}

impl<R> LineScanner<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Start scanning on a new task and return the frame sequence.
    pub fn spawn(self, cancel: CancelToken) -> Frames {
        let (sink, frames) = channel();
        let mut lines = LineReader::new(self.reader);

        tokio::spawn(async move {
            let mut count = 0usize;
            let err = loop {
                let line = match lines.next_line(&cancel).await {
                    ReadLine::Line(line) => line,
                    ReadLine::Eof => break None,
                    ReadLine::Failed(e) => break Some(FrameError::from(e)),
                    ReadLine::Cancelled(reason) => break Some(FrameError::Cancelled(reason)),
                };
                match sink.emit(line, &cancel).await {
                    Emit::Sent => count += 1,
                    Emit::Cancelled(reason) => break Some(FrameError::Cancelled(reason)),
                    Emit::Closed => break None,
                }
            };
            log::debug!("Line scanner emitted {} frames", count);
            sink.close(err);
        });

        frames
    }
}
