//! Terminal preview - draws each frame over the previous one on a single line
//! instead of posting it anywhere.

use std::io::Write;
use std::time::Duration;

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};

use crate::cancel::CancelToken;
use crate::error::{Result, SlacknimateError};
use crate::frames::Frames;
use crate::runner::pacing::Pacer;

/// Renders frames in place on a terminal line.
pub struct Previewer<W: Write> {
    out: W,
    min_delay: Duration,
}

impl<W: Write> Previewer<W> {
    pub fn new(out: W, min_delay: Duration) -> Self {
        Self { out, min_delay }
    }

    /// Draw frames until the sequence closes or the token fires.
    pub async fn run(&mut self, frames: &mut Frames, cancel: &CancelToken) -> Result<()> {
        let mut pacer = Pacer::new(self.min_delay);
        let mut drawn = 0usize;

        loop {
            let frame = tokio::select! {
                biased;
                reason = cancel.cancelled() => return Err(SlacknimateError::Cancelled(reason)),
                frame = frames.next() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            pacer.wait(cancel).await?;
            self.draw(&frame)?;
            drawn += 1;
        }

        if drawn > 0 {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        log::debug!("Preview drew {} frames", drawn);
        Ok(())
    }

    fn draw(&mut self, frame: &str) -> Result<()> {
        queue!(self.out, Clear(ClearType::CurrentLine), MoveToColumn(0), Print(frame))?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
