//! Animation pipeline integration tests
//!
//! Drives frame sources into the updater with a recording endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use slacknimate::frames::{FrameError, LineScanner, LoopingLineScanner};
use slacknimate::runner::{Update, Updater, UpdaterOptions};
use slacknimate::slack::{MessageEndpoint, MessageHandle, MessageStyle, SlackError};
use slacknimate::{CancelReason, CancelToken, SlacknimateError};

/// Keeps the text of every call; the first entry is the post.
#[derive(Default)]
struct RecordingEndpoint {
    posts: Mutex<Vec<(String, String, MessageStyle)>>,
    edits: Mutex<Vec<(MessageHandle, String)>>,
}

#[async_trait]
impl MessageEndpoint for RecordingEndpoint {
    async fn create_message(&self, destination: &str, text: &str, style: &MessageStyle) -> Result<MessageHandle, SlackError> {
        self.posts
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string(), style.clone()));
        Ok(MessageHandle::new("C024BE91L", "1401383885.000061"))
    }

    async fn edit_message(&self, handle: &MessageHandle, text: &str, _style: &MessageStyle) -> Result<(), SlackError> {
        self.edits.lock().unwrap().push((handle.clone(), text.to_string()));
        Ok(())
    }
}

fn counting_options() -> (UpdaterOptions, Arc<Mutex<Vec<Update>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (UpdaterOptions::default().on_update(move |u| sink.lock().unwrap().push(u)), seen)
}

#[tokio::test]
async fn test_streaming_input_animates_one_message() {
    const NUM_FRAMES: usize = 10;
    let input: String = (0..NUM_FRAMES).map(|i| format!("frame {}\n", i)).collect();

    let endpoint = Arc::new(RecordingEndpoint::default());
    let (options, seen) = counting_options();
    let style = MessageStyle::default().with_username("Animation Funtime").with_icon_emoji(":cat:");
    let mut updater = Updater::with_options(Arc::clone(&endpoint), options.with_style(style.clone()));

    let cancel = CancelToken::new();
    let mut frames = LineScanner::new(std::io::Cursor::new(input.into_bytes())).spawn(cancel.clone());
    updater.run("#testing", &mut frames, &cancel).await.unwrap();

    assert!(frames.err().is_none());

    let posts = endpoint.posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0], ("#testing".to_string(), "frame 0".to_string(), style));

    let edits = endpoint.edits.lock().unwrap();
    assert_eq!(edits.len(), NUM_FRAMES - 1);
    for (i, (handle, text)) in edits.iter().enumerate() {
        assert_eq!(handle.channel, "C024BE91L");
        assert_eq!(handle.ts, "1401383885.000061");
        assert_eq!(text, &format!("frame {}", i + 1));
    }

    assert_eq!(seen.lock().unwrap().len(), NUM_FRAMES - 1);
}

#[tokio::test(start_paused = true)]
async fn test_looping_input_runs_until_deadline() {
    let endpoint = Arc::new(RecordingEndpoint::default());
    let options = UpdaterOptions::default().with_min_delay(Duration::from_millis(100));
    let mut updater = Updater::with_options(Arc::clone(&endpoint), options);

    let cancel = CancelToken::with_deadline(Duration::from_millis(1050));
    let input: &'static [u8] = b"|\n/\n-\n\\\n";
    let mut frames = LoopingLineScanner::new(input).spawn(cancel.clone());

    let err = updater.run("#spinner", &mut frames, &cancel).await.unwrap_err();
    assert_eq!(err.cancel_reason(), Some(CancelReason::DeadlineExceeded));

    // one post plus ~10 edits, cycling through the spinner
    let edits = endpoint.edits.lock().unwrap();
    assert!(edits.len() >= 8, "only {} edits", edits.len());
    let cycle = ["|", "/", "-", "\\"];
    for (i, (_, text)) in edits.iter().enumerate() {
        assert_eq!(text, cycle[(i + 1) % cycle.len()]);
    }
}

#[tokio::test]
async fn test_frame_limit_never_posts() {
    let endpoint = Arc::new(RecordingEndpoint::default());
    let mut updater = Updater::new(Arc::clone(&endpoint));

    let cancel = CancelToken::new();
    let input: &'static [u8] = b"1\n2\n3\n4\n5\n";
    let mut frames = LoopingLineScanner::new(input).with_max_frames(3).spawn(cancel.clone());

    // the updater just sees an empty sequence...
    updater.run("#chan", &mut frames, &cancel).await.unwrap();
    assert!(endpoint.posts.lock().unwrap().is_empty());

    // ...and the reason is on the sequence itself
    let err = frames.err().expect("frame source should report the limit");
    assert!(matches!(err, FrameError::FrameLimitExceeded { max: 3 }));
    let err: SlacknimateError = err.into();
    assert!(!err.is_cancelled());
}

#[tokio::test]
async fn test_interrupt_mid_animation() {
    let endpoint = Arc::new(RecordingEndpoint::default());
    let (options, seen) = counting_options();
    let mut updater = Updater::with_options(Arc::clone(&endpoint), options.with_min_delay(Duration::from_millis(20)));

    let cancel = CancelToken::new();
    let input: &'static [u8] = b"a\nb\nc\n";
    let mut frames = LoopingLineScanner::new(input).spawn(cancel.clone());

    let interrupter = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(90)).await;
        interrupter.cancel();
    });

    let err = updater.run("#chan", &mut frames, &cancel).await.unwrap_err();
    assert!(matches!(err, SlacknimateError::Cancelled(CancelReason::Cancelled)));
    assert_eq!(endpoint.posts.lock().unwrap().len(), 1);
    assert_eq!(seen.lock().unwrap().len(), endpoint.edits.lock().unwrap().len());
}
