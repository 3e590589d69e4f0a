//! CLI argument definitions using clap.
//!
//! Flags override the config file; Slack settings also fall back to the
//! SLACK_* environment variables.

use clap::Parser;
use eyre::{Result, bail};
use std::path::PathBuf;
use std::time::Duration;

use slacknimate::slack::MessageStyle;

use crate::config::Config;

/// Smallest allowed delay between frames, in seconds
const MIN_DELAY_SECS: f64 = 0.001;

/// slacknimate - text animation for Slack messages
#[derive(Parser, Debug)]
#[command(name = "slacknimate")]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "slacknimate [options] < frames.txt")]
pub struct Cli {
    /// Slack API token*
    #[arg(short = 'a', long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Slack channel*
    #[arg(short, long, env = "SLACK_CHANNEL")]
    pub channel: Option<String>,

    /// Slack username
    #[arg(long, env = "SLACK_USERNAME")]
    pub username: Option<String>,

    /// Slack icon from url
    #[arg(long, env = "SLACK_ICON_URL")]
    pub icon_url: Option<String>,

    /// Slack icon from emoji
    #[arg(long, env = "SLACK_ICON_EMOJI")]
    pub icon_emoji: Option<String>,

    /// Minimum delay between frames, in seconds [default: 1]
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Loop content upon reaching EOF
    #[arg(short, long = "loop")]
    pub looping: bool,

    /// Most lines to buffer when looping (0 = unlimited)
    #[arg(long)]
    pub max_frames: Option<usize>,

    /// Preview on terminal only
    #[arg(long)]
    pub preview: bool,

    /// Stop after this many seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Optional config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Where the frames go
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Preview,
    Slack {
        token: String,
        channel: String,
        style: MessageStyle,
        api_url: String,
        timeout: Duration,
    },
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub target: Target,
    pub delay: Duration,
    pub looping: bool,
    pub max_frames: usize,
    pub timeout: Option<Duration>,
}

impl RunOptions {
    /// Merge flags over config and validate the result
    pub fn resolve(cli: &Cli, config: &Config) -> Result<Self> {
        let delay_secs = cli.delay.unwrap_or(config.animation.delay_secs);
        let max_frames = cli.max_frames.unwrap_or(config.animation.max_frames);

        let timeout = match cli.timeout {
            Some(secs) if !(secs > 0.0) => bail!("timeout must be a positive number of seconds"),
            Some(secs) => match Duration::try_from_secs_f64(secs) {
                Ok(timeout) => Some(timeout),
                Err(_) => bail!("timeout of {} seconds is out of range", secs),
            },
            None => None,
        };

        let target = if cli.preview {
            Target::Preview
        } else {
            let token = pick(&cli.token, &config.slack.token);
            let channel = pick(&cli.channel, &config.slack.channel);
            let Some(token) = token else {
                bail!("token is required");
            };
            let Some(channel) = channel else {
                bail!("channel is required");
            };
            if !(delay_secs >= MIN_DELAY_SECS) {
                bail!("delay must be >= {} to avoid creating a time paradox", MIN_DELAY_SECS);
            }

            let mut style = MessageStyle::default();
            if let Some(username) = pick(&cli.username, &config.slack.username) {
                style = style.with_username(username);
            }
            if let Some(emoji) = pick(&cli.icon_emoji, &config.slack.icon_emoji) {
                style = style.with_icon_emoji(emoji);
            }
            if let Some(url) = pick(&cli.icon_url, &config.slack.icon_url) {
                style = style.with_icon_url(url);
            }

            Target::Slack {
                token,
                channel,
                style,
                api_url: config.slack.api_url.clone(),
                timeout: Duration::from_millis(config.slack.timeout_ms),
            }
        };

        // preview skips validation, but a negative delay still means "none"
        let delay = if delay_secs > 0.0 {
            match Duration::try_from_secs_f64(delay_secs) {
                Ok(delay) => delay,
                Err(_) => bail!("delay of {} seconds is out of range", delay_secs),
            }
        } else {
            Duration::ZERO
        };

        Ok(Self {
            target,
            delay,
            looping: cli.looping,
            max_frames,
            timeout,
        })
    }
}

/// First non-empty value: flag, then config
fn pick(flag: &Option<String>, configured: &Option<String>) -> Option<String> {
    flag.iter()
        .chain(configured.iter())
        .find(|s| !s.is_empty())
        .cloned()
}
