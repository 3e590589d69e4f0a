use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{LevelFilter, info, warn};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use slacknimate::cancel::CancelToken;
use slacknimate::frames::{Frames, LineScanner, LoopingLineScanner};
use slacknimate::runner::{Previewer, Update, Updater, UpdaterOptions};
use slacknimate::slack::{MessageStyle, SlackClient, SlackConfig};
use slacknimate::SlacknimateError;

mod cli;
mod config;

use cli::{Cli, RunOptions, Target};
use config::Config;

fn setup_logging(default_level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slacknimate")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("slacknimate.log");

    // Setup env_logger with file output; RUST_LOG still wins
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized at {}, writing to: {}", default_level, log_file.display());
    Ok(())
}

/// Level used when RUST_LOG is unset: --verbose, then the config's log_level,
/// then info.
fn default_log_level(verbose: bool, config: &Config) -> String {
    if verbose {
        return "debug".to_string();
    }
    match config.log_level.as_deref() {
        Some(level) if LevelFilter::from_str(level).is_ok() => level.to_lowercase(),
        Some(level) => {
            eprintln!("{} {}", "Ignoring unknown log_level in config:".yellow(), level);
            "info".to_string()
        }
        None => "info".to_string(),
    }
}

/// Fire the token on Ctrl-C
fn cancel_on_interrupt(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Got interrupt signal. Aborting...".yellow());
            info!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

fn start_frames(opts: &RunOptions, cancel: &CancelToken) -> Frames {
    let stdin = tokio::io::stdin();
    if opts.looping {
        LoopingLineScanner::new(stdin)
            .with_max_frames(opts.max_frames)
            .spawn(cancel.clone())
    } else {
        LineScanner::new(stdin).spawn(cancel.clone())
    }
}

fn report_update(u: Update) {
    match &u.err {
        None => {
            info!("posted frame {}/{}: {}", u.dst, u.ts, u.frame);
            eprintln!("{} {}/{}: {}", "posted frame".green(), u.dst, u.ts, u.frame);
        }
        Some(e) => {
            warn!("ERROR updating {}/{} with frame {}: {}", u.dst, u.ts, u.frame, e);
            eprintln!("{} {}/{} with frame {}: {}", "ERROR updating".red(), u.dst, u.ts, u.frame, e);
        }
    }
}

fn build_updater(
    token: &str,
    style: &MessageStyle,
    api_url: &str,
    timeout: Duration,
    delay: Duration,
) -> Result<Updater<SlackClient>> {
    let mut slack_config = SlackConfig::with_api_url(api_url);
    slack_config.timeout = timeout;
    let client = SlackClient::new(token, slack_config).context("Failed to create Slack client")?;

    let options = UpdaterOptions::default()
        .with_min_delay(delay)
        .with_style(style.clone())
        .on_update(report_update);
    Ok(Updater::with_options(Arc::new(client), options))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        eprintln!("{}", "Verbose mode enabled".yellow());
    }

    let opts = RunOptions::resolve(cli, config)?;

    let cancel = CancelToken::new();
    if let Some(timeout) = opts.timeout {
        cancel.cancel_after(timeout);
    }
    cancel_on_interrupt(cancel.clone());

    let mut frames = start_frames(&opts, &cancel);

    let outcome = match &opts.target {
        Target::Preview => {
            let mut previewer = Previewer::new(std::io::stdout(), opts.delay);
            previewer.run(&mut frames, &cancel).await
        }
        Target::Slack {
            token,
            channel,
            style,
            api_url,
            timeout,
        } => {
            let mut updater = build_updater(token, style, api_url, *timeout, opts.delay)?;
            info!("Animating into {} with a minimum delay of {:?}", channel, opts.delay);
            updater.run(channel, &mut frames, &cancel).await
        }
    };

    // Interrupts and --timeout are requested stops, not failures
    match outcome {
        Err(e) if e.is_cancelled() => {
            info!("Stopped: {}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
        Ok(()) => {}
    }

    match frames.err() {
        Some(err) => {
            let err = SlacknimateError::from(err);
            if err.is_cancelled() {
                Ok(())
            } else {
                Err(err).context("Failed reading frames from stdin")
            }
        }
        None => Ok(()),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration; it decides the log level
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&default_log_level(cli.is_verbose(), &config)).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(run_application(&cli, &config));

    // A cancelled stdin read sits on a blocking thread until the next line
    // arrives; don't wait for it.
    runtime.shutdown_background();

    result.context("Application failed")?;

    Ok(())
}
