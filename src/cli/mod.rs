//! CLI module for slacknimate - command-line flags and their resolution
//! against the config file.

pub mod args;

pub use args::{Cli, RunOptions, Target};
