mod cache;
mod cli;
mod commands;
mod config;
mod error;
mod git;
mod interrupt;
mod notify;
mod orchestrator;
mod player;
mod progress;
mod prompt;
mod runner;
mod safety;
mod tag;
#[cfg(test)]
mod testing;
mod ui;

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    /// Project root (the working directory)
    pub root: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        quiet: cli.quiet,
        root: std::env::current_dir().context("Cannot determine working directory")?,
    };

    match cli.command {
        Command::Provision => commands::provision::run(&ctx),
        Command::List => commands::list::run(&ctx),
        Command::Command => commands::command::run(&ctx),
        Command::Hostvars => commands::hostvars::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "shovel", &mut io::stdout());
            Ok(())
        }
    }
}
