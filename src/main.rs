//! brisk - bundles, stylesheets and static files into one site.

mod asset;
mod bundler;
mod cli;
mod config;
mod core;
mod css;
mod embed;
mod html;
mod logger;
mod mirror;
mod orchestrator;
mod serve;
mod utils;
mod watcher;

use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

fn main() {
    if let Err(err) = run() {
        logger::report(&err);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = SiteConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { .. } => cli::build::build_site(&config),
        Commands::Start { .. } => cli::start::start_site(config),
        Commands::Serve { .. } => cli::serve::serve_site(&config),
    }
}
