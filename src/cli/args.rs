//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Mode;

/// brisk: bundles, stylesheets and static files into one site
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Config file path (default: brisk.toml)
    #[arg(short = 'C', long, global = true, default_value = "brisk.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the site once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, watch for changes and serve the output
    #[command(visible_alias = "s")]
    Start {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Serve the built output directory without building
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Arguments shared by every subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Build mode (default: production for `build`, development for `start`)
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Override the public base path (a full URL works too)
    #[arg(short = 'B', long = "base-path")]
    pub base_path: Option<String>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl Cli {
    /// `serve` only reads the output directory.
    pub const fn runs_bundler(&self) -> bool {
        !matches!(self.command, Commands::Serve { .. })
    }

    pub const fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Commands::Build { build_args }
            | Commands::Start { build_args, .. }
            | Commands::Serve { build_args, .. } => build_args,
        }
    }

    /// Network overrides of the serving commands.
    pub const fn listen_args(&self) -> Option<(Option<std::net::IpAddr>, Option<u16>)> {
        match self.command {
            Commands::Build { .. } => None,
            Commands::Start {
                interface, port, ..
            }
            | Commands::Serve {
                interface, port, ..
            } => Some((interface, port)),
        }
    }

    /// Mode used when neither the CLI nor the config names one.
    pub const fn default_mode(&self) -> Mode {
        match self.command {
            Commands::Build { .. } | Commands::Serve { .. } => Mode::Production,
            Commands::Start { .. } => Mode::Development,
        }
    }
}
