//! Project configuration management for `brisk.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── css        # [css]
//! │   ├── bundler    # [bundler]
//! │   └── serve      # [serve]
//! ├── types/         # ConfigError, ConfigDiagnostics, FieldPath
//! └── mod.rs         # SiteConfig, config file discovery (this file)
//! ```
//!
//! Everything mode-dependent (production, source-map mode, browserslist) is
//! resolved here once and threaded through the pipeline as `&SiteConfig`.

mod section;
mod types;

pub use section::{Browserslist, BuildConfig, BundlerConfig, CssConfig, Mode, ServeConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{cli::Cli, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing brisk.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Resolved build mode (internal use only)
    #[serde(skip)]
    pub mode: Option<Mode>,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub css: CssConfig,

    #[serde(default)]
    pub bundler: BundlerConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file. Without one, defaults
    /// apply with cwd as the project root (validation then names whatever
    /// is still missing).
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, config_path) = match locate_config(&cli.config, &cwd) {
            Some(path) => (Self::from_path(&path)?, path),
            None => {
                log!("config"; "{} not found, using defaults", cli.config.display());
                (Self::default(), cwd.join(&cli.config))
            }
        };

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);
        config.config_path = crate::utils::path::normalize_path(&config_path);

        config.apply_cli(cli);
        let mode = config.build.mode.unwrap_or_else(|| cli.default_mode());
        config.finalize(&root, mode);
        config.validate(cli.runs_bundler())?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::from)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warn"; "unknown fields in {} are ignored: {}", display_path, fields.join(", "));
    }

    // ========================================================================
    // resolution
    // ========================================================================

    /// Apply CLI overrides on top of the file values.
    fn apply_cli(&mut self, cli: &Cli) {
        let args = cli.build_args();
        crate::logger::set_verbose(args.verbose);

        Self::update_option(&mut self.build.output, cli.output.as_ref());
        Self::update_option(&mut self.build.base_path, args.base_path.as_ref());
        if args.mode.is_some() {
            self.build.mode = args.mode;
        }

        if let Some((interface, port)) = cli.listen_args() {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
        }
    }

    /// Resolve every relative path against `root` and fix the mode.
    ///
    /// After this call nothing in the pipeline consults ambient state.
    pub fn finalize(&mut self, root: &Path, mode: Mode) {
        let root = crate::utils::path::normalize_path(root);
        let resolve = |p: &Path| crate::utils::path::resolve_path(p, &root);

        self.build.output = resolve(&self.build.output);
        self.build.public = resolve(&self.build.public);
        self.build.template = self.build.template.as_deref().map(resolve);
        self.build.base_path = section::normalize_base_path(&self.build.base_path);
        self.build.mode = Some(mode);
        self.bundler.entries = self.bundler.entries.iter().map(|p| resolve(p)).collect();
        self.bundler.watch = self.bundler.watch.iter().map(|p| resolve(p)).collect();

        self.mode = Some(mode);
        self.root = root;
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // accessors
    // ========================================================================

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Resolved mode; production until `finalize` has run.
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or(Mode::Production)
    }

    pub fn is_production(&self) -> bool {
        self.mode().is_production()
    }

    pub fn output_dir(&self) -> &Path {
        &self.build.output
    }

    /// Directory shared by the bundler chunks and the stylesheet.
    pub fn assets_dir(&self) -> PathBuf {
        self.build.assets_dir()
    }

    /// Manifest written by the bundler command.
    pub fn manifest_path(&self) -> PathBuf {
        self.assets_dir().join(&self.bundler.manifest)
    }

    /// Unhashed stylesheet output path.
    pub fn stylesheet_output(&self) -> PathBuf {
        self.assets_dir().join(&self.css.output)
    }

    /// Whether stylesheets are minified (explicit setting, else production).
    pub fn minify_css(&self) -> bool {
        self.css.minify.unwrap_or_else(|| self.is_production())
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the resolved configuration.
    ///
    /// Collects all validation errors and returns them at once.
    /// `[bundler]` is skipped unless `bundling`.
    pub fn validate(&self, bundling: bool) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&mut diag);
        self.css.validate(&mut diag);
        if bundling {
            self.bundler.validate(&mut diag);
        }

        if self.build.output == self.root {
            diag.error(BuildConfig::OUTPUT, "output must not be the project root");
        }
        if self.build.output == self.build.public {
            diag.error(BuildConfig::OUTPUT, "output must differ from `build.public`");
        }

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

/// `name` as given when absolute, else the nearest `<dir>/name` walking up
/// from `start`.
fn locate_config(name: &Path, start: &Path) -> Option<PathBuf> {
    if name.is_absolute() {
        return name.is_file().then(|| name.to_path_buf());
    }
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (catches typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// A finalized config rooted at `root` with a runnable bundler command.
#[cfg(test)]
pub fn test_site_config(root: &Path, mode: Mode) -> SiteConfig {
    let mut config = test_parse_config("[bundler]\ncommand = [\"true\"]\nentries = []\n");
    config.finalize(root, mode);
    config
}
