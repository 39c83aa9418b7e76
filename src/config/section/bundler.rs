//! `[bundler]` section configuration.
//!
//! The script bundler is an external command. It receives the build layout
//! through `BRISK_*` environment variables, which may also be referenced as
//! `$BRISK_*` inside `command` arguments.
//!
//! # Example
//!
//! ```toml
//! [bundler]
//! command = ["npx", "esbuild", "src/main.js", "--bundle", "--outdir=$BRISK_ASSETS_DIR"]
//! entries = ["src/main.js"]           # Must exist before the bundler runs
//! watch = ["src"]                     # Changes here trigger a rebuild in `start`
//! manifest = "manifest.json"          # Written by the command inside `build.assets`
//! quiet = false                       # Hide the command's stdout on success
//! ```
//!
//! Variables: `BRISK_OUTPUT_DIR`, `BRISK_ASSETS_DIR`, `BRISK_MANIFEST`,
//! `BRISK_BASE_PATH`, `BRISK_MODE`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// `[bundler]` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Command and arguments.
    pub command: Vec<String>,
    /// Entry modules, checked for existence before each run.
    pub entries: Vec<PathBuf>,
    /// Directories or files whose changes trigger a rebuild.
    pub watch: Vec<PathBuf>,
    /// Manifest file name inside the assets directory.
    pub manifest: String,
    /// Suppress the command's stdout on success.
    pub quiet: bool,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            entries: vec!["src/main.js".into()],
            watch: vec!["src".into()],
            manifest: "manifest.json".into(),
            quiet: false,
        }
    }
}

impl BundlerConfig {
    pub const COMMAND: FieldPath = FieldPath::new("bundler.command");
    pub const ENTRIES: FieldPath = FieldPath::new("bundler.entries");
    pub const MANIFEST: FieldPath = FieldPath::new("bundler.manifest");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.command.first().is_none_or(|c| c.trim().is_empty()) {
            diag.error_with_hint(
                Self::COMMAND,
                format!("{} is empty", Self::COMMAND),
                "e.g. command = [\"npx\", \"esbuild\", \"src/main.js\", \"--bundle\", \"--outdir=$BRISK_ASSETS_DIR\"]",
            );
        }

        if self.entries.is_empty() {
            diag.error(Self::ENTRIES, "at least one entry module is required");
        }

        if self.manifest.is_empty() || self.manifest.contains(['/', '\\']) {
            diag.error(
                Self::MANIFEST,
                format!("`{}` must be a plain file name", self.manifest),
            );
        }
    }
}
