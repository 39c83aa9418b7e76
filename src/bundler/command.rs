//! Bundler driven by a configured command.

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::{BuildStats, Bundler, BundlerError, Generation};
use crate::asset::AssetPaths;
use crate::config::{BundlerConfig, SiteConfig};
use crate::utils::exec::{Cmd, format_failure};

/// Runs `[bundler].command` in the project root.
pub struct CommandBundler {
    command: Vec<String>,
    root: PathBuf,
    entries: Vec<PathBuf>,
    watch: Vec<PathBuf>,
    vars: Vec<(String, String)>,
    assets: AssetPaths,
    quiet: bool,
}

impl CommandBundler {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            command: config.bundler.command.clone(),
            root: config.get_root().to_path_buf(),
            entries: config.bundler.entries.clone(),
            watch: config.bundler.watch.clone(),
            vars: brisk_vars(config),
            assets: AssetPaths::from_config(config, None),
            quiet: config.bundler.quiet,
        }
    }

    /// Command line with `$BRISK_*` references replaced.
    pub fn resolved_command(&self) -> Vec<String> {
        resolve_args(&self.command, &self.vars)
    }

    fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str).filter(|p| !p.trim().is_empty())
    }
}

impl Bundler for CommandBundler {
    fn prepare(&self) -> Result<(), BundlerError> {
        let program = self.program().ok_or_else(|| {
            BundlerError::Setup(format!("{} is empty", BundlerConfig::COMMAND))
        })?;

        let found = if Path::new(program).components().count() > 1 {
            self.root.join(program).is_file()
        } else {
            which::which(program).is_ok()
        };
        if !found {
            return Err(BundlerError::Setup(format!(
                "bundler command `{program}` not found ({})",
                BundlerConfig::COMMAND
            )));
        }

        if let Some(missing) = self.entries.iter().find(|entry| !entry.is_file()) {
            return Err(BundlerError::Setup(format!(
                "entry module not found: {} ({})",
                missing.display(),
                BundlerConfig::ENTRIES
            )));
        }
        Ok(())
    }

    fn run(&self) -> Result<BuildStats, BundlerError> {
        let started = Instant::now();
        let cmd = Cmd::from_slice(&self.resolved_command())
            .cwd(&self.root)
            .envs(self.vars.iter().map(|(k, v)| (k, v)));
        let name = cmd.program_name();
        crate::debug!("bundler"; "running `{}`", name);

        let output = cmd.run()?;
        if !output.status.success() {
            return Err(BundlerError::Compile {
                diagnostics: format_failure(&name, &output),
            });
        }

        if !self.quiet {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stdout = stdout.trim();
            if !stdout.is_empty() {
                println!("{stdout}");
            }
        }

        let chunks = self.assets.manifest()?.len();
        Ok(BuildStats {
            generation: Generation::of_output(&self.assets)?,
            chunks,
            duration: started.elapsed(),
        })
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        self.watch.clone()
    }
}

/// `BRISK_*` variables describing the build layout.
pub fn brisk_vars(config: &SiteConfig) -> Vec<(String, String)> {
    vec![
        (
            "BRISK_OUTPUT_DIR".into(),
            config.output_dir().display().to_string(),
        ),
        (
            "BRISK_ASSETS_DIR".into(),
            config.assets_dir().display().to_string(),
        ),
        (
            "BRISK_MANIFEST".into(),
            config.manifest_path().display().to_string(),
        ),
        ("BRISK_BASE_PATH".into(), config.build.base_path.clone()),
        ("BRISK_MODE".into(), config.mode().as_str().into()),
    ]
}

/// Replace `$BRISK_XXX` references in command arguments.
///
/// Longer names are substituted first so `$BRISK_ASSETS_DIR` never matches
/// a shorter variable that happens to be its prefix.
fn resolve_args(args: &[String], vars: &[(String, String)]) -> Vec<String> {
    let mut vars: Vec<_> = vars.iter().collect();
    vars.sort_by_key(|(k, _)| std::cmp::Reverse(k.len()));

    args.iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("${key}"), value)
            })
        })
        .collect()
}
