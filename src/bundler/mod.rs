//! The external script bundler.
//!
//! brisk never transforms scripts itself. A [`Bundler`] compiles the entry
//! modules into named chunks and writes a manifest; brisk only observes the
//! result. [`CommandBundler`] runs the configured `[bundler].command`.

mod command;
mod watch;

pub use command::CommandBundler;
pub use watch::BundlerWatch;

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::asset::{AssetPaths, ManifestError};

#[derive(Debug, Error)]
pub enum BundlerError {
    /// Misconfiguration detected before or while starting the bundler.
    #[error("{0}")]
    Setup(String),

    /// The bundler ran and rejected the input.
    #[error("{diagnostics}")]
    Compile { diagnostics: String },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Content hash identifying one bundler output (or one failure).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generation(String);

impl Generation {
    /// Hash the manifest bytes and every chunk file the manifest references.
    ///
    /// Chunks that cannot be read contribute their URL only.
    pub fn of_output(assets: &AssetPaths) -> Result<Self, BundlerError> {
        let manifest = assets.manifest()?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&fs::read(assets.manifest_path())?);
        for url in manifest.urls() {
            hasher.update(url.as_bytes());
            if let Ok(bytes) = fs::read(assets.to_fs_path(url)) {
                hasher.update(&bytes);
            }
        }
        Ok(Self(hasher.finalize().to_hex().to_string()))
    }

    /// Generation of a failed compile: identical diagnostics, identical generation.
    pub fn of_diagnostics(diagnostics: &str) -> Self {
        Self(crate::utils::hash::compute(diagnostics.as_bytes()))
    }

    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Summary of one successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub generation: Generation,
    /// Number of chunks in the manifest.
    pub chunks: usize,
    pub duration: Duration,
}

/// Outcome of one compile attempt, as delivered to the orchestrator.
#[derive(Debug)]
pub struct BundleEvent {
    /// `None` for infrastructure errors, which are never de-duplicated.
    pub generation: Option<Generation>,
    pub result: Result<BuildStats, BundlerError>,
}

impl BundleEvent {
    pub fn new(result: Result<BuildStats, BundlerError>) -> Self {
        let generation = match &result {
            Ok(stats) => Some(stats.generation.clone()),
            Err(BundlerError::Compile { diagnostics }) => {
                Some(Generation::of_diagnostics(diagnostics))
            }
            Err(_) => None,
        };
        Self { generation, result }
    }
}

/// A script bundler brisk can drive.
pub trait Bundler: Send + Sync {
    /// Validate the setup. Failures here are fatal in watch mode.
    fn prepare(&self) -> Result<(), BundlerError>;

    /// Run one compile.
    fn run(&self) -> Result<BuildStats, BundlerError>;

    /// Files and directories whose changes require a new compile.
    fn watch_paths(&self) -> Vec<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site(manifest: &str, main: &str) -> (TempDir, AssetPaths) {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("assets")).unwrap();
        fs::write(out.join("assets/manifest.json"), manifest).unwrap();
        fs::write(out.join("assets/main.js"), main).unwrap();
        let assets = AssetPaths::new(&out, "/", out.join("assets/manifest.json"), None);
        (dir, assets)
    }

    const MANIFEST: &str = r#"{ "main": { "js": "/assets/main.js" } }"#;

    #[test]
    fn test_generation_tracks_chunk_contents() {
        let (_a, first) = site(MANIFEST, "console.log(1)");
        let (_b, same) = site(MANIFEST, "console.log(1)");
        let (_c, changed) = site(MANIFEST, "console.log(2)");

        let g1 = Generation::of_output(&first).unwrap();
        assert_eq!(g1, Generation::of_output(&same).unwrap());
        // Same manifest, different chunk bytes
        assert_ne!(g1, Generation::of_output(&changed).unwrap());
        assert_eq!(g1.short().len(), 8);
    }

    #[test]
    fn test_generation_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let assets = AssetPaths::new(dir.path(), "/", dir.path().join("manifest.json"), None);
        assert!(matches!(
            Generation::of_output(&assets),
            Err(BundlerError::Manifest(_))
        ));
    }

    #[test]
    fn test_bundle_event_generation() {
        let failed = BundleEvent::new(Err(BundlerError::Compile {
            diagnostics: "x.js:1 unexpected token".into(),
        }));
        let again = BundleEvent::new(Err(BundlerError::Compile {
            diagnostics: "x.js:1 unexpected token".into(),
        }));
        assert!(failed.generation.is_some());
        assert_eq!(failed.generation, again.generation);

        let infra = BundleEvent::new(Err(BundlerError::Io(io::Error::other("spawn"))));
        assert_eq!(infra.generation, None);
    }
}
