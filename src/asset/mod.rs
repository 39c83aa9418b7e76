//! Asset path translation.
//!
//! Maps between absolute paths inside the output directory and the public,
//! base-path-prefixed URLs the browser requests, and merges the bundler
//! manifest with the stylesheet output.
//!
//! ```text
//! /site/_site/assets/main.js  <──>  /my-app/assets/main.js
//!  └ output_dir ┘                    └ base_path ┘
//! ```

mod manifest;
pub mod minify;

pub use manifest::{AssetManifest, ChunkAssets, MAIN, ManifestError, POLYFILL, RUNTIME, VENDOR};

use std::path::{Component, Path, PathBuf};

use crate::config::SiteConfig;
use crate::utils::path::route;

/// Current asset state of a build.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    output_dir: PathBuf,
    /// `/` or `/segment` without trailing slash.
    base_path: String,
    manifest_path: PathBuf,
    /// Output of the stylesheet engine, when stylesheets are configured.
    stylesheet: Option<PathBuf>,
}

impl AssetPaths {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        base_path: impl Into<String>,
        manifest_path: impl Into<PathBuf>,
        stylesheet: Option<PathBuf>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_path: base_path.into(),
            manifest_path: manifest_path.into(),
            stylesheet,
        }
    }

    pub fn from_config(config: &SiteConfig, stylesheet: Option<PathBuf>) -> Self {
        Self::new(
            config.output_dir(),
            config.build.base_path.clone(),
            config.manifest_path(),
            stylesheet,
        )
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn stylesheet(&self) -> Option<&Path> {
        self.stylesheet.as_deref()
    }

    /// `<output>/assets/main.js` → `/base/assets/main.js`
    pub fn to_public_url(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.output_dir).unwrap_or(path);
        let joined = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        route::join_url(&self.base_path, &joined)
    }

    pub fn to_public_urls(&self, paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| self.to_public_url(p)).collect()
    }

    /// `None` in, `None` out.
    pub fn public_url_opt(&self, path: Option<&Path>) -> Option<String> {
        path.map(|p| self.to_public_url(p))
    }

    /// `/base/assets/main.js` → `<output>/assets/main.js`
    pub fn to_fs_path(&self, url: &str) -> PathBuf {
        let stripped = match url.strip_prefix(self.base_path.as_str()) {
            Some(rest) if self.base_path != "/" && (rest.is_empty() || rest.starts_with('/')) => rest,
            _ => url,
        };
        stripped
            .split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .fold(self.output_dir.clone(), |acc, seg| acc.join(seg))
    }

    pub fn to_fs_paths(&self, urls: &[String]) -> Vec<PathBuf> {
        urls.iter().map(|u| self.to_fs_path(u)).collect()
    }

    /// Public URL of the project stylesheet.
    pub fn main_stylesheet(&self) -> Option<String> {
        self.public_url_opt(self.stylesheet())
    }

    /// Stylesheet URLs in link order: the project stylesheet first, then the
    /// `main` chunk's stylesheets.
    pub fn css(&self) -> Result<Vec<String>, ManifestError> {
        let manifest = self.manifest()?;
        Ok(self
            .main_stylesheet()
            .into_iter()
            .chain(manifest.main_css().iter().cloned())
            .filter(|url| !url.is_empty())
            .collect())
    }

    /// The bundler manifest, re-read from disk on every call.
    pub fn manifest(&self) -> Result<AssetManifest, ManifestError> {
        AssetManifest::read(&self.manifest_path)
    }
}
