//! HTML entry document compiler.
//!
//! Renders the template against the current [`AssetPaths`] and writes
//! `<output>/index.html`. A render that is byte-identical to the last
//! written document is not written again.

mod render;
mod template;

pub use render::RenderContext;
pub use template::{DefaultTemplate, FileTemplate, HtmlTemplate};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::asset::{AssetPaths, ManifestError, minify::MinifyError};
use crate::config::SiteConfig;

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("manifest has no `main` script chunk")]
    MissingMain,

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to read runtime chunk {path}")]
    Runtime {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to minify runtime chunk: {0}")]
    Minify(#[from] MinifyError),

    #[error("failed to read template {path}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes `index.html`, remembering the last document it wrote.
pub struct HtmlCompiler {
    output_dir: PathBuf,
    template: Box<dyn HtmlTemplate>,
    modern_browser_test: String,
    last_html: Option<String>,
}

impl HtmlCompiler {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        template: Box<dyn HtmlTemplate>,
        modern_browser_test: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            template,
            modern_browser_test: modern_browser_test.into(),
            last_html: None,
        }
    }

    /// Compiler using the configured template file, or the built-in document.
    pub fn from_config(config: &SiteConfig) -> Self {
        let template: Box<dyn HtmlTemplate> = match &config.build.template {
            Some(path) => Box::new(FileTemplate::new(path)),
            None => Box::new(DefaultTemplate::new(&config.build.title)),
        };
        Self::new(
            config.output_dir(),
            template,
            &config.build.modern_browser_test,
        )
    }

    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join("index.html")
    }

    /// Render and write. Returns whether the file was written.
    pub fn compile(&mut self, assets: &AssetPaths) -> Result<bool, HtmlError> {
        let ctx = RenderContext::new(assets, &self.modern_browser_test);
        let html = self.template.render(&ctx)?;

        if self.last_html.as_deref() == Some(html.as_str()) {
            crate::debug!("html"; "index.html unchanged");
            return Ok(false);
        }

        let path = self.index_path();
        write_file(&path, &html)?;
        self.last_html = Some(html);
        Ok(true)
    }
}

fn write_file(path: &Path, html: &str) -> Result<(), HtmlError> {
    let to_err = |source| HtmlError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_err)?;
    }
    fs::write(path, html).map_err(to_err)
}
