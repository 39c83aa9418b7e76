//! `[css]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [css]
//! stylesheets = [
//!     "https://unpkg.com/normalize.css@8/normalize.css",
//!     "src/styles/base.css",
//!     "src/styles/app.css",
//! ]
//! output = "app.css"              # File name inside `build.assets`
//! source_map = "file"             # file | inline
//! browserslist = ["> 0.2%", "not dead"]
//! minify = true                   # default: true in production
//! ```
//!
//! `browserslist` may also be split by build mode, with `defaults` used for
//! a mode that has no entry:
//!
//! ```toml
//! [css.browserslist]
//! production = ["> 0.5%", "last 2 versions"]
//! development = ["last 1 chrome version"]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Mode;
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::css::SourceMapMode;

/// Browserslist queries, either shared or per build mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Browserslist {
    Queries(Vec<String>),
    ByMode(BTreeMap<String, Vec<String>>),
}

impl Browserslist {
    const FALLBACK: &'static str = "defaults";

    /// Queries that apply in `mode`, if any.
    pub fn for_mode(&self, mode: Mode) -> Option<&[String]> {
        match self {
            Self::Queries(queries) => Some(queries),
            Self::ByMode(by_mode) => by_mode
                .get(mode.as_str())
                .or_else(|| by_mode.get(Self::FALLBACK))
                .map(Vec::as_slice),
        }
    }

    /// Every query set with the key it came from (`None` when shared).
    fn sets(&self) -> Vec<(Option<&str>, &[String])> {
        match self {
            Self::Queries(queries) => vec![(None, queries.as_slice())],
            Self::ByMode(by_mode) => by_mode
                .iter()
                .map(|(key, queries)| (Some(key.as_str()), queries.as_slice()))
                .collect(),
        }
    }
}

/// `[css]` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CssConfig {
    /// Ordered stylesheet sources: project-relative paths or http(s) URLs.
    pub stylesheets: Vec<String>,
    /// Output file name inside the assets directory.
    pub output: String,
    pub source_map: SourceMapMode,
    /// Browserslist queries; enables vendor prefixing when set.
    pub browserslist: Option<Browserslist>,
    /// Minify the stylesheet. `None` follows the build mode.
    pub minify: Option<bool>,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            stylesheets: Vec::new(),
            output: "app.css".into(),
            source_map: SourceMapMode::default(),
            browserslist: None,
            minify: None,
        }
    }
}

impl CssConfig {
    pub const STYLESHEETS: FieldPath = FieldPath::new("css.stylesheets");
    pub const OUTPUT: FieldPath = FieldPath::new("css.output");
    pub const BROWSERSLIST: FieldPath = FieldPath::new("css.browserslist");

    /// Whether any stylesheet is configured.
    pub fn is_enabled(&self) -> bool {
        !self.stylesheets.is_empty()
    }

    /// Browserslist queries for `mode`.
    pub fn browserslist_for(&self, mode: Mode) -> Option<&[String]> {
        self.browserslist.as_ref()?.for_mode(mode)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (i, entry) in self.stylesheets.iter().enumerate() {
            if entry.trim().is_empty() {
                diag.error(Self::STYLESHEETS, format!("entry {i} is empty"));
            }
        }

        if !self.output.ends_with(".css") || self.output.contains(['/', '\\']) {
            diag.error_with_hint(
                Self::OUTPUT,
                format!("`{}` must be a plain `.css` file name", self.output),
                "for example \"app.css\"",
            );
        }

        let sets = self.browserslist.as_ref().map(Browserslist::sets).unwrap_or_default();
        for (key, queries) in sets {
            let label = key.map(|k| format!(" ({k})")).unwrap_or_default();
            if let Some(key) = key
                && key != Browserslist::FALLBACK
                && !["production", "development"].contains(&key)
            {
                diag.warn(Self::BROWSERSLIST, format!("unknown mode `{key}` is never used"));
            }
            match lightningcss::targets::Browsers::from_browserslist(queries) {
                Ok(Some(_)) => {}
                Ok(None) => diag.warn(Self::BROWSERSLIST, format!("matches no browsers{label}")),
                Err(e) => diag.error(Self::BROWSERSLIST, format!("invalid query{label}: {e}")),
            }
        }

        if !self.is_enabled() {
            return;
        }

        let remote = self
            .stylesheets
            .iter()
            .filter(|s| s.starts_with("http://"))
            .count();
        if remote > 0 {
            diag.warn(
                Self::STYLESHEETS,
                format!("{remote} stylesheet(s) fetched over plain http"),
            );
        }
    }
}
