//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! output = "_site"                # Output directory (relative to project root)
//! public = "public"               # Static files copied verbatim into the output
//! assets = "assets"               # Output subdirectory for chunks and stylesheets
//! base_path = "/my-app"           # Public URL prefix (a full URL works too)
//! mode = "production"             # production | development (default: per command)
//! template = "src/index.html"     # HTML template file (default: built-in)
//! title = "My app"                # <title> of the built-in template
//! modern_browser_test = "'fetch' in window"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Build mode. `build` defaults to production, `start` to development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    Development,
}

impl Mode {
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

/// `[build]` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Output directory.
    pub output: PathBuf,
    /// Directory whose contents are mirrored into the output.
    pub public: PathBuf,
    /// Output subdirectory owned by the bundler and the stylesheet engine.
    pub assets: String,
    /// Public URL prefix, normalized to `/` or `/segment` (no trailing slash).
    pub base_path: String,
    /// Explicit mode; `None` means the command decides.
    pub mode: Option<Mode>,
    /// User HTML template with `{{ css_links }}` / `{{ js_bundles }}` / `{{ polyfill }}`.
    pub template: Option<PathBuf>,
    /// Document title used by the built-in template.
    pub title: String,
    /// JavaScript expression deciding at runtime whether to load the polyfill chunk.
    pub modern_browser_test: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: "_site".into(),
            public: "public".into(),
            assets: "assets".into(),
            base_path: "/".into(),
            mode: None,
            template: None,
            title: "brisk app".into(),
            modern_browser_test: "'fetch' in window && 'assign' in Object".into(),
        }
    }
}

impl BuildConfig {
    pub const OUTPUT: FieldPath = FieldPath::new("build.output");
    pub const ASSETS: FieldPath = FieldPath::new("build.assets");
    pub const BASE_PATH: FieldPath = FieldPath::new("build.base_path");
    pub const TEMPLATE: FieldPath = FieldPath::new("build.template");

    /// Absolute directory holding bundler chunks and the stylesheet.
    pub fn assets_dir(&self) -> PathBuf {
        self.output.join(&self.assets)
    }

    /// Validate `[build]` (paths must already be resolved against the root).
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let assets = std::path::Path::new(&self.assets);
        if self.assets.is_empty()
            || assets.is_absolute()
            || assets
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            diag.error_with_hint(
                Self::ASSETS,
                format!("`{}` must be a relative path inside the output", self.assets),
                "use a plain directory name such as \"assets\"",
            );
        }

        if let Some(template) = &self.template
            && !template.is_file()
        {
            diag.error(
                Self::TEMPLATE,
                format!("template file not found: {}", template.display()),
            );
        }
    }
}

/// Normalize a configured base path.
///
/// Full URLs contribute their path component. The result is `/` or starts
/// with `/` and has no trailing slash.
pub(crate) fn normalize_base_path(raw: &str) -> String {
    let path = match url::Url::parse(raw) {
        Ok(url) => url.path().to_string(),
        Err(_) => raw.to_string(),
    };
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.output, PathBuf::from("_site"));
        assert_eq!(config.build.assets, "assets");
        assert_eq!(config.build.base_path, "/");
        assert!(config.build.mode.is_none());
        assert!(config.build.template.is_none());
    }

    #[test]
    fn test_build_config() {
        let config = test_parse_config(
            r#"
[build]
output = "dist"
base_path = "/app/"
mode = "development"
template = "src/index.html"
"#,
        );
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert_eq!(config.build.mode, Some(Mode::Development));
        assert_eq!(
            config.build.template,
            Some(PathBuf::from("src/index.html"))
        );
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "/");
        assert_eq!(normalize_base_path("/"), "/");
        assert_eq!(normalize_base_path("app"), "/app");
        assert_eq!(normalize_base_path("/app/"), "/app");
        assert_eq!(normalize_base_path("/a/b"), "/a/b");
        assert_eq!(
            normalize_base_path("https://example.github.io/my-project/"),
            "/my-project"
        );
        assert_eq!(normalize_base_path("https://user:pw@example.com:8080/a/b?x=1"), "/a/b");
        assert_eq!(normalize_base_path("https://example.com"), "/");
    }

    #[test]
    fn test_validate_assets_dir() {
        let mut build = BuildConfig::default();
        build.assets = "../escape".into();
        let mut diag = ConfigDiagnostics::new();
        build.validate(&mut diag);
        assert!(diag.has_errors());

        let mut diag = ConfigDiagnostics::new();
        BuildConfig::default().validate(&mut diag);
        assert!(!diag.has_errors());
    }
}
