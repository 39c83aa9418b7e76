//! Per-source stylesheet transforms.
//!
//! Transforms run left to right on the parsed `StyleSheet` of one source.
//! They may also adjust how the sheet is printed through the shared
//! [`TransformContext`].

use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use super::{AssetRelocation, CssError, StylesheetSource};
use crate::config::SiteConfig;

/// State shared by the transforms of one source.
pub struct TransformContext<'a> {
    pub source: &'a StylesheetSource,
    /// Directory the concatenated stylesheet is written to.
    pub output_dir: &'a Path,
    /// Browser targets used when printing.
    pub targets: Targets,
    /// Print compactly.
    pub minify: bool,
    /// Files copied into `output_dir` for this source.
    pub relocated: Vec<PathBuf>,
}

impl<'a> TransformContext<'a> {
    pub fn new(source: &'a StylesheetSource, output_dir: &'a Path) -> Self {
        Self {
            source,
            output_dir,
            targets: Targets::default(),
            minify: false,
            relocated: Vec::new(),
        }
    }

    /// Build a transform error for the current source.
    pub fn error(&self, plugin: &'static str, message: impl ToString) -> CssError {
        CssError::Transform {
            filename: self.source.id(),
            plugin,
            message: message.to_string(),
        }
    }
}

/// A stylesheet transform.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        sheet: &mut StyleSheet<'_>,
        ctx: &mut TransformContext<'_>,
    ) -> Result<(), CssError>;
}

/// Browserslist-driven vendor prefixing.
pub struct Autoprefixer {
    targets: Targets,
}

impl Autoprefixer {
    pub const NAME: &'static str = "autoprefixer";

    pub fn from_queries<S: AsRef<str>>(queries: &[S]) -> Result<Self, CssError> {
        let browsers = Browsers::from_browserslist(queries)
            .map_err(|e| CssError::Transform {
                filename: String::new(),
                plugin: Self::NAME,
                message: e.to_string(),
            })?;
        let targets = browsers.map(Targets::from).unwrap_or_default();
        Ok(Self { targets })
    }
}

impl Transform for Autoprefixer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(
        &self,
        sheet: &mut StyleSheet<'_>,
        ctx: &mut TransformContext<'_>,
    ) -> Result<(), CssError> {
        ctx.targets = self.targets;
        sheet
            .minify(MinifyOptions {
                targets: self.targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| ctx.error(Self::NAME, e.kind))
    }
}

/// Structural minification plus compact printing.
pub struct Minify;

impl Minify {
    pub const NAME: &'static str = "minify";
}

impl Transform for Minify {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(
        &self,
        sheet: &mut StyleSheet<'_>,
        ctx: &mut TransformContext<'_>,
    ) -> Result<(), CssError> {
        sheet
            .minify(MinifyOptions {
                targets: ctx.targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| ctx.error(Self::NAME, e.kind))?;
        ctx.minify = true;
        Ok(())
    }
}

/// Transform list for a site build:
/// asset relocation, then prefixing (when a browserslist is configured),
/// then minification (when enabled).
pub fn site_transforms(config: &SiteConfig) -> Result<Vec<Box<dyn Transform>>, CssError> {
    let mut transforms: Vec<Box<dyn Transform>> = vec![Box::new(AssetRelocation)];
    if let Some(queries) = config.css.browserslist_for(config.mode()) {
        transforms.push(Box::new(Autoprefixer::from_queries(queries)?));
    }
    if config.minify_css() {
        transforms.push(Box::new(Minify));
    }
    Ok(transforms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Browserslist, Mode, test_site_config};
    use lightningcss::stylesheet::{ParserOptions, PrinterOptions};

    fn names(transforms: &[Box<dyn Transform>]) -> Vec<&'static str> {
        transforms.iter().map(|t| t.name()).collect()
    }

    #[test]
    fn test_site_transforms_by_mode() {
        let root = Path::new("/site");
        let dev = test_site_config(root, Mode::Development);
        assert_eq!(names(&site_transforms(&dev).unwrap()), ["relocate-assets"]);

        let mut prod = test_site_config(root, Mode::Production);
        prod.css.browserslist = Some(Browserslist::Queries(vec!["safari 8".into()]));
        assert_eq!(
            names(&site_transforms(&prod).unwrap()),
            ["relocate-assets", "autoprefixer", "minify"]
        );
    }

    #[test]
    fn test_site_transforms_follow_mode_browserslist() {
        let root = Path::new("/site");
        let by_mode = Browserslist::ByMode(
            [("production".to_string(), vec!["safari 8".to_string()])].into(),
        );

        let mut prod = test_site_config(root, Mode::Production);
        prod.css.browserslist = Some(by_mode.clone());
        assert!(names(&site_transforms(&prod).unwrap()).contains(&"autoprefixer"));

        let mut dev = test_site_config(root, Mode::Development);
        dev.css.browserslist = Some(by_mode);
        assert_eq!(names(&site_transforms(&dev).unwrap()), ["relocate-assets"]);
    }

    #[test]
    fn test_autoprefixer_adds_prefix() {
        let source = StylesheetSource::Local("/a.css".into());
        let mut ctx = TransformContext::new(&source, Path::new("/out"));
        let mut sheet =
            StyleSheet::parse(".a { user-select: none }", ParserOptions::default()).unwrap();

        Autoprefixer::from_queries(&["safari 8"])
            .unwrap()
            .apply(&mut sheet, &mut ctx)
            .unwrap();
        let css = sheet
            .to_css(PrinterOptions {
                targets: ctx.targets,
                ..PrinterOptions::default()
            })
            .unwrap()
            .code;
        assert!(css.contains("-webkit-user-select"), "{css}");
    }

    #[test]
    fn test_minify_sets_compact_printing() {
        let source = StylesheetSource::Local("/a.css".into());
        let mut ctx = TransformContext::new(&source, Path::new("/out"));
        let mut sheet =
            StyleSheet::parse(".a { color: red }\n.a { margin: 0 }", ParserOptions::default())
                .unwrap();
        Minify.apply(&mut sheet, &mut ctx).unwrap();
        assert!(ctx.minify);
    }
}
