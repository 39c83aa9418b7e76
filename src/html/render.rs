//! Render callbacks available to templates.

use std::fs;

use super::HtmlError;
use crate::asset::{AssetPaths, MAIN, POLYFILL, RUNTIME, VENDOR, minify::minify_js};

/// Asset state handed to [`super::HtmlTemplate::render`].
///
/// Every callback reads the manifest afresh, so a template only pays for
/// the callbacks it references.
pub struct RenderContext<'a> {
    assets: &'a AssetPaths,
    modern_browser_test: &'a str,
}

impl<'a> RenderContext<'a> {
    pub fn new(assets: &'a AssetPaths, modern_browser_test: &'a str) -> Self {
        Self {
            assets,
            modern_browser_test,
        }
    }

    /// Inlined runtime chunk, then the `main` and `vendor` script tags.
    pub fn js_bundles(&self) -> Result<String, HtmlError> {
        let manifest = self.assets.manifest()?;
        let mut tags = Vec::with_capacity(3);

        if let Some(url) = manifest.js(RUNTIME) {
            let path = self.assets.to_fs_path(url);
            let source = fs::read_to_string(&path)
                .map_err(|source| HtmlError::Runtime { path, source })?;
            tags.push(format!("<script>{}</script>", minify_js(&source)?));
        }

        let main = manifest.js(MAIN).ok_or(HtmlError::MissingMain)?;
        tags.push(format!("<script src=\"{main}\"></script>"));

        if let Some(vendor) = manifest.js(VENDOR) {
            tags.push(format!("<script src=\"{vendor}\"></script>"));
        }

        Ok(tags.join("\n"))
    }

    /// One `<link rel="stylesheet">` per stylesheet URL, project stylesheet first.
    pub fn css_links(&self) -> Result<String, HtmlError> {
        Ok(self
            .assets
            .css()?
            .iter()
            .map(|href| format!("<link rel=\"stylesheet\" href=\"{href}\">"))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Loader for the polyfill chunk, run only when the browser test fails.
    pub fn polyfill_script(&self) -> Result<String, HtmlError> {
        let manifest = self.assets.manifest()?;
        let Some(src) = manifest.js(POLYFILL) else {
            return Ok(String::new());
        };
        Ok(format!(
            r#"<script>
  var modernBrowser = ({test});
  if (!modernBrowser) {{
    var scriptElement = document.createElement('script');
    scriptElement.async = false;
    scriptElement.src = '{src}';
    document.head.appendChild(scriptElement);
  }}
</script>"#,
            test = self.modern_browser_test,
        ))
    }
}
