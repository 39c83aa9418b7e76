//! Entry document templates.

use std::fs;
use std::path::PathBuf;

use super::{HtmlError, RenderContext};
use crate::embed::INDEX_HTML;

/// Produces the entry document from the render callbacks.
pub trait HtmlTemplate: Send + Sync {
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String, HtmlError>;
}

/// The built-in `index.html`.
pub struct DefaultTemplate {
    title: String,
}

impl DefaultTemplate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl HtmlTemplate for DefaultTemplate {
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String, HtmlError> {
        let html = fill_placeholders(INDEX_HTML.to_string(), ctx)?;
        Ok(replace_placeholder(html, "title", &self.title))
    }
}

/// A user template file, re-read on every render.
///
/// Supported placeholders: `{{ css_links }}`, `{{ js_bundles }}`,
/// `{{ polyfill }}`. Whitespace inside the braces is optional.
pub struct FileTemplate {
    path: PathBuf,
}

const PLACEHOLDERS: [&str; 3] = ["css_links", "js_bundles", "polyfill"];

impl FileTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HtmlTemplate for FileTemplate {
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String, HtmlError> {
        let html = fs::read_to_string(&self.path).map_err(|source| HtmlError::Template {
            path: self.path.clone(),
            source,
        })?;

        fill_placeholders(html, ctx)
    }
}

/// Substitute the render callbacks, calling each only when its
/// placeholder is present.
fn fill_placeholders(mut html: String, ctx: &RenderContext<'_>) -> Result<String, HtmlError> {
    for name in PLACEHOLDERS {
        if !has_placeholder(&html, name) {
            continue;
        }
        let value = match name {
            "css_links" => ctx.css_links()?,
            "js_bundles" => ctx.js_bundles()?,
            _ => ctx.polyfill_script()?,
        };
        html = replace_placeholder(html, name, &value);
    }
    Ok(html)
}

fn has_placeholder(html: &str, name: &str) -> bool {
    html.contains(&format!("{{{{ {name} }}}}")) || html.contains(&format!("{{{{{name}}}}}"))
}

fn replace_placeholder(html: String, name: &str, value: &str) -> String {
    html.replace(&format!("{{{{ {name} }}}}"), value)
        .replace(&format!("{{{{{name}}}}}"), value)
}
