//! Stylesheet concatenation.
//!
//! Merges an ordered list of stylesheet sources into one file with a merged
//! source map:
//!
//! ```text
//! sources ──(rayon, by index)──> resolve ─> parse ─> transforms ─> print
//!                                                                   │
//!        output file + map  <── hash name <── join "\n" + concat maps
//! ```
//!
//! Output order always equals input order, whatever order the sources
//! finish in.

mod error;
mod relocate;
mod source;
mod sourcemap;
mod transform;


pub use error::{CssError, StylesheetSyntaxError};
pub use relocate::AssetRelocation;
pub use source::{Fetch, HttpFetch, RemoteCache, StylesheetSource};
pub use transform::{Autoprefixer, Minify, Transform, TransformContext, site_transforms};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::utils::hash;

/// Where the merged source map is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    /// `<output>.map` next to the stylesheet.
    #[default]
    File,
    /// Base64 data URL appended to the stylesheet.
    Inline,
}

/// Options for one concatenation.
pub struct ConcatOptions {
    /// Unhashed output path, e.g. `<output>/assets/app.css`.
    pub output_path: PathBuf,
    /// Insert a content hash into the file name.
    pub hash: bool,
    pub source_map: SourceMapMode,
    /// Applied to every source, left to right.
    pub transforms: Vec<Box<dyn Transform>>,
}

impl ConcatOptions {
    /// Options for a site: hashed names in production, transforms from config.
    pub fn for_site(config: &SiteConfig) -> Result<Self, CssError> {
        Ok(Self {
            output_path: config.stylesheet_output(),
            hash: config.is_production(),
            source_map: config.css.source_map,
            transforms: site_transforms(config)?,
        })
    }
}

/// One source after its transforms.
pub struct ParsedStylesheet {
    pub source_id: String,
    pub css: String,
    pub source_map: oxc_sourcemap::SourceMap,
    /// Assets copied next to the output for this source.
    pub assets: Vec<PathBuf>,
}

/// Result of a concatenation.
#[derive(Debug, Clone)]
pub struct ConcatenatedOutput {
    /// Merged CSS, without the `sourceMappingURL` annotation.
    pub css: String,
    /// Merged source map as JSON.
    pub source_map: String,
    /// Final (possibly hashed) stylesheet path.
    pub output_path: PathBuf,
    /// Relocated `url()` assets the stylesheet references, sorted.
    pub assets: Vec<PathBuf>,
}

/// Concatenates stylesheets. Owns the remote-fetch cache, so reuse one
/// instance across rebuilds.
pub struct Concatenator {
    fetch: Box<dyn Fetch>,
    cache: RemoteCache,
}

impl Default for Concatenator {
    fn default() -> Self {
        Self::new()
    }
}

impl Concatenator {
    /// Concatenator fetching remote sources over HTTP.
    pub fn new() -> Self {
        Self::with_fetch(Box::new(HttpFetch::new()))
    }

    pub fn with_fetch(fetch: Box<dyn Fetch>) -> Self {
        Self {
            fetch,
            cache: RemoteCache::new(),
        }
    }

    pub fn cache(&self) -> &RemoteCache {
        &self.cache
    }

    /// Merge `sources` into one stylesheet and write it.
    pub fn concatenate(
        &self,
        sources: &[StylesheetSource],
        options: &ConcatOptions,
    ) -> Result<ConcatenatedOutput, CssError> {
        if sources.is_empty() {
            return Err(CssError::Empty);
        }

        let output_dir = options
            .output_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        // Indexed collect keeps input order
        let parsed: Vec<ParsedStylesheet> = sources
            .par_iter()
            .map(|source| {
                let text = self.resolve(source)?;
                process_source(source, &text, &output_dir, &options.transforms)
            })
            .collect::<Result<_, _>>()?;

        let css = parsed
            .iter()
            .map(|p| p.css.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let parts: Vec<_> = parsed
            .iter()
            .map(|p| (p.css.as_str(), &p.source_map))
            .collect();
        let map = sourcemap::concat(&parts);

        let output_path = if options.hash {
            output_dir.join(hash::hashed_file_name(
                &options.output_path,
                &hash::fingerprint(&css),
            ))
        } else {
            options.output_path.clone()
        };

        let source_map = map.to_json_string();
        write_output(&output_path, &css, &map, &source_map, options.source_map)?;

        let mut assets: Vec<PathBuf> = parsed.into_iter().flat_map(|p| p.assets).collect();
        assets.sort();
        assets.dedup();

        crate::debug!("css"; "{} sources -> {}", sources.len(), output_path.display());
        Ok(ConcatenatedOutput {
            css,
            source_map,
            output_path,
            assets,
        })
    }

    /// Read a local source or fetch (once) a remote one.
    fn resolve(&self, source: &StylesheetSource) -> Result<Arc<str>, CssError> {
        match source {
            StylesheetSource::Local(path) => fs::read_to_string(path)
                .map(Arc::from)
                .map_err(|e| CssError::Read {
                    path: path.clone(),
                    source: e,
                }),
            StylesheetSource::Remote(url) => self.cache.get_or_fetch(url, self.fetch.as_ref()),
        }
    }
}

/// Parse one source and run it through `transforms`.
///
/// Without transforms the text is kept verbatim (parsing still surfaces
/// syntax errors) and mapped line for line.
fn process_source(
    source: &StylesheetSource,
    text: &str,
    output_dir: &Path,
    transforms: &[Box<dyn Transform>],
) -> Result<ParsedStylesheet, CssError> {
    let source_id = source.id();
    let mut sheet = StyleSheet::parse(
        text,
        ParserOptions {
            filename: source_id.clone(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| {
        let snippet = e
            .loc
            .as_ref()
            .map(|loc| error::render_code_frame(text, loc.line, loc.column))
            .unwrap_or_default();
        CssError::Syntax(StylesheetSyntaxError {
            filename: source_id.clone(),
            message: e.kind.to_string(),
            snippet,
        })
    })?;

    if transforms.is_empty() {
        let css = text.strip_suffix('\n').unwrap_or(text);
        let css = css.strip_suffix('\r').unwrap_or(css).to_string();
        let source_map = sourcemap::identity_map(&source_id, text, &css);
        return Ok(ParsedStylesheet {
            source_id,
            css,
            source_map,
            assets: Vec::new(),
        });
    }

    let mut ctx = TransformContext::new(source, output_dir);
    for transform in transforms {
        transform.apply(&mut sheet, &mut ctx)?;
    }

    let mut printer_map = parcel_sourcemap::SourceMap::new("/");
    printer_map.add_source(&source_id);
    printer_map
        .set_source_content(0, text)
        .map_err(|e| CssError::SourceMap(e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: ctx.minify,
            source_map: Some(&mut printer_map),
            targets: ctx.targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| CssError::Print {
            filename: source_id.clone(),
            message: e.kind.to_string(),
        })?;

    Ok(ParsedStylesheet {
        source_map: sourcemap::from_printer(&mut printer_map)?,
        source_id,
        css: printed.code,
        assets: ctx.relocated,
    })
}

/// Write the stylesheet and, in file mode, its `.map` sibling.
fn write_output(
    path: &Path,
    css: &str,
    map: &oxc_sourcemap::SourceMap,
    map_json: &str,
    mode: SourceMapMode,
) -> Result<(), CssError> {
    let write = |path: &Path, contents: &str| {
        fs::write(path, contents).map_err(|e| CssError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CssError::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let annotation = match mode {
        SourceMapMode::Inline => map.to_data_url(),
        SourceMapMode::File => {
            let map_path = map_path_for(path);
            write(&map_path, map_json)?;
            map_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        }
    };

    write(path, &format!("{css}\n/*# sourceMappingURL={annotation} */\n"))
}

/// `<stylesheet>.map`
pub fn map_path_for(stylesheet: &Path) -> PathBuf {
    let mut name = stylesheet.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}

/// Concatenate the stylesheets configured for a site.
pub fn compile_site(
    concatenator: &Concatenator,
    config: &SiteConfig,
) -> Result<ConcatenatedOutput, CssError> {
    let sources = StylesheetSource::parse_all(&config.css.stylesheets, config.get_root());
    concatenator.concatenate(&sources, &ConcatOptions::for_site(config)?)
}

/// Local stylesheet files of a site, for watching.
pub fn local_sources(config: &SiteConfig) -> Vec<PathBuf> {
    StylesheetSource::parse_all(&config.css.stylesheets, config.get_root())
        .into_iter()
        .filter_map(|source| match source {
            StylesheetSource::Local(path) => Some(path),
            StylesheetSource::Remote(_) => None,
        })
        .collect()
}

/// Delete a previous stylesheet output and its `.map`. Missing files are fine.
pub fn remove_output(stylesheet: &Path) -> std::io::Result<()> {
    for path in [stylesheet.to_path_buf(), map_path_for(stylesheet)] {
        match fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
    }
    Ok(())
}
