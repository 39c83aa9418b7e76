//! Per-source maps and their concatenation.

use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap, SourceMapBuilder};

use super::CssError;

/// Map every line of `css` to the same line of the source, column 0.
///
/// Used when a source passes through untouched.
pub fn identity_map(source_id: &str, content: &str, css: &str) -> SourceMap {
    let mut builder = SourceMapBuilder::default();
    let src = builder.add_source_and_content(source_id, content);
    for line in 0..line_count(css) {
        builder.add_token(line, 0, line, 0, Some(src), None);
    }
    builder.into_sourcemap()
}

/// Convert a map printed by lightningcss.
pub fn from_printer(map: &mut parcel_sourcemap::SourceMap) -> Result<SourceMap, CssError> {
    let json = map
        .to_json(None)
        .map_err(|e| CssError::SourceMap(e.to_string()))?;
    SourceMap::from_json_string(&json).map_err(|e| CssError::SourceMap(e.to_string()))
}

/// Merge per-source maps for chunks joined with `\n`, in order.
pub fn concat(parts: &[(&str, &SourceMap)]) -> SourceMap {
    let mut builder = ConcatSourceMapBuilder::default();
    let mut offset = 0;
    for (css, map) in parts {
        builder.add_sourcemap(map, offset);
        offset += line_count(css);
    }
    builder.into_sourcemap()
}

/// Number of lines `css` occupies once joined with `\n`.
pub fn line_count(css: &str) -> u32 {
    u32::try_from(css.matches('\n').count() + 1).unwrap_or(u32::MAX)
}
