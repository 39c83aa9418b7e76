//! Stylesheet engine errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

use owo_colors::OwoColorize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CssError {
    #[error("No stylesheets provided")]
    Empty,

    #[error("{0}")]
    Syntax(StylesheetSyntaxError),

    #[error("failed to read stylesheet `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch `{url}`: {message}")]
    Fetch { url: String, message: String },

    #[error("{plugin} failed on `{filename}`: {message}")]
    Transform {
        filename: String,
        plugin: &'static str,
        message: String,
    },

    #[error("failed to print `{filename}`: {message}")]
    Print { filename: String, message: String },

    #[error("source map error: {0}")]
    SourceMap(String),

    #[error("failed to write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A stylesheet that failed to parse, with a rendered code frame.
#[derive(Debug, Clone)]
pub struct StylesheetSyntaxError {
    /// Local path or URL of the offending source.
    pub filename: String,
    pub message: String,
    /// Offending line with its neighbours and a caret, or empty.
    pub snippet: String,
}

impl fmt::Display for StylesheetSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.filename.bold(), self.message)?;
        if !self.snippet.is_empty() {
            write!(f, "\n\n{}", self.snippet)?;
        }
        Ok(())
    }
}

impl std::error::Error for StylesheetSyntaxError {}

/// Render the lines around `line` (0-based) with a caret under `column`
/// (1-based).
///
/// ```text
///   1 | body {
/// > 2 |   color: ;
///     |          ^
///   3 | }
/// ```
pub fn render_code_frame(source: &str, line: u32, column: u32) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let line = line as usize;
    if line >= lines.len() {
        return String::new();
    }

    let first = line.saturating_sub(1);
    let last = (line + 1).min(lines.len() - 1);
    let gutter = (last + 1).to_string().len();

    let mut out = String::new();
    for (i, text) in lines.iter().enumerate().take(last + 1).skip(first) {
        let marker = if i == line { '>' } else { ' ' };
        out.push_str(&format!("{marker} {:>gutter$} | {text}\n", i + 1));
        if i == line {
            let pad = " ".repeat(column.saturating_sub(1) as usize);
            out.push_str(&format!("  {:>gutter$} | {pad}^\n", ""));
        }
    }
    out.truncate(out.trim_end().len());
    out
}
