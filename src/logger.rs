//! Stamped, colored console output.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, only printed with `--verbose`
//! - [`report`], the single place errors are printed
//!
//! # Example
//!
//! ```ignore
//! log!("css"; "Compiled CSS.");
//! debug!("watch"; "{} events", n);
//! logger::report(&err);
//! ```

use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stderr, stdout},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::bundler::BundlerError;
use crate::css::CssError;

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Serializes writers so lines from concurrent producers never interleave.
static OUTPUT: Mutex<()> = Mutex::new(());

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a timestamp and a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let line = format!("{} {} {message}", stamp(), colorize_prefix(module));
    let _guard = OUTPUT.lock();
    let mut stdout = stdout().lock();
    writeln!(stdout, "{line}").ok();
    stdout.flush().ok();
}

/// Print an error.
///
/// Compile failures and stylesheet syntax errors already carry a rendered
/// diagnostic, so only that and any context around it is printed. Anything
/// else is printed with its full cause chain.
pub fn report(err: &anyhow::Error) {
    let line = format!("{} {} {}", stamp(), "ERROR:".bright_red().bold(), render(err));
    let _guard = OUTPUT.lock();
    let mut stderr = stderr().lock();
    writeln!(stderr, "{line}").ok();
    stderr.flush().ok();
}

fn render(err: &anyhow::Error) -> String {
    match err.chain().position(is_diagnostic) {
        Some(last) => err
            .chain()
            .take(last + 1)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": "),
        None => format!("{err:?}"),
    }
}

/// Whether the error (or one of its causes) is a user-facing diagnostic
/// rather than an infrastructure failure.
fn is_rendered_diagnostic(err: &anyhow::Error) -> bool {
    err.chain().any(is_diagnostic)
}

fn is_diagnostic(cause: &(dyn std::error::Error + 'static)) -> bool {
    matches!(cause.downcast_ref::<CssError>(), Some(CssError::Syntax(_)))
        || matches!(
            cause.downcast_ref::<BundlerError>(),
            Some(BundlerError::Compile { .. })
        )
}

/// Current local time as `[HH:MM:SS]`, dimmed.
fn stamp() -> String {
    let now = chrono::Local::now().format("%H:%M:%S");
    format!("[{now}]").dimmed().to_string()
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" => prefix.bright_blue().bold().to_string(),
        "watch" | "mirror" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        "warn" | "config" => prefix.bright_magenta().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::StylesheetSyntaxError;

    #[test]
    fn test_syntax_error_is_rendered_diagnostic() {
        let err = anyhow::Error::new(CssError::Syntax(StylesheetSyntaxError {
            filename: "a.css".into(),
            message: "Unexpected token".into(),
            snippet: String::new(),
        }));
        assert!(is_rendered_diagnostic(&err));
    }

    #[test]
    fn test_compile_error_is_rendered_diagnostic() {
        let err = anyhow::Error::new(BundlerError::Compile {
            diagnostics: "error: x".into(),
        });
        assert!(is_rendered_diagnostic(&err));
    }

    #[test]
    fn test_io_error_is_not_rendered_diagnostic() {
        let err = anyhow::Error::new(std::io::Error::other("disk full"));
        assert!(!is_rendered_diagnostic(&err));
        let err = anyhow::Error::new(CssError::Empty);
        assert!(!is_rendered_diagnostic(&err));
    }

    #[test]
    fn test_context_keeps_diagnostic_detection() {
        use anyhow::Context;
        let res: Result<(), BundlerError> = Err(BundlerError::Compile {
            diagnostics: "boom".into(),
        });
        let err = res.context("bundling").unwrap_err();
        assert!(is_rendered_diagnostic(&err));
    }

    #[test]
    fn test_render_keeps_context_and_snippet() {
        use anyhow::Context;
        let res: Result<(), CssError> = Err(CssError::Syntax(StylesheetSyntaxError {
            filename: "app.css".into(),
            message: "Unexpected token".into(),
            snippet: "> 1 | ..b {".into(),
        }));
        let err = res.context("stylesheet rebuild").unwrap_err();
        let text = render(&err);
        assert!(text.starts_with("stylesheet rebuild: "), "{text}");
        assert!(text.contains("> 1 | ..b {"), "{text}");
        assert_eq!(text.matches("Unexpected token").count(), 1, "{text}");
    }

    #[test]
    fn test_render_plain_error_with_causes() {
        use anyhow::Context;
        let res: Result<(), std::io::Error> = Err(std::io::Error::other("disk full"));
        let text = render(&res.context("failed to write index.html").unwrap_err());
        assert!(text.contains("failed to write index.html"));
        assert!(text.contains("disk full"));
    }

    #[test]
    fn test_stamp_shape() {
        // "[HH:MM:SS]" plus ANSI codes
        assert!(stamp().contains(':'));
    }
}
