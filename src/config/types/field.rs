//! Config field path.

use owo_colors::OwoColorize;
use std::fmt;

/// A dotted path naming a `brisk.toml` field in diagnostics.
///
/// Sections expose their paths as associated constants:
///
/// ```ignore
/// impl BundlerConfig {
///     pub const COMMAND: FieldPath = FieldPath::new("bundler.command");
/// }
///
/// diag.error(BundlerConfig::COMMAND, "must not be empty");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(pub &'static str);

impl FieldPath {
    #[inline]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_args!("`{}`", self.0).bright_blue())
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path() {
        const PORT: FieldPath = FieldPath::new("serve.port");
        assert_eq!(PORT.as_str(), "serve.port");
        assert!(PORT.to_string().contains("serve.port"));
    }
}
