//! Files compiled into the binary.

/// Entry document used when no template file is configured.
///
/// Uses the same `{{ name }}` placeholders as user templates, plus `title`.
pub const INDEX_HTML: &str = include_str!("html/index.html");
