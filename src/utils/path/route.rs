//! URL processing utilities.

/// Check if a link carries a URL scheme (`http:`, `data:`, `mailto:`, ...).
///
/// # Examples
/// ```ignore
/// assert!(is_external_link("https://example.com"));
/// assert!(is_external_link("data:image/png;base64,AAAA"));
/// assert!(!is_external_link("./font.woff2"));
/// ```
#[inline]
pub fn is_external_link(link: &str) -> bool {
    link.find(':').is_some_and(|pos| {
        pos > 0
            && link[..pos]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Split a URL into its path and its `?query#fragment` suffix.
///
/// The suffix keeps its leading `?` or `#` so it can be appended verbatim.
#[inline]
pub fn split_suffix(url: &str) -> (&str, &str) {
    match url.find(['?', '#']) {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    }
}

/// Join a base path and a relative URL path with exactly one `/` between.
///
/// `join_url("/app/", "assets/main.js")` → `/app/assets/main.js`
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return format!("{base}/");
    }
    format!("{base}/{path}")
}
