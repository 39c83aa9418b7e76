//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::utils::path::route;

/// Strip the site base path from a request URL.
///
/// `/app/x.js` under `/app` → `/x.js`; URLs outside the base path → `None`.
pub fn strip_base_path<'a>(url: &'a str, base_path: &str) -> Option<&'a str> {
    let (path, _) = route::split_suffix(url);
    if base_path == "/" {
        return Some(path);
    }
    match path.strip_prefix(base_path) {
        Some("") => Some("/"),
        Some(rest) if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

/// Whether the request targets `/` itself (query string allowed).
pub fn is_site_root(url: &str) -> bool {
    route::split_suffix(url).0 == "/"
}

/// Resolve URL to filesystem path, handling index.html for directories
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|seg| seg == "..") {
        return None;
    }

    let local = serve_root.join(&clean);

    // Canonicalize to resolve symlinks and verify path is under serve_root
    let canonical = local.canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Client-side routes look like `/users/42`: no extension in the last segment.
pub fn is_history_route(url: &str) -> bool {
    let (path, _) = route::split_suffix(url);
    let last = path.rsplit('/').next().unwrap_or("");
    !last.contains('.')
}

/// Normalize URL: decode, strip query string, trim slashes
fn normalize_url(url: &str) -> String {
    let (path, _) = route::split_suffix(url);
    percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default()
        .trim_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_site_root() {
        assert!(is_site_root("/"));
        assert!(is_site_root("/?x=1"));
        assert!(!is_site_root("/app/"));
        assert!(!is_site_root("/index.html"));
    }

    #[test]
    fn test_strip_base_path() {
        assert_eq!(strip_base_path("/a.js?v=1", "/"), Some("/a.js"));
        assert_eq!(strip_base_path("/app/a.js", "/app"), Some("/a.js"));
        assert_eq!(strip_base_path("/app", "/app"), Some("/"));
        assert_eq!(strip_base_path("/app/", "/app"), Some("/"));
        assert_eq!(strip_base_path("/apple/a.js", "/app"), None);
        assert_eq!(strip_base_path("/other", "/app"), None);
    }

    #[test]
    fn test_resolve_path() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("assets")).unwrap();
        fs::write(root.join("index.html"), "<html>").unwrap();
        fs::write(root.join("assets/a b.js"), "").unwrap();

        let canonical = root.canonicalize().unwrap();
        assert_eq!(resolve_path("/", root), Some(canonical.join("index.html")));
        assert_eq!(
            resolve_path("/assets/a%20b.js?x=1", root),
            Some(canonical.join("assets/a b.js"))
        );
        assert_eq!(resolve_path("/missing.js", root), None);
        assert_eq!(resolve_path("/../etc/passwd", root), None);
        assert_eq!(resolve_path("/assets", root), None);
    }

    #[test]
    fn test_is_history_route() {
        assert!(is_history_route("/users/42"));
        assert!(is_history_route("/"));
        assert!(!is_history_route("/assets/main.js"));
        assert!(!is_history_route("/favicon.ico?v=2"));
    }
}
