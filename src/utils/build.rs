//! Output directory operations.

use std::fs;
use std::io;
use std::path::Path;

/// Empty the output directory, creating it if needed.
pub fn clean_output(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("_site");

        clean_output(&out).unwrap();
        assert!(out.is_dir());

        fs::write(out.join("stale.js"), "").unwrap();
        clean_output(&out).unwrap();
        assert!(out.is_dir());
        assert!(!out.join("stale.js").exists());
    }
}
