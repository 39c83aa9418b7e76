//! Content hashing using blake3.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let fp = hash::fingerprint("body{color:red}"); // -> "a1b2c3d4e5"
//! let name = hash::hashed_file_name(Path::new("style.css"), "a1b2c3d4e5"); // -> "style-a1b2c3d4e5.css"
//! ```

use std::path::Path;

/// Length of the hex fingerprint used in file names.
pub const FINGERPRINT_LEN: usize = 10;

/// Compute the full blake3 hash of byte data as hex.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    hex::encode(blake3::hash(data.as_ref()).as_bytes())
}

/// Compute a short hex fingerprint, suitable for cache-busting file names.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    let mut hex = compute(data);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Insert a fingerprint before the extension: `style.css` → `style-<fp>.css`.
pub fn hashed_file_name(path: &Path, fingerprint: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{stem}-{fingerprint}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{fingerprint}"),
    }
}
