//! Path and URL utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `resolve_path`)
//! - [`route`]: URL utilities (`is_external_link`, `split_suffix`, `join_url`)

pub mod fs;
pub mod route;

pub use fs::{normalize_path, resolve_path};
