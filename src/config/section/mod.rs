//! Configuration section definitions.
//!
//! Each module corresponds to a section in `brisk.toml`:
//!
//! | Module    | TOML Section | Purpose                                  |
//! |-----------|--------------|------------------------------------------|
//! | `build`   | `[build]`    | Output layout, base path, mode, template |
//! | `css`     | `[css]`      | Stylesheet sources and transforms        |
//! | `bundler` | `[bundler]`  | External script bundler command          |
//! | `serve`   | `[serve]`    | Development server                       |

mod build;
pub(crate) use build::normalize_base_path;
mod bundler;
mod css;
mod serve;

pub use build::{BuildConfig, Mode};
pub use bundler::BundlerConfig;
pub use css::{Browserslist, CssConfig};
pub use serve::ServeConfig;
