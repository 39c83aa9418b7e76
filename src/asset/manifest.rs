//! The bundler's asset manifest.
//!
//! ```json
//! {
//!   "runtime": { "js": "/assets/runtime.js" },
//!   "main": { "js": "/assets/main.js", "css": ["/assets/main.css"] },
//!   "vendor": { "js": "/assets/vendor.js" }
//! }
//! ```
//!
//! `css` may be a single string or an array.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const MAIN: &str = "main";
pub const VENDOR: &str = "vendor";
pub const RUNTIME: &str = "runtime";
pub const POLYFILL: &str = "polyfill";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest `{path}`")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Public URLs emitted for one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAssets {
    #[serde(default)]
    pub js: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub css: Vec<String>,
}

/// Chunk name → assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    chunks: BTreeMap<String, ChunkAssets>,
}

impl AssetManifest {
    /// Read and parse the manifest at `path`.
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let bytes = std::fs::read(path).map_err(|e| ManifestError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn chunk(&self, name: &str) -> Option<&ChunkAssets> {
        self.chunks.get(name)
    }

    /// Script URL of a chunk, if the chunk exists and has one.
    pub fn js(&self, name: &str) -> Option<&str> {
        self.chunk(name).and_then(|c| c.js.as_deref())
    }

    /// Stylesheets of the `main` chunk.
    pub fn main_css(&self) -> &[String] {
        self.chunk(MAIN).map(|c| c.css.as_slice()).unwrap_or_default()
    }

    /// Every URL referenced by the manifest, in chunk-name order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.chunks
            .values()
            .flat_map(|c| c.js.iter().chain(c.css.iter()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AssetManifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = parse(
            r#"{
                "main": { "js": "/assets/main.js", "css": ["/assets/main.css"] },
                "runtime": { "js": "/assets/runtime.js" }
            }"#,
        );
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.js(MAIN), Some("/assets/main.js"));
        assert_eq!(manifest.js(RUNTIME), Some("/assets/runtime.js"));
        assert_eq!(manifest.js(VENDOR), None);
        assert_eq!(manifest.main_css(), ["/assets/main.css"]);
    }

    #[test]
    fn test_css_single_string() {
        let manifest = parse(r#"{ "main": { "js": "/m.js", "css": "/m.css" } }"#);
        assert_eq!(manifest.main_css(), ["/m.css"]);
    }

    #[test]
    fn test_missing_main_has_no_css() {
        let manifest = parse(r#"{ "vendor": { "js": "/v.js" } }"#);
        assert!(manifest.main_css().is_empty());
        assert_eq!(manifest.urls().collect::<Vec<_>>(), ["/v.js"]);
    }

    #[test]
    fn test_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        assert!(matches!(
            AssetManifest::read(&path),
            Err(ManifestError::Read { .. })
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AssetManifest::read(&path),
            Err(ManifestError::Parse { .. })
        ));
    }
}
