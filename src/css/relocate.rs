//! Copies assets referenced by `url()` next to the stylesheet output.
//!
//! `url(../fonts/a.woff2?v=2)` in `src/styles/app.css` becomes
//! `url(a-<hash>.woff2?v=2)` and the font is copied to the output
//! directory under that name. The hash covers the file content, so an
//! existing copy is never rewritten.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lightningcss::stylesheet::StyleSheet;
use lightningcss::values::url::Url;
use lightningcss::visit_types;
use lightningcss::visitor::{Visit, VisitTypes, Visitor};
use percent_encoding::percent_decode_str;

use super::{CssError, Transform, TransformContext};
use crate::utils::{hash, path::route};

/// Rewrites local `url()` references to hashed copies in the output directory.
pub struct AssetRelocation;

impl AssetRelocation {
    pub const NAME: &'static str = "relocate-assets";
}

impl Transform for AssetRelocation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(
        &self,
        sheet: &mut StyleSheet<'_>,
        ctx: &mut TransformContext<'_>,
    ) -> Result<(), CssError> {
        // Remote stylesheets keep their references
        let Some(base_dir) = ctx.source.base_dir() else {
            return Ok(());
        };
        let mut relocator = Relocator {
            base_dir,
            output_dir: ctx.output_dir,
            relocated: &mut ctx.relocated,
        };
        let result = sheet.visit(&mut relocator);
        result.map_err(|e| ctx.error(Self::NAME, e))
    }
}

struct Relocator<'a> {
    base_dir: &'a Path,
    output_dir: &'a Path,
    relocated: &'a mut Vec<PathBuf>,
}

impl<'i> Visitor<'i> for Relocator<'_> {
    type Error = io::Error;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(URLS)
    }

    fn visit_url(&mut self, url: &mut Url<'i>) -> Result<(), Self::Error> {
        if let Some(rewritten) = self.relocate(&url.url)? {
            url.url = rewritten.into();
        }
        Ok(())
    }
}

impl Relocator<'_> {
    /// Copy the referenced file and return the rewritten reference, or
    /// `None` to leave it untouched.
    fn relocate(&mut self, reference: &str) -> io::Result<Option<String>> {
        if !is_relocatable(reference) {
            return Ok(None);
        }

        let (path, suffix) = route::split_suffix(reference);
        let decoded: Cow<'_, str> = percent_decode_str(path).decode_utf8_lossy();
        let asset = self.base_dir.join(decoded.as_ref());
        if !asset.is_file() {
            crate::log!("css"; "asset not found, leaving `{}` as is: {}", reference, asset.display());
            return Ok(None);
        }

        let name = copy_hashed(&asset, self.output_dir)?;
        self.relocated.push(self.output_dir.join(&name));
        Ok(Some(format!("{name}{suffix}")))
    }
}

/// Relative references only: no scheme (`data:`, `https:`), no
/// fragment-only (`#id`) and no root-absolute (`/img.png`) references.
fn is_relocatable(reference: &str) -> bool {
    let (path, _) = route::split_suffix(reference);
    !path.is_empty()
        && !path.starts_with('/')
        && !reference.starts_with('#')
        && !route::is_external_link(reference)
}

/// Copy `asset` into `output_dir` as `<stem>-<hash>.<ext>`, skipping the
/// copy when that file already exists. Returns the new file name.
fn copy_hashed(asset: &Path, output_dir: &Path) -> io::Result<String> {
    let bytes = fs::read(asset)?;
    let name = hash::hashed_file_name(asset, &hash::fingerprint(&bytes));
    let dest: PathBuf = output_dir.join(&name);
    if !dest.exists() {
        fs::create_dir_all(output_dir)?;
        fs::write(&dest, &bytes)?;
        crate::debug!("css"; "copied {} -> {}", asset.display(), dest.display());
    }
    Ok(name)
}
