//! One-shot site build.
//!
//! Build phases:
//! - **Clean** - empty the output directory
//! - **Bundle** - run the bundler command once
//! - **Stylesheets** - concatenate `[css].stylesheets` (hashed in production)
//! - **HTML** - render `index.html` against the fresh manifest
//! - **Mirror** - copy the public directory
//! - **Finalize** - drop the manifest, log

use std::fs;
use std::io::ErrorKind;

use anyhow::{Context, Result};

use crate::{
    asset::AssetPaths,
    bundler::{Bundler, CommandBundler},
    config::SiteConfig,
    css::{self, Concatenator},
    debug,
    html::HtmlCompiler,
    log, mirror,
    utils::build::clean_output,
};

/// Build the entire site once.
pub fn build_site(config: &SiteConfig) -> Result<()> {
    build_with(config, &CommandBundler::from_config(config), &Concatenator::new())
}

/// Build with explicit collaborators.
pub fn build_with(
    config: &SiteConfig,
    bundler: &dyn Bundler,
    concatenator: &Concatenator,
) -> Result<()> {
    let output_dir = config.output_dir();
    clean_output(output_dir)
        .with_context(|| format!("failed to clean {}", output_dir.display()))?;

    bundler.prepare()?;
    let stats = bundler.run()?;
    debug!("build"; "{} chunks in {:?} ({})", stats.chunks, stats.duration, stats.generation.short());
    log!("build"; "Compiled JS.");

    let stylesheet = if config.css.is_enabled() {
        let output = css::compile_site(concatenator, config)?;
        log!("build"; "Compiled CSS.");
        Some(output.output_path)
    } else {
        None
    };

    let assets = AssetPaths::from_config(config, stylesheet);
    HtmlCompiler::from_config(config).compile(&assets)?;

    let copied = mirror::copy_all(&config.build.public, output_dir)
        .context("failed to copy the public directory")?;
    debug!("mirror"; "copied {} files", copied);

    remove_manifest(&assets)?;
    log!("build"; "Finished building your site.");
    Ok(())
}

/// The manifest is a build intermediate; the deployed site doesn't need it.
fn remove_manifest(assets: &AssetPaths) -> Result<()> {
    let path = assets.manifest_path();
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            Err(e).with_context(|| format!("failed to remove {}", path.display()))
        }
        _ => Ok(()),
    }
}
