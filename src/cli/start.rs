//! Watch mode: build, serve, rebuild on change.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::{
    bundler::CommandBundler, config::SiteConfig, core::shutdown_signal, css::Concatenator, log,
    orchestrator::Coordinator,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Run the watch session until Ctrl+C or a setup error.
pub fn start_site(config: SiteConfig) -> Result<()> {
    log!("brisk"; "Starting brisk. Wait ...");

    let config = Arc::new(config);
    let bundler = Arc::new(CommandBundler::from_config(&config));
    let concatenator = Arc::new(Concatenator::new());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let signal = shutdown_signal();
    let result = rt.block_on(async {
        let coordinator = Coordinator::new(config, bundler, concatenator);
        let shutdown = tokio::task::spawn_blocking(move || signal.recv());

        tokio::select! {
            result = coordinator.run() => result,
            _ = shutdown => Ok(()),
        }
    });

    // A bundler run may still be in flight on the blocking pool.
    rt.shutdown_timeout(SHUTDOWN_GRACE);
    result
}
