//! Watch-mode driver: compile once, then again on every source change.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{BundleEvent, Bundler, BundlerError};
use crate::watcher::ChangeStream;

/// A prepared bundler with its change stream attached.
pub struct BundlerWatch {
    bundler: Arc<dyn Bundler>,
    stream: ChangeStream,
}

impl BundlerWatch {
    /// Validate the setup and attach the watcher.
    ///
    /// Every error returned here is a setup error.
    pub fn start(bundler: Arc<dyn Bundler>) -> Result<Self, BundlerError> {
        bundler.prepare()?;
        let stream = ChangeStream::watch(&bundler.watch_paths())
            .map_err(|e| BundlerError::Setup(format!("failed to watch bundler sources: {e}")))?;
        Ok(Self { bundler, stream })
    }

    /// Compile now and after every change batch, sending each outcome.
    ///
    /// Returns when the receiver is dropped or the watcher stops.
    pub async fn run(mut self, tx: mpsc::Sender<BundleEvent>) {
        loop {
            let bundler = Arc::clone(&self.bundler);
            let event = match tokio::task::spawn_blocking(move || bundler.run()).await {
                Ok(result) => BundleEvent::new(result),
                Err(e) => BundleEvent::new(Err(BundlerError::Io(std::io::Error::other(e)))),
            };
            if tx.send(event).await.is_err() {
                return;
            }

            let Some(changes) = self.stream.next().await else {
                return;
            };
            for change in &changes {
                crate::debug!("bundler"; "{}: {}", change.kind.label(), change.path.display());
            }
        }
    }
}
