//! Debounced file-system change streams.
//!
//! ```text
//! notify (sync callback) → bridge thread → Debouncer (pure timing) → batches
//! ```
//!
//! The watcher is attached when the stream is created, so changes made while
//! the caller is still busy (e.g. the initial copy) are buffered, not lost.

mod debouncer;


use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;

use crate::utils::path::normalize_path;
use debouncer::Debouncer;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// One debounced change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Which paths a stream reports.
///
/// Directories report everything below them. Files are watched through their
/// parent directory (editors often replace files instead of writing them in
/// place) and only changes to the file itself are reported.
#[derive(Debug, Default)]
struct Scope {
    dirs: Vec<PathBuf>,
    files: FxHashSet<PathBuf>,
}

impl Scope {
    fn contains(&self, path: &Path) -> bool {
        self.files.contains(path) || self.dirs.iter().any(|dir| path.starts_with(dir))
    }
}

/// A stream of debounced change batches for a set of files and directories.
pub struct ChangeStream {
    rx: mpsc::Receiver<notify::Event>,
    debouncer: Debouncer,
    scope: Scope,
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
}

impl ChangeStream {
    /// Start watching `targets`. Missing targets are skipped.
    pub fn watch(targets: &[PathBuf]) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel::<notify::Event>(256);
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        // Bridge the sync notify callback into the async channel.
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        let mut scope = Scope::default();
        let mut watched_parents = FxHashSet::default();
        for target in targets {
            if target.is_dir() {
                watcher.watch(target, RecursiveMode::Recursive)?;
                scope.dirs.push(normalize_path(target));
            } else if target.is_file() {
                let file = normalize_path(target);
                if let Some(parent) = file.parent()
                    && watched_parents.insert(parent.to_path_buf())
                {
                    watcher.watch(parent, RecursiveMode::NonRecursive)?;
                }
                scope.files.insert(file);
            } else {
                crate::debug!("watch"; "skip missing path: {}", target.display());
            }
        }

        Ok(Self {
            rx,
            debouncer: Debouncer::new(),
            scope,
            _watcher: watcher,
        })
    }

    /// Wait for the next non-empty batch of changes.
    ///
    /// Returns `None` once the underlying watcher has shut down.
    pub async fn next(&mut self) -> Option<Vec<Change>> {
        loop {
            tokio::select! {
                biased;
                event = self.rx.recv() => {
                    self.debouncer.add_event(&event?);
                }
                _ = tokio::time::sleep(self.debouncer.sleep_duration()) => {
                    let Some(batch) = self.debouncer.take_if_ready() else {
                        continue;
                    };
                    let batch: Vec<_> = batch
                        .into_iter()
                        .filter(|change| self.scope.contains(&change.path))
                        .collect();
                    if !batch.is_empty() {
                        return Some(batch);
                    }
                }
            }
        }
    }
}
