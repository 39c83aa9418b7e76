//! Static directory mirror.
//!
//! Copies the public directory into the output once, then turns debounced
//! change batches into [`MirrorIntent`]s. Intents carry no I/O of their own:
//! the caller logs them and then hands them to [`Mirror::commit`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rayon::prelude::*;

use crate::utils::path::normalize_path;
use crate::watcher::{Change, ChangeKind, ChangeStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorKind {
    Copy,
    Delete,
}

/// A pending replication step, relative to both mirror roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorIntent {
    pub relative_path: PathBuf,
    pub kind: MirrorKind,
}

impl MirrorIntent {
    pub fn copy(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: MirrorKind::Copy,
        }
    }

    pub fn delete(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: MirrorKind::Delete,
        }
    }

    /// `Copying robots.txt` / `Deleting img/old.png`
    pub fn describe(&self) -> String {
        let verb = match self.kind {
            MirrorKind::Copy => "Copying",
            MirrorKind::Delete => "Deleting",
        };
        format!("{verb} {}", self.relative_path.display())
    }
}

/// Copy every non-hidden file below `source_dir` into `dest_dir`.
///
/// A missing source directory copies nothing. Returns the number of files copied.
pub fn copy_all(source_dir: &Path, dest_dir: &Path) -> io::Result<usize> {
    if !source_dir.is_dir() {
        return Ok(0);
    }

    let files: Vec<PathBuf> = WalkDir::new(source_dir)
        .skip_hidden(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect();

    files.par_iter().try_for_each(|src| {
        let rel = src.strip_prefix(source_dir).unwrap_or(src);
        copy_file(src, &dest_dir.join(rel))
    })?;
    Ok(files.len())
}

fn copy_file(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dest).map(|_| ())
}

/// The two roots of a mirror.
#[derive(Debug, Clone)]
pub struct Mirror {
    source_dir: PathBuf,
    dest_dir: PathBuf,
}

impl Mirror {
    pub fn new(source_dir: impl AsRef<Path>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: normalize_path(source_dir.as_ref()),
            dest_dir: dest_dir.into(),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn copy_all(&self) -> io::Result<usize> {
        copy_all(&self.source_dir, &self.dest_dir)
    }

    /// Translate watcher changes into intents. Paths outside the source
    /// directory are dropped.
    pub fn intents(&self, changes: &[Change]) -> Vec<MirrorIntent> {
        changes
            .iter()
            .filter_map(|change| {
                let rel = change.path.strip_prefix(&self.source_dir).ok()?;
                if rel.as_os_str().is_empty() {
                    return None;
                }
                Some(match change.kind {
                    ChangeKind::Created | ChangeKind::Modified => MirrorIntent::copy(rel),
                    ChangeKind::Removed => MirrorIntent::delete(rel),
                })
            })
            .collect()
    }

    /// Perform the I/O for one intent.
    ///
    /// Copying a directory copies it recursively. Deleting something that is
    /// already gone is not an error.
    pub fn commit(&self, intent: &MirrorIntent) -> io::Result<()> {
        let src = self.source_dir.join(&intent.relative_path);
        let dest = self.dest_dir.join(&intent.relative_path);

        match intent.kind {
            MirrorKind::Copy if src.is_dir() => copy_all(&src, &dest).map(|_| ()),
            MirrorKind::Copy => copy_file(&src, &dest),
            MirrorKind::Delete => {
                let result = if dest.is_dir() {
                    fs::remove_dir_all(&dest)
                } else {
                    fs::remove_file(&dest)
                };
                match result {
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    other => other,
                }
            }
        }
    }
}

/// Incremental replication: a change stream over the source directory.
pub struct MirrorWatch {
    mirror: Mirror,
    stream: ChangeStream,
}

impl MirrorWatch {
    pub fn watch(mirror: Mirror) -> notify::Result<Self> {
        let stream = ChangeStream::watch(&[mirror.source_dir.clone()])?;
        Ok(Self { mirror, stream })
    }

    /// Next batch of intents; `None` once the watcher has shut down.
    pub async fn next(&mut self) -> Option<Vec<MirrorIntent>> {
        loop {
            let changes = self.stream.next().await?;
            let intents = self.mirror.intents(&changes);
            if !intents.is_empty() {
                return Some(intents);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("public");
        let dest = dir.path().join("out");
        fs::create_dir_all(src.join("img/icons")).unwrap();
        fs::write(src.join("robots.txt"), "User-agent: *").unwrap();
        fs::write(src.join("img/icons/a.svg"), "<svg/>").unwrap();
        fs::write(src.join(".secret"), "x").unwrap();
        (dir, src, dest)
    }

    #[test]
    fn test_copy_all_skips_hidden() {
        let (_dir, src, dest) = setup();
        assert_eq!(copy_all(&src, &dest).unwrap(), 2);
        assert_eq!(fs::read_to_string(dest.join("robots.txt")).unwrap(), "User-agent: *");
        assert!(dest.join("img/icons/a.svg").exists());
        assert!(!dest.join(".secret").exists());
    }

    #[test]
    fn test_copy_all_missing_source() {
        let dir = TempDir::new().unwrap();
        assert_eq!(copy_all(&dir.path().join("nope"), &dir.path().join("out")).unwrap(), 0);
    }

    #[test]
    fn test_intents_from_changes() {
        let (_dir, src, dest) = setup();
        let mirror = Mirror::new(&src, &dest);
        let root = mirror.source_dir().to_path_buf();
        let changes = vec![
            Change { path: root.join("robots.txt"), kind: ChangeKind::Modified },
            Change { path: root.join("img/old.png"), kind: ChangeKind::Removed },
            Change { path: root.clone(), kind: ChangeKind::Modified },
            Change { path: PathBuf::from("/elsewhere/x"), kind: ChangeKind::Created },
        ];
        assert_eq!(
            mirror.intents(&changes),
            [MirrorIntent::copy("robots.txt"), MirrorIntent::delete("img/old.png")]
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(MirrorIntent::copy("robots.txt").describe(), "Copying robots.txt");
        assert_eq!(MirrorIntent::delete("a.png").describe(), "Deleting a.png");
    }

    #[test]
    fn test_commit() {
        let (_dir, src, dest) = setup();
        let mirror = Mirror::new(&src, &dest);

        mirror.commit(&MirrorIntent::copy("robots.txt")).unwrap();
        assert!(dest.join("robots.txt").exists());

        // Directory adds are copied recursively
        mirror.commit(&MirrorIntent::copy("img")).unwrap();
        assert!(dest.join("img/icons/a.svg").exists());

        mirror.commit(&MirrorIntent::delete("robots.txt")).unwrap();
        assert!(!dest.join("robots.txt").exists());
        mirror.commit(&MirrorIntent::delete("img")).unwrap();
        assert!(!dest.join("img").exists());

        // Already gone
        mirror.commit(&MirrorIntent::delete("robots.txt")).unwrap();
    }

    #[test]
    fn test_commit_copy_of_vanished_file_fails() {
        let (_dir, src, dest) = setup();
        let mirror = Mirror::new(&src, &dest);
        assert!(mirror.commit(&MirrorIntent::copy("gone.txt")).is_err());
    }
}
