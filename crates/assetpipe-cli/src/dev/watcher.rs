//! File system watcher with debouncing.
//!
//! Directories are watched recursively. A single file is watched through
//! its parent directory so that editors replacing the file on save keep
//! being noticed.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    /// Whether the file now has new content.
    pub fn is_write(&self) -> bool {
        !matches!(self, FileChange::Removed(_))
    }
}

#[derive(Debug, Clone)]
enum Target {
    Dir(PathBuf),
    File(PathBuf),
}

impl Target {
    fn contains(&self, path: &Path) -> bool {
        match self {
            Target::Dir(dir) => path.starts_with(dir),
            Target::File(file) => path == file,
        }
    }

    fn root(&self) -> &Path {
        match self {
            Target::Dir(dir) => dir,
            Target::File(file) => file.parent().unwrap_or(file),
        }
    }
}

/// Watches files and directories, sending debounced changes through a channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    paths: Vec<PathBuf>,
}

impl FileWatcher {
    /// Create a watcher for `paths`.
    ///
    /// Paths matching `ignore_patterns` (`name` for a path component,
    /// `*.ext` for an extension) and hidden files are skipped.
    pub fn new(
        paths: Vec<PathBuf>,
        ignore_patterns: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let mut targets = Vec::with_capacity(paths.len());
        for path in &paths {
            let Ok(canonical) = path.canonicalize() else {
                return Err(CliError::FileNotFound(path.clone()));
            };
            if canonical.is_dir() {
                targets.push(Target::Dir(canonical));
            } else {
                targets.push(Target::File(canonical));
            }
        }

        let (tx, rx) = mpsc::channel(100);

        let debounce = Duration::from_millis(debounce_ms);
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let handler_targets = targets.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            for path in &event.paths {
                if should_ignore(path, &handler_targets, &ignore_patterns) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };
                last_event = Some((path.clone(), now));

                let _ = tx.blocking_send(change);
            }
        })?;

        for target in &targets {
            match target {
                Target::Dir(dir) => watcher.watch(dir, RecursiveMode::Recursive)?,
                Target::File(_) => watcher.watch(target.root(), RecursiveMode::NonRecursive)?,
            }
        }

        Ok((
            Self {
                _watcher: watcher,
                paths,
            },
            rx,
        ))
    }

    /// Paths being watched.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

fn should_ignore(path: &Path, targets: &[Target], ignore_patterns: &[String]) -> bool {
    let Some(target) = targets.iter().find(|t| t.contains(path)) else {
        return true;
    };

    let rel_path = match path.strip_prefix(target.root()) {
        Ok(p) => p,
        Err(_) => return true,
    };

    for component in rel_path.components() {
        let Some(name) = component.as_os_str().to_str() else {
            continue;
        };
        if name.starts_with('.') && name != "." && name != ".." {
            return true;
        }
        for pattern in ignore_patterns {
            match pattern.strip_prefix('*') {
                Some(ext) if name.ends_with(ext) => return true,
                None if name == pattern => return true,
                _ => {}
            }
        }
    }

    false
}
