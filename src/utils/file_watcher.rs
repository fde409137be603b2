use anyhow::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use crate::constants::SOURCE_EXTENSIONS;

/// Events that we care about for the file system, source files only
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created(Vec<PathBuf>),
    Modified(Vec<PathBuf>),
    Deleted(Vec<PathBuf>),
}

/// A file system watcher that monitors changes in a directory
pub struct FileSystemWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<Result<Event, notify::Error>>,
    root: PathBuf,
}

impl FileSystemWatcher {
    /// Create a new file system watcher for the given path
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |event| {
            let _ = tx.send(event);
        })?;

        // Watch the path recursively
        watcher.watch(path, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            root: path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
        })
    }

    /// Check for any file system events (non-blocking)
    pub fn check_events(&self) -> Vec<FileEvent> {
        let mut events = Vec::new();

        // Process all available events
        while let Ok(Ok(event)) = self.rx.try_recv() {
            let paths = self.relevant(event.paths);
            if paths.is_empty() {
                continue;
            }
            match event.kind {
                EventKind::Create(_) => events.push(FileEvent::Created(paths)),
                EventKind::Modify(modify_kind) => {
                    // Filter out metadata-only changes
                    use notify::event::ModifyKind;
                    match modify_kind {
                        ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Name(_) => {
                            events.push(FileEvent::Modified(paths))
                        },
                        _ => {}, // Ignore metadata changes
                    }
                },
                EventKind::Remove(_) => events.push(FileEvent::Deleted(paths)),
                _ => {}, // Ignore other events
            }
        }

        events
    }

    /// Keep source files, judged relative to the watched root
    fn relevant(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths
            .into_iter()
            .filter(|p| {
                let relative = p
                    .strip_prefix(&self.root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| p.file_name().map(PathBuf::from).unwrap_or_default());
                !Self::should_ignore_path(&relative)
            })
            .collect()
    }

    /// Check if a path should be ignored (hidden files, build output, non-source files)
    pub fn should_ignore_path(path: &Path) -> bool {
        // Ignore hidden files and directories anywhere in the path
        let hidden = path.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        });
        if hidden {
            return true;
        }

        // Ignore common build/cache directories
        let in_build_dir = path.components().any(|c| {
            matches!(
                c.as_os_str().to_str(),
                Some("target" | "node_modules" | "__pycache__" | "dist" | "build" | "venv")
            )
        });
        if in_build_dir {
            return true;
        }

        !is_source_file(path)
    }
}

/// Whether the analyzer is expected to understand this file
pub fn is_source_file(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => SOURCE_EXTENSIONS.contains(&ext),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_should_ignore_path() {
        assert!(FileSystemWatcher::should_ignore_path(Path::new(".hidden.py")));
        assert!(FileSystemWatcher::should_ignore_path(Path::new(".venv/lib/site.py")));
        assert!(FileSystemWatcher::should_ignore_path(Path::new("node_modules/pkg/index.js")));
        assert!(FileSystemWatcher::should_ignore_path(Path::new("__pycache__/a.py")));
        assert!(FileSystemWatcher::should_ignore_path(Path::new("image.png")));
        assert!(FileSystemWatcher::should_ignore_path(Path::new("README.md")));

        assert!(!FileSystemWatcher::should_ignore_path(Path::new("main.py")));
        assert!(!FileSystemWatcher::should_ignore_path(Path::new("src/lib.rs")));
        assert!(!FileSystemWatcher::should_ignore_path(Path::new("./app/views.ts")));
    }

    #[tokio::test]
    async fn test_file_watcher_events() {
        let temp_dir = TempDir::new().unwrap();
        let watcher = FileSystemWatcher::new(temp_dir.path()).unwrap();

        // Create a file
        let test_file = temp_dir.path().join("test.py");
        fs::write(&test_file, "def f(): pass").unwrap();

        // Give the watcher time to detect the change
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let events = watcher.check_events();
        assert!(!events.is_empty(), "Should have detected file creation");
    }
}
