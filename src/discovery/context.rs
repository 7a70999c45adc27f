//! The shared, read-only view of a project tree handed to every scanner.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::DiscoveryError;
use crate::config::DiscoveryConfig;

/// Cloneable cancellation flag for long discovery passes.
///
/// Raising it stops the directory walk and makes scanners return what they
/// have collected so far.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Lower the flag so the signal can be reused for another pass.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A regular file found under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub size: u64,
}

impl SourceFile {
    pub fn file_name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or("")
    }

    pub fn stem(&self) -> &str {
        self.path.file_stem().and_then(|n| n.to_str()).unwrap_or("")
    }

    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension()
            .map_or(false, |ext| extensions.contains(&ext.as_str()))
    }
}

/// Everything a scanner may look at during one pass.
#[derive(Debug)]
pub struct ScanContext {
    pub root: PathBuf,
    pub files: Vec<SourceFile>,
    pub abort: AbortSignal,
}

impl ScanContext {
    /// Walk `root` once and capture the file list.
    pub async fn build(
        root: &Path,
        config: &DiscoveryConfig,
        abort: AbortSignal,
    ) -> Result<Self, DiscoveryError> {
        let files = walk(root, config, &abort).await?;
        Ok(Self {
            root: root.to_path_buf(),
            files,
            abort,
        })
    }

    /// Files whose extension is one of `extensions`.
    pub fn files_with_extensions<'a>(
        &'a self,
        extensions: &'a [&'a str],
    ) -> impl Iterator<Item = &'a SourceFile> + 'a {
        self.files.iter().filter(move |f| f.has_extension(extensions))
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Read a file as UTF-8.
    ///
    /// Binary files and files that vanished or became unreadable since the
    /// walk yield `None`; the failure is logged and the scanner moves on.
    pub async fn read(&self, file: &SourceFile) -> Option<String> {
        match tokio::fs::read_to_string(&file.path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                log::debug!("Skipping non-UTF-8 file {}", file.path.display());
                None
            }
            Err(e) => {
                log::warn!("Skipping unreadable {}: {}", file.path.display(), e);
                None
            }
        }
    }
}

/// Depth-first walk honouring `ignore_dirs`, `max_depth` and `max_file_size`.
///
/// Symlinks are not followed. The result is sorted by path so every scanner
/// sees files in the same order.
async fn walk(
    root: &Path,
    config: &DiscoveryConfig,
    abort: &AbortSignal,
) -> Result<Vec<SourceFile>, DiscoveryError> {
    let meta = tokio::fs::metadata(root)
        .await
        .map_err(|_| DiscoveryError::InvalidRoot(root.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(DiscoveryError::InvalidRoot(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let mut stack = vec![(root.to_path_buf(), 0usize)];

    while let Some((dir, depth)) = stack.pop() {
        if abort.is_aborted() {
            log::info!("Discovery walk aborted after {} files", files.len());
            break;
        }

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot read directory {}: {}", dir.display(), e);
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Error listing {}: {}", dir.display(), e);
                    break;
                }
            };
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    log::debug!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            let path = entry.path();

            if file_type.is_dir() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if config.ignore_dirs.iter().any(|d| d.as_str() == name) {
                    continue;
                }
                if depth < config.max_depth {
                    stack.push((path, depth + 1));
                }
            } else if file_type.is_file() {
                let size = match entry.metadata().await {
                    Ok(m) => m.len(),
                    Err(_) => continue,
                };
                if size > config.max_file_size {
                    log::debug!("Skipping {} ({} bytes)", path.display(), size);
                    continue;
                }
                files.push(SourceFile { path, size });
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
