//! Depth-first tree walk driving a [`Visitor`].
//!
//! The walk uses an explicit worklist rather than recursion. A directory is
//! handed to [`Visitor::on_directory`] before any of its entries; the entries
//! of one directory are visited in file-name order, each subdirectory being
//! fully walked before its next sibling. Hidden entries (leading `.`) are
//! neither visited nor descended into. Symlinked directories are not followed.
//!
//! Visitor results never steer the walk: an `Ok` always continues, an `Err`
//! aborts the whole walk.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ImportError;

/// Callbacks for one walk.
#[async_trait]
pub trait Visitor: Send {
    async fn on_directory(&mut self, dir: &Path) -> Result<(), ImportError>;

    async fn on_file(&mut self, file: &Path) -> Result<(), ImportError>;
}

/// How many entries a walk visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub directories: usize,
    pub files: usize,
}

enum Entry {
    Directory(PathBuf),
    File(PathBuf),
}

/// Walks the tree under `root`, calling `visitor` once per directory and file.
pub async fn walk<V>(root: &Path, visitor: &mut V) -> Result<WalkStats, ImportError>
where
    V: Visitor + ?Sized,
{
    let metadata = fs::metadata(root).map_err(|e| ImportError::io(root, e))?;
    let mut stack = vec![if metadata.is_dir() {
        Entry::Directory(root.to_path_buf())
    } else {
        Entry::File(root.to_path_buf())
    }];
    let mut stats = WalkStats::default();

    while let Some(entry) = stack.pop() {
        match entry {
            Entry::Directory(dir) => {
                visitor.on_directory(&dir).await?;
                stats.directories += 1;
                let children = list_children(&dir)?;
                stack.extend(children.into_iter().rev());
            }
            Entry::File(file) => {
                visitor.on_file(&file).await?;
                stats.files += 1;
            }
        }
    }

    debug!(
        root = %root.display(),
        directories = stats.directories,
        files = stats.files,
        "Walk complete"
    );
    Ok(stats)
}

/// Visible entries of `dir`, sorted by file name.
fn list_children(dir: &Path) -> Result<Vec<Entry>, ImportError> {
    let mut named = Vec::new();
    for entry_res in fs::read_dir(dir).map_err(|e| ImportError::io(dir, e))? {
        let entry = entry_res.map_err(|e| ImportError::io(dir, e))?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            debug!(path = %entry.path().display(), "Skipping hidden entry");
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| ImportError::io(&path, e))?;
        let child = if file_type.is_dir() {
            Entry::Directory(path)
        } else if file_type.is_file() {
            Entry::File(path)
        } else if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(target) if target.is_file() => Entry::File(path),
                Ok(_) => {
                    debug!(path = %path.display(), "Not following symlinked directory");
                    continue;
                }
                Err(e) => {
                    debug!(path = %path.display(), error = ?e, "Skipping dangling symlink");
                    continue;
                }
            }
        } else {
            debug!(path = %path.display(), "Skipping special file");
            continue;
        };
        named.push((name, child));
    }
    named.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(named.into_iter().map(|(_, child)| child).collect())
}
