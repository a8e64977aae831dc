//! Error types for the import pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an import pass.
///
/// Failed requests are not errors: loaders report them as `false` and the
/// traversal moves on.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Reading a file or listing a directory failed
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The namespace prefix file could not be loaded
    #[error("Failed to read prefix file {}: {source}", .path.display())]
    Prefix {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ImportError::Io {
            path: path.into(),
            source,
        }
    }
}
