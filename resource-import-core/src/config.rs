use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::ImportError;
use crate::formats::AllowedBinaryFormats;
use crate::payload::PrefixPreamble;

/// Resolved settings for one import run.
///
/// Built by the CLI from its YAML file and environment; the core never reads
/// configuration sources itself.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Directory tree to scan.
    pub root: PathBuf,
    /// Namespace prefix file; `None` selects the built-in prefixes.
    pub prefix_file: Option<PathBuf>,
    pub binary_formats: AllowedBinaryFormats,
}

impl ImportConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ImportConfig {
            root: root.into(),
            prefix_file: None,
            binary_formats: AllowedBinaryFormats::fallback(),
        }
    }

    /// Reads the prefix file. A configured but unreadable file is fatal.
    pub fn load_prefix(&self) -> Result<PrefixPreamble, ImportError> {
        match &self.prefix_file {
            Some(path) => {
                let prefix = PrefixPreamble::load(path)?;
                info!(path = %path.display(), bytes = prefix.len(), "Using prefix file");
                Ok(prefix)
            }
            None => {
                info!("Using default prefix file");
                Ok(PrefixPreamble::default_prefixes())
            }
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            root = %self.root.display(),
            prefix_file = ?self.prefix_file,
            binary_formats = self.binary_formats.len(),
            "Loaded ImportConfig"
        );
        debug!(?self, "ImportConfig loaded (full debug)");
    }
}
