//! Two-pass import: create everything, then patch.
//!
//! [`run_import`] loads the prefix preamble, walks the tree once in CREATE
//! mode and, once that pass has finished, walks it again in UPDATE mode with
//! the same finder. Only the mode changes between passes.
//!
//! # Error Handling
//! An I/O error aborts the running pass and is returned; later passes do not
//! run. Failed requests are logged by the loader and never surface here.

use tracing::{error, info};

use crate::config::ImportConfig;
use crate::contract::RepositoryLoader;
use crate::error::ImportError;
use crate::finder::ResourceFinder;
use crate::mode::TraversalMode;
use crate::walk::{walk, WalkStats};

/// Which passes to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassSelection {
    CreateOnly,
    UpdateOnly,
    #[default]
    Both,
}

impl PassSelection {
    pub fn modes(self) -> &'static [TraversalMode] {
        match self {
            PassSelection::CreateOnly => &[TraversalMode::Create],
            PassSelection::UpdateOnly => &[TraversalMode::Update],
            PassSelection::Both => &[TraversalMode::Create, TraversalMode::Update],
        }
    }
}

#[derive(Debug)]
pub struct ImportReport {
    pub passes: Vec<PassReport>,
}

/// What one pass walked over.
#[derive(Debug)]
pub struct PassReport {
    pub mode: TraversalMode,
    pub directories: usize,
    pub files: usize,
}

pub async fn run_import<L>(
    config: &ImportConfig,
    loader: &L,
    passes: PassSelection,
) -> Result<ImportReport, ImportError>
where
    L: RepositoryLoader + ?Sized,
{
    info!(root = %config.root.display(), ?passes, "[IMPORT] Starting import");
    let prefix = config.load_prefix().map_err(|e| {
        error!(error = %e, "[IMPORT][ERROR] Failed to load prefix file");
        e
    })?;

    let mut finder = ResourceFinder::new(
        config.root.clone(),
        loader,
        prefix,
        config.binary_formats.clone(),
    );

    let mut reports = Vec::new();
    for mode in passes.modes() {
        finder.set_mode(*mode);
        let stats = run_pass(&config.root, &mut finder).await?;
        reports.push(PassReport {
            mode: *mode,
            directories: stats.directories,
            files: stats.files,
        });
    }

    info!("[IMPORT] Import complete");
    Ok(ImportReport { passes: reports })
}

/// Walks the tree once with the finder's current mode.
pub async fn run_pass<L>(
    root: &std::path::Path,
    finder: &mut ResourceFinder<'_, L>,
) -> Result<WalkStats, ImportError>
where
    L: RepositoryLoader + ?Sized,
{
    let mode = finder.mode();
    info!(%mode, root = %root.display(), "[IMPORT] Starting pass");
    match walk(root, finder).await {
        Ok(stats) => {
            info!(
                %mode,
                directories = stats.directories,
                files = stats.files,
                "[IMPORT] Pass finished"
            );
            Ok(stats)
        }
        Err(e) => {
            error!(%mode, error = %e, "[IMPORT][ERROR] Pass aborted");
            Err(e)
        }
    }
}
