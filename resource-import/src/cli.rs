///
/// This module implements the CLI interface for resource-import: command parsing,
/// configuration loading and the async entrypoint.
///
/// All traversal and dispatch logic lives in the [`resource-import-core`] crate.
/// This module is strictly CLI glue: it resolves configuration, builds the HTTP
/// loader and hands both to [`run_import`].
///
/// ## How To Use
/// - For command-line users: `resource-import import --config import.yaml`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`resource-import-core`]: ../../resource-import-core/
use crate::load_config::{credentials_from_env, load_config, CliConfig};
use crate::upload::HttpRepositoryLoader;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use resource_import_core::import::{run_import, PassSelection};
use std::path::PathBuf;

/// CLI for resource-import: load a directory tree of RDF resources into a repository.
#[derive(Parser)]
#[clap(
    name = "resource-import",
    version,
    about = "Upload a directory tree of Turtle, SPARQL update and binary files into an LDP repository"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create resources from .ttl and binary files, then apply .ru/.rq updates
    Import {
        /// Path to the YAML config file (defaults apply when omitted)
        #[clap(long)]
        config: Option<PathBuf>,
        /// Which passes to run
        #[clap(long, value_enum, default_value_t = ModeArg::Both)]
        mode: ModeArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Create,
    Update,
    Both,
}

impl From<ModeArg> for PassSelection {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Create => PassSelection::CreateOnly,
            ModeArg::Update => PassSelection::UpdateOnly,
            ModeArg::Both => PassSelection::Both,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Import { config, mode } => {
            let cli_config = match config {
                Some(path) => load_config(path)?,
                None => {
                    tracing::info!("No config file given, using defaults");
                    CliConfig::default()
                }
            };
            let import_config = cli_config.import_config();

            let mut loader = HttpRepositoryLoader::new(&cli_config.repository.url)?
                .with_patch_method(cli_config.repository.patch_method);
            if let Some(credentials) = credentials_from_env() {
                loader = loader.with_credentials(&credentials.username, &credentials.password)?;
            }

            tracing::info!(
                command = "import",
                fcrepo_url = %loader.base_url(),
                resources_dir = %import_config.root.display(),
                ?mode,
                "Starting import"
            );
            match run_import(&import_config, &loader, mode.into()).await {
                Ok(report) => {
                    tracing::info!(command = "import", ?report, "Import complete");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "import", error = %e, "Import failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
