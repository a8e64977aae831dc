/// `load_config` module: loads the YAML config file and injects credentials from the environment.
///
/// This is the only place where user-supplied YAML is parsed. Every field has a
/// default, so an empty file (or no file at all) gives a working setup against
/// `http://localhost:8080/rest/` and the current directory.
///
/// # Secrets
/// Credentials are never read from YAML. `RESOURCE_IMPORT_USER` and
/// `RESOURCE_IMPORT_PASSWORD` are taken from the environment (a `.env` file is
/// honoured); authentication is only enabled when both are non-empty.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use resource_import_core::config::ImportConfig;
use resource_import_core::formats::AllowedBinaryFormats;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::upload::PatchMethod;

pub const USER_ENV: &str = "RESOURCE_IMPORT_USER";
pub const PASSWORD_ENV: &str = "RESOURCE_IMPORT_PASSWORD";

pub const DEFAULT_REPOSITORY_URL: &str = "http://localhost:8080/rest/";

#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub repository: RepositorySection,
    #[serde(default)]
    pub resources: ResourcesSection,
}

#[derive(Debug, Deserialize)]
pub struct RepositorySection {
    #[serde(default = "default_repository_url")]
    pub url: String,
    #[serde(default)]
    pub patch_method: PatchMethod,
}

#[derive(Debug, Deserialize)]
pub struct ResourcesSection {
    #[serde(default = "default_resources_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub prefix_file: Option<PathBuf>,
    #[serde(default)]
    pub binary_formats_file: Option<PathBuf>,
}

fn default_repository_url() -> String {
    DEFAULT_REPOSITORY_URL.to_string()
}

fn default_resources_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RepositorySection {
    fn default() -> Self {
        RepositorySection {
            url: default_repository_url(),
            patch_method: PatchMethod::default(),
        }
    }
}

impl Default for ResourcesSection {
    fn default() -> Self {
        ResourcesSection {
            dir: default_resources_dir(),
            prefix_file: None,
            binary_formats_file: None,
        }
    }
}

/// Username and password for HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl CliConfig {
    /// Resolves the core import settings. Reads the binary formats file, which
    /// falls back to `jpg` when unreadable.
    pub fn import_config(&self) -> ImportConfig {
        let binary_formats = match &self.resources.binary_formats_file {
            Some(path) => AllowedBinaryFormats::load(path),
            None => AllowedBinaryFormats::fallback(),
        };
        let config = ImportConfig {
            root: self.resources.dir.clone(),
            prefix_file: self.resources.prefix_file.clone(),
            binary_formats,
        };
        config.trace_loaded();
        config
    }
}

/// Credentials from the environment, when both user and password are set.
pub fn credentials_from_env() -> Option<Credentials> {
    match (env::var(USER_ENV), env::var(PASSWORD_ENV)) {
        (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
            info!(username = %username, "Credentials loaded from environment");
            Some(Credentials { username, password })
        }
        _ => {
            info!("No credentials in environment, requests will be unauthenticated");
            None
        }
    }
}

/// Loads the YAML config file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    if config_content.trim().is_empty() {
        info!(config_path = ?path_ref, "Config file is empty, using defaults");
        return Ok(CliConfig::default());
    }

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    info!(
        repository_url = %config.repository.url,
        resources_dir = %config.resources.dir.display(),
        patch_method = ?config.repository.patch_method,
        "Configuration loaded"
    );
    Ok(config)
}
