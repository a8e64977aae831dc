//! Traversal modes and the settings each one implies.
//!
//! A pass runs in exactly one [`TraversalMode`]. Everything that depends on
//! the mode (trigger extensions, whether metaless directories are skipped,
//! the log label) is bundled in one immutable [`ModeSettings`] value, so a
//! mode switch replaces all of it at once.

use std::fmt;
use std::str::FromStr;

/// Which pass the finder is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalMode {
    /// Initial population: PUT containers and binaries from `.ttl` and binary files
    Create,
    /// Post-creation pass: PATCH resources from `.ru`/`.rq` SPARQL update files
    Update,
}

/// Mode-dependent settings. One static value exists per mode.
#[derive(Debug, PartialEq, Eq)]
pub struct ModeSettings {
    pub mode: TraversalMode,
    /// Extensions (with leading dot) that mark a payload file, in priority order.
    pub file_types: &'static [&'static str],
    /// Directories without a metadata file are skipped instead of force-created.
    pub skip_dirs_without_meta: bool,
    pub log_prefix: &'static str,
}

const CREATE_SETTINGS: ModeSettings = ModeSettings {
    mode: TraversalMode::Create,
    file_types: &[".ttl"],
    skip_dirs_without_meta: false,
    log_prefix: "Creating",
};

const UPDATE_SETTINGS: ModeSettings = ModeSettings {
    mode: TraversalMode::Update,
    file_types: &[".ru", ".rq"],
    skip_dirs_without_meta: true,
    log_prefix: "Patching",
};

impl TraversalMode {
    pub fn settings(self) -> &'static ModeSettings {
        match self {
            TraversalMode::Create => &CREATE_SETTINGS,
            TraversalMode::Update => &UPDATE_SETTINGS,
        }
    }
}

impl ModeSettings {
    /// The trigger extension `filename` ends with, if any.
    pub fn matching_file_type(&self, filename: &str) -> Option<&'static str> {
        self.file_types
            .iter()
            .copied()
            .find(|file_type| filename.ends_with(file_type))
    }

    /// Names of the files that describe a directory itself (`_.ttl`, `_.ru`, ...).
    pub fn metadata_filenames(&self) -> impl Iterator<Item = String> + 'static {
        let file_types: &'static [&'static str] = self.file_types;
        file_types.iter().map(|file_type| format!("_{file_type}"))
    }

    pub fn is_metadata_filename(&self, filename: &str) -> bool {
        self.file_types
            .iter()
            .any(|file_type| filename.strip_prefix('_') == Some(*file_type))
    }
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalMode::Create => f.write_str("CREATE"),
            TraversalMode::Update => f.write_str("UPDATE"),
        }
    }
}

/// Returned when a mode name is neither `create` nor `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown finder mode: {}", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for TraversalMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("create") {
            Ok(TraversalMode::Create)
        } else if s.eq_ignore_ascii_case("update") {
            Ok(TraversalMode::Update)
        } else {
            Err(UnknownMode(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_settings_trigger_on_turtle() {
        let settings = TraversalMode::Create.settings();
        assert_eq!(settings.matching_file_type("data.ttl"), Some(".ttl"));
        assert_eq!(settings.matching_file_type("update.ru"), None);
        assert!(!settings.skip_dirs_without_meta);
        assert_eq!(settings.log_prefix, "Creating");
    }

    #[test]
    fn update_settings_trigger_on_sparql_updates() {
        let settings = TraversalMode::Update.settings();
        assert_eq!(settings.matching_file_type("fix.ru"), Some(".ru"));
        assert_eq!(settings.matching_file_type("fix.rq"), Some(".rq"));
        assert_eq!(settings.matching_file_type("data.ttl"), None);
        assert!(settings.skip_dirs_without_meta);
        assert_eq!(settings.log_prefix, "Patching");
    }

    #[test]
    fn metadata_filenames_follow_file_types() {
        let names: Vec<String> = TraversalMode::Update.settings().metadata_filenames().collect();
        assert_eq!(names, vec!["_.ru".to_string(), "_.rq".to_string()]);
        assert!(TraversalMode::Create.settings().is_metadata_filename("_.ttl"));
        assert!(!TraversalMode::Create.settings().is_metadata_filename("x_.ttl"));
        assert!(!TraversalMode::Create.settings().is_metadata_filename("_.ru"));
    }

    #[test]
    fn parses_mode_names_case_insensitively() {
        assert_eq!("CREATE".parse::<TraversalMode>(), Ok(TraversalMode::Create));
        assert_eq!("update".parse::<TraversalMode>(), Ok(TraversalMode::Update));
        assert_eq!(
            "delete".parse::<TraversalMode>(),
            Err(UnknownMode("delete".to_string()))
        );
    }
}
