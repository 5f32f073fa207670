//! Service configuration
//!
//! Loaded from a single file (TOML by default; JSON and YAML also work,
//! picked by extension). Relative paths inside the file resolve against the
//! file's own directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::matcher::ContainmentMatcher;
use crate::model::{GroupId, GroupPair};
use crate::{Error, Result};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "rolesync.toml";

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub groups: GroupSettings,
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub primary: GroupId,
    pub secondary: GroupId,
    /// When set, commands are only accepted from this group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Initial state of event-driven sync
    #[serde(default = "default_true")]
    pub auto_sync: bool,
    #[serde(default = "default_true")]
    pub reconcile_on_startup: bool,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Let an empty role name match the first secondary role
    #[serde(default)]
    pub match_empty_names: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_sync: true,
            reconcile_on_startup: true,
            queue_capacity: default_queue_capacity(),
            match_empty_names: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append logs here instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("sync_roles.json")
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Settings for a group pair with every other field defaulted
    pub fn new(primary: GroupId, secondary: GroupId) -> Self {
        Self {
            groups: GroupSettings {
                primary,
                secondary,
                commands: None,
            },
            registry: RegistrySettings::default(),
            sync: SyncSettings::default(),
            logging: LoggingSettings::default(),
        }
    }

    /// Load, resolve relative paths, and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings: Self = rolesync_fs::ConfigStore::new().load(path)?;
        if let Some(base) = path.parent() {
            settings.resolve_paths(base);
        }
        settings.validate()?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Make relative file paths relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.registry.path.is_relative() {
            self.registry.path = base.join(&self.registry.path);
        }
        if let Some(file) = &self.logging.file
            && file.is_relative()
        {
            self.logging.file = Some(base.join(file));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.groups.primary == self.groups.secondary {
            return Err(Error::ConfigInvalid {
                message: format!(
                    "primary and secondary group must differ (both are {})",
                    self.groups.primary
                ),
            });
        }
        if self.sync.queue_capacity == 0 {
            return Err(Error::ConfigInvalid {
                message: "sync.queue_capacity must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn group_pair(&self) -> GroupPair {
        GroupPair {
            primary: self.groups.primary,
            secondary: self.groups.secondary,
        }
    }

    pub fn matcher(&self) -> ContainmentMatcher {
        if self.sync.match_empty_names {
            ContainmentMatcher::permissive()
        } else {
            ContainmentMatcher::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_minimal_file_gets_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rolesync.toml");
        std::fs::write(&path, "[groups]\nprimary = 1\nsecondary = 2\n").unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.group_pair().primary, GroupId(1));
        assert!(settings.sync.auto_sync);
        assert_eq!(settings.sync.queue_capacity, 256);
        assert_eq!(settings.registry.path, temp.path().join("sync_roles.json"));
        assert!(!settings.matcher().matches_empty_names());
    }

    #[test]
    fn test_identical_groups_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rolesync.toml");
        std::fs::write(&path, "[groups]\nprimary = 7\nsecondary = 7\n").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let mut settings = Settings::new(GroupId(1), GroupId(2));
        settings.registry.path = PathBuf::from("/var/lib/rolesync/roles.json");

        settings.resolve_paths(Path::new("/etc/rolesync"));

        assert_eq!(settings.registry.path, PathBuf::from("/var/lib/rolesync/roles.json"));
    }

    #[test]
    fn test_full_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rolesync.toml");
        std::fs::write(
            &path,
            r#"
[groups]
primary = 607066249381543946
secondary = 1346226782306832465
commands = 1298147393191284736

[registry]
path = "state/roles.json"

[sync]
auto_sync = false
queue_capacity = 8
match_empty_names = true

[logging]
level = "debug"
file = "rolesync.log"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.groups.commands, Some(GroupId(1298147393191284736)));
        assert!(!settings.sync.auto_sync);
        assert!(settings.sync.reconcile_on_startup);
        assert_eq!(settings.logging.file, Some(temp.path().join("rolesync.log")));
        assert!(settings.matcher().matches_empty_names());
    }
}
