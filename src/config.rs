//! Configuration loading and management.
//!
//! Lookup order: an explicit `--config` path, then `./timeboard/config.yaml`,
//! then `~/.timeboard/config.yaml`, then built-in defaults. Environment
//! variables override whatever was loaded.

use crate::clock::{DEFAULT_TIMEZONE, Timezones};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_DB_PATH: &str = "TIMEBOARD_DB_PATH";
pub const ENV_TIMEZONE: &str = "TIMEBOARD_TIMEZONE";

const CONFIG_FILE: &str = "config.yaml";

/// Planner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub general: GeneralConfig,

    /// Per-owner settings keyed by owner id.
    #[serde(default)]
    pub owners: BTreeMap<String, OwnerConfig>,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".timeboard/timeboard.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// IANA timezone for owners without their own setting.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerConfig {
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Directories searched for `config.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// `./timeboard` and `~/.timeboard`.
    pub fn discover() -> Self {
        Self {
            project_dir: Some(PathBuf::from("timeboard")),
            user_dir: dirs::home_dir().map(|home| home.join(".timeboard")),
        }
    }

    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        [self.project_dir.as_ref(), self.user_dir.as_ref()]
            .into_iter()
            .flatten()
            .map(|dir| dir.join(CONFIG_FILE))
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve configuration from the standard locations plus environment.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve_with_paths(explicit, &ConfigPaths::discover())
    }

    /// Resolve configuration with explicit search directories.
    ///
    /// An explicit path must load. Discovered files are used in order; the
    /// first one that exists wins.
    pub fn resolve_with_paths(explicit: Option<&Path>, paths: &ConfigPaths) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match paths.candidates().find(|path| path.exists()) {
                Some(path) => {
                    debug!(path = %path.display(), "Loading config");
                    Self::load(&path)?
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `TIMEBOARD_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db_path) = lookup(ENV_DB_PATH) {
            self.server.db_path = PathBuf::from(db_path);
        }
        if let Some(timezone) = lookup(ENV_TIMEZONE) {
            self.general.timezone = timezone;
        }
    }

    /// Build the timezone resolver, rejecting unknown zone names.
    pub fn timezones(&self) -> Result<Timezones> {
        Timezones::from_names(
            &self.general.timezone,
            self.owners.iter().filter_map(|(owner, settings)| {
                settings
                    .timezone
                    .as_deref()
                    .map(|tz| (owner.as_str(), tz))
            }),
        )
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn empty_paths(temp: &TempDir) -> ConfigPaths {
        ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        )
    }

    #[test]
    fn defaults_when_nothing_found() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.apply_overrides(|_| None);

        assert_eq!(config.server.db_path, PathBuf::from(".timeboard/timeboard.db"));
        assert_eq!(config.general.timezone, "Asia/Tbilisi");
        assert!(empty_paths(&temp).candidates().all(|p| !p.exists()));
    }

    #[test]
    fn project_config_beats_user_config() {
        let temp = TempDir::new().unwrap();
        let paths = empty_paths(&temp);
        for (dir, tz) in [("project", "Europe/Berlin"), ("user", "Asia/Tokyo")] {
            let dir = temp.path().join(dir);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(
                dir.join("config.yaml"),
                format!("general:\n  timezone: {}\n", tz),
            )
            .unwrap();
        }

        let found: Vec<PathBuf> = paths.candidates().filter(|p| p.exists()).collect();
        let config = Config::load(&found[0]).unwrap();
        assert_eq!(config.general.timezone, "Europe/Berlin");
        // Unset sections fall back to defaults.
        assert_eq!(config.server.db_path, PathBuf::from(".timeboard/timeboard.db"));
    }

    #[test]
    fn explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml");
        assert!(Config::resolve_with_paths(Some(&missing), &empty_paths(&temp)).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            (ENV_DB_PATH, "/tmp/other.db"),
            (ENV_TIMEZONE, "UTC"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.server.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.general.timezone, "UTC");
    }

    #[test]
    fn owner_timezones_resolve() {
        let config: Config = serde_yaml::from_str(
            r#"
general:
  timezone: UTC
owners:
  alice:
    timezone: America/New_York
  bob: {}
"#,
        )
        .unwrap();
        let zones = config.timezones().unwrap();
        assert_eq!(zones.for_owner("alice"), chrono_tz::America::New_York);
        assert_eq!(zones.for_owner("bob"), chrono_tz::UTC);
    }

    #[test]
    fn unknown_timezone_fails_at_load() {
        let config: Config = serde_yaml::from_str("general:\n  timezone: Atlantis/Lost\n").unwrap();
        assert!(config.timezones().is_err());
    }

    #[test]
    fn ensure_db_dir_creates_parent() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.server.db_path = temp.path().join("nested/dir/timeboard.db");
        config.ensure_db_dir().unwrap();
        assert!(temp.path().join("nested/dir").is_dir());
    }
}
