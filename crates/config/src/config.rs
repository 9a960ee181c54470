//! Configuration file loading.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Weekday;
use est_core::{ScheduleError, WorkSchedule};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Config file name, looked up in the home directory.
pub const CONFIG_FILE_NAME: &str = ".estconfig.toml";

/// Contents written when no config file exists yet.
pub const DEFAULT_CONFIG: &str = r#"# Your estfile stores your tasks and estimates. You may want to move it
# somewhere with automatic backup.
estfile = "$HOME/.estfile.json"

# Days of the week you work.
workdays = ["monday", "tuesday", "wednesday", "thursday", "friday"]

# Start and end of each working block, in order, as h:mm(am|pm).
workhours = ["9:30am", "12:00pm", "12:30pm", "5:30pm"]
"#;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No home directory to resolve paths against
    #[error("could not determine home directory")]
    NoHomeDir,

    /// Reading or creating the config file failed
    #[error("couldn't find or create {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The config file isn't valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Unknown weekday name
    #[error("invalid workday '{0}'")]
    InvalidWorkday(String),

    /// Work hours don't form a valid schedule
    #[error("invalid workhours: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Result type for configuration.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstConfig {
    /// Estfile location; `$HOME` and a leading `~` are expanded
    #[serde(default = "default_estfile")]
    pub estfile: String,

    /// Weekday names, e.g. "monday" or "mon"
    #[serde(default = "default_workdays")]
    pub workdays: Vec<String>,

    /// Working block boundaries, e.g. "9:30am"
    #[serde(default = "default_workhours")]
    pub workhours: Vec<String>,
}

fn default_estfile() -> String {
    "$HOME/.estfile.json".to_string()
}

fn default_workdays() -> Vec<String> {
    ["monday", "tuesday", "wednesday", "thursday", "friday"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_workhours() -> Vec<String> {
    ["9:30am", "12:00pm", "12:30pm", "5:30pm"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for EstConfig {
    fn default() -> Self {
        Self {
            estfile: default_estfile(),
            workdays: default_workdays(),
            workhours: default_workhours(),
        }
    }
}

impl EstConfig {
    /// `$HOME/.estconfig.toml`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(home_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load the config at `path`, writing [`DEFAULT_CONFIG`] there first if
    /// the file doesn't exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(mut file) => {
                file.write_all(DEFAULT_CONFIG.as_bytes()).map_err(io_err)?;
                info!(path = %path.display(), "created default config");
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(io_err(e)),
        }

        let content = std::fs::read_to_string(path).map_err(io_err)?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), estfile = %config.estfile, "loaded config");
        Ok(config)
    }

    /// Parse config file contents. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Estfile path with `$HOME` expanded against the user's home directory.
    pub fn estfile_path(&self) -> Result<PathBuf> {
        Ok(self.estfile_path_in(&home_dir()?))
    }

    /// Estfile path with `$HOME` and a leading `~` expanded against `home`.
    pub fn estfile_path_in(&self, home: &Path) -> PathBuf {
        let home = home.to_string_lossy();
        let expanded = self.estfile.replace("$HOME", &home);
        match expanded.strip_prefix("~/") {
            Some(rest) => Path::new(&*home).join(rest),
            None => PathBuf::from(expanded),
        }
    }

    /// The validated working week.
    pub fn schedule(&self) -> Result<WorkSchedule> {
        let workdays = self
            .workdays
            .iter()
            .map(|name| {
                Weekday::from_str(name.trim())
                    .map_err(|_| ConfigError::InvalidWorkday(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(WorkSchedule::parse(workdays, self.workhours.as_slice())?)
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses_to_default() {
        let config = EstConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, EstConfig::default());
        assert_eq!(config.schedule().unwrap(), WorkSchedule::standard());
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = EstConfig::from_toml("estfile = \"/tmp/est.json\"\n").unwrap();
        assert_eq!(config.estfile, "/tmp/est.json");
        assert_eq!(config.workdays, default_workdays());
        assert_eq!(config.workhours, default_workhours());
    }

    #[test]
    fn test_load_or_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let created = EstConfig::load_or_create(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
        assert_eq!(created, EstConfig::default());

        std::fs::write(&path, "estfile = \"~/work/est.json\"\n").unwrap();
        let edited = EstConfig::load_or_create(&path).unwrap();
        assert_eq!(edited.estfile, "~/work/est.json");
    }

    #[test]
    fn test_estfile_expansion() {
        let home = Path::new("/home/ada");
        let mut config = EstConfig::default();
        assert_eq!(
            config.estfile_path_in(home),
            PathBuf::from("/home/ada/.estfile.json")
        );

        config.estfile = "~/sync/est.json".to_string();
        assert_eq!(
            config.estfile_path_in(home),
            PathBuf::from("/home/ada/sync/est.json")
        );

        config.estfile = "/var/est.json".to_string();
        assert_eq!(config.estfile_path_in(home), PathBuf::from("/var/est.json"));
    }

    #[test]
    fn test_custom_schedule() {
        let config = EstConfig::from_toml(
            "workdays = [\"Sat\", \"sunday\"]\nworkhours = [\"10:00am\", \"2:00pm\"]\n",
        )
        .unwrap();
        let schedule = config.schedule().unwrap();
        assert_eq!(schedule.workdays(), vec![Weekday::Sat, Weekday::Sun]);
        assert_eq!(schedule.daily_duration(), chrono::Duration::hours(4));
    }

    #[test]
    fn test_invalid_values() {
        let config = EstConfig::from_toml("workdays = [\"funday\"]\n").unwrap();
        assert!(matches!(
            config.schedule(),
            Err(ConfigError::InvalidWorkday(name)) if name == "funday"
        ));

        let config = EstConfig::from_toml("workhours = [\"9:00am\"]\n").unwrap();
        assert!(matches!(
            config.schedule(),
            Err(ConfigError::Schedule(ScheduleError::OddLength(1)))
        ));

        assert!(matches!(
            EstConfig::from_toml("workdays = 3\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
