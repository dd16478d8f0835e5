//! Configuration file parser for the seminars talkbot announces.
//!
//! Unlike most of the tool's inputs the config is mandatory: without at least
//! one `[[seminar]]` table there is nothing to fetch. Unknown top-level keys
//! are accepted but logged, since they are usually typos.
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::feed::{DEFAULT_BASE_URL, SEARCH_WINDOW_DAYS};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Well-formed TOML that still cannot drive a run.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// An hour of the day, 0 through 23.
///
/// Validated on deserialization so schedule derivation never has to deal with
/// an out-of-range hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "u32")]
pub struct HourOfDay(u32);

impl HourOfDay {
    pub fn new(hour: u32) -> Result<Self, ConfigError> {
        if hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "hour of day must be between 0 and 23, got {}",
                hour
            )));
        }
        Ok(Self(hour))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for HourOfDay {
    type Error = ConfigError;

    fn try_from(hour: u32) -> Result<Self, Self::Error> {
        Self::new(hour)
    }
}

impl fmt::Display for HourOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

/// When the "upcoming talk" announcement goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AnnouncePolicy {
    /// Days before the talk, at most [`AnnouncePolicy::MAX_DAYS_BEFORE`].
    /// Weekend results are pulled back to the Thursday/Friday.
    pub days_before: u32,
    /// Hour of the announce day.
    pub time: HourOfDay,
}

impl AnnouncePolicy {
    /// Announcing more than a year ahead is always a config mistake.
    pub const MAX_DAYS_BEFORE: u32 = 365;
}

/// When the "starting soon" reminder goes out on the day of the talk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReminderPolicy {
    pub time: HourOfDay,
}

/// One seminar series on the talks site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeminarConfig {
    /// Display name used in logs and `--seminar` selection.
    pub name: String,
    /// Numeric list id on the talks site.
    pub talks_id: u64,
    pub room: String,
    /// Conferencing link, if the series is hybrid.
    #[serde(default)]
    pub zoom: Option<String>,
    /// Addresses handed to the dispatcher.
    #[serde(default)]
    pub recipients: Vec<String>,
    pub announce: AnnouncePolicy,
    pub reminder: ReminderPolicy,
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of the talks site. Overridable so tests can point at a mock server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// How many days ahead to look for the next talk.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    #[serde(default, rename = "seminar")]
    pub seminars: Vec<SeminarConfig>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_window_days() -> u32 {
    SEARCH_WINDOW_DAYS
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 3] = ["base_url", "window_days", "seminar"];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Err(ConfigError::Io)`
    /// - Invalid TOML or an hour outside 0-23 → `Err(ConfigError::Parse)`
    /// - No seminars → `Err(ConfigError::Invalid)`
    /// - Unknown top-level keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            seminars = config.seminars.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.seminars.is_empty() {
            return Err(ConfigError::Invalid(
                "no [[seminar]] tables defined".to_string(),
            ));
        }
        if self.window_days == 0 {
            return Err(ConfigError::Invalid(
                "window_days must be at least 1".to_string(),
            ));
        }
        for seminar in &self.seminars {
            if seminar.announce.days_before > AnnouncePolicy::MAX_DAYS_BEFORE {
                return Err(ConfigError::Invalid(format!(
                    "seminar {:?}: announce.days_before must be at most {}, got {}",
                    seminar.name,
                    AnnouncePolicy::MAX_DAYS_BEFORE,
                    seminar.announce.days_before
                )));
            }
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("base_url {:?}: {}", self.base_url, e)))?;
        Ok(())
    }

    /// Finds a seminar by display name (case-insensitive).
    pub fn seminar(&self, name: &str) -> Option<&SeminarConfig> {
        self.seminars
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
base_url = "https://talks.example.ac.uk"
window_days = 7

[[seminar]]
name = "Theory Seminar"
talks_id = 1234
room = "Computer Science, LG34"
zoom = "https://zoom.us/j/123"
recipients = ["theory@example.ac.uk"]

[seminar.announce]
days_before = 2
time = 10

[seminar.reminder]
time = 9

[[seminar]]
name = "Lab Lunch"
talks_id = 99
room = "UG40"

[seminar.announce]
days_before = 0
time = 8

[seminar.reminder]
time = 11
"#;

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(FULL).unwrap();
        assert_eq!(config.base_url, "https://talks.example.ac.uk");
        assert_eq!(config.window_days, 7);
        assert_eq!(config.seminars.len(), 2);

        let theory = &config.seminars[0];
        assert_eq!(theory.talks_id, 1234);
        assert_eq!(theory.zoom.as_deref(), Some("https://zoom.us/j/123"));
        assert_eq!(theory.recipients, vec!["theory@example.ac.uk".to_string()]);
        assert_eq!(theory.announce.days_before, 2);
        assert_eq!(theory.announce.time.get(), 10);
        assert_eq!(theory.reminder.time.get(), 9);

        let lunch = &config.seminars[1];
        assert!(lunch.zoom.is_none());
        assert!(lunch.recipients.is_empty());
    }

    #[test]
    fn test_defaults_for_optional_keys() {
        let content = r#"
[[seminar]]
name = "Theory Seminar"
talks_id = 1
room = "LG34"
announce = { days_before = 1, time = 9 }
reminder = { time = 9 }
"#;
        let config = Config::from_toml(content).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.window_days, SEARCH_WINDOW_DAYS);
    }

    #[test]
    fn test_hour_out_of_range_rejected() {
        let content = r#"
[[seminar]]
name = "Theory Seminar"
talks_id = 1
room = "LG34"
announce = { days_before = 1, time = 24 }
reminder = { time = 9 }
"#;
        let err = Config::from_toml(content).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("between 0 and 23"));
    }

    #[test]
    fn test_negative_days_before_rejected() {
        let content = r#"
[[seminar]]
name = "Theory Seminar"
talks_id = 1
room = "LG34"
announce = { days_before = -1, time = 9 }
reminder = { time = 9 }
"#;
        assert!(matches!(
            Config::from_toml(content),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_days_before_upper_bound() {
        let content = FULL.replace("days_before = 2", "days_before = 4294967295");
        let err = Config::from_toml(&content).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("at most 365"));

        let content = FULL.replace("days_before = 2", "days_before = 365");
        assert!(Config::from_toml(&content).is_ok());
    }

    #[test]
    fn test_no_seminars_rejected() {
        let err = Config::from_toml("window_days = 6\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_window_rejected() {
        let content = FULL.replace("window_days = 7", "window_days = 0");
        assert!(matches!(
            Config::from_toml(&content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let content = FULL.replace("https://talks.example.ac.uk", "not a url");
        assert!(matches!(
            Config::from_toml(&content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = format!("totally_fake_key = 42\n{}", FULL);
        assert!(Config::from_toml(&content).is_ok());
    }

    #[test]
    fn test_seminar_lookup_case_insensitive() {
        let config = Config::from_toml(FULL).unwrap();
        assert_eq!(config.seminar("lab lunch").map(|s| s.talks_id), Some(99));
        assert!(config.seminar("Nonexistent").is_none());
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = Path::new("/tmp/talkbot_test_nonexistent_config.toml");
        assert!(matches!(Config::load(path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join("talkbot_config_test_load");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, FULL).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.seminars[0].name, "Theory Seminar");

        std::fs::remove_dir_all(&dir).ok();
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("talkbot_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_hour_display() {
        assert_eq!(HourOfDay::new(9).unwrap().to_string(), "09:00");
    }
}
