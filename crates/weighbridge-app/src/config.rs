//! Configuration management for the weighbridge
//!
//! Config stored at: ~/.config/weighbridge/config.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use weighbridge_domain::{SentinelPolicy, StabilityThresholds};
use weighbridge_telemetry::SerialSettings;
use weighbridge_types::{ConfigError, OutputFormat, Result};

use crate::session::SessionSettings;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telemetry source (`-`, `tcp://host:port`, or a path)
    #[serde(default)]
    pub source: Option<String>,

    /// Serial line settings of the indicator
    #[serde(default)]
    pub serial: SerialSettings,

    /// Stability poll interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// kg above which a truck counts as present
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold: f64,

    /// kg below which the deck counts as empty
    #[serde(default = "default_departure_threshold")]
    pub departure_threshold: f64,

    /// Consecutive qualifying polls before a weighing is triggered
    #[serde(default = "default_stability_ticks")]
    pub stability_ticks: u32,

    /// Cooldown after each booked visit
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound for capture + recognition
    #[serde(default = "default_identification_timeout_ms")]
    pub identification_timeout_ms: u64,

    /// Command that writes a JPEG snapshot to stdout
    #[serde(default)]
    pub capture_command: Option<String>,

    /// Command that reads a JPEG on stdin and prints the identifier JSON
    #[serde(default)]
    pub recognizer_command: Option<String>,

    /// Material selected at startup
    #[serde(default = "default_material")]
    pub default_material: String,

    /// TOML price list replacing the built-in catalog
    #[serde(default)]
    pub materials_file: Option<PathBuf>,

    /// Matching of UNKNOWN / MANUAL_CHECK identifiers
    #[serde(default)]
    pub sentinel_policy: SentinelPolicy,

    /// Default output format (json, table)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_entry_threshold() -> f64 {
    500.0
}

fn default_departure_threshold() -> f64 {
    100.0
}

fn default_stability_ticks() -> u32 {
    10
}

fn default_settle_delay_ms() -> u64 {
    1500
}

fn default_identification_timeout_ms() -> u64 {
    15_000
}

fn default_material() -> String {
    "mixed".to_string()
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Table
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            serial: SerialSettings::default(),
            poll_interval_ms: default_poll_interval_ms(),
            entry_threshold: default_entry_threshold(),
            departure_threshold: default_departure_threshold(),
            stability_ticks: default_stability_ticks(),
            settle_delay_ms: default_settle_delay_ms(),
            identification_timeout_ms: default_identification_timeout_ms(),
            capture_command: None,
            recognizer_command: None,
            default_material: default_material(),
            materials_file: None,
            sentinel_policy: SentinelPolicy::default(),
            output_format: default_output_format(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("weighbridge");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Validated runtime settings
    pub fn session_settings(&self) -> Result<SessionSettings> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".to_string()).into());
        }
        if self.stability_ticks == 0 {
            return Err(ConfigError::Invalid("stability_ticks must be at least 1".to_string()).into());
        }
        if !self.entry_threshold.is_finite() || !self.departure_threshold.is_finite() {
            return Err(ConfigError::Invalid("thresholds must be finite".to_string()).into());
        }
        if self.departure_threshold > self.entry_threshold {
            return Err(ConfigError::Invalid(format!(
                "departure_threshold ({}) exceeds entry_threshold ({})",
                self.departure_threshold, self.entry_threshold
            ))
            .into());
        }

        Ok(SessionSettings {
            thresholds: StabilityThresholds {
                entry: self.entry_threshold,
                departure: self.departure_threshold,
                ticks: self.stability_ticks,
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            identification_timeout: Duration::from_millis(self.identification_timeout_ms),
            sentinel_policy: self.sentinel_policy,
        })
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Weighbridge Configuration")?;
        writeln!(f, "=========================")?;
        writeln!(f)?;
        writeln!(f, "Source:            {}", self.source.as_deref().unwrap_or("(not set)"))?;
        writeln!(f, "Serial:            {}", self.serial)?;
        writeln!(f, "Poll interval:     {} ms", self.poll_interval_ms)?;
        writeln!(f, "Entry threshold:   {} kg", self.entry_threshold)?;
        writeln!(f, "Departure:         {} kg", self.departure_threshold)?;
        writeln!(f, "Stability ticks:   {}", self.stability_ticks)?;
        writeln!(f, "Settle delay:      {} ms", self.settle_delay_ms)?;
        writeln!(f, "Ident. timeout:    {} ms", self.identification_timeout_ms)?;
        writeln!(
            f,
            "Capture command:   {}",
            self.capture_command.as_deref().unwrap_or("(not set)")
        )?;
        writeln!(
            f,
            "Recognizer:        {}",
            self.recognizer_command.as_deref().unwrap_or("(not set)")
        )?;
        writeln!(f, "Default material:  {}", self.default_material)?;
        writeln!(
            f,
            "Materials file:    {}",
            self.materials_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in)".to_string())
        )?;
        writeln!(f, "Sentinel policy:   {}", self.sentinel_policy)?;
        writeln!(f, "Output format:     {}", self.output_format)?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:       {}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weighbridge_types::Error;

    #[test]
    fn test_reference_defaults() {
        let settings = Config::default().session_settings().unwrap();
        assert_eq!(settings.poll_interval, Duration::from_millis(200));
        assert_eq!(settings.thresholds, StabilityThresholds::default());
        assert_eq!(settings.settle_delay, Duration::from_millis(1500));
        assert_eq!(settings.sentinel_policy, SentinelPolicy::Isolate);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"stability_ticks": 5, "sentinel_policy": "pair"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.stability_ticks, 5);
        assert_eq!(config.sentinel_policy, SentinelPolicy::Pair);
        assert_eq!(config.poll_interval_ms, 200);
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.default_material, "mixed");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.stability_ticks, 10);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            source: Some("tcp://10.0.0.7:4001".to_string()),
            recognizer_command: Some("plate-reader --json".to_string()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.source.as_deref(), Some("tcp://10.0.0.7:4001"));
        assert_eq!(loaded.recognizer_command.as_deref(), Some("plate-reader --json"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let zero_ticks = Config {
            stability_ticks: 0,
            ..Config::default()
        };
        assert!(matches!(
            zero_ticks.session_settings(),
            Err(Error::Config(ConfigError::Invalid(_)))
        ));

        let inverted = Config {
            entry_threshold: 50.0,
            departure_threshold: 100.0,
            ..Config::default()
        };
        assert!(inverted.session_settings().is_err());

        let zero_poll = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert!(zero_poll.session_settings().is_err());
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(Error::Config(ConfigError::ParseError(_)))
        ));
    }
}
