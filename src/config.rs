use crate::error::{Result, SplitError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default chunk length for silence detection (45 minutes).
pub const DEFAULT_CHUNK_DURATION_SECS: u64 = 45 * 60;
pub const DEFAULT_SILENCE_THRESHOLD_DB: f64 = -40.0;
pub const DEFAULT_SILENCE_DURATION_SECS: f64 = 2.0;
/// Split points closer than this are collapsed into one.
pub const DEFAULT_DEDUPE_EPSILON_SECS: f64 = 0.05;
/// Shortest segment to produce; 0 keeps every split point.
pub const DEFAULT_MIN_SEGMENT_SECS: f64 = 0.0;
pub const DEFAULT_LOG_FILE: &str = "silencesplit.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunk_duration_secs: u64,
    pub silence_threshold_db: f64,
    pub silence_duration_secs: f64,
    pub dedupe_epsilon_secs: f64,
    pub min_segment_secs: f64,
    pub ffmpeg: String,
    pub ffprobe: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_duration_secs: DEFAULT_CHUNK_DURATION_SECS,
            silence_threshold_db: DEFAULT_SILENCE_THRESHOLD_DB,
            silence_duration_secs: DEFAULT_SILENCE_DURATION_SECS,
            dedupe_epsilon_secs: DEFAULT_DEDUPE_EPSILON_SECS,
            min_segment_secs: DEFAULT_MIN_SEGMENT_SECS,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }
}

impl Config {
    /// Defaults, then the config file, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = Self::from_toml(&contents)?;
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| SplitError::Config(format!("Failed to parse config file: {e}")))
    }

    fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("SILENCESPLIT_CHUNK_DURATION") {
            if let Ok(secs) = v.parse() {
                self.chunk_duration_secs = secs;
            }
        }
        if let Some(v) = var("SILENCESPLIT_SILENCE_THRESHOLD") {
            if let Ok(db) = v.trim_end_matches("dB").parse() {
                self.silence_threshold_db = db;
            }
        }
        if let Some(v) = var("SILENCESPLIT_SILENCE_DURATION") {
            if let Ok(secs) = v.parse() {
                self.silence_duration_secs = secs;
            }
        }
        if let Some(v) = var("SILENCESPLIT_MIN_SEGMENT") {
            if let Ok(secs) = v.parse() {
                self.min_segment_secs = secs;
            }
        }
        if let Some(v) = var("SILENCESPLIT_FFMPEG") {
            self.ffmpeg = v;
        }
        if let Some(v) = var("SILENCESPLIT_FFPROBE") {
            self.ffprobe = v;
        }
        if let Some(v) = var("SILENCESPLIT_LOG_FILE") {
            self.log_file = if v.is_empty() {
                None
            } else {
                Some(PathBuf::from(v))
            };
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_duration_secs == 0 {
            return Err(SplitError::Config(
                "Chunk duration must be greater than 0".to_string(),
            ));
        }

        if !self.silence_threshold_db.is_finite() || self.silence_threshold_db >= 0.0 {
            return Err(SplitError::Config(format!(
                "Silence threshold must be a negative dB value, got {}",
                self.silence_threshold_db
            )));
        }

        if self.silence_duration_secs <= 0.0 || !fits_duration(self.silence_duration_secs) {
            return Err(SplitError::Config(format!(
                "Silence duration must be a positive number of seconds, got {}",
                self.silence_duration_secs
            )));
        }

        if !fits_duration(self.dedupe_epsilon_secs) {
            return Err(SplitError::Config(format!(
                "Dedupe epsilon must be a non-negative number of seconds, got {}",
                self.dedupe_epsilon_secs
            )));
        }

        if !fits_duration(self.min_segment_secs) {
            return Err(SplitError::Config(format!(
                "Minimum segment length must be a non-negative number of seconds, got {}",
                self.min_segment_secs
            )));
        }

        Ok(())
    }

    pub fn chunk_duration(&self) -> Duration {
        Duration::from_secs(self.chunk_duration_secs)
    }

    pub fn silence_duration(&self) -> Duration {
        Duration::from_secs_f64(self.silence_duration_secs)
    }

    pub fn dedupe_epsilon(&self) -> Duration {
        Duration::from_secs_f64(self.dedupe_epsilon_secs)
    }

    pub fn min_segment(&self) -> Duration {
        Duration::from_secs_f64(self.min_segment_secs)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("silencesplit").join("config.toml"))
    }
}

/// Whether `secs` converts to a `Duration`: finite, not negative and in range.
fn fits_duration(secs: f64) -> bool {
    Duration::try_from_secs_f64(secs).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk_duration_secs, 2700);
        assert_eq!(config.silence_threshold_db, -40.0);
        assert_eq!(config.silence_duration_secs, 2.0);
        assert_eq!(config.ffmpeg, "ffmpeg");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml("silence_threshold_db = -35.5\nffmpeg = \"/opt/ffmpeg\"")
            .unwrap();
        assert_eq!(config.silence_threshold_db, -35.5);
        assert_eq!(config.ffmpeg, "/opt/ffmpeg");
        assert_eq!(config.chunk_duration_secs, DEFAULT_CHUNK_DURATION_SECS);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("chunk_duration_secs = \"long\""),
            Err(SplitError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SILENCESPLIT_CHUNK_DURATION", "600"),
            ("SILENCESPLIT_SILENCE_THRESHOLD", "-30dB"),
            ("SILENCESPLIT_SILENCE_DURATION", "1.5"),
            ("SILENCESPLIT_MIN_SEGMENT", "10"),
            ("SILENCESPLIT_LOG_FILE", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.chunk_duration_secs, 600);
        assert_eq!(config.silence_threshold_db, -30.0);
        assert_eq!(config.silence_duration_secs, 1.5);
        assert_eq!(config.min_segment_secs, 10.0);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_env_ignores_garbage() {
        let mut config = Config::default();
        config.apply_env(|k| (k == "SILENCESPLIT_CHUNK_DURATION").then(|| "soon".to_string()));
        assert_eq!(config.chunk_duration_secs, DEFAULT_CHUNK_DURATION_SECS);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.chunk_duration_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.silence_threshold_db = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.silence_duration_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dedupe_epsilon_secs = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.min_segment_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_durations_out_of_range() {
        for secs in [1e20, f64::INFINITY, f64::NAN] {
            let mut config = Config::default();
            config.silence_duration_secs = secs;
            assert!(matches!(config.validate(), Err(SplitError::Config(_))));

            let mut config = Config::default();
            config.dedupe_epsilon_secs = secs;
            assert!(matches!(config.validate(), Err(SplitError::Config(_))));

            let mut config = Config::default();
            config.min_segment_secs = secs;
            assert!(matches!(config.validate(), Err(SplitError::Config(_))));
        }

        let mut config = Config::default();
        config.silence_duration_secs = 86_400.0;
        config.min_segment_secs = 10.0;
        assert!(config.validate().is_ok());
        assert_eq!(config.min_segment(), Duration::from_secs(10));
    }
}
