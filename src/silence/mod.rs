pub mod cache;
pub mod detector;
pub mod parse;

pub use cache::{CacheEntry, CacheKey, SegmentRecord, SilenceCache, CACHE_FILE_NAME};
pub use detector::{DetectionStats, SilenceDetector};
pub use parse::parse_silence_log;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A stretch of silence inside one chunk, relative to the chunk start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilenceInterval {
    #[serde(with = "secs")]
    pub start: Duration,
    #[serde(with = "secs")]
    pub end: Duration,
}

impl SilenceInterval {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Parameters handed to the silence-detection filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceParams {
    /// Noise floor in dB; anything quieter counts as silence.
    pub threshold_db: f64,
    /// Shortest stretch that is reported.
    pub min_duration: Duration,
}

impl Default for SilenceParams {
    fn default() -> Self {
        Self {
            threshold_db: crate::config::DEFAULT_SILENCE_THRESHOLD_DB,
            min_duration: Duration::from_secs_f64(crate::config::DEFAULT_SILENCE_DURATION_SECS),
        }
    }
}

impl SilenceParams {
    pub fn filter_arg(&self) -> String {
        format!(
            "silencedetect=noise={}dB:d={}",
            self.threshold_db,
            self.min_duration.as_secs_f64()
        )
    }
}

/// Seconds as they appear in tool output and the cache, rounded to whole
/// microseconds so values survive a trip through text unchanged.
pub(crate) fn duration_from_secs(secs: f64) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_micros((secs * 1_000_000.0).round() as u64)
}

/// Serde helpers storing a `Duration` as fractional seconds.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let value = f64::deserialize(d)?;
        if !value.is_finite() || value < 0.0 {
            return Err(D::Error::custom(format!("invalid seconds value {value}")));
        }
        Ok(super::duration_from_secs(value))
    }
}
