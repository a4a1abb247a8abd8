use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

use super::{SilenceInterval, SilenceParams};

/// File name of the cache inside the output directory.
pub const CACHE_FILE_NAME: &str = ".silence_cache.json";

const CACHE_VERSION: u32 = 1;

/// Identity of one chunk's detection run. Every field must match for a
/// cached result to be reused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheKey {
    pub chunk_index: usize,
    #[serde(with = "super::secs")]
    pub chunk_duration: Duration,
    pub silence_threshold: f64,
    #[serde(with = "super::secs")]
    pub silence_duration: Duration,
}

impl CacheKey {
    pub fn new(chunk_index: usize, chunk_duration: Duration, params: &SilenceParams) -> Self {
        Self {
            chunk_index,
            chunk_duration,
            silence_threshold: params.threshold_db,
            silence_duration: params.min_duration,
        }
    }

    pub fn params(&self) -> SilenceParams {
        SilenceParams {
            threshold_db: self.silence_threshold,
            min_duration: self.silence_duration,
        }
    }

    /// Threshold compared at micro-dB resolution so a value read back from
    /// JSON still matches the one that was written.
    fn threshold_micro_db(&self) -> i64 {
        (self.silence_threshold * 1_000_000.0).round() as i64
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.chunk_index == other.chunk_index
            && self.chunk_duration == other.chunk_duration
            && self.threshold_micro_db() == other.threshold_micro_db()
            && self.silence_duration == other.silence_duration
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub key: CacheKey,
    pub intervals: Vec<SilenceInterval>,
}

/// Range a segment file was written with. A file is only reused when the
/// current plan gives its index the same range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub index: usize,
    #[serde(with = "super::secs")]
    pub start: Duration,
    #[serde(with = "super::secs")]
    pub end: Duration,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: Vec<CacheEntry>,
    #[serde(default)]
    segments: Vec<SegmentRecord>,
}

/// Detection results and written segment ranges from earlier runs,
/// persisted as JSON.
#[derive(Debug, Default)]
pub struct SilenceCache {
    path: Option<PathBuf>,
    entries: Vec<CacheEntry>,
    segments: Vec<SegmentRecord>,
    dirty: bool,
}

impl SilenceCache {
    /// A cache that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache at `path`. A missing, unreadable or malformed file
    /// yields an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = match Self::read_file(&path) {
            Ok(Some(file)) => {
                info!(
                    "Loaded {} cached chunk result(s) and {} segment record(s) from {}",
                    file.entries.len(),
                    file.segments.len(),
                    path.display()
                );
                file
            }
            Ok(None) => {
                debug!("No silence cache at {}", path.display());
                CacheFile::default()
            }
            Err(reason) => {
                warn!(
                    "Ignoring silence cache {}: {reason}. All chunks will be re-detected",
                    path.display()
                );
                CacheFile::default()
            }
        };

        Self {
            path: Some(path),
            entries: file.entries,
            segments: file.segments,
            dirty: false,
        }
    }

    fn read_file(path: &Path) -> std::result::Result<Option<CacheFile>, String> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let file: CacheFile = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
        if file.version != CACHE_VERSION {
            return Err(format!("unsupported cache version {}", file.version));
        }
        Ok(Some(file))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<&[SilenceInterval]> {
        self.entries
            .iter()
            .find(|e| e.key == *key)
            .map(|e| e.intervals.as_slice())
    }

    /// Store a result, replacing any entry for the same chunk index that was
    /// computed with other parameters.
    pub fn insert(&mut self, key: CacheKey, intervals: Vec<SilenceInterval>) {
        self.entries.retain(|e| e.key.chunk_index != key.chunk_index);
        self.entries.push(CacheEntry { key, intervals });
        self.entries.sort_by_key(|e| e.key.chunk_index);
        self.dirty = true;
    }

    /// Range the segment at `index` was last written with.
    pub fn segment(&self, index: usize) -> Option<&SegmentRecord> {
        self.segments.iter().find(|r| r.index == index)
    }

    pub fn record_segment(&mut self, record: SegmentRecord) {
        self.segments.retain(|r| r.index != record.index);
        self.segments.push(record);
        self.segments.sort_by_key(|r| r.index);
        self.dirty = true;
    }

    /// Drop the record for `index` while its file is being rewritten.
    pub fn forget_segment(&mut self, index: usize) {
        let before = self.segments.len();
        self.segments.retain(|r| r.index != index);
        self.dirty |= self.segments.len() != before;
    }

    /// Drop records past the first `count` segments.
    pub fn truncate_segments(&mut self, count: usize) {
        let before = self.segments.len();
        self.segments.retain(|r| r.index <= count);
        self.dirty |= self.segments.len() != before;
    }

    /// Rewrite the whole cache file. Writes go to a temporary file that is
    /// renamed over the old one.
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            self.dirty = false;
            return Ok(());
        };

        let file = CacheFile {
            version: CACHE_VERSION,
            entries: self.entries.clone(),
            segments: self.segments.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!("Saved {} cache entries to {}", self.entries.len(), path.display());
        self.dirty = false;
        Ok(())
    }
}
