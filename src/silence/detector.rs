use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::media::MediaTool;

use super::{parse_silence_log, CacheKey, SilenceCache, SilenceInterval};

/// Counts of how chunk results were obtained during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionStats {
    /// Chunks that ran through the external tool.
    pub detected: usize,
    /// Chunks answered from the cache.
    pub cached: usize,
}

/// Runs silence detection per chunk, consulting the cache first.
pub struct SilenceDetector<'a> {
    tool: &'a dyn MediaTool,
    cache: &'a mut SilenceCache,
    stats: DetectionStats,
}

impl<'a> SilenceDetector<'a> {
    pub fn new(tool: &'a dyn MediaTool, cache: &'a mut SilenceCache) -> Self {
        Self {
            tool,
            cache,
            stats: DetectionStats::default(),
        }
    }

    pub fn stats(&self) -> DetectionStats {
        self.stats
    }

    /// Cached result for `key`, if the cache has one.
    pub fn cached(&mut self, key: &CacheKey) -> Option<Vec<SilenceInterval>> {
        let hit = self.cache.lookup(key)?.to_vec();
        self.stats.cached += 1;
        info!(
            "Using cached silence data for chunk {} ({} silences)",
            key.chunk_index,
            hit.len()
        );
        Some(hit)
    }

    /// Detect silences in the chunk audio at `audio`, which is
    /// `chunk_duration` long. Results are cached under `key` before they are
    /// returned.
    pub fn detect(
        &mut self,
        audio: &Path,
        chunk_duration: Duration,
        key: CacheKey,
    ) -> Result<Vec<SilenceInterval>> {
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let params = key.params();
        debug!(
            "Running {} on chunk {}: {}",
            self.tool.name(),
            key.chunk_index,
            params.filter_arg()
        );

        let log = self.tool.silence_log(audio, &params)?;
        let intervals = parse_silence_log(&log, chunk_duration)?;
        self.stats.detected += 1;

        info!(
            "Detected {} silence(s) in chunk {}",
            intervals.len(),
            key.chunk_index
        );

        self.cache.insert(key, intervals.clone());
        if let Err(e) = self.cache.save() {
            warn!("Failed to write silence cache: {e}");
        }

        Ok(intervals)
    }
}
