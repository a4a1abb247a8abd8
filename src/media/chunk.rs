use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;

use super::MediaTool;

/// A fixed window of the source file scanned for silence on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub index: usize,
    /// Where the chunk starts in the source file.
    pub offset: Duration,
    pub duration: Duration,
}

impl ChunkPlan {
    pub fn end(&self) -> Duration {
        self.offset + self.duration
    }
}

/// Cover `total` with back-to-back chunks of `chunk_duration`; the last one
/// is clipped to what remains.
pub fn plan_chunks(total: Duration, chunk_duration: Duration) -> Vec<ChunkPlan> {
    let mut chunks = Vec::new();
    if chunk_duration.is_zero() {
        return chunks;
    }

    let mut offset = Duration::ZERO;
    while offset < total {
        let end = (offset + chunk_duration).min(total);
        chunks.push(ChunkPlan {
            index: chunks.len(),
            offset,
            duration: end - offset,
        });
        offset = end;
    }

    chunks
}

/// Extracted chunk audio; the file is removed when this is dropped.
#[derive(Debug)]
pub struct TempChunk {
    pub plan: ChunkPlan,
    pub path: PathBuf,
}

impl TempChunk {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempChunk {
    fn drop(&mut self) {
        if self.path.exists() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!("Removed chunk file {}", self.path.display()),
                Err(e) => warn!(
                    "Failed to remove chunk file {}: {e}",
                    self.path.display()
                ),
            }
        }
    }
}

/// Materialize one chunk of `input` as a WAV file inside `temp_dir`.
pub fn extract_chunk(
    tool: &dyn MediaTool,
    input: &Path,
    plan: ChunkPlan,
    temp_dir: &Path,
) -> Result<TempChunk> {
    // Guard first so a half-written file is cleaned up on failure too.
    let chunk = TempChunk {
        plan,
        path: temp_dir.join(format!("chunk_{:04}.wav", plan.index)),
    };

    info!(
        "Extracting chunk {}: {:.3}s to {:.3}s",
        plan.index,
        plan.offset.as_secs_f64(),
        plan.end().as_secs_f64()
    );

    tool.extract_chunk(input, plan.offset, plan.duration, &chunk.path)?;

    info!(
        "Finished extracting chunk {} to {}",
        plan.index,
        chunk.path.display()
    );
    Ok(chunk)
}
