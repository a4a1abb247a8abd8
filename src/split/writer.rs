use std::path::Path;

use tracing::{error, info, warn};

use crate::error::{Result, SplitError};
use crate::media::{AudioEncoding, MediaTool, OutputFormat};
use crate::silence::SegmentRecord;

use super::Segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioStatus {
    /// Written by stream copy.
    Copied,
    /// Stream copy failed; written with the container's default encoder.
    Reencoded,
    /// Already on disk from an earlier run.
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverStatus {
    Written,
    Existing,
    /// Cover could not be produced; the audio is kept regardless.
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentOutcome {
    pub index: usize,
    pub audio: AudioStatus,
    pub cover: CoverStatus,
}

/// Writes segment audio and cover images for one input file.
pub struct SegmentWriter<'a> {
    tool: &'a dyn MediaTool,
    input: &'a Path,
    format: OutputFormat,
    has_video: bool,
    overwrite: bool,
}

impl<'a> SegmentWriter<'a> {
    pub fn new(
        tool: &'a dyn MediaTool,
        input: &'a Path,
        format: OutputFormat,
        has_video: bool,
    ) -> Self {
        Self {
            tool,
            input,
            format,
            has_video,
            overwrite: false,
        }
    }

    /// Regenerate files even when an earlier run wrote the same range.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Write one segment. `is_last` segments run to the end of the input.
    ///
    /// `previous` is the range this index was written with by an earlier run;
    /// existing files are kept only when it matches `segment`.
    ///
    /// Audio failures are fatal; cover failures are logged and reported in
    /// the outcome.
    pub fn write(
        &self,
        segment: &Segment,
        is_last: bool,
        previous: Option<&SegmentRecord>,
    ) -> Result<SegmentOutcome> {
        let planned = SegmentRecord::from(segment);
        let unchanged = previous == Some(&planned);
        let reusable = unchanged && !self.overwrite;
        if previous.is_some() && !unchanged {
            info!("Segment {} range changed, regenerating", segment.index);
        }

        let audio = self.write_audio(segment, is_last, reusable).inspect_err(|e| {
            error!("Segment {} failed: {e}", segment.index);
        })?;
        let cover = self.write_cover(segment, reusable);

        info!(
            "Segment {} done: {} ({:.3}s to {:.3}s)",
            segment.index,
            segment.audio_path.display(),
            segment.start.as_secs_f64(),
            segment.end.as_secs_f64()
        );

        Ok(SegmentOutcome {
            index: segment.index,
            audio,
            cover,
        })
    }

    fn write_audio(
        &self,
        segment: &Segment,
        is_last: bool,
        reusable: bool,
    ) -> Result<AudioStatus> {
        let path = &segment.audio_path;
        if path.exists() && reusable {
            info!("Split audio {} already exists, skipping", path.display());
            return Ok(AudioStatus::Existing);
        }

        info!(
            "Creating split audio {} from {:.3}s to {:.3}s",
            path.display(),
            segment.start.as_secs_f64(),
            segment.end.as_secs_f64()
        );

        let end = if is_last { None } else { Some(segment.end) };
        let copied = self.tool.extract_audio_range(
            self.input,
            segment.start,
            end,
            self.format,
            AudioEncoding::Copy,
            path,
        );

        match copied {
            Ok(()) => Ok(AudioStatus::Copied),
            Err(e) => {
                warn!(
                    "Stream copy failed for segment {}, re-encoding: {e}",
                    segment.index
                );
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
                self.tool.extract_audio_range(
                    self.input,
                    segment.start,
                    end,
                    self.format,
                    AudioEncoding::Reencode,
                    path,
                )?;
                Ok(AudioStatus::Reencoded)
            }
        }
    }

    fn write_cover(&self, segment: &Segment, reusable: bool) -> CoverStatus {
        let path = &segment.cover_path;
        if path.exists() {
            if reusable {
                info!("Cover image {} already exists, skipping", path.display());
                return CoverStatus::Existing;
            }
            // A stale cover must not outlive a failed extraction.
            if let Err(e) = std::fs::remove_file(path) {
                warn!("No cover for segment {}: {e}", segment.index);
                return CoverStatus::Missing(e.to_string());
            }
        }

        if !self.has_video {
            let reason = SplitError::CoverExtraction("input has no video stream".to_string());
            warn!("No cover for segment {}: {reason}", segment.index);
            return CoverStatus::Missing(reason.to_string());
        }

        let at = segment.midpoint();
        info!(
            "Extracting frame at {:.3}s as cover image",
            at.as_secs_f64()
        );

        match self.tool.extract_frame(self.input, at, path) {
            Ok(()) => CoverStatus::Written,
            Err(e) => {
                warn!("No cover for segment {}: {e}", segment.index);
                CoverStatus::Missing(e.to_string())
            }
        }
    }
}

/// Remove `split_<n>` audio and cover files with `n > count`, left over from
/// an earlier run that produced more segments. Returns how many were removed.
pub fn remove_extra_segments(dir: &Path, count: usize, extension: &str) -> Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((stem, ext)) = name.rsplit_once('.') else {
            continue;
        };
        if ext != extension && ext != "jpg" {
            continue;
        }
        let Some(n) = stem.strip_prefix("split_").and_then(|n| n.parse::<usize>().ok()) else {
            continue;
        };
        if n > count && path.is_file() {
            info!("Removing leftover {}", path.display());
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
