pub mod translate;
pub mod writer;

pub use translate::{accept_split_points, plan_segments, to_split_points, ChunkSilences};
pub use writer::{remove_extra_segments, AudioStatus, CoverStatus, SegmentOutcome, SegmentWriter};

use std::path::PathBuf;
use std::time::Duration;

use crate::silence::SegmentRecord;

/// A cut position in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitPoint {
    pub time: Duration,
}

/// One output audio file and its cover image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 1-based position in the output.
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub audio_path: PathBuf,
    pub cover_path: PathBuf,
}

impl Segment {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    /// Where the cover frame is taken from.
    pub fn midpoint(&self) -> Duration {
        self.start + self.duration() / 2
    }
}

impl From<&Segment> for SegmentRecord {
    fn from(segment: &Segment) -> Self {
        Self {
            index: segment.index,
            start: segment.start,
            end: segment.end,
        }
    }
}
