pub mod chunk;
pub mod ffmpeg;
pub mod probe;

pub use chunk::{extract_chunk, plan_chunks, ChunkPlan, TempChunk};
pub use ffmpeg::Ffmpeg;
pub use probe::parse_probe_output;

use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::silence::SilenceParams;

/// What the probe learned about an input file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Codec of the first audio stream, e.g. `aac`.
    pub codec: String,
    /// First name FFprobe reports for the container, e.g. `matroska`.
    pub container: String,
    pub duration: Duration,
    pub has_video: bool,
}

impl MediaInfo {
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::for_codec(&self.codec)
    }
}

/// Container used for the audio segments, chosen so the source codec can be
/// stream-copied into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub extension: &'static str,
    pub muxer: &'static str,
}

impl OutputFormat {
    pub fn for_codec(codec: &str) -> Self {
        let (extension, muxer) = match codec {
            "aac" | "alac" => ("m4a", "ipod"),
            "mp3" => ("mp3", "mp3"),
            "flac" => ("flac", "flac"),
            "opus" => ("opus", "opus"),
            "vorbis" => ("ogg", "ogg"),
            "ac3" => ("ac3", "ac3"),
            "eac3" => ("eac3", "eac3"),
            "dts" => ("dts", "dts"),
            c if c.starts_with("pcm_") => ("wav", "wav"),
            // Matroska audio accepts any codec.
            _ => ("mka", "matroska"),
        };
        Self { extension, muxer }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.extension, self.muxer)
    }
}

/// How an audio range should be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// Stream copy, no re-encoding.
    Copy,
    /// Let the tool pick the container's default encoder.
    Reencode,
}

/// The external media tool every pipeline stage delegates to.
///
/// `Ffmpeg` is the real implementation; tests substitute a fake.
pub trait MediaTool {
    fn name(&self) -> &'static str;

    /// Verify the tool can be launched at all.
    fn check(&self) -> Result<()>;

    fn probe(&self, input: &Path) -> Result<MediaInfo>;

    /// Write `[start, start + duration)` of the input's audio to `output`.
    fn extract_chunk(
        &self,
        input: &Path,
        start: Duration,
        duration: Duration,
        output: &Path,
    ) -> Result<()>;

    /// Run silence detection over `audio` and return the tool's raw
    /// diagnostic text.
    fn silence_log(&self, audio: &Path, params: &SilenceParams) -> Result<String>;

    /// Write the input's audio from `start` to `end` (or to the end of the
    /// file when `end` is `None`) into `output`.
    fn extract_audio_range(
        &self,
        input: &Path,
        start: Duration,
        end: Option<Duration>,
        format: OutputFormat,
        encoding: AudioEncoding,
        output: &Path,
    ) -> Result<()>;

    /// Save a single still frame at `at` as an image.
    fn extract_frame(&self, input: &Path, at: Duration, output: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_for_codec() {
        assert_eq!(OutputFormat::for_codec("aac").extension, "m4a");
        assert_eq!(OutputFormat::for_codec("mp3").muxer, "mp3");
        assert_eq!(OutputFormat::for_codec("pcm_s24le").extension, "wav");
        assert_eq!(OutputFormat::for_codec("vorbis").extension, "ogg");
    }

    #[test]
    fn test_unknown_codec_falls_back_to_matroska() {
        let format = OutputFormat::for_codec("truehd");
        assert_eq!(format.extension, "mka");
        assert_eq!(format.muxer, "matroska");
    }

    #[test]
    fn test_media_info_output_format() {
        let info = MediaInfo {
            codec: "flac".to_string(),
            container: "matroska".to_string(),
            duration: Duration::from_secs(10),
            has_video: true,
        };
        assert_eq!(info.output_format().extension, "flac");
    }
}
