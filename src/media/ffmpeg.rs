use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SplitError};
use crate::silence::SilenceParams;

use super::{parse_probe_output, AudioEncoding, MediaInfo, MediaTool, OutputFormat};

/// `MediaTool` backed by the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.ffmpeg, &config.ffprobe)
    }

    fn ffmpeg_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-hide_banner", "-nostdin", "-loglevel", "error"]);
        cmd
    }
}

/// Format a duration the way FFmpeg accepts it on the command line.
fn secs_arg(d: Duration) -> String {
    format!("{:.6}", d.as_secs_f64())
}

/// Last few lines of a process's stderr, for error messages.
fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join("; ")
}

fn check_program(program: &Path) -> Result<()> {
    let output = Command::new(program).arg("-version").output().map_err(|e| {
        SplitError::ToolNotFound(format!(
            "{} not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}",
            program.display()
        ))
    })?;

    if !output.status.success() {
        return Err(SplitError::ToolNotFound(format!(
            "{} -version failed",
            program.display()
        )));
    }

    debug!("{} is available", program.display());
    Ok(())
}

impl MediaTool for Ffmpeg {
    fn name(&self) -> &'static str {
        "FFmpeg"
    }

    fn check(&self) -> Result<()> {
        check_program(&self.ffmpeg)?;
        check_program(&self.ffprobe)
    }

    fn probe(&self, input: &Path) -> Result<MediaInfo> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(input)
            .output()
            .map_err(|e| SplitError::Probe(format!("Failed to run FFprobe: {e}")))?;

        if !output.status.success() {
            return Err(SplitError::Probe(format!(
                "FFprobe failed: {}",
                stderr_tail(&output)
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn extract_chunk(
        &self,
        input: &Path,
        start: Duration,
        duration: Duration,
        output: &Path,
    ) -> Result<()> {
        let result = self
            .ffmpeg_command()
            .arg("-ss")
            .arg(secs_arg(start))
            .arg("-t")
            .arg(secs_arg(duration))
            .arg("-i")
            .arg(input)
            .args(["-vn", "-acodec", "pcm_s16le", "-f", "wav"])
            .arg(output)
            .output()
            .map_err(|e| SplitError::Extraction(format!("Failed to run FFmpeg: {e}")))?;

        if !result.status.success() {
            return Err(SplitError::Extraction(format!(
                "FFmpeg exited with {}: {}",
                result.status,
                stderr_tail(&result)
            )));
        }

        if !output.exists() {
            return Err(SplitError::Extraction(format!(
                "Output file was not created: {}",
                output.display()
            )));
        }

        Ok(())
    }

    fn silence_log(&self, audio: &Path, params: &SilenceParams) -> Result<String> {
        // silencedetect reports at info level, so the quiet defaults of
        // `ffmpeg_command` do not apply here.
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-nostdin", "-nostats", "-i"])
            .arg(audio)
            .arg("-af")
            .arg(params.filter_arg())
            .args(["-f", "null", "-"])
            .output()
            .map_err(|e| SplitError::Detection(format!("Failed to run FFmpeg: {e}")))?;

        if !output.status.success() {
            return Err(SplitError::Detection(format!(
                "FFmpeg exited with {}: {}",
                output.status,
                stderr_tail(&output)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stderr).into_owned())
    }

    fn extract_audio_range(
        &self,
        input: &Path,
        start: Duration,
        end: Option<Duration>,
        format: OutputFormat,
        encoding: AudioEncoding,
        output: &Path,
    ) -> Result<()> {
        let mut cmd = self.ffmpeg_command();
        cmd.arg("-ss").arg(secs_arg(start)).arg("-i").arg(input);
        if let Some(end) = end {
            cmd.arg("-t").arg(secs_arg(end.saturating_sub(start)));
        }
        cmd.args(["-map", "0:a:0", "-vn"]);
        if encoding == AudioEncoding::Copy {
            cmd.args(["-c:a", "copy"]);
        }
        cmd.args(["-f", format.muxer]).arg(output);

        let result = cmd
            .output()
            .map_err(|e| SplitError::Segment(format!("Failed to run FFmpeg: {e}")))?;

        if !result.status.success() {
            return Err(SplitError::Segment(format!(
                "FFmpeg exited with {}: {}",
                result.status,
                stderr_tail(&result)
            )));
        }

        if !output.exists() {
            return Err(SplitError::Segment(format!(
                "Output file was not created: {}",
                output.display()
            )));
        }

        Ok(())
    }

    fn extract_frame(&self, input: &Path, at: Duration, output: &Path) -> Result<()> {
        let result = self
            .ffmpeg_command()
            .arg("-ss")
            .arg(secs_arg(at))
            .arg("-i")
            .arg(input)
            .args(["-map", "0:v:0", "-frames:v", "1", "-q:v", "2"])
            .arg(output)
            .output()
            .map_err(|e| SplitError::CoverExtraction(format!("Failed to run FFmpeg: {e}")))?;

        if !result.status.success() {
            return Err(SplitError::CoverExtraction(format!(
                "FFmpeg exited with {}: {}",
                result.status,
                stderr_tail(&result)
            )));
        }

        if !output.exists() {
            return Err(SplitError::CoverExtraction(format!(
                "No frame at {:.3}s",
                at.as_secs_f64()
            )));
        }

        Ok(())
    }
}
