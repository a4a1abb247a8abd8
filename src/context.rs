use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::subscriber::DefaultGuard;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SplitError};
use crate::logging;
use crate::silence::{SilenceCache, CACHE_FILE_NAME};

/// Output directory for `input`: a sibling directory named after its stem.
pub fn output_dir_for(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let parent = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // Without an extension the stem is the file itself.
    if input.extension().is_none() {
        return parent.join(format!("{}_split", stem.to_string_lossy()));
    }
    parent.join(stem)
}

/// Everything one run owns: its logging, the silence cache, the scratch
/// directory for chunk audio and the cancellation flag.
///
/// Created once per run; [`RunContext::finish`] persists the cache and tears
/// the rest down.
pub struct RunContext {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub cache: SilenceCache,
    temp_dir: TempDir,
    cancelled: Arc<AtomicBool>,
    // Declared last so logging outlives the other fields while they drop.
    _log_guard: DefaultGuard,
}

impl RunContext {
    /// Install logging for this run, then set up the rest.
    pub fn open(input: &Path, verbose: bool, log_file: Option<&Path>) -> Result<Self> {
        let log_guard = logging::scoped(verbose, log_file)?;
        Self::with_log_guard(input, log_guard)
    }

    /// Set up a run whose logging is already installed. Setup failures are
    /// logged before the guard is released.
    pub fn with_log_guard(input: &Path, log_guard: DefaultGuard) -> Result<Self> {
        let (output_dir, cache, temp_dir) = Self::prepare(input).inspect_err(|e| {
            error!("Run setup failed: {e}");
        })?;

        Ok(Self {
            input: input.to_path_buf(),
            output_dir,
            cache,
            temp_dir,
            cancelled: Arc::new(AtomicBool::new(false)),
            _log_guard: log_guard,
        })
    }

    fn prepare(input: &Path) -> Result<(PathBuf, SilenceCache, TempDir)> {
        if !input.is_file() {
            return Err(SplitError::FileNotFound(input.display().to_string()));
        }

        let output_dir = output_dir_for(input);
        info!("Creating output directory: {}", output_dir.display());
        std::fs::create_dir_all(&output_dir)?;

        let cache = SilenceCache::load(output_dir.join(CACHE_FILE_NAME));

        let temp_dir = tempfile::Builder::new()
            .prefix("silencesplit_")
            .tempdir()?;
        debug!("Using temp directory: {}", temp_dir.path().display());

        Ok((output_dir, cache, temp_dir))
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Flag that aborts the run between steps once set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            warn!("Run cancelled, stopping");
            return Err(SplitError::Cancelled);
        }
        Ok(())
    }

    /// Persist the cache and release the temp directory and log file.
    pub fn finish(mut self) -> Result<()> {
        if self.cache.is_dirty() {
            self.cache.save()?;
        }
        debug!("Cleaning up temp directory: {}", self.temp_dir.path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_dir_for() {
        assert_eq!(
            output_dir_for(Path::new("/media/talks/keynote.mkv")),
            PathBuf::from("/media/talks/keynote")
        );
        assert_eq!(output_dir_for(Path::new("show.mp4")), PathBuf::from("./show"));
        assert_eq!(
            output_dir_for(Path::new("/rec/capture")),
            PathBuf::from("/rec/capture_split")
        );
    }

    #[test]
    fn test_open_creates_output_dir_and_loads_cache() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("episode.mkv");
        std::fs::write(&input, b"fake").unwrap();

        let ctx = RunContext::open(&input, false, None).unwrap();
        assert_eq!(ctx.output_dir, dir.path().join("episode"));
        assert!(ctx.output_dir.is_dir());
        assert!(ctx.cache.is_empty());
        assert!(ctx.temp_dir().is_dir());

        let temp = ctx.temp_dir().to_path_buf();
        ctx.finish().unwrap();
        assert!(!temp.exists());
    }

    #[test]
    fn test_open_missing_input() {
        let result = RunContext::open(Path::new("/nonexistent/episode.mkv"), false, None);
        assert!(matches!(result, Err(SplitError::FileNotFound(_))));
    }

    #[test]
    fn test_missing_input_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("silencesplit.log");

        let result = RunContext::open(&dir.path().join("episode.mkv"), false, Some(&log));

        assert!(matches!(result, Err(SplitError::FileNotFound(_))));
        let contents = std::fs::read_to_string(&log).unwrap();
        assert!(contents.contains("ERROR"));
        assert!(contents.contains("File not found"));
        assert!(contents.contains("episode.mkv"));
    }

    #[test]
    fn test_cancel_flag() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("episode.mkv");
        std::fs::write(&input, b"fake").unwrap();

        let ctx = RunContext::open(&input, false, None).unwrap();
        assert!(ctx.ensure_not_cancelled().is_ok());
        ctx.cancel_flag().store(true, Ordering::Relaxed);
        assert!(matches!(ctx.ensure_not_cancelled(), Err(SplitError::Cancelled)));
    }
}
