use crate::config::Config;
use crate::context::RunContext;
use crate::error::{Result, SplitError};
use crate::media::{extract_chunk, plan_chunks, MediaInfo, MediaTool};
use crate::silence::{CacheKey, DetectionStats, SegmentRecord, SilenceDetector, SilenceParams};
use crate::split::{
    accept_split_points, plan_segments, remove_extra_segments, to_split_points, AudioStatus,
    ChunkSilences, CoverStatus, Segment, SegmentOutcome, SegmentWriter, SplitPoint,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Settings for one split run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Length of the windows scanned for silence.
    pub chunk_duration: Duration,
    /// Silence-detection filter settings.
    pub silence: SilenceParams,
    /// Split points closer than this are merged.
    pub dedupe_epsilon: Duration,
    /// Split points that would leave a shorter segment are dropped.
    pub min_segment: Duration,
    /// Regenerate segments that already exist.
    pub overwrite: bool,
    /// Detect and plan only; write no segments.
    pub dry_run: bool,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_duration: config.chunk_duration(),
            silence: SilenceParams {
                threshold_db: config.silence_threshold_db,
                min_duration: config.silence_duration(),
            },
            dedupe_epsilon: config.dedupe_epsilon(),
            min_segment: config.min_segment(),
            overwrite: false,
            dry_run: false,
            show_progress: true,
        }
    }
}

/// Statistics from one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total time taken for the entire run.
    pub total_time: Duration,
    /// Time spent extracting chunks and detecting silence.
    pub detection_time: Duration,
    /// Time spent writing segments and covers.
    pub writing_time: Duration,
    /// Duration of the input.
    pub media_duration: Duration,
    pub chunks: usize,
    pub chunks_detected: usize,
    pub chunks_cached: usize,
    /// Silences found across all chunks, before deduplication.
    pub silences: usize,
    /// Segments written in this run (not skipped as existing).
    pub segments_written: usize,
    pub covers_missing: usize,
}

/// Result of a split run.
#[derive(Debug)]
pub struct PipelineResult {
    pub output_dir: PathBuf,
    pub media: MediaInfo,
    pub split_points: Vec<SplitPoint>,
    pub segments: Vec<Segment>,
    /// One entry per segment; empty for a dry run.
    pub outcomes: Vec<SegmentOutcome>,
    pub stats: PipelineStats,
}

fn check_cancelled(flag: &AtomicBool) -> Result<()> {
    if flag.load(Ordering::Relaxed) {
        return Err(SplitError::Cancelled);
    }
    Ok(())
}

fn progress_bar(show: bool, len: usize, message: &str) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Detect silences chunk by chunk, taking cached results where possible.
pub fn detect_silences(
    tool: &dyn MediaTool,
    ctx: &mut RunContext,
    media: &MediaInfo,
    config: &PipelineConfig,
) -> Result<(Vec<ChunkSilences>, DetectionStats)> {
    let plans = plan_chunks(media.duration, config.chunk_duration);
    info!(
        "Scanning {} chunk(s) of up to {:.0}s for silence",
        plans.len(),
        config.chunk_duration.as_secs_f64()
    );

    let input = ctx.input.clone();
    let temp_dir = ctx.temp_dir().to_path_buf();
    let cancelled = ctx.cancel_flag();
    let mut detector = SilenceDetector::new(tool, &mut ctx.cache);

    let pb = progress_bar(config.show_progress, plans.len(), "Detecting silence");
    let mut chunks = Vec::with_capacity(plans.len());

    for plan in plans {
        check_cancelled(&cancelled)?;

        let key = CacheKey::new(plan.index, config.chunk_duration, &config.silence);
        let intervals = match detector.cached(&key) {
            Some(hit) => hit,
            None => {
                // The chunk file is removed when `audio` drops, on error too.
                let audio = extract_chunk(tool, &input, plan, &temp_dir)?;
                detector.detect(audio.path(), plan.duration, key)?
            }
        };

        chunks.push(ChunkSilences {
            index: plan.index,
            offset: plan.offset,
            intervals,
        });
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok((chunks, detector.stats()))
}

/// Split the context's input at detected silences.
///
/// 1. Probes the input for codec and duration
/// 2. Detects silence per chunk, using the cache where possible
/// 3. Derives split points and plans segments
/// 4. Writes each segment's audio and cover image
pub fn split_by_silence(
    tool: &dyn MediaTool,
    ctx: &mut RunContext,
    config: &PipelineConfig,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    tool.check()?;
    ctx.ensure_not_cancelled()?;

    // Stage 1: probe
    info!("Stage 1/3: Probing {}", ctx.input.display());
    let media = tool.probe(&ctx.input)?;
    let format = media.output_format();
    info!(
        "Detected audio codec: {}, container format: {}, segments will be written as {}",
        media.codec, media.container, format
    );
    info!("Input duration: {:.3}s", media.duration.as_secs_f64());

    // Stage 2: silence detection
    info!("Stage 2/3: Detecting silence");
    let detection_start = Instant::now();
    let (chunks, detection_stats) = detect_silences(tool, ctx, &media, config)?;
    let detection_time = detection_start.elapsed();

    let silences: usize = chunks.iter().map(|c| c.intervals.len()).sum();
    let candidates = to_split_points(&chunks, config.dedupe_epsilon);
    let split_points = accept_split_points(
        candidates,
        media.duration,
        config.dedupe_epsilon,
        config.min_segment,
    );
    info!(
        "Split points ({}): [{}]",
        split_points.len(),
        split_points
            .iter()
            .map(|p| format!("{:.3}", p.time.as_secs_f64()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let segments = plan_segments(
        &split_points,
        media.duration,
        &ctx.output_dir,
        format.extension,
    );

    let mut stats = PipelineStats {
        detection_time,
        media_duration: media.duration,
        chunks: chunks.len(),
        chunks_detected: detection_stats.detected,
        chunks_cached: detection_stats.cached,
        silences,
        ..Default::default()
    };

    if config.dry_run {
        info!("Dry run: {} segment(s) planned, nothing written", segments.len());
        stats.total_time = start_time.elapsed();
        return Ok(PipelineResult {
            output_dir: ctx.output_dir.clone(),
            media,
            split_points,
            segments,
            outcomes: Vec::new(),
            stats,
        });
    }

    // Stage 3: segments
    info!(
        "Stage 3/3: Writing {} segment(s) to {}",
        segments.len(),
        ctx.output_dir.display()
    );
    let writing_start = Instant::now();
    let writer = SegmentWriter::new(tool, &ctx.input, format, media.has_video)
        .with_overwrite(config.overwrite);

    let removed = remove_extra_segments(&ctx.output_dir, segments.len(), format.extension)?;
    if removed > 0 {
        info!("Removed {removed} file(s) left over from a run with more segments");
    }
    ctx.cache.truncate_segments(segments.len());

    let pb = progress_bar(config.show_progress, segments.len(), "Writing segments");
    let mut outcomes = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        ctx.ensure_not_cancelled()?;
        let previous = ctx.cache.segment(segment.index).copied();
        ctx.cache.forget_segment(segment.index);
        let outcome = writer.write(segment, i + 1 == segments.len(), previous.as_ref())?;
        ctx.cache.record_segment(SegmentRecord::from(segment));
        outcomes.push(outcome);
        pb.inc(1);
    }
    pb.finish_and_clear();

    stats.writing_time = writing_start.elapsed();
    stats.segments_written = outcomes
        .iter()
        .filter(|o| o.audio != AudioStatus::Existing)
        .count();
    stats.covers_missing = outcomes
        .iter()
        .filter(|o| matches!(o.cover, CoverStatus::Missing(_)))
        .count();
    stats.total_time = start_time.elapsed();

    info!(
        "Processing completed: {} segment(s), {} without cover",
        outcomes.len(),
        stats.covers_missing
    );

    Ok(PipelineResult {
        output_dir: ctx.output_dir.clone(),
        media,
        split_points,
        segments,
        outcomes,
        stats,
    })
}

/// Print a summary of the run.
pub fn print_summary(result: &PipelineResult) {
    let stats = &result.stats;
    let dry_run = result.outcomes.is_empty();

    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    if dry_run {
        println!("{}", style("                    Dry Run: Planned Segments").bold());
    } else {
        println!("{}", style("                      Split Complete").bold());
    }
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
    println!("  Output:     {}", result.output_dir.display());
    println!(
        "  Source:     {} / {} ({:.1}s)",
        result.media.codec,
        result.media.container,
        stats.media_duration.as_secs_f64()
    );
    println!(
        "  Chunks:     {} ({} detected, {} from cache)",
        stats.chunks, stats.chunks_detected, stats.chunks_cached
    );
    println!(
        "  Silences:   {} found, {} split point(s)",
        stats.silences,
        result.split_points.len()
    );
    println!();

    for segment in &result.segments {
        let name = segment
            .audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let cover = result
            .outcomes
            .iter()
            .find(|o| o.index == segment.index)
            .map(|o| match o.cover {
                CoverStatus::Missing(_) => style("no cover").yellow().to_string(),
                _ => style("cover").green().to_string(),
            })
            .unwrap_or_default();
        println!(
            "    {:<16} {:>10.3}s → {:>10.3}s  {}",
            name,
            segment.start.as_secs_f64(),
            segment.end.as_secs_f64(),
            cover
        );
    }

    println!();
    println!("  Timing:");
    println!(
        "    Detect:      {:.2}s",
        stats.detection_time.as_secs_f64()
    );
    if !dry_run {
        println!(
            "    Write:       {:.2}s ({} written, {} kept)",
            stats.writing_time.as_secs_f64(),
            stats.segments_written,
            result.outcomes.len() - stats.segments_written
        );
    }
    println!("    Total:       {:.2}s", stats.total_time.as_secs_f64());
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
}
