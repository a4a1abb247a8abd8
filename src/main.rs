use anyhow::{Context, Result};
use clap::Parser;
use silencesplit::config::Config;
use silencesplit::interactive::run_interactive_wizard;
use silencesplit::logging;
use silencesplit::media::Ffmpeg;
use silencesplit::{print_summary, split_by_silence, PipelineConfig, RunContext};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "silencesplit")]
#[command(version, about = "Split long recordings into audio segments at silences")]
#[command(long_about = "Detect silences in a long audio/video file with FFmpeg and split its audio \
at the start of each silence. Every segment keeps the source codec and gets a cover image taken \
from its midpoint.")]
struct Cli {
    /// Input audio/video file
    #[arg(required_unless_present = "interactive")]
    input: Option<PathBuf>,

    /// Chunk duration in seconds used for silence detection [default: 2700]
    #[arg(long)]
    chunk_duration: Option<u64>,

    /// Silence threshold in dB [default: -40]
    #[arg(long, allow_negative_numbers = true)]
    silence_threshold: Option<f64>,

    /// Minimum silence duration in seconds [default: 2]
    #[arg(long)]
    silence_duration: Option<f64>,

    /// Drop split points that would leave a segment shorter than this many
    /// seconds [default: 0]
    #[arg(long)]
    min_segment: Option<f64>,

    /// Log file (default: silencesplit.log in the current directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Regenerate segments that already exist
    #[arg(long)]
    overwrite: bool,

    /// Detect silences and show the planned segments without writing them
    #[arg(long)]
    dry_run: bool,

    /// Choose the input and parameters interactively
    #[arg(short, long)]
    interactive: bool,

    /// Hide progress bars
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(secs) = self.chunk_duration {
            config.chunk_duration_secs = secs;
        }
        if let Some(db) = self.silence_threshold {
            config.silence_threshold_db = db;
        }
        if let Some(secs) = self.silence_duration {
            config.silence_duration_secs = secs;
        }
        if let Some(secs) = self.min_segment {
            config.min_segment_secs = secs;
        }
        if let Some(ref path) = self.log_file {
            config.log_file = Some(path.clone());
        }
    }
}

/// Load the layered config. Without a config there is no configured log
/// file, so a failure is logged to the `--log-file` path or the default one.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            let log_file = cli.log_file.clone().or_else(|| Config::default().log_file);
            let _guard = logging::scoped(cli.verbose, log_file.as_deref());
            error!("Failed to load configuration: {e}");
            return Err(e).context("Failed to load configuration");
        }
    };
    cli.apply_overrides(&mut config);
    Ok(config)
}

/// Settle the input and final settings, running the wizard if asked.
fn prepare(cli: &Cli, mut config: Config) -> Result<(PathBuf, Config)> {
    let input = match cli.input.clone() {
        Some(input) if !cli.interactive => input,
        _ => {
            let result = run_interactive_wizard(config)?;
            config = result.config;
            result.input
        }
    };

    config.validate().context("Configuration validation failed")?;
    Ok((input, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let log_guard = logging::scoped(cli.verbose, config.log_file.as_deref())
        .context("Failed to open log file")?;

    let (input, config) = prepare(&cli, config).inspect_err(|e| error!("{e:#}"))?;

    let mut ctx = RunContext::with_log_guard(&input, log_guard)
        .with_context(|| format!("Failed to set up run for '{}'", input.display()))?;

    let cancelled = ctx.cancel_flag();
    ctrlc::set_handler(move || cancelled.store(true, Ordering::Relaxed))
        .inspect_err(|e| error!("Failed to install Ctrl+C handler: {e}"))
        .context("Failed to install Ctrl+C handler")?;

    info!("Input:     {}", input.display());
    info!("Output:    {}", ctx.output_dir.display());
    info!(
        "Detection: {}s chunks, {}dB threshold, {}s minimum silence, {}s minimum segment",
        config.chunk_duration_secs,
        config.silence_threshold_db,
        config.silence_duration_secs,
        config.min_segment_secs
    );

    let pipeline_config = PipelineConfig {
        overwrite: cli.overwrite,
        dry_run: cli.dry_run,
        show_progress: !cli.quiet,
        ..PipelineConfig::from_config(&config)
    };

    let tool = Ffmpeg::from_config(&config);
    let result = match split_by_silence(&tool, &mut ctx, &pipeline_config) {
        Ok(result) => result,
        Err(e) => {
            error!("Run failed: {e}");
            if let Err(finish_err) = ctx.finish() {
                eprintln!("Failed to save silence cache: {finish_err}");
            }
            return Err(e).with_context(|| format!("Failed to split '{}'", input.display()));
        }
    };

    ctx.finish().context("Failed to save silence cache")?;
    print_summary(&result);

    Ok(())
}
