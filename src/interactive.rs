use crate::config::Config;
use console::style;
use dialoguer::{Confirm, FuzzySelect, Input};
use std::fs;
use std::path::{Path, PathBuf};

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "webm", "ts", // Video
    "wav", "flac", "mp3", "m4a", "ogg", "opus", "aac", "mka", // Audio
];

pub struct InteractiveResult {
    pub input: PathBuf,
    pub config: Config,
}

/// Walk the user through choosing an input file and the detection
/// parameters, starting from `config`.
pub fn run_interactive_wizard(config: Config) -> anyhow::Result<InteractiveResult> {
    print_header();

    let input = select_source_file(Path::new("."))?;

    let mut config = config;
    config.chunk_duration_secs = Input::new()
        .with_prompt("Chunk duration (seconds)")
        .default(config.chunk_duration_secs)
        .validate_with(|v: &u64| if *v > 0 { Ok(()) } else { Err("must be greater than 0") })
        .interact_text()?;
    config.silence_threshold_db = Input::new()
        .with_prompt("Silence threshold (dB)")
        .default(config.silence_threshold_db)
        .validate_with(|v: &f64| if *v < 0.0 { Ok(()) } else { Err("must be negative") })
        .interact_text()?;
    config.silence_duration_secs = Input::new()
        .with_prompt("Minimum silence duration (seconds)")
        .default(config.silence_duration_secs)
        .validate_with(|v: &f64| if *v > 0.0 { Ok(()) } else { Err("must be greater than 0") })
        .interact_text()?;
    config.min_segment_secs = Input::new()
        .with_prompt("Minimum segment length (seconds, 0 keeps every split)")
        .default(config.min_segment_secs)
        .validate_with(|v: &f64| if *v >= 0.0 { Ok(()) } else { Err("must not be negative") })
        .interact_text()?;

    println!();
    println!("  {} {}", style("Input:").bold(), input.display());
    println!(
        "  {} {}s chunks, {}dB, {}s minimum silence, {}s minimum segment",
        style("Detect:").bold(),
        config.chunk_duration_secs,
        config.silence_threshold_db,
        config.silence_duration_secs,
        config.min_segment_secs
    );
    println!();

    if !Confirm::new()
        .with_prompt("Proceed with these settings?")
        .default(true)
        .interact()?
    {
        anyhow::bail!("Cancelled by user");
    }

    Ok(InteractiveResult { input, config })
}

fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║        silencesplit - split audio at silence      ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Media files in `dir`, sorted by name.
pub fn find_media_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    files.sort();
    Ok(files)
}

fn select_source_file(dir: &Path) -> anyhow::Result<PathBuf> {
    let files = find_media_files(dir)?;

    if files.is_empty() {
        let path: String = Input::new()
            .with_prompt("No media files found here. Path to input file")
            .interact_text()?;
        return Ok(PathBuf::from(path.trim()));
    }

    let names: Vec<String> = files
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();

    let selection = FuzzySelect::new()
        .with_prompt("Select a file to split")
        .items(&names)
        .default(0)
        .interact()?;

    Ok(files[selection].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("talk.MKV")));
        assert!(is_supported(Path::new("/a/b/podcast.flac")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn test_find_media_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mkv", "a.mp3", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("folder.mkv")).unwrap();

        let files = find_media_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.mp3"), dir.path().join("b.mkv")]
        );
    }
}
