//! Parser for the diagnostic lines FFmpeg's `silencedetect` filter prints:
//!
//! ```text
//! [silencedetect @ 0x55d0c8] silence_start: 120
//! [silencedetect @ 0x55d0c8] silence_end: 123.5 | silence_duration: 3.5
//! ```
//!
//! This is the only place that knows the text format.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{Result, SplitError};

use super::{duration_from_secs, SilenceInterval};

const START_MARKER: &str = "silence_start";
const END_MARKER: &str = "silence_end";

static START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_start:\s*(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)").expect("Invalid regex")
});

static END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_end:\s*(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)").expect("Invalid regex")
});

fn capture_secs(re: &Regex, line: &str) -> Result<Duration> {
    let secs: f64 = re
        .captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| {
            SplitError::Detection(format!("Unparseable silencedetect line: {}", line.trim()))
        })?;
    Ok(duration_from_secs(secs))
}

/// Turn `silencedetect` output for one chunk into intervals, earliest first.
///
/// A start without a matching end is closed at `chunk_duration`; an end
/// without a start opens at the chunk start. Lines without either marker are
/// ignored.
pub fn parse_silence_log(log: &str, chunk_duration: Duration) -> Result<Vec<SilenceInterval>> {
    let mut intervals = Vec::new();
    let mut open: Option<Duration> = None;

    let mut push = |start: Duration, end: Duration| {
        let end = end.min(chunk_duration);
        if start < end {
            intervals.push(SilenceInterval { start, end });
        }
    };

    for line in log.lines() {
        if line.contains(START_MARKER) {
            let start = capture_secs(&START_RE, line)?;
            // Keep the earliest start if the filter repeats itself.
            open.get_or_insert(start);
        } else if line.contains(END_MARKER) {
            let end = capture_secs(&END_RE, line)?;
            let start = open.take().unwrap_or(Duration::ZERO);
            push(start, end);
        }
    }

    if let Some(start) = open {
        push(start, chunk_duration);
    }

    intervals.sort_by_key(|i| i.start);
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: Duration = Duration::from_secs(2700);

    fn secs(s: f64) -> Duration {
        duration_from_secs(s)
    }

    #[test]
    fn test_parse_pairs() {
        let log = "\
Input #0, wav, from 'chunk_0000.wav':
  Duration: 00:45:00.00, bitrate: 1536 kb/s
[silencedetect @ 0x55d0c8] silence_start: 120
[silencedetect @ 0x55d0c8] silence_end: 123.5 | silence_duration: 3.5
size=N/A time=00:45:00.00 bitrate=N/A speed=900x
[silencedetect @ 0x55d0c8] silence_start: 1800.25
[silencedetect @ 0x55d0c8] silence_end: 1803.000125 | silence_duration: 2.750125
";
        let intervals = parse_silence_log(log, CHUNK).unwrap();

        assert_eq!(
            intervals,
            vec![
                SilenceInterval {
                    start: secs(120.0),
                    end: secs(123.5)
                },
                SilenceInterval {
                    start: secs(1800.25),
                    end: secs(1803.000125)
                },
            ]
        );
    }

    #[test]
    fn test_no_silence_is_not_an_error() {
        let log = "Input #0, wav, from 'chunk_0000.wav':\n  Stream #0:0: Audio: pcm_s16le\n";
        assert!(parse_silence_log(log, CHUNK).unwrap().is_empty());
        assert!(parse_silence_log("", CHUNK).unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_silence_closes_at_chunk_end() {
        let log = "[silencedetect @ 0x1] silence_start: 2690.5\n";
        let intervals = parse_silence_log(log, CHUNK).unwrap();
        assert_eq!(
            intervals,
            vec![SilenceInterval {
                start: secs(2690.5),
                end: CHUNK
            }]
        );
    }

    #[test]
    fn test_leading_end_opens_at_chunk_start() {
        let log = "[silencedetect @ 0x1] silence_end: 4.2 | silence_duration: 4.2\n";
        let intervals = parse_silence_log(log, CHUNK).unwrap();
        assert_eq!(intervals[0].start, Duration::ZERO);
        assert_eq!(intervals[0].end, secs(4.2));
    }

    #[test]
    fn test_negative_start_clamped() {
        let log = "\
[silencedetect @ 0x1] silence_start: -0.00133
[silencedetect @ 0x1] silence_end: 2.5 | silence_duration: 2.50133
";
        let intervals = parse_silence_log(log, CHUNK).unwrap();
        assert_eq!(intervals[0].start, Duration::ZERO);
    }

    #[test]
    fn test_exponent_notation() {
        let log = "\
[silencedetect @ 0x1] silence_start: 1.5e-05
[silencedetect @ 0x1] silence_end: 3 | silence_duration: 2.999985
";
        let intervals = parse_silence_log(log, CHUNK).unwrap();
        assert_eq!(intervals[0].start, Duration::from_micros(15));
    }

    #[test]
    fn test_end_clamped_to_chunk() {
        let log = "\
[silencedetect @ 0x1] silence_start: 8
[silencedetect @ 0x1] silence_end: 10.02 | silence_duration: 2.02
";
        let intervals = parse_silence_log(log, Duration::from_secs(10)).unwrap();
        assert_eq!(intervals[0].end, Duration::from_secs(10));
    }

    #[test]
    fn test_garbled_marker_line_is_an_error() {
        let log = "[silencedetect @ 0x1] silence_start: nan-ish\n";
        assert!(matches!(
            parse_silence_log(log, CHUNK),
            Err(SplitError::Detection(_))
        ));
    }
}
