use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::silence::SilenceInterval;

use super::{Segment, SplitPoint};

/// Silences found in one chunk, still relative to the chunk start.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSilences {
    pub index: usize,
    pub offset: Duration,
    pub intervals: Vec<SilenceInterval>,
}

/// Map every chunk's silences to file-absolute split points.
///
/// Each silence contributes its *start*. Chunks are independent, so a silence
/// straddling a chunk boundary shows up twice; points closer than `epsilon`
/// to the previously kept one are dropped, keeping the earlier point.
pub fn to_split_points(chunks: &[ChunkSilences], epsilon: Duration) -> Vec<SplitPoint> {
    let mut times: Vec<Duration> = chunks
        .iter()
        .flat_map(|c| c.intervals.iter().map(move |i| c.offset + i.start))
        .collect();
    times.sort_unstable();

    let mut points: Vec<SplitPoint> = Vec::with_capacity(times.len());
    for time in times {
        if let Some(last) = points.last() {
            // Sorted, so `time >= last.time`; equality matters when epsilon is zero.
            if time == last.time || time - last.time < epsilon {
                continue;
            }
        }
        points.push(SplitPoint { time });
    }

    points
}

/// Drop split points that would produce an empty segment at either end of
/// the file, or a segment shorter than `min_segment`.
///
/// Points are taken in order: one closer than `min_segment` to the previously
/// kept boundary is dropped, merging the short stretch into the following
/// segment. A final segment that would still be too short is merged into
/// its predecessor.
pub fn accept_split_points(
    points: Vec<SplitPoint>,
    total: Duration,
    epsilon: Duration,
    min_segment: Duration,
) -> Vec<SplitPoint> {
    let mut accepted: Vec<SplitPoint> = Vec::with_capacity(points.len());
    let mut boundary = Duration::ZERO;
    for point in points {
        if point.time <= epsilon || point.time + epsilon >= total {
            continue;
        }
        if point.time.saturating_sub(boundary) < min_segment {
            debug!(
                "Dropping split point {:.3}s: segment would be shorter than {:.3}s",
                point.time.as_secs_f64(),
                min_segment.as_secs_f64()
            );
            continue;
        }
        boundary = point.time;
        accepted.push(point);
    }

    while let Some(last) = accepted.last() {
        if total - last.time >= min_segment {
            break;
        }
        debug!(
            "Dropping split point {:.3}s: final segment would be shorter than {:.3}s",
            last.time.as_secs_f64(),
            min_segment.as_secs_f64()
        );
        accepted.pop();
    }

    accepted
}

/// Pair consecutive boundaries (file start, each split point, file end) into
/// segments named `split_<n>.<extension>` / `split_<n>.jpg` in `output_dir`.
pub fn plan_segments(
    points: &[SplitPoint],
    total: Duration,
    output_dir: &Path,
    extension: &str,
) -> Vec<Segment> {
    let ends = points.iter().map(|p| p.time).chain(std::iter::once(total));

    let mut segments = Vec::with_capacity(points.len() + 1);
    let mut start = Duration::ZERO;
    for (i, end) in ends.enumerate() {
        let index = i + 1;
        segments.push(Segment {
            index,
            start,
            end,
            audio_path: output_dir.join(format!("split_{index}.{extension}")),
            cover_path: output_dir.join(format!("split_{index}.jpg")),
        });
        start = end;
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn interval(start: f64, end: f64) -> SilenceInterval {
        SilenceInterval {
            start: secs(start),
            end: secs(end),
        }
    }

    fn chunk(index: usize, offset: u64, intervals: Vec<SilenceInterval>) -> ChunkSilences {
        ChunkSilences {
            index,
            offset: Duration::from_secs(offset),
            intervals,
        }
    }

    const EPS: Duration = Duration::from_millis(50);

    #[test]
    fn test_offsets_applied_at_silence_start() {
        let chunks = vec![
            chunk(0, 0, vec![interval(120.0, 123.5)]),
            chunk(1, 2700, vec![interval(50.0, 52.1)]),
            chunk(2, 5400, vec![]),
        ];

        let points = to_split_points(&chunks, EPS);
        assert_eq!(
            points,
            vec![
                SplitPoint { time: secs(120.0) },
                SplitPoint { time: secs(2750.0) }
            ]
        );
    }

    #[test]
    fn test_straddling_silence_deduplicated() {
        // Silence runs across the 2700s boundary: reported at the end of
        // chunk 0 and at the very start of chunk 1.
        let chunks = vec![
            chunk(0, 0, vec![interval(2699.98, 2700.0)]),
            chunk(1, 2700, vec![interval(0.0, 1.5)]),
        ];

        let points = to_split_points(&chunks, EPS);
        assert_eq!(points, vec![SplitPoint { time: secs(2699.98) }]);
    }

    #[test]
    fn test_output_strictly_ascending_and_spaced() {
        let chunks = vec![
            chunk(1, 100, vec![interval(0.01, 3.0), interval(5.0, 9.0)]),
            chunk(0, 0, vec![interval(99.97, 100.0), interval(10.0, 12.0), interval(10.03, 12.0)]),
        ];

        let points = to_split_points(&chunks, EPS);
        assert!(points.windows(2).all(|w| w[1].time > w[0].time && w[1].time - w[0].time >= EPS));
        assert_eq!(
            points.iter().map(|p| p.time).collect::<Vec<_>>(),
            vec![secs(10.0), secs(99.97), secs(105.0)]
        );
    }

    #[test]
    fn test_zero_epsilon_still_drops_exact_duplicates() {
        let chunks = vec![chunk(0, 0, vec![interval(10.0, 12.0), interval(10.0, 11.0)])];
        assert_eq!(to_split_points(&chunks, Duration::ZERO).len(), 1);
    }

    #[test]
    fn test_no_silence_no_points() {
        let chunks = vec![chunk(0, 0, vec![]), chunk(1, 2700, vec![])];
        assert!(to_split_points(&chunks, EPS).is_empty());
    }

    #[test]
    fn test_accept_drops_file_edges() {
        let total = secs(600.0);
        let points = vec![
            SplitPoint { time: Duration::ZERO },
            SplitPoint { time: secs(300.0) },
            SplitPoint { time: secs(599.99) },
        ];
        let accepted = accept_split_points(points, total, EPS, Duration::ZERO);
        assert_eq!(accepted, vec![SplitPoint { time: secs(300.0) }]);
    }

    #[test]
    fn test_accept_enforces_minimum_segment_length() {
        let total = secs(600.0);
        let points = [3.0, 100.0, 104.0, 300.0, 305.0, 595.0]
            .into_iter()
            .map(|t| SplitPoint { time: secs(t) })
            .collect();

        let accepted = accept_split_points(points, total, EPS, secs(10.0));

        assert_eq!(
            accepted,
            vec![SplitPoint { time: secs(100.0) }, SplitPoint { time: secs(300.0) }]
        );
    }

    #[test]
    fn test_accept_minimum_longer_than_file_keeps_whole_file() {
        let points = vec![SplitPoint { time: secs(30.0) }];
        assert!(accept_split_points(points, secs(60.0), EPS, secs(45.0)).is_empty());
    }

    #[test]
    fn test_plan_segments_partition_file() {
        let dir = PathBuf::from("/media/lecture");
        let points = vec![
            SplitPoint { time: secs(120.0) },
            SplitPoint { time: secs(2750.0) },
        ];
        let total = secs(6000.0);

        let segments = plan_segments(&points, total, &dir, "m4a");

        assert_eq!(segments.len(), 3);
        assert_eq!((segments[0].start, segments[0].end), (Duration::ZERO, secs(120.0)));
        assert_eq!((segments[1].start, segments[1].end), (secs(120.0), secs(2750.0)));
        assert_eq!((segments[2].start, segments[2].end), (secs(2750.0), total));
        assert_eq!(segments[0].audio_path, dir.join("split_1.m4a"));
        assert_eq!(segments[2].cover_path, dir.join("split_3.jpg"));
        assert!(segments.windows(2).all(|w| w[0].end == w[1].start));
        assert_eq!(segments[1].midpoint(), secs(1435.0));
    }

    #[test]
    fn test_plan_segments_without_points_is_whole_file() {
        let segments = plan_segments(&[], secs(42.0), Path::new("out"), "mp3");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].index, 1);
        assert_eq!(segments[0].start, Duration::ZERO);
        assert_eq!(segments[0].end, secs(42.0));
    }
}
