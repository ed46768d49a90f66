//! Aggregation over the status log: reconstructs online intervals from
//! the raw samples and derives per-day totals, medians and long offline
//! gaps. Pure functions over unix timestamps; day bucketing is UTC.

use crate::store::StatusSample;
use std::ops::Range;
use std::time::Duration;

const DAY_SECS: i64 = 86_400;

/// Reconstructs online intervals from a timestamp-ordered status log.
///
/// An online run opens at its first online sample and closes at the next
/// offline sample. Zero-length intervals and a trailing run that never
/// saw an offline sample are dropped.
pub fn online_intervals(samples: &[StatusSample]) -> Vec<Range<i64>> {
    let mut intervals = Vec::new();
    let mut run_start: Option<i64> = None;
    for pair in samples.windows(2) {
        let (cur, next) = (pair[0], pair[1]);
        match (cur.is_online, next.is_online) {
            (true, true) => {
                run_start.get_or_insert(cur.timestamp);
            }
            (true, false) => {
                let start = run_start.take().unwrap_or(cur.timestamp);
                if start != next.timestamp {
                    intervals.push(start..next.timestamp);
                }
            }
            (false, true) => {
                run_start = Some(next.timestamp);
            }
            (false, false) => {
                run_start = None;
            }
        }
    }
    intervals
}

/// Total online time per UTC day, clipped at day boundaries. Days with a
/// second or less are dropped. Keys are the epoch second the day starts.
pub fn online_time_per_day(intervals: &[Range<i64>]) -> Vec<(i64, Duration)> {
    let mut result = Vec::new();
    let (Some(first), Some(last)) = (intervals.first(), intervals.last()) else {
        return result;
    };
    let mut day_start = first.start.div_euclid(DAY_SECS) * DAY_SECS;
    while day_start < last.end {
        let day_end = day_start + DAY_SECS;
        let total: i64 = intervals
            .iter()
            .map(|i| (i.end.min(day_end) - i.start.max(day_start)).max(0))
            .sum();
        if total > 1 {
            result.push((day_start, Duration::from_secs(total as u64)));
        }
        day_start = day_end;
    }
    result
}

pub fn median_duration(durations: &[Duration]) -> Option<Duration> {
    if durations.is_empty() {
        return None;
    }
    let mut sorted = durations.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2
    } else {
        sorted[mid]
    })
}

/// Gaps between consecutive online intervals longer than `min`.
pub fn offline_gaps(intervals: &[Range<i64>], min: Duration) -> Vec<Range<i64>> {
    let min = min.as_secs() as i64;
    intervals
        .windows(2)
        .filter(|w| w[1].start - w[0].end > min)
        .map(|w| w[0].end..w[1].start)
        .collect()
}

/// Compact duration rendering, e.g. "1d 2h 3m 4s".
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3_600;
    secs %= 3_600;
    let minutes = secs / 60;
    secs %= 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(timestamp: i64) -> StatusSample {
        StatusSample {
            timestamp,
            is_online: true,
        }
    }

    fn off(timestamp: i64) -> StatusSample {
        StatusSample {
            timestamp,
            is_online: false,
        }
    }

    #[test]
    fn single_run_closes_at_offline_sample() {
        let intervals = online_intervals(&[on(100), off(200)]);
        assert_eq!(intervals, vec![100..200]);
    }

    #[test]
    fn consecutive_online_samples_extend_one_run() {
        let intervals = online_intervals(&[on(100), on(150), on(180), off(200)]);
        assert_eq!(intervals, vec![100..200]);
    }

    #[test]
    fn offline_then_online_opens_a_new_run() {
        let intervals = online_intervals(&[on(100), off(200), on(300), off(400)]);
        assert_eq!(intervals, vec![100..200, 300..400]);
    }

    #[test]
    fn trailing_open_run_is_dropped() {
        let intervals = online_intervals(&[on(100), off(200), on(300)]);
        assert_eq!(intervals, vec![100..200]);
    }

    #[test]
    fn zero_length_interval_is_dropped() {
        let intervals = online_intervals(&[on(200), off(200)]);
        assert!(intervals.is_empty());
    }

    #[test]
    fn per_day_totals_clip_at_day_boundaries() {
        // One hour before midnight through two hours after.
        let start = DAY_SECS - 3_600;
        let end = DAY_SECS + 7_200;
        let per_day = online_time_per_day(&[start..end]);
        assert_eq!(
            per_day,
            vec![
                (0, Duration::from_secs(3_600)),
                (DAY_SECS, Duration::from_secs(7_200)),
            ]
        );
    }

    #[test]
    fn per_day_drops_negligible_days() {
        let per_day = online_time_per_day(&[10..11]);
        assert!(per_day.is_empty());
    }

    #[test]
    fn median_of_odd_and_even_counts() {
        let odd = [
            Duration::from_secs(1),
            Duration::from_secs(9),
            Duration::from_secs(5),
        ];
        assert_eq!(median_duration(&odd), Some(Duration::from_secs(5)));

        let even = [
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(6),
            Duration::from_secs(8),
        ];
        assert_eq!(median_duration(&even), Some(Duration::from_secs(5)));

        assert_eq!(median_duration(&[]), None);
    }

    #[test]
    fn only_long_gaps_are_reported() {
        let intervals = vec![0..100, 150..200, 10_000..10_100];
        let gaps = offline_gaps(&intervals, Duration::from_secs(1_000));
        assert_eq!(gaps, vec![200..10_000]);
    }

    #[test]
    fn duration_rendering() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(61)), "1m 1s");
        assert_eq!(
            format_duration(Duration::from_secs(90_061)),
            "1d 1h 1m 1s"
        );
        assert_eq!(format_duration(Duration::from_secs(7_200)), "2h");
    }
}
