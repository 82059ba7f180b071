// metrics.rs
// Pure metric derivation: ratios, averages, trend frames, rankings and
// categorical buckets. No I/O, no panics; zero denominators yield zero.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::Serialize;

/// Percentage as an integer, `round(100·num/den)`. Zero when `den == 0`.
pub fn ratio(num: i64, den: i64) -> i64 {
    if den <= 0 {
        return 0;
    }
    (100.0 * num as f64 / den as f64).round() as i64
}

/// Two-decimal percentage for the metrics that keep that precision
/// (conversion rate, ROI). Everything else goes through `ratio`.
pub fn ratio2(num: f64, den: f64) -> f64 {
    if den <= 0.0 {
        return 0.0;
    }
    (100.0 * num / den * 100.0).round() / 100.0
}

/// Integer-rounded mean, zero when the count is zero.
pub fn average(sum: f64, count: i64) -> i64 {
    if count <= 0 {
        return 0;
    }
    (sum / count as f64).round() as i64
}

/// Guarded division rounded to two decimals (cost-per-distance style).
pub fn per_unit(total: f64, units: f64) -> f64 {
    if units <= 0.0 {
        return 0.0;
    }
    (total / units * 100.0).round() / 100.0
}

/// One slice of a derived time series.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendBucket {
    pub label: String,
    pub value: f64,
}

/// A fixed, contiguous, zero-filled window of N periods ending at `now`.
/// Keys are internal; only labelled buckets leave this module.
#[derive(Debug, Clone)]
pub struct TrendFrame {
    keys: Vec<String>,
    buckets: Vec<TrendBucket>,
}

impl TrendFrame {
    /// N daily buckets, oldest first, ending at the day of `now`.
    pub fn days(now: DateTime<Utc>, n: usize) -> Self {
        let mut keys = Vec::with_capacity(n);
        let mut buckets = Vec::with_capacity(n);
        for i in (0..n).rev() {
            let day = now - Duration::days(i as i64);
            keys.push(day.format("%Y-%m-%d").to_string());
            buckets.push(TrendBucket {
                label: day.format("%d %b").to_string(),
                value: 0.0,
            });
        }
        TrendFrame { keys, buckets }
    }

    /// N monthly buckets, oldest first, ending at the month of `now`.
    pub fn months(now: DateTime<Utc>, n: usize) -> Self {
        let mut keys = Vec::with_capacity(n);
        let mut buckets = Vec::with_capacity(n);
        for i in (0..n).rev() {
            let month = now
                .checked_sub_months(Months::new(i as u32))
                .unwrap_or(now);
            keys.push(format!("{:04}-{:02}", month.year(), month.month()));
            buckets.push(TrendBucket {
                label: month.format("%b").to_string(),
                value: 0.0,
            });
        }
        TrendFrame { keys, buckets }
    }

    /// Key for placing a timestamp into a daily frame.
    pub fn day_key(at: DateTime<Utc>) -> String {
        at.format("%Y-%m-%d").to_string()
    }

    /// Key for placing a timestamp into a monthly frame.
    pub fn month_key(at: DateTime<Utc>) -> String {
        format!("{:04}-{:02}", at.year(), at.month())
    }

    /// Add `value` to the bucket matching `key`. Timestamps outside the
    /// window fall off silently; empty periods stay present at zero.
    pub fn add(&mut self, key: &str, value: f64) {
        if let Some(idx) = self.keys.iter().position(|k| k == key) {
            self.buckets[idx].value += value;
        }
    }

    pub fn add_all<'a, I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        for (key, value) in entries {
            self.add(key, value);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn into_buckets(self) -> Vec<TrendBucket> {
        self.buckets
    }
}

/// Stable descending ranking on `score`, truncated to `n`. Equal scores keep
/// their input order; upstream defines no tie-break and none is invented here.
pub fn top_n<T, F>(mut items: Vec<T>, n: usize, score: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));
    items.truncate(n);
    items
}

/// Categorical counts in a single pass over already-fetched records.
pub fn count_by<T, K, F>(records: &[T], classify: F) -> HashMap<K, i64>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(classify(record)).or_insert(0) += 1;
    }
    counts
}

/// Summed values per category, single pass.
pub fn sum_by<T, K, F, V>(records: &[T], classify: F, value: V) -> HashMap<K, f64>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
    V: Fn(&T) -> f64,
{
    let mut sums = HashMap::new();
    for record in records {
        *sums.entry(classify(record)).or_insert(0.0) += value(record);
    }
    sums
}

/// Schedule buckets for delivery/installation work queues.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScheduleBuckets {
    pub pending: i64,
    pub urgent: i64,
    pub overdue: i64,
}

/// urgent = pending with a scheduled date no later than two days out;
/// overdue = pending with a scheduled date already in the past. The
/// predicates overlap: past-due work is also urgent.
pub fn schedule_buckets<T, P, S>(records: &[T], is_pending: P, scheduled: S, now: DateTime<Utc>) -> ScheduleBuckets
where
    P: Fn(&T) -> bool,
    S: Fn(&T) -> DateTime<Utc>,
{
    let horizon = now + Duration::days(2);
    let mut out = ScheduleBuckets::default();
    for record in records {
        if !is_pending(record) {
            continue;
        }
        out.pending += 1;
        let at = scheduled(record);
        if at < now {
            out.overdue += 1;
        }
        if at <= horizon {
            out.urgent += 1;
        }
    }
    out
}

/// Stock level against per-item thresholds.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Ok,
    Low,
    Critical,
}

pub fn stock_level(quantity: i64, low: i64, critical: i64) -> StockLevel {
    if quantity <= critical {
        StockLevel::Critical
    } else if quantity <= low {
        StockLevel::Low
    } else {
        StockLevel::Ok
    }
}

/// Units still free after open-order allocations. Never negative.
pub fn available(total: i64, allocated: i64) -> i64 {
    (total - allocated).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ratio_never_divides_by_zero() {
        assert_eq!(ratio(5, 0), 0);
        assert_eq!(ratio(0, 0), 0);
        assert_eq!(ratio(-3, 0), 0);
        assert_eq!(ratio(1, 3), 33);
        assert_eq!(ratio(2, 3), 67);
        assert_eq!(ratio(3, 4), 75);
    }

    #[test]
    fn ratio2_keeps_two_decimals() {
        assert_eq!(ratio2(1.0, 3.0), 33.33);
        assert_eq!(ratio2(1.0, 0.0), 0.0);
        assert_eq!(ratio2(2.0, 8.0), 25.0);
    }

    #[test]
    fn average_handles_empty_counts() {
        assert_eq!(average(0.0, 0), 0);
        assert_eq!(average(10.0, 4), 3);
        assert_eq!(average(10.0, 3), 3);
    }

    #[test]
    fn trend_frame_is_exact_and_zero_filled() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let frame = TrendFrame::months(now, 6);
        assert_eq!(frame.len(), 6);

        // Data only in periods 2 and 5 of the window.
        let feb = Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap();
        let may = Utc.with_ymd_and_hms(2024, 5, 28, 0, 0, 0).unwrap();
        let buckets = frame
            .add_all([
                (TrendFrame::month_key(feb).as_str(), 7.0),
                (TrendFrame::month_key(may).as_str(), 11.0),
            ])
            .into_buckets();

        let values: Vec<f64> = buckets.iter().map(|b| b.value).collect();
        assert_eq!(values, vec![0.0, 7.0, 0.0, 0.0, 11.0, 0.0]);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Jan", "Feb", "Mar", "Apr", "May", "Jun"]);
    }

    #[test]
    fn trend_frame_days_are_contiguous() {
        let now = Utc.with_ymd_and_hms(2024, 3, 3, 8, 0, 0).unwrap();
        let frame = TrendFrame::days(now, 4);
        let buckets = frame.into_buckets();
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["29 Feb", "01 Mar", "02 Mar", "03 Mar"]);
    }

    #[test]
    fn out_of_window_data_falls_off() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let old = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let buckets = TrendFrame::months(now, 3)
            .add_all([(TrendFrame::month_key(old).as_str(), 99.0)])
            .into_buckets();
        assert!(buckets.iter().all(|b| b.value == 0.0));
    }

    #[test]
    fn top_n_is_stable_on_ties() {
        let items = vec![("a", 10.0), ("b", 30.0), ("c", 10.0), ("d", 20.0)];
        let ranked = top_n(items, 3, |(_, v)| *v);
        let names: Vec<&str> = ranked.iter().map(|(n, _)| *n).collect();
        // a and c tie at 10; a entered first and stays first.
        assert_eq!(names, vec!["b", "d", "a"]);
    }

    #[test]
    fn count_by_is_single_pass_over_records() {
        let records = vec!["x", "y", "x", "x"];
        let counts = count_by(&records, |r| *r);
        assert_eq!(counts.get("x"), Some(&3));
        assert_eq!(counts.get("y"), Some(&1));
    }

    #[test]
    fn sum_by_accumulates_per_category() {
        let records = vec![("panel", 2.0), ("inverter", 5.0), ("panel", 3.5)];
        let sums = sum_by(&records, |r| r.0, |r| r.1);
        assert_eq!(sums.get("panel"), Some(&5.5));
        assert_eq!(sums.get("inverter"), Some(&5.0));
    }

    #[test]
    fn past_due_work_is_both_urgent_and_overdue() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        let records = vec![
            ("late", true, now - Duration::days(1)),
            ("soon", true, now + Duration::days(1)),
            ("far", true, now + Duration::days(10)),
            ("done", false, now - Duration::days(5)),
        ];
        let out = schedule_buckets(&records, |r| r.1, |r| r.2, now);
        // "late" satisfies both predicates; the buckets are not a partition.
        assert_eq!(
            out,
            ScheduleBuckets {
                pending: 3,
                urgent: 2,
                overdue: 1
            }
        );

        let only_late = vec![("late", true, now - Duration::days(1))];
        let out = schedule_buckets(&only_late, |r| r.1, |r| r.2, now);
        assert_eq!(out.urgent, 1);
        assert_eq!(out.overdue, 1);
    }

    #[test]
    fn availability_never_goes_negative() {
        assert_eq!(available(10, 4), 6);
        assert_eq!(available(3, 8), 0);
        assert_eq!(available(0, 0), 0);
    }

    #[test]
    fn stock_levels_respect_thresholds() {
        assert_eq!(stock_level(100, 20, 5), StockLevel::Ok);
        assert_eq!(stock_level(15, 20, 5), StockLevel::Low);
        assert_eq!(stock_level(4, 20, 5), StockLevel::Critical);
    }

    #[test]
    fn derivations_are_idempotent() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let build = || {
            TrendFrame::months(now, 6)
                .add_all([("2024-05", 3.0), ("2024-02", 1.0)])
                .into_buckets()
        };
        assert_eq!(build(), build());
        assert_eq!(ratio(7, 13), ratio(7, 13));
    }
}
