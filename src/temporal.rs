//! Temporal join engine
//!
//! Every correlation analysis reduces to the same primitive: given a trigger
//! event (a meal, an activity session), find the nearest measurement at or
//! before it (the baseline) and the measurements inside a forward response
//! window. This module implements that join once, over series sorted a
//! single time, so lookups are O(log n) and a full join is O(n log n).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::GlucoseReading;
use crate::stats;

/// A timestamped measurement value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub instant: DateTime<Utc>,
    pub value: f64,
}

/// One trigger joined against a measurement series
///
/// Invariant: `baseline.instant <= trigger`, and every response sample lies
/// strictly after the trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRecord {
    /// Instant of the trigger event
    pub trigger: DateTime<Utc>,

    /// Closest measurement at or before the trigger
    pub baseline: Sample,

    /// Measurements strictly after the trigger, within the lookahead window
    pub response: Vec<Sample>,
}

impl JoinRecord {
    /// Peak excursion: max(response) - baseline. Used by spike-style
    /// analyses where the clinically relevant signal is the highest point
    /// reached, not the average.
    pub fn peak_delta(&self) -> Option<f64> {
        self.response
            .iter()
            .map(|s| s.value)
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.max(v)))
            })
            .map(|peak| peak - self.baseline.value)
    }

    /// Mean of the response window values
    pub fn response_mean(&self) -> Option<f64> {
        let values: Vec<f64> = self.response.iter().map(|s| s.value).collect();
        stats::mean(&values)
    }
}

/// An aggregated correlation for one subject (a meal label, an activity
/// type), produced by the analyzers on top of the join engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    /// What was correlated (meal label, activity type)
    pub subject: String,

    /// Average baseline value across occurrences
    pub baseline: f64,

    /// Average response value across occurrences
    pub response: f64,

    /// Average delta across occurrences; semantics (peak vs mean) belong
    /// to the producing analyzer
    pub delta: f64,

    /// How many trigger occurrences contributed
    pub occurrences: u32,

    /// True when the delta crossed the producing analyzer's high threshold
    pub is_high: bool,
}

/// A measurement series sorted once by instant
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.instant);
        SampleSeries { samples }
    }

    /// Build from glucose readings, excluding 0.0 "value missing"
    /// placeholders the normalizer keeps for positional alignment.
    pub fn from_readings(readings: &[GlucoseReading]) -> Self {
        Self::new(
            readings
                .iter()
                .filter(|r| r.reading > 0.0)
                .map(|r| Sample {
                    instant: r.instant,
                    value: r.reading,
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Closest sample at or before `instant`
    pub fn at_or_before(&self, instant: DateTime<Utc>) -> Option<&Sample> {
        let idx = self.samples.partition_point(|s| s.instant <= instant);
        idx.checked_sub(1).map(|i| &self.samples[i])
    }

    /// Samples in the half-open interval (start, end]
    pub fn between_exclusive_inclusive(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> &[Sample] {
        let lo = self.samples.partition_point(|s| s.instant <= start);
        let hi = self.samples.partition_point(|s| s.instant <= end);
        &self.samples[lo..hi]
    }

    /// Samples in the half-open interval [start, end)
    pub fn between_inclusive_exclusive(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> &[Sample] {
        let lo = self.samples.partition_point(|s| s.instant < start);
        let hi = self.samples.partition_point(|s| s.instant < end);
        &self.samples[lo..hi]
    }

    /// Mean of the samples in [instant - lookback, instant)
    pub fn lookback_mean(&self, instant: DateTime<Utc>, lookback: Duration) -> Option<f64> {
        let window = self.between_inclusive_exclusive(instant - lookback, instant);
        let values: Vec<f64> = window.iter().map(|s| s.value).collect();
        stats::mean(&values)
    }

    /// Join each trigger against this series.
    ///
    /// A trigger with no measurement at or before it is skipped: without a
    /// baseline there is nothing to correlate against. The response set is
    /// every sample strictly after the trigger and within `lookahead`;
    /// triggers with an empty response set are still returned so callers can
    /// decide their own minimum-data rules.
    pub fn correlate(&self, triggers: &[DateTime<Utc>], lookahead: Duration) -> Vec<JoinRecord> {
        triggers
            .iter()
            .filter_map(|&trigger| {
                let baseline = *self.at_or_before(trigger)?;
                let response = self
                    .between_exclusive_inclusive(trigger, trigger + lookahead)
                    .to_vec();
                Some(JoinRecord {
                    trigger,
                    baseline,
                    response,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, minute, 0).unwrap()
    }

    fn series(points: &[(u32, u32, f64)]) -> SampleSeries {
        SampleSeries::new(
            points
                .iter()
                .map(|&(h, m, v)| Sample {
                    instant: at(h, m),
                    value: v,
                })
                .collect(),
        )
    }

    #[test]
    fn baseline_is_closest_at_or_before() {
        let s = series(&[(8, 0, 95.0), (11, 30, 100.0), (13, 0, 130.0)]);
        assert_eq!(s.at_or_before(at(12, 0)).unwrap().value, 100.0);
        assert_eq!(s.at_or_before(at(11, 30)).unwrap().value, 100.0);
        assert!(s.at_or_before(at(7, 0)).is_none());
    }

    #[test]
    fn response_window_is_exclusive_inclusive() {
        let s = series(&[(12, 0, 110.0), (13, 0, 130.0), (15, 0, 160.0), (15, 1, 170.0)]);
        let window = s.between_exclusive_inclusive(at(12, 0), at(15, 0));
        let values: Vec<f64> = window.iter().map(|x| x.value).collect();
        // The sample exactly at the trigger is excluded, the one exactly at
        // the window end is included
        assert_eq!(values, vec![130.0, 160.0]);
    }

    #[test]
    fn correlate_skips_triggers_without_baseline() {
        let s = series(&[(12, 0, 110.0)]);
        let records = s.correlate(&[at(8, 0), at(13, 0)], Duration::hours(3));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].trigger, at(13, 0));
    }

    #[test]
    fn correlate_preserves_causality() {
        let s = series(&[(8, 0, 95.0), (11, 30, 100.0), (13, 0, 130.0), (14, 0, 160.0)]);
        let triggers = vec![at(12, 0), at(13, 30)];
        for record in s.correlate(&triggers, Duration::hours(3)) {
            assert!(record.baseline.instant <= record.trigger);
            for sample in &record.response {
                assert!(sample.instant > record.trigger);
            }
        }
    }

    #[test]
    fn peak_delta_is_max_response_minus_baseline() {
        let s = series(&[(11, 30, 100.0), (13, 0, 130.0), (14, 0, 160.0)]);
        let records = s.correlate(&[at(12, 0)], Duration::hours(3));
        assert_eq!(records[0].peak_delta(), Some(60.0));
    }

    #[test]
    fn empty_response_has_no_peak_delta() {
        let s = series(&[(11, 30, 100.0)]);
        let records = s.correlate(&[at(12, 0)], Duration::hours(3));
        assert_eq!(records[0].peak_delta(), None);
        assert_eq!(records[0].response_mean(), None);
    }

    #[test]
    fn lookback_mean_covers_inclusive_exclusive_window() {
        let s = series(&[(10, 0, 90.0), (11, 30, 110.0), (12, 0, 200.0)]);
        // [11:00, 12:00) contains only the 11:30 sample
        assert_eq!(s.lookback_mean(at(12, 0), Duration::hours(1)), Some(110.0));
    }

    #[test]
    fn zero_placeholder_readings_are_excluded_from_series() {
        let readings = vec![
            GlucoseReading {
                reading: 0.0,
                instant: at(8, 0),
                timing_tag: None,
                notes: None,
            },
            GlucoseReading {
                reading: 120.0,
                instant: at(9, 0),
                timing_tag: None,
                notes: None,
            },
        ];
        let s = SampleSeries::from_readings(&readings);
        assert_eq!(s.len(), 1);
    }
}
