//! Period-over-period percentage change.

use chrono::{Days, NaiveDate};

use super::aggregate::DailyAggregate;
use crate::error::{Error, Result};

/// Change from `baseline` to `current`, in percent.
///
/// A zero baseline reads as 100% growth when there is any current value,
/// 0% otherwise.
pub fn percentage_change(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        if current == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        ((current - baseline) / baseline) * 100.0
    }
}

/// Average of per-day percentage changes.
///
/// The sum of per-element changes is truncated to an integer first, then
/// integer-divided by the element count. Mismatched or empty series give 0.
pub fn average_percentage_change(current: &[f64], baseline: &[f64]) -> i64 {
    try_average_percentage_change(current, baseline).unwrap_or(0)
}

/// Like [`average_percentage_change`], but reports degenerate input.
pub fn try_average_percentage_change(current: &[f64], baseline: &[f64]) -> Result<i64> {
    if current.len() != baseline.len() {
        return Err(Error::DegenerateInput(format!(
            "series lengths differ: {} current vs {} baseline",
            current.len(),
            baseline.len()
        )));
    }
    if current.is_empty() {
        return Err(Error::DegenerateInput("empty series".to_string()));
    }

    let sum: f64 = current
        .iter()
        .zip(baseline)
        .map(|(c, b)| percentage_change(*c, *b))
        .sum();

    Ok(sum as i64 / current.len() as i64)
}

/// Format delta for display (e.g., "+23%" or "-15%").
pub fn format_delta(delta: i64) -> String {
    if delta >= 0 {
        format!("+{}%", delta)
    } else {
        format!("{}%", delta)
    }
}

/// Where the comparison values come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaselinePolicy {
    /// Same aggregate, `n` days earlier (missing days count as zero)
    ShiftedDays(i64),
    /// Current value times a factor
    Scaled(f64),
}

impl Default for BaselinePolicy {
    fn default() -> Self {
        BaselinePolicy::ShiftedDays(7)
    }
}

/// Current values and their baselines, aligned day by day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendSeries {
    pub days: Vec<NaiveDate>,
    pub current: Vec<f64>,
    pub baseline: Vec<f64>,
}

impl TrendSeries {
    /// Align the days of `current` (ascending) against baselines drawn from `history`.
    pub fn build(
        current: &DailyAggregate<f64>,
        history: &DailyAggregate<f64>,
        policy: BaselinePolicy,
    ) -> Self {
        let mut entries: Vec<(NaiveDate, f64)> = current.iter().collect();
        entries.sort_by_key(|(day, _)| *day);

        let mut series = TrendSeries::default();
        for (day, value) in entries {
            let baseline = match policy {
                BaselinePolicy::ShiftedDays(n) => shift_back(day, n)
                    .and_then(|earlier| history.get(earlier))
                    .unwrap_or(0.0),
                BaselinePolicy::Scaled(factor) => value * factor,
            };
            series.days.push(day);
            series.current.push(value);
            series.baseline.push(baseline);
        }
        series
    }

    pub fn average_change(&self) -> i64 {
        average_percentage_change(&self.current, &self.baseline)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// `day` moved `n` days into the past (into the future for negative `n`).
pub(crate) fn shift_back(day: NaiveDate, n: i64) -> Option<NaiveDate> {
    if n >= 0 {
        day.checked_sub_days(Days::new(n.unsigned_abs()))
    } else {
        day.checked_add_days(Days::new(n.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::DayFormat;

    fn day(s: &str) -> NaiveDate {
        DayFormat::default().parse(s).unwrap()
    }

    #[test]
    fn test_percentage_change() {
        assert_eq!(percentage_change(123.0, 100.0), 23.0);
        assert_eq!(percentage_change(80.0, 100.0), -20.0);
        assert_eq!(percentage_change(100.0, 0.0), 100.0);
        assert_eq!(percentage_change(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_average_of_two_days() {
        assert_eq!(average_percentage_change(&[110.0, 90.0], &[100.0, 90.0]), 5);
    }

    #[test]
    fn test_zero_baseline() {
        assert_eq!(average_percentage_change(&[50.0], &[0.0]), 100);
        assert_eq!(average_percentage_change(&[0.0], &[0.0]), 0);
    }

    #[test]
    fn test_sum_is_truncated_before_division() {
        // 33.33.. + 33.33.. + 0 = 66.66.. → 66 / 3 = 22
        let current = [4.0, 4.0, 3.0];
        let baseline = [3.0, 3.0, 3.0];
        assert_eq!(average_percentage_change(&current, &baseline), 22);

        // -15 + 0 = -15 → -15 / 2 = -7 (toward zero)
        assert_eq!(average_percentage_change(&[85.0, 10.0], &[100.0, 10.0]), -7);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(average_percentage_change(&[1.0, 2.0], &[1.0]), 0);
        assert_eq!(average_percentage_change(&[], &[]), 0);
        assert!(matches!(
            try_average_percentage_change(&[1.0], &[]),
            Err(Error::DegenerateInput(_))
        ));
        assert!(matches!(
            try_average_percentage_change(&[], &[]),
            Err(Error::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(23), "+23%");
        assert_eq!(format_delta(0), "+0%");
        assert_eq!(format_delta(-15), "-15%");
    }

    #[test]
    fn test_shifted_baseline() {
        let history: DailyAggregate<f64> = [
            (day("01/05/2024"), 100.0),
            (day("08/05/2024"), 110.0),
            (day("09/05/2024"), 40.0),
        ]
        .into_iter()
        .collect();
        let current = history.window(day("08/05/2024"), day("09/05/2024"));

        let series = TrendSeries::build(&current, &history, BaselinePolicy::ShiftedDays(7));
        assert_eq!(series.days, vec![day("08/05/2024"), day("09/05/2024")]);
        assert_eq!(series.current, vec![110.0, 40.0]);
        assert_eq!(series.baseline, vec![100.0, 0.0]);
        // (10 + 100) / 2
        assert_eq!(series.average_change(), 55);
    }

    #[test]
    fn test_scaled_baseline() {
        let current: DailyAggregate<f64> = [(day("08/05/2024"), 90.0)].into_iter().collect();
        let series = TrendSeries::build(&current, &current, BaselinePolicy::Scaled(0.9));
        assert_eq!(series.baseline.len(), 1);
        assert!((series.baseline[0] - 81.0).abs() < 1e-9);
        assert_eq!(series.average_change(), 11);
    }
}
