//! Display-ready report series and per-view report state.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use super::aggregate::{CategoryAggregate, DailyAggregate, Total};
use super::day::DayFormat;
use crate::error::Result;
use crate::types::SkippedRecord;

/// One labeled value in a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPoint {
    pub label: String,
    pub value: f64,
}

/// Ordered `(label, value)` pairs plus the largest value for scaling.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub points: Vec<ReportPoint>,
    pub max_value: Option<f64>,
}

impl Report {
    pub fn from_points(points: Vec<ReportPoint>) -> Self {
        let max_value = points
            .iter()
            .map(|p| p.value)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        Self { points, max_value }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn pairs(&self) -> Vec<(&str, f64)> {
        self.points
            .iter()
            .map(|p| (p.label.as_str(), p.value))
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }
}

/// How category reports are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryOrder {
    /// Label ascending (grid of bars)
    Alphabetical,
    /// Value descending, ties by label (ranked pie or bar)
    Ranked,
}

/// Builds [`Report`]s from aggregates without touching them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAssembler {
    format: DayFormat,
}

impl ReportAssembler {
    pub fn new(format: DayFormat) -> Self {
        Self { format }
    }

    /// Days ascending, labeled `dd/MM`.
    pub fn daily<V: Total>(&self, aggregate: &DailyAggregate<V>) -> Report {
        let mut entries: Vec<(NaiveDate, V)> = aggregate.iter().collect();
        entries.sort_by_key(|(day, _)| *day);

        Report::from_points(
            entries
                .into_iter()
                .map(|(day, value)| ReportPoint {
                    label: self.format.label(day),
                    value: value.as_f64(),
                })
                .collect(),
        )
    }

    /// Raw category totals in the requested order.
    pub fn category(&self, aggregate: &CategoryAggregate, order: CategoryOrder) -> Report {
        Report::from_points(
            sorted_categories(aggregate, order)
                .into_iter()
                .map(|(label, count)| ReportPoint {
                    label: label.to_string(),
                    value: count as f64,
                })
                .collect(),
        )
    }

    /// Each category as a rounded percentage of the total.
    ///
    /// A zero total yields an empty report.
    pub fn category_share(&self, aggregate: &CategoryAggregate, order: CategoryOrder) -> Report {
        let total = aggregate.total();
        if total <= 0 {
            return Report::default();
        }

        Report::from_points(
            sorted_categories(aggregate, order)
                .into_iter()
                .map(|(label, count)| ReportPoint {
                    label: label.to_string(),
                    value: (100.0 * count as f64 / total as f64).round(),
                })
                .collect(),
        )
    }
}

fn sorted_categories(aggregate: &CategoryAggregate, order: CategoryOrder) -> Vec<(&str, i64)> {
    let mut entries: Vec<(&str, i64)> = aggregate.iter().collect();
    match order {
        CategoryOrder::Alphabetical => entries.sort_by(|a, b| a.0.cmp(b.0)),
        CategoryOrder::Ranked => entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0))),
    }
    entries
}

// ============================================
// Report state
// ============================================

/// A finished report plus what was left out of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportOutcome {
    pub report: Report,
    pub skipped: Vec<SkippedRecord>,
    /// Average change against the baseline, for reports that carry one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<i64>,
}

impl ReportOutcome {
    pub fn new(report: Report, skipped: Vec<SkippedRecord>) -> Self {
        Self {
            report,
            skipped,
            change_pct: None,
        }
    }
}

/// Lifecycle of one report within a view activation.
///
/// Only `Loading` transitions; every other state is final.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReportState {
    /// Fetch still in flight
    #[default]
    Loading,
    /// Fetch finished with data
    Populated(ReportOutcome),
    /// Fetch finished, nothing to show
    NoData { skipped: Vec<SkippedRecord> },
    /// Fetch failed
    Failed { message: String },
}

impl ReportState {
    /// Apply a fetch result. Settled states ignore further results.
    pub fn resolve(self, outcome: Result<ReportOutcome>) -> ReportState {
        match self {
            ReportState::Loading => match outcome {
                Ok(outcome) if outcome.report.is_empty() => ReportState::NoData {
                    skipped: outcome.skipped,
                },
                Ok(outcome) => ReportState::Populated(outcome),
                Err(e) => {
                    tracing::warn!(error = %e, "Report fetch failed");
                    ReportState::Failed {
                        message: e.to_string(),
                    }
                }
            },
            settled => settled,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, ReportState::Loading)
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            ReportState::Populated(outcome) => Some(&outcome.report),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&ReportOutcome> {
        match self {
            ReportState::Populated(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Records left out, for settled states that know about them.
    pub fn skipped(&self) -> &[SkippedRecord] {
        match self {
            ReportState::Populated(outcome) => &outcome.skipped,
            ReportState::NoData { skipped } => skipped,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::SkipReason;

    fn day(s: &str) -> NaiveDate {
        DayFormat::default().parse(s).unwrap()
    }

    fn categories(entries: &[(&str, i64)]) -> CategoryAggregate {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_daily_report_end_to_end_example() {
        let aggregate: DailyAggregate<i64> = [(day("02/05/2024"), 1), (day("01/05/2024"), 2)]
            .into_iter()
            .collect();
        let report = ReportAssembler::default().daily(&aggregate);

        assert_eq!(report.pairs(), vec![("01/05", 2.0), ("02/05", 1.0)]);
        assert_eq!(report.max_value, Some(2.0));
    }

    #[test]
    fn test_daily_report_is_date_ordered_across_years() {
        let days = [
            "15/01/2025",
            "31/12/2024",
            "01/02/2024",
            "02/01/2025",
            "28/02/2024",
        ];
        let aggregate: DailyAggregate<f64> = days.iter().map(|d| (day(d), 1.5)).collect();
        let report = ReportAssembler::default().daily(&aggregate);

        assert_eq!(
            report.pairs().iter().map(|(l, _)| *l).collect::<Vec<_>>(),
            vec!["01/02", "28/02", "31/12", "02/01", "15/01"]
        );
    }

    #[test]
    fn test_empty_daily_report() {
        let report = ReportAssembler::default().daily(&DailyAggregate::<i64>::new());
        assert!(report.is_empty());
        assert_eq!(report.max_value, None);
    }

    #[test]
    fn test_category_orders() {
        let aggregate = categories(&[("Science", 3), ("Art", 3), ("History", 7)]);
        let assembler = ReportAssembler::default();

        let alpha = assembler.category(&aggregate, CategoryOrder::Alphabetical);
        assert_eq!(
            alpha.pairs(),
            vec![("Art", 3.0), ("History", 7.0), ("Science", 3.0)]
        );

        let ranked = assembler.category(&aggregate, CategoryOrder::Ranked);
        assert_eq!(
            ranked.pairs(),
            vec![("History", 7.0), ("Art", 3.0), ("Science", 3.0)]
        );
        assert_eq!(ranked.max_value, Some(7.0));
    }

    #[test]
    fn test_category_share_rounds() {
        let aggregate = categories(&[("A", 1), ("B", 1), ("C", 1)]);
        let report = ReportAssembler::default().category_share(&aggregate, CategoryOrder::Ranked);
        assert_eq!(report.pairs(), vec![("A", 33.0), ("B", 33.0), ("C", 33.0)]);

        let aggregate = categories(&[("A", 2), ("B", 1)]);
        let report = ReportAssembler::default().category_share(&aggregate, CategoryOrder::Ranked);
        assert_eq!(report.pairs(), vec![("A", 67.0), ("B", 33.0)]);
    }

    #[test]
    fn test_category_share_sums_near_hundred() {
        let samples: Vec<Vec<(&str, i64)>> = vec![
            vec![("a", 1)],
            vec![("a", 1), ("b", 2), ("c", 3), ("d", 4)],
            vec![("a", 7), ("b", 7), ("c", 7)],
            vec![("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1), ("f", 1)],
            vec![("a", 999), ("b", 1)],
            vec![("a", 0), ("b", 5)],
        ];
        for sample in samples {
            let aggregate = categories(&sample);
            let report =
                ReportAssembler::default().category_share(&aggregate, CategoryOrder::Alphabetical);
            let deviation = (report.total() - 100.0).abs();
            assert!(
                deviation <= sample.len() as f64,
                "{sample:?} summed to {}",
                report.total()
            );
        }
    }

    #[test]
    fn test_category_share_of_empty_is_empty() {
        let report = ReportAssembler::default()
            .category_share(&CategoryAggregate::new(), CategoryOrder::Ranked);
        assert!(report.is_empty());

        let zeros = categories(&[("A", 0)]);
        let report = ReportAssembler::default().category_share(&zeros, CategoryOrder::Ranked);
        assert!(report.is_empty());
    }

    #[test]
    fn test_state_transitions() {
        let populated = ReportState::Loading.resolve(Ok(ReportOutcome::new(
            Report::from_points(vec![ReportPoint {
                label: "x".to_string(),
                value: 1.0,
            }]),
            vec![],
        )));
        assert!(populated.is_settled());
        assert_eq!(populated.report().map(Report::len), Some(1));

        let skipped = vec![SkippedRecord::new(
            "a",
            SkipReason::MalformedDate("?".to_string()),
        )];
        let empty = ReportState::Loading.resolve(Ok(ReportOutcome::new(Report::default(), skipped)));
        assert!(matches!(empty, ReportState::NoData { .. }));
        assert_eq!(empty.skipped().len(), 1);

        let failed = ReportState::Loading.resolve(Err(Error::fetch("books", "offline")));
        assert!(matches!(failed, ReportState::Failed { .. }));

        // settled states never move again
        let still_failed = failed.clone().resolve(Ok(ReportOutcome::default()));
        assert_eq!(still_failed, failed);
        assert!(!ReportState::Loading.is_settled());
    }
}
