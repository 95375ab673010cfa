//! Library dashboard for the analytics screen.
//!
//! Holds the two headline figures and the four chart reports, each in its
//! own settled [`ReportState`].

use chrono::NaiveDate;
use serde::Serialize;

use super::report::ReportState;
use super::trend::format_delta;
use crate::types::SkippedRecord;

/// Everything the analytics screen shows.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryDashboard {
    /// Day the weekly window ends on
    pub today: NaiveDate,

    // Headline figures (None when the fetch failed)
    /// Users with the `Member` role
    pub member_count: Option<usize>,
    /// Fines dated within the weekly window, any status, rounded
    pub weekly_fine_total: Option<i64>,
    /// Fines left out of the weekly total
    pub fine_total_skipped: Vec<SkippedRecord>,

    // Charts
    pub issues_per_day: ReportState,
    pub most_issued_categories: ReportState,
    pub most_rated_categories: ReportState,
    pub weekly_fines: ReportState,
}

impl LibraryDashboard {
    /// Chart reports with their display titles, in screen order.
    pub fn reports(&self) -> [(&'static str, &ReportState); 4] {
        [
            ("Issues per day", &self.issues_per_day),
            ("Most issued categories (%)", &self.most_issued_categories),
            ("Most rated categories", &self.most_rated_categories),
            ("Weekly fines", &self.weekly_fines),
        ]
    }

    /// Records left out across all reports and the weekly total.
    pub fn skipped_total(&self) -> usize {
        self.fine_total_skipped.len()
            + self
                .reports()
                .iter()
                .map(|(_, state)| state.skipped().len())
                .sum::<usize>()
    }

    /// Reports that failed to load.
    pub fn failed_count(&self) -> usize {
        self.reports()
            .iter()
            .filter(|(_, state)| matches!(state, ReportState::Failed { .. }))
            .count()
    }

    /// Format the member count for display (e.g., "1,204").
    pub fn format_member_count(&self) -> String {
        match self.member_count {
            Some(count) => group_thousands(count as i64),
            None => "n/a".to_string(),
        }
    }

    /// Format the weekly fine total for display (e.g., "₹1,250").
    pub fn format_weekly_fine_total(&self) -> String {
        match self.weekly_fine_total {
            Some(total) => format!("₹{}", group_thousands(total)),
            None => "n/a".to_string(),
        }
    }

    /// Format the weekly fines trend (e.g., "+12%"), if the report loaded.
    pub fn format_fines_change(&self) -> Option<String> {
        self.weekly_fines
            .outcome()
            .and_then(|outcome| outcome.change_pct)
            .map(format_delta)
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{Report, ReportOutcome, ReportPoint};
    use crate::types::SkipReason;

    fn dashboard() -> LibraryDashboard {
        LibraryDashboard {
            today: NaiveDate::from_ymd_opt(2024, 5, 8).unwrap(),
            member_count: Some(1204),
            weekly_fine_total: Some(1250),
            fine_total_skipped: vec![SkippedRecord::new(
                "f9",
                SkipReason::MalformedDate("8/5/2024".to_string()),
            )],
            issues_per_day: ReportState::NoData {
                skipped: vec![SkippedRecord::new(
                    "c1",
                    SkipReason::MissingField("checkInDate".to_string()),
                )],
            },
            most_issued_categories: ReportState::Failed {
                message: "offline".to_string(),
            },
            most_rated_categories: ReportState::Loading,
            weekly_fines: ReportState::Populated(ReportOutcome {
                report: Report::from_points(vec![ReportPoint {
                    label: "08/05".to_string(),
                    value: 40.0,
                }]),
                skipped: vec![],
                change_pct: Some(-15),
            }),
        }
    }

    #[test]
    fn test_format_headlines() {
        let dashboard = dashboard();
        assert_eq!(dashboard.format_member_count(), "1,204");
        assert_eq!(dashboard.format_weekly_fine_total(), "₹1,250");
        assert_eq!(dashboard.format_fines_change().as_deref(), Some("-15%"));

        let empty = LibraryDashboard {
            member_count: None,
            weekly_fine_total: None,
            weekly_fines: ReportState::Loading,
            ..dashboard
        };
        assert_eq!(empty.format_member_count(), "n/a");
        assert_eq!(empty.format_weekly_fine_total(), "n/a");
        assert_eq!(empty.format_fines_change(), None);
    }

    #[test]
    fn test_counts() {
        let dashboard = dashboard();
        assert_eq!(dashboard.skipped_total(), 2);
        assert_eq!(dashboard.failed_count(), 1);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(-4200), "-4,200");
    }
}
