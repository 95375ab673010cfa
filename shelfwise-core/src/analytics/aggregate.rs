//! Time-series and category aggregation.
//!
//! The aggregator turns decoded records into unordered per-day or
//! per-category totals. Records that cannot contribute (bad date, bad amount,
//! no catalog match) are listed in [`Aggregation::skipped`] rather than
//! silently dropped. Ordering is left to the report assembler.

use std::collections::HashMap;
use std::ops::AddAssign;

use chrono::NaiveDate;

use super::day::DayFormat;
use crate::error::{Error, Result};
use crate::types::{
    fields, BookCategoryMap, CheckinRecord, FineRecord, FineStatus, RatingRecord, SkipReason,
    SkippedRecord,
};

/// Numeric totals an aggregate can hold.
pub trait Total: Copy + Default + AddAssign + PartialOrd {
    fn as_f64(self) -> f64;
}

impl Total for i64 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Total for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

/// Records that carry an id and a stored date string.
pub trait DatedRecord {
    fn record_id(&self) -> &str;
    fn date_str(&self) -> &str;
}

impl DatedRecord for CheckinRecord {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn date_str(&self) -> &str {
        &self.check_in_date
    }
}

impl DatedRecord for FineRecord {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn date_str(&self) -> &str {
        &self.date
    }
}

// ============================================
// Aggregates
// ============================================

/// Calendar day → summed value. Unordered.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate<V> {
    totals: HashMap<NaiveDate, V>,
}

impl<V> Default for DailyAggregate<V> {
    fn default() -> Self {
        Self {
            totals: HashMap::new(),
        }
    }
}

impl<V: Total> DailyAggregate<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, day: NaiveDate, value: V) {
        *self.totals.entry(day).or_default() += value;
    }

    pub fn get(&self, day: NaiveDate) -> Option<V> {
        self.totals.get(&day).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, V)> + '_ {
        self.totals.iter().map(|(day, value)| (*day, *value))
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn total(&self) -> V {
        let mut sum = V::default();
        for value in self.totals.values() {
            sum += *value;
        }
        sum
    }

    /// Days within `start..=end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        self.iter()
            .filter(|(day, _)| (start..=end).contains(day))
            .collect()
    }

    /// Totals keyed by their stored string form (e.g. `"01/05/2024"`).
    pub fn keyed(&self, format: &DayFormat) -> HashMap<String, V> {
        self.iter().map(|(day, v)| (format.key(day), v)).collect()
    }
}

impl<V: Total> FromIterator<(NaiveDate, V)> for DailyAggregate<V> {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, V)>>(iter: I) -> Self {
        let mut aggregate = Self::new();
        for (day, value) in iter {
            aggregate.add(day, value);
        }
        aggregate
    }
}

/// Category label → summed count. Unordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryAggregate {
    totals: HashMap<String, i64>,
}

impl CategoryAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: &str, count: i64) {
        *self.totals.entry(category.to_string()).or_default() += count;
    }

    pub fn get(&self, category: &str) -> Option<i64> {
        self.totals.get(category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.totals.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn total(&self) -> i64 {
        self.totals.values().sum()
    }
}

impl<'a> FromIterator<(&'a str, i64)> for CategoryAggregate {
    fn from_iter<I: IntoIterator<Item = (&'a str, i64)>>(iter: I) -> Self {
        let mut aggregate = Self::new();
        for (category, count) in iter {
            aggregate.add(category, count);
        }
        aggregate
    }
}

/// An aggregate plus the records that were left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation<A> {
    pub aggregate: A,
    pub skipped: Vec<SkippedRecord>,
}

impl<A> Aggregation<A> {
    pub fn new(aggregate: A, skipped: Vec<SkippedRecord>) -> Self {
        Self { aggregate, skipped }
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Prepend skips from an earlier stage (e.g. document decoding).
    pub fn with_prior_skips(mut self, mut prior: Vec<SkippedRecord>) -> Self {
        prior.append(&mut self.skipped);
        self.skipped = prior;
        self
    }

    /// The aggregate, or `ParseSkipped` if any record was left out.
    pub fn into_strict(self) -> Result<A> {
        if self.skipped.is_empty() {
            Ok(self.aggregate)
        } else {
            Err(Error::ParseSkipped {
                count: self.skipped.len(),
            })
        }
    }

    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> Aggregation<B> {
        Aggregation {
            aggregate: f(self.aggregate),
            skipped: self.skipped,
        }
    }
}

// ============================================
// Aggregator
// ============================================

/// Groups records by day or by category.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesAggregator {
    format: DayFormat,
}

impl TimeSeriesAggregator {
    pub fn new(format: DayFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> DayFormat {
        self.format
    }

    /// Sum per-record values by day.
    ///
    /// `value` returns `Ok(None)` for records that are filtered out on purpose;
    /// those are neither summed nor reported as skipped.
    pub fn sum_by_day<R, V, F>(&self, records: &[R], value: F) -> Aggregation<DailyAggregate<V>>
    where
        R: DatedRecord,
        V: Total,
        F: Fn(&R) -> std::result::Result<Option<V>, SkipReason>,
    {
        let mut aggregate = DailyAggregate::new();
        let mut skipped = Vec::new();

        for record in records {
            let Some(day) = self.format.parse(record.date_str()) else {
                skipped.push(SkippedRecord::new(
                    record.record_id(),
                    SkipReason::MalformedDate(record.date_str().to_string()),
                ));
                continue;
            };
            match value(record) {
                Ok(Some(v)) => aggregate.add(day, v),
                Ok(None) => {}
                Err(reason) => skipped.push(SkippedRecord::new(record.record_id(), reason)),
            }
        }

        if !skipped.is_empty() {
            tracing::debug!(
                skipped = skipped.len(),
                days = aggregate.len(),
                "Records skipped during daily aggregation"
            );
        }

        Aggregation::new(aggregate, skipped)
    }

    /// One per record, by day.
    pub fn daily_counts<R: DatedRecord>(&self, records: &[R]) -> Aggregation<DailyAggregate<i64>> {
        self.sum_by_day(records, |_| Ok(Some(1)))
    }

    /// Paid fine amounts by day. Unpaid fines are filtered out.
    pub fn daily_paid_amounts(&self, fines: &[FineRecord]) -> Aggregation<DailyAggregate<f64>> {
        self.sum_by_day(fines, |fine| match fine.status {
            FineStatus::Paid => fine.amount_value().map(Some),
            FineStatus::Unpaid => Ok(None),
        })
    }

    /// All fine amounts dated within `start..=end`, regardless of status.
    pub fn amount_in_window(
        &self,
        fines: &[FineRecord],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Aggregation<f64> {
        self.sum_by_day(fines, |fine| fine.amount_value().map(Some))
            .map(|daily| daily.window(start, end).total())
    }

    /// Check-ins per category, resolved through the catalog.
    pub fn checkin_categories(
        &self,
        checkins: &[CheckinRecord],
        catalog: &BookCategoryMap,
    ) -> Aggregation<CategoryAggregate> {
        let mut aggregate = CategoryAggregate::new();
        let mut skipped = Vec::new();

        for checkin in checkins {
            let Some(isbn) = checkin.book_isbn.as_deref() else {
                skipped.push(SkippedRecord::new(
                    &checkin.id,
                    SkipReason::MissingField(fields::BOOK_ISBN.to_string()),
                ));
                continue;
            };
            match catalog.category_of(isbn) {
                Some(category) => aggregate.add(category, 1),
                None => skipped.push(SkippedRecord::new(
                    &checkin.id,
                    SkipReason::NoCatalogMatch(isbn.to_string()),
                )),
            }
        }

        Aggregation::new(aggregate, skipped)
    }

    /// Number of ratings per category, resolved through the catalog.
    pub fn rating_categories(
        &self,
        ratings: &[RatingRecord],
        catalog: &BookCategoryMap,
    ) -> Aggregation<CategoryAggregate> {
        let mut aggregate = CategoryAggregate::new();
        let mut skipped = Vec::new();

        for rating in ratings {
            match catalog.category_of(&rating.book_isbn) {
                Some(category) => aggregate.add(category, rating.ratings.len() as i64),
                None => skipped.push(SkippedRecord::new(
                    &rating.book_isbn,
                    SkipReason::NoCatalogMatch(rating.book_isbn.clone()),
                )),
            }
        }

        Aggregation::new(aggregate, skipped)
    }
}
