//! Report pipeline: fetch, join, aggregate, assemble.
//!
//! Each report runs the same stages. Records are fetched and decoded, then
//! (for category reports) the catalog is looked up once per distinct book
//! identifier. Lookups fan out concurrently, bounded by
//! `max_concurrent_lookups`, and all of them complete before aggregation
//! starts. The aggregation and assembly stages are synchronous.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;

use super::aggregate::{Aggregation, TimeSeriesAggregator};
use super::dashboard::LibraryDashboard;
use super::report::{CategoryOrder, ReportAssembler, ReportOutcome, ReportState};
use super::trend::{shift_back, BaselinePolicy, TrendSeries};
use crate::config::Config;
use crate::error::Result;
use crate::store::{collections, Document, DocumentStore};
use crate::types::{
    decode_all, fields, BookCategoryMap, BookRecord, CheckinRecord, FineRecord, FromDocument,
    RatingRecord, SkippedRecord, UserType,
};

/// Default bound on concurrent catalog lookups.
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Builds every library report from a document store.
#[derive(Clone)]
pub struct ReportPipeline {
    store: Arc<dyn DocumentStore>,
    aggregator: TimeSeriesAggregator,
    assembler: ReportAssembler,
    baseline: BaselinePolicy,
    max_concurrent_lookups: usize,
    weekly_window_days: i64,
}

impl ReportPipeline {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            aggregator: TimeSeriesAggregator::default(),
            assembler: ReportAssembler::default(),
            baseline: BaselinePolicy::default(),
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
            weekly_window_days: 7,
        }
    }

    /// Pipeline configured from the `[store]` and `[analytics]` sections.
    pub fn from_config(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self::new(store)
            .with_baseline(config.analytics.baseline_policy())
            .with_max_concurrent_lookups(config.store.max_concurrent_lookups)
            .with_weekly_window_days(config.analytics.weekly_window_days)
    }

    pub fn with_baseline(mut self, baseline: BaselinePolicy) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_max_concurrent_lookups(mut self, limit: usize) -> Self {
        self.max_concurrent_lookups = limit.max(1);
        self
    }

    pub fn with_weekly_window_days(mut self, days: i64) -> Self {
        self.weekly_window_days = days.max(0);
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    // ============================================
    // Stages
    // ============================================

    /// Fetch a whole collection and decode it.
    pub async fn fetch<R: FromDocument>(
        &self,
        collection: &str,
    ) -> Result<(Vec<R>, Vec<SkippedRecord>)> {
        let docs = self.store.get_all(collection).await?;
        let (records, skipped) = decode_all::<R>(&docs);
        tracing::debug!(
            collection,
            fetched = docs.len(),
            decoded = records.len(),
            skipped = skipped.len(),
            "Fetched collection"
        );
        Ok((records, skipped))
    }

    /// Look up the category of each book identifier.
    ///
    /// One `isbn == x` query per identifier, at most `max_concurrent_lookups`
    /// in flight. Any failed lookup fails the whole join.
    pub async fn fetch_catalog(&self, isbns: BTreeSet<String>) -> Result<BookCategoryMap> {
        let lookups = isbns.len();

        let results: Vec<Vec<Document>> = stream::iter(isbns)
            .map(|isbn| {
                let store = Arc::clone(&self.store);
                async move {
                    let value = Value::String(isbn);
                    store
                        .where_equals(collections::BOOKS, fields::ISBN, &value)
                        .await
                }
            })
            .buffer_unordered(self.max_concurrent_lookups)
            .try_collect()
            .await?;

        let docs: Vec<Document> = results.into_iter().flatten().collect();
        let (books, skipped) = decode_all::<BookRecord>(&docs);
        if !skipped.is_empty() {
            tracing::debug!(skipped = skipped.len(), "Undecodable catalog entries");
        }

        let catalog = BookCategoryMap::from_books(&books);
        tracing::debug!(lookups, matched = catalog.len(), "Catalog join complete");
        Ok(catalog)
    }

    // ============================================
    // Reports
    // ============================================

    /// Check-ins per day.
    pub async fn issues_per_day(&self) -> Result<ReportOutcome> {
        let (checkins, decode_skips) = self.fetch::<CheckinRecord>(collections::CHECKINS).await?;
        let aggregation = self
            .aggregator
            .daily_counts(&checkins)
            .with_prior_skips(decode_skips);

        Ok(ReportOutcome::new(
            self.assembler.daily(&aggregation.aggregate),
            aggregation.skipped,
        ))
    }

    /// Share of check-ins per category, largest first.
    pub async fn most_issued_categories(&self) -> Result<ReportOutcome> {
        let (checkins, decode_skips) = self.fetch::<CheckinRecord>(collections::CHECKINS).await?;
        let isbns = checkins
            .iter()
            .filter_map(|c| c.book_isbn.clone())
            .collect();
        let catalog = self.fetch_catalog(isbns).await?;

        let aggregation = self
            .aggregator
            .checkin_categories(&checkins, &catalog)
            .with_prior_skips(decode_skips);

        Ok(ReportOutcome::new(
            self.assembler
                .category_share(&aggregation.aggregate, CategoryOrder::Ranked),
            aggregation.skipped,
        ))
    }

    /// Number of ratings per category, alphabetical.
    pub async fn most_rated_categories(&self) -> Result<ReportOutcome> {
        let (ratings, decode_skips) = self.fetch::<RatingRecord>(collections::RATINGS).await?;
        let isbns = ratings.iter().map(|r| r.book_isbn.clone()).collect();
        let catalog = self.fetch_catalog(isbns).await?;

        let aggregation = self
            .aggregator
            .rating_categories(&ratings, &catalog)
            .with_prior_skips(decode_skips);

        Ok(ReportOutcome::new(
            self.assembler
                .category(&aggregation.aggregate, CategoryOrder::Alphabetical),
            aggregation.skipped,
        ))
    }

    /// Paid fine amounts per day over the weekly window, with the average
    /// change against the configured baseline.
    pub async fn weekly_fines(&self, today: NaiveDate) -> Result<ReportOutcome> {
        let (fines, decode_skips) = self.fetch::<FineRecord>(collections::FINES).await?;
        let paid = self
            .aggregator
            .daily_paid_amounts(&fines)
            .with_prior_skips(decode_skips);

        let (start, end) = self.weekly_window(today);
        let current = paid.aggregate.window(start, end);
        let trend = TrendSeries::build(&current, &paid.aggregate, self.baseline);
        let change_pct = trend.average_change();

        tracing::debug!(
            days = current.len(),
            change_pct,
            baseline = ?self.baseline,
            "Weekly fines trend"
        );

        Ok(ReportOutcome {
            report: self.assembler.daily(&current),
            skipped: paid.skipped,
            change_pct: Some(change_pct),
        })
    }

    /// Users whose account role is `Member`.
    pub async fn member_count(&self) -> Result<usize> {
        let value = Value::String(UserType::Member.as_str().to_string());
        let members = self
            .store
            .where_equals(collections::USERS, fields::USER_TYPE, &value)
            .await?;
        Ok(members.len())
    }

    /// Sum of every fine dated within the weekly window, any status, rounded.
    pub async fn weekly_fine_total(&self, today: NaiveDate) -> Result<Aggregation<i64>> {
        let (fines, decode_skips) = self.fetch::<FineRecord>(collections::FINES).await?;
        let (start, end) = self.weekly_window(today);

        Ok(self
            .aggregator
            .amount_in_window(&fines, start, end)
            .with_prior_skips(decode_skips)
            .map(|total| total.round() as i64))
    }

    /// Build every dashboard report concurrently.
    ///
    /// A failing report settles as `Failed` without affecting the others.
    pub async fn dashboard(&self, today: NaiveDate) -> LibraryDashboard {
        let (members, fine_total, issues, issued, rated, fines) = tokio::join!(
            self.member_count(),
            self.weekly_fine_total(today),
            self.issues_per_day(),
            self.most_issued_categories(),
            self.most_rated_categories(),
            self.weekly_fines(today),
        );

        let member_count = members
            .map_err(|e| tracing::warn!(error = %e, "Member count unavailable"))
            .ok();
        let (weekly_fine_total, fine_total_skipped) = match fine_total {
            Ok(aggregation) => (Some(aggregation.aggregate), aggregation.skipped),
            Err(e) => {
                tracing::warn!(error = %e, "Weekly fine total unavailable");
                (None, Vec::new())
            }
        };

        let dashboard = LibraryDashboard {
            today,
            member_count,
            weekly_fine_total,
            fine_total_skipped,
            issues_per_day: ReportState::Loading.resolve(issues),
            most_issued_categories: ReportState::Loading.resolve(issued),
            most_rated_categories: ReportState::Loading.resolve(rated),
            weekly_fines: ReportState::Loading.resolve(fines),
        };

        tracing::info!(
            members = ?dashboard.member_count,
            weekly_fine_total = ?dashboard.weekly_fine_total,
            skipped = dashboard.skipped_total(),
            "Dashboard built"
        );
        dashboard
    }

    /// `[today - weekly_window_days, today]`, inclusive.
    fn weekly_window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = shift_back(today, self.weekly_window_days).unwrap_or(NaiveDate::MIN);
        (start, today)
    }
}
