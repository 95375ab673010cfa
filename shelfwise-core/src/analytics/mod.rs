//! Analytics module for shelfwise
//!
//! Turns raw library records into chart-ready reports:
//! - [`aggregate`]: per-day and per-category totals, with skipped records
//! - [`trend`]: percentage change against a baseline
//! - [`report`]: ordered, labeled series and the per-report state machine
//! - [`pipeline`]: fetch, catalog join and assembly against a document store
//! - [`scope`]: fetches bound to a view activation
//! - [`dashboard`]: the analytics screen as a whole
//!
//! ## Data flow
//!
//! ```text
//! DocumentStore ──fetch──▶ records ──aggregate──▶ DailyAggregate / CategoryAggregate
//!                                                          │
//!                               ReportState ◀──resolve── Report ◀──assemble──┘
//! ```
//!
//! Aggregation and assembly are pure; only the pipeline touches the store.

pub mod aggregate;
pub mod dashboard;
pub mod day;
pub mod pipeline;
pub mod report;
pub mod scope;
pub mod trend;

pub use aggregate::{
    Aggregation, CategoryAggregate, DailyAggregate, DatedRecord, TimeSeriesAggregator, Total,
};
pub use dashboard::LibraryDashboard;
pub use day::DayFormat;
pub use pipeline::ReportPipeline;
pub use report::{CategoryOrder, Report, ReportAssembler, ReportOutcome, ReportPoint, ReportState};
pub use scope::{ReportSlot, ViewScope};
pub use trend::{
    average_percentage_change, format_delta, percentage_change, try_average_percentage_change,
    BaselinePolicy, TrendSeries,
};
