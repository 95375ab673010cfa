//! # shelfwise-core
//!
//! Core library for shelfwise - library analytics and reporting.
//!
//! This library provides:
//! - Domain records decoded from a document store (check-ins, fines, ratings, books)
//! - Time-series and category aggregation with explicit skipped records
//! - Trend calculation and chart-ready report assembly
//! - A report pipeline with bounded concurrent catalog joins
//! - Fine policy configuration and scheduled broadcast notifications
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through four stages:
//! - **Fetch:** documents from a [`store::DocumentStore`] (snapshot file or HTTP gateway)
//! - **Decode:** typed records; undecodable documents become [`SkippedRecord`]s
//! - **Aggregate:** unordered per-day or per-category totals
//! - **Assemble:** ordered, labeled [`analytics::Report`]s held in a [`analytics::ReportState`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use shelfwise_core::{open_store, Config, ReportPipeline};
//!
//! # async fn run() -> shelfwise_core::Result<()> {
//! let config = Config::load()?;
//! let store = open_store(&config.store)?;
//! let pipeline = ReportPipeline::from_config(store, &config);
//!
//! let issues = pipeline.issues_per_day().await?;
//! for point in &issues.report.points {
//!     println!("{} {}", point.label, point.value);
//! }
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{LibraryDashboard, ReportPipeline, ReportState, ViewScope};
pub use config::Config;
pub use error::{Error, Result};
pub use store::{open_store, Document, DocumentStore, MemoryStore};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod fines;
pub mod logging;
pub mod notify;
pub mod store;
pub mod types;
