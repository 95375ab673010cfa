//! Scheduled broadcast notifications.
//!
//! A [`Notification`] is validated locally and handed to a
//! [`NotificationDispatch`] implementation. Delivery to member devices is the
//! dispatch endpoint's job.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, Timelike};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::error::{Error, Result};

/// Input pattern for schedules, e.g. `08/05/2024 09:30`.
pub const SCHEDULE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// How a notification is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Fires at a calendar date and time
    Date,
}

/// A broadcast to all members.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub scheduled_for: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        scheduled_for: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            scheduled_for,
            kind: NotificationKind::Date,
        }
    }

    /// Validate against the current local time.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(Local::now().naive_local())
    }

    /// Title and body must be non-blank; the schedule must not be before
    /// the minute containing `now`.
    pub fn validate_at(&self, now: NaiveDateTime) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidNotification("title is empty".to_string()));
        }
        if self.body.trim().is_empty() {
            return Err(Error::InvalidNotification("body is empty".to_string()));
        }

        let this_minute = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        if self.scheduled_for < this_minute {
            return Err(Error::InvalidNotification(format!(
                "schedule {} is in the past",
                self.scheduled_for.format(SCHEDULE_FORMAT)
            )));
        }
        Ok(())
    }
}

/// Parse a `dd/MM/yyyy HH:MM` schedule, rejecting anything that does not
/// re-render to exactly the input.
pub fn parse_schedule(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, SCHEDULE_FORMAT)
        .ok()
        .filter(|t| t.format(SCHEDULE_FORMAT).to_string() == value)
        .ok_or_else(|| {
            Error::InvalidNotification(format!(
                "schedule {value:?} does not match dd/MM/yyyy HH:MM"
            ))
        })
}

/// Hands notifications to whatever delivers them.
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> Result<()>;
}

/// Pick a dispatcher: HTTP when an endpoint is configured, log-only otherwise
/// or when `dry_run` is set.
pub fn dispatcher_from_config(
    config: &NotificationConfig,
    dry_run: bool,
) -> Result<Box<dyn NotificationDispatch>> {
    if dry_run || config.endpoint.is_none() {
        tracing::debug!(dry_run, "Using log-only notification dispatch");
        return Ok(Box::new(LogDispatcher));
    }
    Ok(Box::new(HttpDispatcher::new(config)?))
}

// ============================================
// Log-only dispatch
// ============================================

/// Records the notification in the log and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatch for LogDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            id = %notification.id,
            title = %notification.title,
            scheduled_for = %notification.scheduled_for,
            "Notification not sent (log-only dispatch)"
        );
        Ok(())
    }
}

// ============================================
// HTTP dispatch
// ============================================

/// POSTs the notification as JSON to the configured endpoint.
pub struct HttpDispatcher {
    http_client: reqwest::Client,
    endpoint: String,
    max_retries: usize,
    initial_backoff: Duration,
}

impl HttpDispatcher {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::Config("notifications.endpoint is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid notifications.api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint,
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(500),
        })
    }

    /// Override the first retry delay (doubles on each retry, capped at 30s).
    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    async fn send_once(&self, notification: &Notification) -> std::result::Result<(), Attempt> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await
            .map_err(|e| {
                let error = Error::Dispatch(format!("HTTP request failed: {}", e));
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    Attempt::Transient(error)
                } else {
                    Attempt::Permanent(error)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        let error = Error::Dispatch(format!("API error ({}): {}", status, error_text));
        if is_retryable_status(status) {
            Err(Attempt::Transient(error))
        } else {
            Err(Attempt::Permanent(error))
        }
    }
}

#[async_trait]
impl NotificationDispatch for HttpDispatcher {
    /// Retries transient failures (5xx, 429, timeouts, connection errors)
    /// with exponential backoff.
    async fn dispatch(&self, notification: &Notification) -> Result<()> {
        let mut last_error = None;
        let mut delay = self.initial_backoff;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    attempt = attempt + 1,
                    max_attempts = self.max_retries + 1,
                    ?delay,
                    "Retrying notification dispatch"
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            match self.send_once(notification).await {
                Ok(()) => {
                    tracing::info!(id = %notification.id, "Notification dispatched");
                    return Ok(());
                }
                Err(Attempt::Transient(e)) => {
                    tracing::warn!(error = %e, "Transient error dispatching notification");
                    last_error = Some(e);
                }
                Err(Attempt::Permanent(e)) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Dispatch("max retries exceeded".to_string())))
    }
}

/// Outcome of one failed send.
enum Attempt {
    Transient(Error),
    Permanent(Error),
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}
