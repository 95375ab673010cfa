//! Report fetches tied to a view activation.
//!
//! A [`ViewScope`] owns every fetch started while a view is showing. Closing
//! the scope (explicitly or by dropping it) aborts fetches still in flight,
//! and a result that arrives after closing is never published to its slot.

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::report::{ReportOutcome, ReportState};
use crate::error::Result;

#[derive(Debug)]
pub struct ViewScope {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl ViewScope {
    /// Open a scope for one activation of a view.
    pub fn activate() -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        tracing::debug!("View scope activated");
        Self {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// Start a report fetch. The returned slot starts out `Loading`.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn_report<F>(&mut self, name: impl Into<String>, fetch: F) -> ReportSlot
    where
        F: Future<Output = Result<ReportOutcome>> + Send + 'static,
    {
        let name = name.into();
        let (state_tx, state_rx) = watch::channel(ReportState::Loading);

        if !self.is_active() {
            tracing::debug!(report = %name, "Scope closed, fetch not started");
            return ReportSlot {
                name,
                state: state_rx,
            };
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let closed_rx = self.shutdown_tx.subscribe();
        let report = name.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    tracing::debug!(report = %report, "Fetch cancelled");
                }
                outcome = fetch => {
                    // Holding the read guard keeps the scope from closing mid-publish
                    let closed = closed_rx.borrow();
                    if *closed {
                        tracing::debug!(report = %report, "Discarding result for closed scope");
                        return;
                    }
                    state_tx.send_replace(ReportState::Loading.resolve(outcome));
                    drop(closed);
                }
            }
        });
        self.handles.push(handle);

        ReportSlot {
            name,
            state: state_rx,
        }
    }

    pub fn is_active(&self) -> bool {
        !*self.shutdown_tx.borrow()
    }

    /// Close the scope and abort outstanding fetches.
    pub fn deactivate(&mut self) {
        if !self.is_active() {
            return;
        }
        self.shutdown_tx.send_replace(true);
        let outstanding = self.handles.len();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        tracing::debug!(outstanding, "View scope deactivated");
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Observer for one report's state within a scope.
#[derive(Debug, Clone)]
pub struct ReportSlot {
    name: String,
    state: watch::Receiver<ReportState>,
}

impl ReportSlot {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> ReportState {
        self.state.borrow().clone()
    }

    /// Wait until the report settles or its scope closes.
    ///
    /// A fetch cancelled by its scope leaves the slot `Loading`.
    pub async fn settled(&mut self) -> ReportState {
        if let Ok(state) = self.state.wait_for(ReportState::is_settled).await {
            return state.clone();
        }
        self.state()
    }
}
