
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eventsift_core::{AppError, AppResult};
use eventsift_domain::EventSelection;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::analytics_ports::{AuxiliaryFilters, EventGateway, EventQuery, ExportDelivery};

/// One-shot CSV export of the currently filtered event set.
///
/// Reuses the feed's selection and auxiliary filters but strips
/// pagination, so the backend returns the full filtered set. A single busy
/// flag rejects overlapping exports; export failures stay on this surface
/// and never touch the feed's page state.
pub struct EventExportService {
    gateway: Arc<dyn EventGateway>,
    delivery: Arc<dyn ExportDelivery>,
    filename_prefix: String,
    exporting: AtomicBool,
    last_error: Mutex<Option<String>>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl EventExportService {
    /// Creates an export service; `filename_prefix` leads the delivered
    /// filename, e.g. `events` for `events-2026-03-01-to-2026-04-01.csv`.
    pub fn new(
        gateway: Arc<dyn EventGateway>,
        delivery: Arc<dyn ExportDelivery>,
        filename_prefix: impl Into<String>,
    ) -> AppResult<Self> {
        let filename_prefix = filename_prefix.into();
        if filename_prefix.trim().is_empty() {
            return Err(AppError::Validation(
                "export filename prefix must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            gateway,
            delivery,
            filename_prefix,
            exporting: AtomicBool::new(false),
            last_error: Mutex::new(None),
        })
    }

    /// Returns whether an export is currently outstanding; the UI disables
    /// its trigger while this is true.
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::SeqCst)
    }

    /// Returns the most recent export failure, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Exports the full filtered set for the given selection and filters
    /// and hands the payload to the delivery collaborator. Returns the
    /// delivered filename.
    pub async fn export(
        &self,
        selection: &EventSelection,
        filters: &AuxiliaryFilters,
    ) -> AppResult<String> {
        if self
            .exporting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::Conflict(
                "an export is already in progress".to_owned(),
            ));
        }
        let _busy = BusyGuard(&self.exporting);

        let query = EventQuery::build_export(selection, filters);
        let filename = self.filename(filters);

        match self.run_export(&query, filename.as_str()).await {
            Ok(()) => {
                *self.last_error.lock().await = None;
                info!(filename = %filename, "event export delivered");
                Ok(filename)
            }
            Err(error) => {
                warn!(error = %error, "event export failed");
                *self.last_error.lock().await = Some(error.to_string());
                Err(error)
            }
        }
    }

    async fn run_export(&self, query: &EventQuery, filename: &str) -> AppResult<()> {
        let payload = self.gateway.export_events(query).await?;
        self.delivery.deliver(filename, payload).await
    }

    fn filename(&self, filters: &AuxiliaryFilters) -> String {
        format!(
            "{}-{}-to-{}.csv",
            self.filename_prefix,
            filters.range.start().format("%Y-%m-%d"),
            filters.range.end().format("%Y-%m-%d"),
        )
    }
}
