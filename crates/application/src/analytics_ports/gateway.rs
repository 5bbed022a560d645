use async_trait::async_trait;
use eventsift_core::AppResult;
use eventsift_domain::EventCatalog;
use serde_json::Value;

use super::query::EventQuery;

/// One page of filtered events. Replaces the prior page wholesale on every
/// successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPage {
    /// Event rows as the backend returned them; the filter pipeline never
    /// interprets their payloads.
    pub events: Vec<Value>,
    /// 1-based page number this page corresponds to.
    pub page: usize,
    /// Total rows matching the filter.
    pub total: usize,
    /// Total pages at the requested limit.
    pub total_pages: usize,
}

/// Raw export bytes, handed off to a delivery collaborator untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    /// CSV payload as fetched.
    pub bytes: Vec<u8>,
}

/// Read side of the analytics backend.
#[async_trait]
pub trait EventGateway: Send + Sync {
    /// Fetches the facet catalog for the current view.
    async fn fetch_catalog(&self) -> AppResult<EventCatalog>;

    /// Fetches one page of events matching the descriptor.
    async fn fetch_events(&self, query: &EventQuery) -> AppResult<EventPage>;

    /// Fetches the full filtered set as an export payload. The descriptor
    /// must carry no pagination.
    async fn export_events(&self, query: &EventQuery) -> AppResult<ExportPayload>;
}

/// Download-trigger collaborator receiving a finished export.
#[async_trait]
pub trait ExportDelivery: Send + Sync {
    /// Hands over a successfully fetched payload under the given filename.
    async fn deliver(&self, filename: &str, payload: ExportPayload) -> AppResult<()>;
}
