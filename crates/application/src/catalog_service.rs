use std::sync::Arc;

use eventsift_domain::EventCatalog;
use tracing::warn;

use crate::analytics_ports::EventGateway;

/// Loads the facet catalog for a view.
///
/// A failed catalog fetch degrades the selector to an empty list instead
/// of blocking the rest of the view, so the load never fails outward.
pub struct CatalogService {
    gateway: Arc<dyn EventGateway>,
}

impl CatalogService {
    /// Creates a catalog service over the given gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn EventGateway>) -> Self {
        Self { gateway }
    }

    /// Fetches the catalog, falling back to an empty one on failure.
    pub async fn load(&self) -> EventCatalog {
        match self.gateway.fetch_catalog().await {
            Ok(catalog) => catalog,
            Err(error) => {
                warn!(error = %error, "event catalog fetch failed; selector will be empty");
                EventCatalog::default()
            }
        }
    }
}
