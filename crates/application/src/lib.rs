//! Application services and ports for the event filter pipeline.

#![forbid(unsafe_code)]

mod analytics_ports;
mod catalog_service;
mod event_feed_service;
mod export_service;

pub use analytics_ports::{
    AuxiliaryFilters, DateRange, EventGateway, EventPage, EventQuery, ExportDelivery,
    ExportPayload, PageRequest,
};
pub use catalog_service::CatalogService;
pub use event_feed_service::{EventFeedService, FeedPhase, FeedSnapshot};
pub use export_service::EventExportService;
