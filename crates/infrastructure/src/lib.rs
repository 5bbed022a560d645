//! Adapters for the event filter pipeline: HTTP analytics gateway,
//! in-memory gateway for tests and local development, and filesystem
//! export delivery.

#![forbid(unsafe_code)]

mod fs_export_delivery;
mod http_event_gateway;
mod in_memory_event_gateway;

pub use fs_export_delivery::FsExportDelivery;
pub use http_event_gateway::HttpEventGateway;
pub use in_memory_event_gateway::{InMemoryEventGateway, StoredEvent};
