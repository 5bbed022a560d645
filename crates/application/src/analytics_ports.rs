mod gateway;
mod query;

pub use gateway::{EventGateway, EventPage, ExportDelivery, ExportPayload};
pub use query::{AuxiliaryFilters, DateRange, EventQuery, PageRequest};
