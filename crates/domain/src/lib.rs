//! Domain values and invariants for the hierarchical event filter.

#![forbid(unsafe_code)]

mod catalog;
mod selection;
mod session;

pub use catalog::{EventCatalog, EventDefinition};
pub use selection::{ActionFilter, EventSelection, SelectionStatus};
pub use session::FilterSession;
