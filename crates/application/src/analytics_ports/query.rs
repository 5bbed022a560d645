use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use eventsift_core::{AppError, AppResult};
use eventsift_domain::{ActionFilter, EventSelection};

/// Query window, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a validated date range.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::Validation(
                "date range start must come before its end".to_owned(),
            ));
        }

        Ok(Self { start, end })
    }

    /// Returns the inclusive start instant.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the exclusive end instant.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Filters that sit beside the event selection: the category tab, the
/// query window, and the internal-traffic exclusion flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryFilters {
    /// Optional category restriction.
    pub category: Option<String>,
    /// Query window.
    pub range: DateRange,
    /// Whether internal traffic is excluded.
    pub exclude_internal: bool,
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    limit: usize,
}

impl PageRequest {
    /// Creates a validated page request.
    pub fn new(page: usize, limit: usize) -> AppResult<Self> {
        if page == 0 {
            return Err(AppError::Validation("page numbers start at 1".to_owned()));
        }
        if limit == 0 {
            return Err(AppError::Validation(
                "page limit must be greater than zero".to_owned(),
            ));
        }

        Ok(Self { page, limit })
    }

    /// Returns the 1-based page number.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// The canonical description of what the next query fetches.
///
/// Derived from the committed selection plus auxiliary filters and never
/// mutated in place. Equal inputs build equal descriptors: event names are
/// emitted in sorted order and the action map is ordered, so equality is
/// structural regardless of the order toggles happened in. The feed
/// service leans on that to skip fetches that would change nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Optional category restriction.
    pub category: Option<String>,
    /// Selected event names, sorted.
    pub event_names: Vec<String>,
    /// Per-event action constraints; absence of a name means no action
    /// filter for that event.
    pub event_actions: BTreeMap<String, ActionFilter>,
    /// Inclusive window start.
    pub start_date: DateTime<Utc>,
    /// Exclusive window end.
    pub end_date: DateTime<Utc>,
    /// Whether internal traffic is excluded.
    pub exclude_internal: bool,
    /// Pagination; `None` asks for the full filtered set (export).
    pub page: Option<PageRequest>,
}

impl EventQuery {
    /// Builds the descriptor for one page of results.
    #[must_use]
    pub fn build(
        selection: &EventSelection,
        filters: &AuxiliaryFilters,
        page: PageRequest,
    ) -> Self {
        Self::assemble(selection, filters, Some(page))
    }

    /// Builds the pagination-free descriptor used for exports.
    #[must_use]
    pub fn build_export(selection: &EventSelection, filters: &AuxiliaryFilters) -> Self {
        Self::assemble(selection, filters, None)
    }

    fn assemble(
        selection: &EventSelection,
        filters: &AuxiliaryFilters,
        page: Option<PageRequest>,
    ) -> Self {
        Self {
            category: filters.category.clone(),
            event_names: selection.event_names().iter().cloned().collect(),
            event_actions: selection.action_filters().clone(),
            start_date: filters.range.start(),
            end_date: filters.range.end(),
            exclude_internal: filters.exclude_internal,
            page,
        }
    }
}
