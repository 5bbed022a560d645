#[cfg(test)]
mod tests;

use std::sync::Arc;

use eventsift_core::{AppError, AppResult};
use eventsift_domain::EventSelection;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::analytics_ports::{
    AuxiliaryFilters, DateRange, EventGateway, EventPage, EventQuery, PageRequest,
};

/// Where the feed currently stands for its latest descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedPhase {
    /// No fetch issued yet.
    Idle,
    /// A fetch for the current descriptor is in flight.
    Fetching,
    /// The current descriptor's page is loaded.
    Loaded(EventPage),
    /// The fetch for the current descriptor failed; the message is the
    /// page-level error surface.
    Failed(String),
}

/// Caller-facing view of the feed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Current phase.
    pub phase: FeedPhase,
    /// Current 1-based page number.
    pub page: usize,
}

struct FeedState {
    selection: EventSelection,
    filters: AuxiliaryFilters,
    page: usize,
    issued: u64,
    loaded_query: Option<EventQuery>,
    phase: FeedPhase,
}

impl FeedState {
    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            phase: self.phase.clone(),
            page: self.page,
        }
    }
}

/// Issues and reconciles paged event fetches for the committed selection.
///
/// Every response carries the token it was issued under; a response is
/// applied only while its token is still the latest one issued, so the
/// last-issued fetch wins regardless of completion order. Issuing a new
/// fetch supersedes any in-flight one without transport-level abort.
pub struct EventFeedService {
    gateway: Arc<dyn EventGateway>,
    limit: usize,
    state: Mutex<FeedState>,
}

impl EventFeedService {
    /// Creates a feed over the given gateway with an empty selection and
    /// the supplied auxiliary filters. No fetch is issued until the caller
    /// asks for one; the composing view calls [`EventFeedService::refresh`]
    /// exactly once on mount.
    pub fn new(
        gateway: Arc<dyn EventGateway>,
        filters: AuxiliaryFilters,
        limit: usize,
    ) -> AppResult<Self> {
        if limit == 0 {
            return Err(AppError::Validation(
                "page limit must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            gateway,
            limit,
            state: Mutex::new(FeedState {
                selection: EventSelection::new(),
                filters,
                page: 1,
                issued: 0,
                loaded_query: None,
                phase: FeedPhase::Idle,
            }),
        })
    }

    /// Returns the current state without touching it.
    pub async fn snapshot(&self) -> FeedSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Adopts a newly committed selection and refetches from page 1.
    pub async fn apply_selection(&self, selection: EventSelection) -> FeedSnapshot {
        {
            let mut state = self.state.lock().await;
            state.selection = selection;
            state.page = 1;
            if !self.needs_fetch(&state) {
                return state.snapshot();
            }
        }
        self.run_fetch().await
    }

    /// Changes the category filter and refetches from page 1.
    pub async fn set_category(&self, category: Option<String>) -> FeedSnapshot {
        {
            let mut state = self.state.lock().await;
            state.filters.category = category;
            state.page = 1;
            if !self.needs_fetch(&state) {
                return state.snapshot();
            }
        }
        self.run_fetch().await
    }

    /// Changes the query window and refetches from page 1.
    pub async fn set_date_range(&self, range: DateRange) -> FeedSnapshot {
        {
            let mut state = self.state.lock().await;
            state.filters.range = range;
            state.page = 1;
            if !self.needs_fetch(&state) {
                return state.snapshot();
            }
        }
        self.run_fetch().await
    }

    /// Changes the internal-traffic exclusion and refetches from page 1.
    pub async fn set_exclude_internal(&self, exclude_internal: bool) -> FeedSnapshot {
        {
            let mut state = self.state.lock().await;
            state.filters.exclude_internal = exclude_internal;
            state.page = 1;
            if !self.needs_fetch(&state) {
                return state.snapshot();
            }
        }
        self.run_fetch().await
    }

    /// Moves to another page of the current filter. Page-only changes keep
    /// every other part of the descriptor as is.
    pub async fn set_page(&self, page: usize) -> AppResult<FeedSnapshot> {
        if page == 0 {
            return Err(AppError::Validation("page numbers start at 1".to_owned()));
        }

        {
            let mut state = self.state.lock().await;
            state.page = page;
            if !self.needs_fetch(&state) {
                return Ok(state.snapshot());
            }
        }
        Ok(self.run_fetch().await)
    }

    /// Refetches the current descriptor unconditionally. This is both the
    /// initial-mount fetch and the user-triggered recovery path after a
    /// failure; there are no automatic retries.
    pub async fn refresh(&self) -> FeedSnapshot {
        self.run_fetch().await
    }

    fn current_query(&self, state: &FeedState) -> EventQuery {
        let page = PageRequest::new(state.page, self.limit)
            .unwrap_or_else(|_| unreachable!("page and limit are validated on entry"));
        EventQuery::build(&state.selection, &state.filters, page)
    }

    /// A mutation that rebuilds an identical descriptor over an already
    /// loaded page changes nothing, so no fetch is issued for it.
    fn needs_fetch(&self, state: &FeedState) -> bool {
        if !matches!(state.phase, FeedPhase::Loaded(_)) {
            return true;
        }
        state.loaded_query.as_ref() != Some(&self.current_query(state))
    }

    async fn run_fetch(&self) -> FeedSnapshot {
        let (token, query) = {
            let mut state = self.state.lock().await;
            state.issued = state.issued.wrapping_add(1);
            state.phase = FeedPhase::Fetching;
            (state.issued, self.current_query(&state))
        };

        let outcome = self.gateway.fetch_events(&query).await;

        let mut state = self.state.lock().await;
        if state.issued != token {
            debug!(
                token,
                latest = state.issued,
                "discarding superseded event fetch response"
            );
            return state.snapshot();
        }

        match outcome {
            Ok(page) => {
                state.phase = FeedPhase::Loaded(page);
                state.loaded_query = Some(query);
            }
            Err(error) => {
                warn!(error = %error, "event fetch failed");
                state.phase = FeedPhase::Failed(error.to_string());
                state.loaded_query = None;
            }
        }
        state.snapshot()
    }
}
