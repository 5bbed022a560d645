use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use eventsift_core::{AppError, AppResult};
use eventsift_domain::{EventCatalog, EventDefinition, EventSelection};
use serde_json::json;
use tokio::sync::{Mutex, Notify};

use crate::analytics_ports::{
    AuxiliaryFilters, DateRange, EventGateway, EventPage, EventQuery, ExportPayload,
};

use super::{EventFeedService, FeedPhase};

enum FetchBehavior {
    Respond,
    Fail,
    HoldUntil(Arc<Notify>),
}

struct ScriptedGateway {
    behaviors: Mutex<VecDeque<FetchBehavior>>,
    calls: Mutex<Vec<EventQuery>>,
    fetches: AtomicUsize,
}

impl ScriptedGateway {
    fn new(behaviors: Vec<FetchBehavior>) -> Self {
        Self {
            behaviors: Mutex::new(behaviors.into()),
            calls: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn last_query(&self) -> EventQuery {
        self.calls
            .lock()
            .await
            .last()
            .cloned()
            .unwrap_or_else(|| unreachable!())
    }
}

#[async_trait]
impl EventGateway for ScriptedGateway {
    async fn fetch_catalog(&self) -> AppResult<EventCatalog> {
        Ok(EventCatalog::default())
    }

    async fn fetch_events(&self, query: &EventQuery) -> AppResult<EventPage> {
        self.calls.lock().await.push(query.clone());
        let sequence = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        let behavior = self
            .behaviors
            .lock()
            .await
            .pop_front()
            .unwrap_or(FetchBehavior::Respond);

        match behavior {
            FetchBehavior::Respond => {}
            FetchBehavior::Fail => {
                return Err(AppError::Unavailable("scripted failure".to_owned()));
            }
            FetchBehavior::HoldUntil(gate) => gate.notified().await,
        }

        // `total` tags the response with its issuance order so tests can
        // tell which fetch a page came from.
        Ok(EventPage {
            events: vec![json!({ "sequence": sequence })],
            page: query.page.map(|page| page.page()).unwrap_or(1),
            total: sequence,
            total_pages: 1,
        })
    }

    async fn export_events(&self, _query: &EventQuery) -> AppResult<ExportPayload> {
        Err(AppError::Internal("not exercised".to_owned()))
    }
}

fn filters() -> AuxiliaryFilters {
    let range = DateRange::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!()),
        Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!()),
    )
    .unwrap_or_else(|_| unreachable!());

    AuxiliaryFilters {
        category: None,
        range,
        exclude_internal: false,
    }
}

fn selection_with(name: &str) -> EventSelection {
    let event = EventDefinition::new(name, "General", Vec::new(), None)
        .unwrap_or_else(|_| unreachable!());
    EventSelection::new().toggle_event(&event)
}

fn service(gateway: Arc<ScriptedGateway>) -> EventFeedService {
    EventFeedService::new(gateway, filters(), 25).unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn initial_refresh_loads_first_page() {
    let gateway = Arc::new(ScriptedGateway::new(Vec::new()));
    let feed = service(gateway.clone());

    let snapshot = feed.refresh().await;

    assert_eq!(gateway.fetch_count(), 1);
    assert_eq!(snapshot.page, 1);
    assert!(matches!(snapshot.phase, FeedPhase::Loaded(_)));
}

#[tokio::test]
async fn later_issued_fetch_wins_over_earlier_completion() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(ScriptedGateway::new(vec![
        FetchBehavior::HoldUntil(gate.clone()),
        FetchBehavior::Respond,
    ]));
    let feed = Arc::new(service(gateway.clone()));

    // Fetch A parks inside the gateway.
    let feed_a = feed.clone();
    let task_a = tokio::spawn(async move { feed_a.refresh().await });
    while gateway.fetch_count() < 1 {
        tokio::task::yield_now().await;
    }

    // Fetch B is issued later and completes first.
    let snapshot_b = feed.refresh().await;
    let FeedPhase::Loaded(page_b) = &snapshot_b.phase else {
        unreachable!()
    };
    assert_eq!(page_b.total, 2);

    // A resolves afterwards; its response must be discarded.
    gate.notify_one();
    let snapshot_a = task_a.await.unwrap_or_else(|_| unreachable!());
    let FeedPhase::Loaded(page_after) = &snapshot_a.phase else {
        unreachable!()
    };
    assert_eq!(page_after.total, 2);

    let final_snapshot = feed.snapshot().await;
    let FeedPhase::Loaded(final_page) = &final_snapshot.phase else {
        unreachable!()
    };
    assert_eq!(final_page.total, 2);
}

#[tokio::test]
async fn filter_changes_reset_to_page_one_but_page_changes_do_not() {
    let gateway = Arc::new(ScriptedGateway::new(Vec::new()));
    let feed = service(gateway.clone());
    feed.refresh().await;

    let snapshot = feed
        .set_page(3)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(snapshot.page, 3);
    assert_eq!(
        gateway.last_query().await.page.map(|page| page.page()),
        Some(3)
    );

    let snapshot = feed.set_category(Some("Documents".to_owned())).await;
    assert_eq!(snapshot.page, 1);
    let query = gateway.last_query().await;
    assert_eq!(query.category.as_deref(), Some("Documents"));
    assert_eq!(query.page.map(|page| page.page()), Some(1));
}

#[tokio::test]
async fn unchanged_descriptor_skips_redundant_fetch() {
    let gateway = Arc::new(ScriptedGateway::new(Vec::new()));
    let feed = service(gateway.clone());

    let selection = selection_with("signup");
    feed.apply_selection(selection.clone()).await;
    assert_eq!(gateway.fetch_count(), 1);

    // Same selection committed again: equal descriptor, nothing to do.
    let snapshot = feed.apply_selection(selection).await;
    assert_eq!(gateway.fetch_count(), 1);
    assert!(matches!(snapshot.phase, FeedPhase::Loaded(_)));
}

#[tokio::test]
async fn page_zero_is_rejected_without_a_fetch() {
    let gateway = Arc::new(ScriptedGateway::new(Vec::new()));
    let feed = service(gateway.clone());

    assert!(feed.set_page(0).await.is_err());
    assert_eq!(gateway.fetch_count(), 0);
}

#[tokio::test]
async fn fetch_failure_surfaces_and_refresh_recovers() {
    let gateway = Arc::new(ScriptedGateway::new(vec![
        FetchBehavior::Fail,
        FetchBehavior::Respond,
    ]));
    let feed = service(gateway.clone());

    let snapshot = feed.refresh().await;
    assert!(matches!(snapshot.phase, FeedPhase::Failed(_)));

    let snapshot = feed.refresh().await;
    assert!(matches!(snapshot.phase, FeedPhase::Loaded(_)));
    assert_eq!(gateway.fetch_count(), 2);
}

#[tokio::test]
async fn selection_change_supersedes_in_flight_fetch() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(ScriptedGateway::new(vec![
        FetchBehavior::HoldUntil(gate.clone()),
        FetchBehavior::Respond,
    ]));
    let feed = Arc::new(service(gateway.clone()));

    let feed_a = feed.clone();
    let task_a = tokio::spawn(async move { feed_a.refresh().await });
    while gateway.fetch_count() < 1 {
        tokio::task::yield_now().await;
    }

    let snapshot = feed.apply_selection(selection_with("signup")).await;
    let FeedPhase::Loaded(page) = &snapshot.phase else {
        unreachable!()
    };
    assert_eq!(page.total, 2);

    gate.notify_one();
    task_a.await.unwrap_or_else(|_| unreachable!());

    // The stale first response must not clobber the newer selection's page.
    let final_snapshot = feed.snapshot().await;
    let FeedPhase::Loaded(final_page) = &final_snapshot.phase else {
        unreachable!()
    };
    assert_eq!(final_page.total, 2);
}
