use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventsift_application::{EventGateway, EventPage, EventQuery, ExportPayload};
use eventsift_core::{AppError, AppResult};
use eventsift_domain::EventCatalog;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// One recorded analytics event.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    name: String,
    occurred_at: DateTime<Utc>,
    internal: bool,
    payload: Map<String, Value>,
}

impl StoredEvent {
    /// Creates a stored event; `payload` carries any secondary fields such
    /// as the action field an event's taxonomy points at.
    pub fn new(
        name: impl Into<String>,
        occurred_at: DateTime<Utc>,
        internal: bool,
        payload: Map<String, Value>,
    ) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "stored event name must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            name,
            occurred_at,
            internal,
            payload,
        })
    }

    fn matches(&self, query: &EventQuery, catalog: &EventCatalog) -> bool {
        if self.occurred_at < query.start_date || self.occurred_at >= query.end_date {
            return false;
        }
        if query.exclude_internal && self.internal {
            return false;
        }
        if let Some(category) = &query.category {
            let Some(definition) = catalog.find(self.name.as_str()) else {
                return false;
            };
            if definition.category() != category {
                return false;
            }
        }
        if !query.event_names.is_empty() && !query.event_names.contains(&self.name) {
            return false;
        }
        if let Some(filter) = query.event_actions.get(self.name.as_str()) {
            let Some(action) = self
                .payload
                .get(filter.action_field())
                .and_then(Value::as_str)
            else {
                return false;
            };
            if !filter.actions().contains(action) {
                return false;
            }
        }
        true
    }

    fn to_row(&self) -> Value {
        let mut row = self.payload.clone();
        row.insert("name".to_owned(), Value::String(self.name.clone()));
        row.insert(
            "occurredAt".to_owned(),
            Value::String(self.occurred_at.to_rfc3339()),
        );
        row.insert("internal".to_owned(), Value::Bool(self.internal));
        Value::Object(row)
    }
}

/// Gateway double holding catalog and events in memory, with the backend's
/// filtering, ordering, pagination, and CSV semantics. Used by tests and
/// local development.
pub struct InMemoryEventGateway {
    catalog: EventCatalog,
    events: RwLock<Vec<StoredEvent>>,
}

impl InMemoryEventGateway {
    /// Creates a gateway over a fixed catalog and an initial set of events.
    #[must_use]
    pub fn new(catalog: EventCatalog, events: Vec<StoredEvent>) -> Self {
        Self {
            catalog,
            events: RwLock::new(events),
        }
    }

    /// Appends one event.
    pub async fn record(&self, event: StoredEvent) {
        self.events.write().await.push(event);
    }

    async fn filtered(&self, query: &EventQuery) -> Vec<StoredEvent> {
        let events = self.events.read().await;
        let mut matched: Vec<StoredEvent> = events
            .iter()
            .filter(|event| event.matches(query, &self.catalog))
            .cloned()
            .collect();

        // Newest first, name as tie-break for a stable order.
        matched.sort_by(|left, right| {
            right
                .occurred_at
                .cmp(&left.occurred_at)
                .then_with(|| left.name.cmp(&right.name))
        });
        matched
    }
}

#[async_trait]
impl EventGateway for InMemoryEventGateway {
    async fn fetch_catalog(&self) -> AppResult<EventCatalog> {
        Ok(self.catalog.clone())
    }

    async fn fetch_events(&self, query: &EventQuery) -> AppResult<EventPage> {
        let page = query.page.ok_or_else(|| {
            AppError::Validation("event page query requires pagination".to_owned())
        })?;

        let matched = self.filtered(query).await;
        let total = matched.len();
        let total_pages = total.div_ceil(page.limit());
        let events = matched
            .into_iter()
            .skip((page.page() - 1) * page.limit())
            .take(page.limit())
            .map(|event| event.to_row())
            .collect();

        Ok(EventPage {
            events,
            page: page.page(),
            total,
            total_pages,
        })
    }

    async fn export_events(&self, query: &EventQuery) -> AppResult<ExportPayload> {
        if query.page.is_some() {
            return Err(AppError::Validation(
                "export query must not paginate".to_owned(),
            ));
        }

        let mut csv = String::from("name,occurred_at,internal\n");
        for event in self.filtered(query).await {
            csv.push_str(&format!(
                "{},{},{}\n",
                event.name,
                event.occurred_at.to_rfc3339(),
                event.internal
            ));
        }

        Ok(ExportPayload {
            bytes: csv.into_bytes(),
        })
    }
}
