use async_trait::async_trait;
use eventsift_application::{EventGateway, EventPage, EventQuery, ExportPayload};
use eventsift_core::{AppError, AppResult};
use eventsift_domain::{EventCatalog, EventDefinition};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// HTTP adapter for the analytics backend's catalog, query, and export
/// endpoints.
pub struct HttpEventGateway {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogResponse {
    event_names: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    name: String,
    category: String,
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    action_field: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsResponse {
    events: Vec<Value>,
    page: usize,
    total: usize,
    total_pages: usize,
}

impl HttpEventGateway {
    /// Creates a gateway over a shared HTTP client. The base URL must be a
    /// valid absolute URL; timeouts belong to the supplied client.
    pub fn new(http_client: reqwest::Client, base_url: &str) -> AppResult<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|error| AppError::Validation(format!("invalid base URL: {error}")))?;
        if !parsed.has_host() {
            return Err(AppError::Validation(
                "base URL must carry a host".to_owned(),
            ));
        }

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    async fn get_checked(&self, endpoint: String, params: &[(&str, String)]) -> AppResult<reqwest::Response> {
        let response = self
            .http_client
            .get(endpoint.as_str())
            .query(params)
            .send()
            .await
            .map_err(|error| {
                AppError::Unavailable(format!("analytics request transport error: {error}"))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_owned());
        if status.is_client_error() {
            Err(AppError::Validation(format!(
                "analytics endpoint rejected the request with status {}: {body}",
                status.as_u16()
            )))
        } else {
            Err(AppError::Unavailable(format!(
                "analytics endpoint returned status {}: {body}",
                status.as_u16()
            )))
        }
    }
}

#[async_trait]
impl EventGateway for HttpEventGateway {
    async fn fetch_catalog(&self) -> AppResult<EventCatalog> {
        let endpoint = format!("{}/api/analytics/event-names", self.base_url);
        let response = self.get_checked(endpoint, &[]).await?;
        let body = response.json::<CatalogResponse>().await.map_err(|error| {
            AppError::Unavailable(format!("failed to parse catalog response: {error}"))
        })?;

        let definitions = body
            .event_names
            .into_iter()
            .map(|entry| {
                EventDefinition::new(entry.name, entry.category, entry.actions, entry.action_field)
            })
            .collect::<AppResult<Vec<_>>>()?;

        EventCatalog::new(definitions)
    }

    async fn fetch_events(&self, query: &EventQuery) -> AppResult<EventPage> {
        let endpoint = format!("{}/api/analytics/events", self.base_url);
        let params = query_params(query);
        let response = self.get_checked(endpoint, &params).await?;
        let body = response.json::<EventsResponse>().await.map_err(|error| {
            AppError::Unavailable(format!("failed to parse events response: {error}"))
        })?;

        Ok(EventPage {
            events: body.events,
            page: body.page,
            total: body.total,
            total_pages: body.total_pages,
        })
    }

    async fn export_events(&self, query: &EventQuery) -> AppResult<ExportPayload> {
        let endpoint = format!("{}/api/analytics/events/export", self.base_url);
        let params = query_params(query);
        let response = self.get_checked(endpoint, &params).await?;
        let bytes = response.bytes().await.map_err(|error| {
            AppError::Unavailable(format!("failed to read export payload: {error}"))
        })?;

        Ok(ExportPayload {
            bytes: bytes.to_vec(),
        })
    }
}

/// Renders a descriptor as wire query parameters. Kept pure so encoding is
/// testable without a server.
fn query_params(query: &EventQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if let Some(category) = &query.category {
        params.push(("category", category.clone()));
    }
    if !query.event_names.is_empty() {
        params.push(("eventNames", query.event_names.join(",")));
    }
    if !query.event_actions.is_empty() {
        params.push(("eventActions", encode_event_actions(query)));
    }
    params.push(("startDate", query.start_date.to_rfc3339()));
    params.push(("endDate", query.end_date.to_rfc3339()));
    params.push(("excludeInternal", query.exclude_internal.to_string()));
    if let Some(page) = query.page {
        params.push(("page", page.page().to_string()));
        params.push(("limit", page.limit().to_string()));
    }

    params
}

/// Packs per-event action filters as `name:action1|action2,next:a`.
fn encode_event_actions(query: &EventQuery) -> String {
    query
        .event_actions
        .iter()
        .map(|(name, filter)| {
            let actions = filter
                .actions()
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("|");
            format!("{name}:{actions}")
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use eventsift_application::{AuxiliaryFilters, DateRange, EventQuery, PageRequest};
    use eventsift_domain::{EventDefinition, EventSelection};

    use super::{HttpEventGateway, query_params};

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
            category: Some("Interaction".to_owned()),
            range,
            exclude_internal: true,
        }
    }

    fn selection() -> EventSelection {
        let clicks = EventDefinition::new(
            "button_click",
            "Interaction",
            vec!["click".to_owned(), "hover".to_owned(), "focus".to_owned()],
            Some("interaction_type".to_owned()),
        )
        .unwrap_or_else(|_| unreachable!());
        let views = EventDefinition::new("page_view", "Navigation", Vec::new(), None)
            .unwrap_or_else(|_| unreachable!());

        EventSelection::new()
            .toggle_event(&views)
            .toggle_action(&clicks, "click")
            .toggle_action(&clicks, "hover")
    }

    #[test]
    fn rejects_base_url_without_host() {
        let client = reqwest::Client::new();
        assert!(HttpEventGateway::new(client.clone(), "not a url").is_err());
        assert!(HttpEventGateway::new(client, "file:///tmp").is_err());
    }

    #[test]
    fn encodes_selection_and_pagination() {
        let page = PageRequest::new(2, 50).unwrap_or_else(|_| unreachable!());
        let query = EventQuery::build(&selection(), &filters(), page);
        let params = query_params(&query);

        let lookup = |key: &str| {
            params
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.as_str())
        };

        assert_eq!(lookup("category"), Some("Interaction"));
        assert_eq!(lookup("eventNames"), Some("button_click,page_view"));
        assert_eq!(lookup("eventActions"), Some("button_click:click|hover"));
        assert_eq!(lookup("excludeInternal"), Some("true"));
        assert_eq!(lookup("page"), Some("2"));
        assert_eq!(lookup("limit"), Some("50"));
    }

    #[test]
    fn export_encoding_omits_pagination_and_empty_filters() {
        let query = EventQuery::build_export(&EventSelection::new(), &filters());
        let params = query_params(&query);

        assert!(params.iter().all(|(name, _)| *name != "page"));
        assert!(params.iter().all(|(name, _)| *name != "limit"));
        assert!(params.iter().all(|(name, _)| *name != "eventNames"));
        assert!(params.iter().all(|(name, _)| *name != "eventActions"));
        assert!(params.iter().any(|(name, _)| *name == "startDate"));
    }
}
