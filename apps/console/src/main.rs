//! eventsift console: fetches one filtered page of analytics events from a
//! configured backend and optionally exports the filtered set as CSV.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Utc};
use eventsift_application::{
    AuxiliaryFilters, CatalogService, DateRange, EventExportService, EventFeedService, FeedPhase,
};
use eventsift_core::{AppError, AppResult};
use eventsift_domain::{EventCatalog, EventSelection, FilterSession};
use eventsift_infrastructure::{FsExportDelivery, HttpEventGateway};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct ConsoleConfig {
    base_url: String,
    category: Option<String>,
    range: DateRange,
    exclude_internal: bool,
    selection_expression: Option<String>,
    page: usize,
    limit: usize,
    export: bool,
    export_directory: String,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ConsoleConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let gateway = Arc::new(HttpEventGateway::new(
        http_client,
        config.base_url.as_str(),
    )?);

    let catalog = CatalogService::new(gateway.clone()).load().await;
    info!(events = catalog.events().len(), "catalog loaded");

    let selection = resolve_selection(&catalog, config.selection_expression.as_deref());

    let filters = AuxiliaryFilters {
        category: config.category.clone(),
        range: config.range,
        exclude_internal: config.exclude_internal,
    };
    let feed = EventFeedService::new(gateway.clone(), filters.clone(), config.limit)?;

    let mut snapshot = match &selection {
        Some(selection) => feed.apply_selection(selection.clone()).await,
        None => feed.refresh().await,
    };
    if config.page > 1 {
        snapshot = feed.set_page(config.page).await?;
    }

    match snapshot.phase {
        FeedPhase::Loaded(page) => {
            info!(
                page = page.page,
                total = page.total,
                total_pages = page.total_pages,
                "page loaded"
            );
            for event in &page.events {
                println!("{event}");
            }
        }
        FeedPhase::Failed(message) => {
            error!(error = %message, "event fetch failed");
            return Err(AppError::Unavailable(message));
        }
        FeedPhase::Idle | FeedPhase::Fetching => {}
    }

    if config.export {
        let delivery = Arc::new(FsExportDelivery::new(config.export_directory.clone()));
        let export_service = EventExportService::new(gateway, delivery, "events")?;
        let filename = export_service
            .export(&selection.unwrap_or_default(), &filters)
            .await?;
        info!(filename = %filename, directory = %config.export_directory, "export delivered");
    }

    Ok(())
}

/// Replays a selection expression (`name` or `name:action|action` items,
/// comma-separated) through a selector session against the loaded catalog.
/// Unknown names and actions are skipped with a warning, like any other
/// malformed selection input.
fn resolve_selection(catalog: &EventCatalog, expression: Option<&str>) -> Option<EventSelection> {
    let expression = expression?;
    let mut session = FilterSession::open(EventSelection::new());

    for item in expression.split(',').filter(|item| !item.trim().is_empty()) {
        let (name, actions) = match item.split_once(':') {
            Some((name, actions)) => (name.trim(), Some(actions)),
            None => (item.trim(), None),
        };

        let Some(event) = catalog.find(name) else {
            warn!(event = name, "selection names an event missing from the catalog");
            continue;
        };

        match actions {
            None => session.toggle_event(event),
            Some(actions) => {
                for action in actions.split('|').map(str::trim).filter(|a| !a.is_empty()) {
                    session.toggle_action(event, action);
                }
            }
        }
    }

    session.close()
}

impl ConsoleConfig {
    fn load() -> AppResult<Self> {
        let base_url = required_env("ANALYTICS_BASE_URL")?
            .trim_end_matches('/')
            .to_owned();
        let category = env::var("ANALYTICS_CATEGORY")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let end = parse_env_date("ANALYTICS_END_DATE", Utc::now())?;
        let default_start = end
            .checked_sub_days(Days::new(30))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let start = parse_env_date("ANALYTICS_START_DATE", default_start)?;
        let range = DateRange::new(start, end)?;

        let exclude_internal = parse_env_bool("ANALYTICS_EXCLUDE_INTERNAL", false)?;
        let selection_expression = env::var("ANALYTICS_SELECTION")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let page = parse_env_usize("ANALYTICS_PAGE", 1)?;
        let limit = parse_env_usize("ANALYTICS_LIMIT", 25)?;
        let export = parse_env_bool("ANALYTICS_EXPORT", false)?;
        let export_directory =
            env::var("ANALYTICS_EXPORT_DIR").unwrap_or_else(|_| "exports".to_owned());

        if page == 0 {
            return Err(AppError::Validation(
                "ANALYTICS_PAGE must be greater than zero".to_owned(),
            ));
        }
        if limit == 0 {
            return Err(AppError::Validation(
                "ANALYTICS_LIMIT must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            base_url,
            category,
            range,
            exclude_internal,
            selection_expression,
            page,
            limit,
            export,
            export_directory,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_date(name: &str, default: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    match env::var(name) {
        Ok(value) => value
            .parse::<DateTime<Utc>>()
            .map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(AppError::Validation(format!(
                "invalid {name} value '{other}': expected true or false"
            ))),
        },
        Err(_) => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> AppResult<usize> {
    match env::var(name) {
        Ok(value) => value.parse::<usize>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
