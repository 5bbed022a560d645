use std::collections::HashSet;

use eventsift_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// One filterable event supplied by the external catalog: a name, the
/// category it is listed under, and an optional secondary action taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefinition {
    name: NonEmptyString,
    category: NonEmptyString,
    actions: Vec<String>,
    action_field: Option<String>,
}

impl EventDefinition {
    /// Creates a validated event definition.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        actions: Vec<String>,
        action_field: Option<String>,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;

        let mut seen = HashSet::new();
        for action in &actions {
            if action.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "event '{}' has an empty action value",
                    name.as_str()
                )));
            }
            if !seen.insert(action.as_str()) {
                return Err(AppError::Validation(format!(
                    "event '{}' lists duplicate action '{action}'",
                    name.as_str()
                )));
            }
        }

        let action_field = action_field.and_then(|value| {
            let trimmed = value.trim().to_owned();
            (!trimmed.is_empty()).then_some(trimmed)
        });

        if !actions.is_empty() && action_field.is_none() {
            return Err(AppError::Validation(format!(
                "event '{}' declares actions but no action field",
                name.as_str()
            )));
        }

        Ok(Self {
            name,
            category: NonEmptyString::new(category)?,
            actions,
            action_field,
        })
    }

    /// Returns the event name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the catalog category.
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Returns the full action list; empty when the event has no
    /// secondary taxonomy.
    #[must_use]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Returns the record field actions are stored under, when the event
    /// has actions.
    #[must_use]
    pub fn action_field(&self) -> Option<&str> {
        self.action_field.as_deref()
    }

    /// Returns whether the event carries a secondary action taxonomy.
    #[must_use]
    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }
}

/// Immutable, ordered list of filterable events for one view.
///
/// Catalog content comes from an external collaborator and is trusted as
/// supplied; only structural validity of each entry is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCatalog {
    events: Vec<EventDefinition>,
}

impl EventCatalog {
    /// Creates a catalog, rejecting duplicate event names.
    pub fn new(events: Vec<EventDefinition>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for event in &events {
            if !seen.insert(event.name().to_owned()) {
                return Err(AppError::Validation(format!(
                    "catalog lists duplicate event '{}'",
                    event.name()
                )));
            }
        }

        Ok(Self { events })
    }

    /// Returns the catalog entries in supplied order.
    #[must_use]
    pub fn events(&self) -> &[EventDefinition] {
        &self.events
    }

    /// Finds one event by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|event| event.name() == name)
    }

    /// Returns the distinct categories in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut categories = Vec::new();
        for event in &self.events {
            if !categories.contains(&event.category()) {
                categories.push(event.category());
            }
        }
        categories
    }

    /// Returns whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
