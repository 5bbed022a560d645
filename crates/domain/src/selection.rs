use std::collections::{BTreeMap, BTreeSet};

use eventsift_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::catalog::EventDefinition;

/// Per-event action constraint: the record field actions live under, plus
/// the selected subset of actions.
///
/// A filter is only ever a strict, non-empty subset of the event's full
/// action list; "all actions" and "no actions" are normalized away by the
/// toggle transforms on [`EventSelection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFilter {
    action_field: String,
    actions: BTreeSet<String>,
}

impl ActionFilter {
    /// Creates an action filter, rejecting an empty action set.
    pub fn new(action_field: impl Into<String>, actions: BTreeSet<String>) -> AppResult<Self> {
        if actions.is_empty() {
            return Err(AppError::Validation(
                "action filter must select at least one action".to_owned(),
            ));
        }

        Ok(Self {
            action_field: action_field.into(),
            actions,
        })
    }

    /// Returns the record field the actions are matched against.
    #[must_use]
    pub fn action_field(&self) -> &str {
        &self.action_field
    }

    /// Returns the selected actions.
    #[must_use]
    pub fn actions(&self) -> &BTreeSet<String> {
        &self.actions
    }
}

/// How one event participates in a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStatus<'a> {
    /// Event is not selected at any level.
    NotSelected,
    /// Event is selected with all of its actions implicitly included.
    AllActions,
    /// Event is selected with a strict subset of its actions.
    Actions(&'a BTreeSet<String>),
}

/// The two-level (event, action) selection driving the analytics query.
///
/// Membership in `event_names` and presence in `event_actions` jointly
/// encode the three-way state per event: absent everywhere (not selected),
/// name only (all actions), or name plus filter (partial). An
/// `event_actions` key is always also an `event_names` member.
///
/// Values are immutable: every transform takes `&self` and returns a new
/// selection, so callers replace them wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSelection {
    event_names: BTreeSet<String>,
    event_actions: BTreeMap<String, ActionFilter>,
}

impl EventSelection {
    /// Returns the empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the selected event names.
    #[must_use]
    pub fn event_names(&self) -> &BTreeSet<String> {
        &self.event_names
    }

    /// Returns the per-event action filters.
    #[must_use]
    pub fn action_filters(&self) -> &BTreeMap<String, ActionFilter> {
        &self.event_actions
    }

    /// Returns whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_names.is_empty()
    }

    /// Resolves the three-way per-event state in one place, so display
    /// callers never probe the two collections separately.
    #[must_use]
    pub fn status_of(&self, name: &str) -> SelectionStatus<'_> {
        if let Some(filter) = self.event_actions.get(name) {
            return SelectionStatus::Actions(filter.actions());
        }
        if self.event_names.contains(name) {
            return SelectionStatus::AllActions;
        }
        SelectionStatus::NotSelected
    }

    /// Flips an event at the parent level.
    ///
    /// Deselecting drops the name and any action filter under it.
    /// Selecting the parent restores "all actions" semantics, clearing a
    /// prior partial filter rather than keeping it.
    #[must_use]
    pub fn toggle_event(&self, event: &EventDefinition) -> Self {
        let mut next = self.clone();
        if next.event_names.remove(event.name()) {
            next.event_actions.remove(event.name());
        } else {
            next.event_names.insert(event.name().to_owned());
            next.event_actions.remove(event.name());
        }
        next
    }

    /// Flips one action under an event.
    ///
    /// The resulting action set decides the outcome, checked in order:
    /// equal to the full list collapses to a full-event selection, empty
    /// removes the event entirely, anything else is recorded as a partial
    /// filter. An action outside the event's taxonomy, or an event without
    /// one, is a no-op.
    #[must_use]
    pub fn toggle_action(&self, event: &EventDefinition, action: &str) -> Self {
        let Some(action_field) = event.action_field() else {
            return self.clone();
        };
        if !event.actions().iter().any(|known| known == action) {
            return self.clone();
        }

        let mut actions: BTreeSet<String> = self
            .event_actions
            .get(event.name())
            .map(|filter| filter.actions().clone())
            .unwrap_or_default();
        if !actions.remove(action) {
            actions.insert(action.to_owned());
        }

        let mut next = self.clone();
        if actions.len() == event.actions().len() {
            // All actions picked individually converges on the same value
            // as selecting the parent row.
            next.event_actions.remove(event.name());
            next.event_names.insert(event.name().to_owned());
        } else if actions.is_empty() {
            next.event_names.remove(event.name());
            next.event_actions.remove(event.name());
        } else {
            let filter = ActionFilter {
                action_field: action_field.to_owned(),
                actions,
            };
            next.event_actions.insert(event.name().to_owned(), filter);
            next.event_names.insert(event.name().to_owned());
        }
        next
    }

    /// Returns the empty selection.
    #[must_use]
    pub fn clear(&self) -> Self {
        Self::default()
    }
}
