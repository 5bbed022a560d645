use crate::catalog::EventDefinition;
use crate::selection::EventSelection;

/// One open run of the selector: a draft selection mutated by toggles,
/// diffed against the committed value when the selector is dismissed.
///
/// The session exists only while the selector is open. Every dismissal
/// path (explicit close, click-away) ends it through [`FilterSession::close`],
/// so the diff-and-commit rule cannot be bypassed by one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSession {
    committed: EventSelection,
    draft: EventSelection,
}

impl FilterSession {
    /// Opens a session; the draft starts as a copy of the committed value.
    #[must_use]
    pub fn open(committed: EventSelection) -> Self {
        Self {
            draft: committed.clone(),
            committed,
        }
    }

    /// Returns the in-progress draft.
    #[must_use]
    pub fn draft(&self) -> &EventSelection {
        &self.draft
    }

    /// Returns the committed value the session opened with.
    #[must_use]
    pub fn committed(&self) -> &EventSelection {
        &self.committed
    }

    /// Applies a parent-level toggle to the draft.
    pub fn toggle_event(&mut self, event: &EventDefinition) {
        self.draft = self.draft.toggle_event(event);
    }

    /// Applies an action-level toggle to the draft.
    pub fn toggle_action(&mut self, event: &EventDefinition, action: &str) {
        self.draft = self.draft.toggle_action(event, action);
    }

    /// Applies the catalog's "all items" sentinel: the draft becomes the
    /// empty selection, overriding whatever was picked earlier in this
    /// session. Last click wins.
    pub fn select_none(&mut self) {
        self.draft = self.draft.clear();
    }

    /// Ends the session. Returns the draft as the new committed value when
    /// it differs structurally from the value the session opened with, and
    /// `None` when the user ended up where they started.
    #[must_use]
    pub fn close(self) -> Option<EventSelection> {
        if self.draft == self.committed {
            None
        } else {
            Some(self.draft)
        }
    }
}
