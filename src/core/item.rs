use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

use super::agenda::AgendaId;

/// Longest item text the planner accepts.
pub const ITEM_TEXT_MAX_LENGTH: usize = 64;

/// Server-assigned item identifier. Drafts never carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Todo,
    Completed,
    Snoozed,
    Dropped,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Completed => "completed",
            Self::Snoozed => "snoozed",
            Self::Dropped => "dropped",
        }
    }

    /// State after clicking the checkbox. Anything that is not completed becomes completed.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Completed => Self::Todo,
            _ => Self::Completed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Todo)
    }
}

/// Something held in a [`Collection`](super::collection::Collection): it has an id
/// and lives in exactly one container.
pub trait Entity: Clone + PartialEq + fmt::Debug {
    type Id: Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display;
    type Key: Copy + Eq + Hash + Ord + fmt::Debug;

    fn id(&self) -> Self::Id;
    fn key(&self) -> Self::Key;
}

/// A partial change applied optimistically to an entity before the server confirms it.
pub trait Patch<E> {
    /// Whether the patch would blank out a required text field.
    fn is_blank(&self) -> bool;
    fn apply(&self, entity: &mut E);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayItem {
    pub id: ItemId,
    pub text: String,
    pub state: ItemState,
    pub index: i64,
    pub day: NaiveDate,
}

impl Entity for DayItem {
    type Id = ItemId;
    type Key = NaiveDate;

    fn id(&self) -> ItemId {
        self.id
    }

    fn key(&self) -> NaiveDate {
        self.day
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub id: ItemId,
    pub text: String,
    pub state: ItemState,
    pub index: i64,
    pub agenda_id: AgendaId,
}

impl Entity for AgendaItem {
    type Id = ItemId;
    type Key = AgendaId;

    fn id(&self) -> ItemId {
        self.id
    }

    fn key(&self) -> AgendaId {
        self.agenda_id
    }
}

/// Inline edits shared by day and agenda items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ItemState>,
}

impl ItemChanges {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            state: None,
        }
    }

    pub fn state(state: ItemState) -> Self {
        Self {
            text: None,
            state: Some(state),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.state.is_none()
    }
}

impl Patch<DayItem> for ItemChanges {
    fn is_blank(&self) -> bool {
        self.text.as_deref().is_some_and(|t| t.trim().is_empty())
    }

    fn apply(&self, item: &mut DayItem) {
        if let Some(text) = &self.text {
            item.text = text.clone();
        }
        if let Some(state) = self.state {
            item.state = state;
        }
    }
}

impl Patch<AgendaItem> for ItemChanges {
    fn is_blank(&self) -> bool {
        <Self as Patch<DayItem>>::is_blank(self)
    }

    fn apply(&self, item: &mut AgendaItem) {
        if let Some(text) = &self.text {
            item.text = text.clone();
        }
        if let Some(state) = self.state {
            item.state = state;
        }
    }
}

/// Trimmed text for a new item, or `None` when it must be dropped locally.
pub fn accept_text(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > ITEM_TEXT_MAX_LENGTH {
        None
    } else {
        Some(trimmed)
    }
}
