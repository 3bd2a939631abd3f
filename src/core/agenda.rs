use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::item::{Entity, Patch};

pub const AGENDA_NAME_MAX_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgendaId(pub u64);

impl fmt::Display for AgendaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgendaType {
    /// One per month, created by the server.
    Monthly,
    Custom,
    /// Hidden custom agenda.
    Archived,
}

impl AgendaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Custom => "custom",
            Self::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agenda {
    pub id: AgendaId,
    pub name: String,
    pub agenda_type: AgendaType,
    pub index: i64,
    #[serde(default)]
    pub todo_count: u32,
    #[serde(default)]
    pub completed_count: u32,
}

impl Entity for Agenda {
    type Id = AgendaId;
    /// Agendas form a single ordered list.
    type Key = ();

    fn id(&self) -> AgendaId {
        self.id
    }

    fn key(&self) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgendaChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agenda_type: Option<AgendaType>,
}

impl AgendaChanges {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            agenda_type: None,
        }
    }

    pub fn retype(agenda_type: AgendaType) -> Self {
        Self {
            name: None,
            agenda_type: Some(agenda_type),
        }
    }
}

impl Patch<Agenda> for AgendaChanges {
    fn is_blank(&self) -> bool {
        self.name.as_deref().is_some_and(|n| n.trim().is_empty())
    }

    fn apply(&self, agenda: &mut Agenda) {
        if let Some(name) = &self.name {
            agenda.name = name.clone();
        }
        if let Some(agenda_type) = self.agenda_type {
            agenda.agenda_type = agenda_type;
        }
    }
}

/// Trimmed name for a new or renamed agenda, or `None` when it is empty or too long.
pub fn accept_name(name: &str) -> Option<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > AGENDA_NAME_MAX_LENGTH {
        None
    } else {
        Some(trimmed)
    }
}

/// Bulk server-side operations on one agenda's items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgendaAction {
    DeleteFinishedItems,
    SortItemsByState,
}

impl AgendaAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DeleteFinishedItems => "Delete finished items",
            Self::SortItemsByState => "Sort items by state",
        }
    }
}

/// Filter for the agenda list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaQuery {
    pub agenda_types: Vec<AgendaType>,
    pub selected_day: Option<NaiveDate>,
    pub with_counts: bool,
}

impl AgendaQuery {
    /// Monthly agendas around `day` plus every custom agenda.
    pub fn planner(day: NaiveDate) -> Self {
        Self {
            agenda_types: vec![AgendaType::Monthly, AgendaType::Custom],
            selected_day: Some(day),
            with_counts: false,
        }
    }

    /// Everything the settings page manages, with item counts.
    pub fn settings() -> Self {
        Self {
            agenda_types: vec![AgendaType::Custom, AgendaType::Archived],
            selected_day: None,
            with_counts: true,
        }
    }
}
