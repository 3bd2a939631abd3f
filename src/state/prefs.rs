use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::storage::{KeyValueStore, keys};
use crate::core::agenda::AgendaId;
use crate::core::calendar::{format_date, parse_date};

/// Focal date remembered across runs.
pub struct SelectedDate {
    storage: Arc<dyn KeyValueStore>,
}

impl SelectedDate {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Stored date, or `today` when nothing usable is stored.
    pub fn load(&self, today: NaiveDate) -> NaiveDate {
        self.storage
            .get(keys::SELECTED_DATE)
            .and_then(|raw| parse_date(&raw))
            .unwrap_or(today)
    }

    pub fn save(&self, date: NaiveDate) {
        self.storage.set(keys::SELECTED_DATE, &format_date(date));
    }
}

/// Which agendas the user folded away.
pub struct CollapsedAgendas {
    storage: Arc<dyn KeyValueStore>,
    collapsed: BTreeMap<AgendaId, bool>,
}

impl CollapsedAgendas {
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let collapsed = storage.get_json(keys::COLLAPSED_AGENDAS, BTreeMap::new());
        Self { storage, collapsed }
    }

    pub fn is_collapsed(&self, agenda: AgendaId) -> bool {
        self.collapsed.get(&agenda).copied().unwrap_or(false)
    }

    /// Flip one agenda and persist. Returns the new collapsed flag.
    pub fn toggle(&mut self, agenda: AgendaId) -> bool {
        let collapsed = !self.is_collapsed(agenda);
        self.collapsed.insert(agenda, collapsed);
        self.storage.set_json(keys::COLLAPSED_AGENDAS, &self.collapsed);
        collapsed
    }
}
