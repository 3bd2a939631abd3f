use chrono::NaiveDate;

use crate::core::calendar::{MonthKey, month_label, next_month_start};
use crate::core::{Agenda, AgendaId, AgendaType};

/// Agendas shown beside the day column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgendaGroups {
    pub current_month: Option<Agenda>,
    pub next_month: Option<Agenda>,
    pub custom: Vec<Agenda>,
}

impl AgendaGroups {
    /// Copy/move destinations for an item living in `from`.
    pub fn copy_targets(&self, from: AgendaId) -> Vec<Agenda> {
        let mut targets: Vec<Agenda> = Vec::new();
        let candidates = self
            .current_month
            .iter()
            .chain(self.next_month.iter())
            .chain(self.custom.iter());
        for agenda in candidates {
            if agenda.id != from && !targets.iter().any(|t| t.id == agenda.id) {
                targets.push(agenda.clone());
            }
        }
        targets
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgendaView {
    focal: Option<NaiveDate>,
}

impl AgendaView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focal_date(&self) -> Option<NaiveDate> {
        self.focal
    }

    /// Move the focal date. True only when the calendar month changed,
    /// which is when the agendas need refetching.
    pub fn set_focal_date(&mut self, date: NaiveDate) -> bool {
        let changed = self.focal.map(MonthKey::of) != Some(MonthKey::of(date));
        self.focal = Some(date);
        changed
    }

    pub fn groups(&self, agendas: &[Agenda]) -> AgendaGroups {
        let Some(focal) = self.focal else {
            return AgendaGroups::default();
        };
        let monthly: Vec<&Agenda> = agendas
            .iter()
            .filter(|a| a.agenda_type == AgendaType::Monthly)
            .collect();
        let named = |label: String| {
            let label = label.to_lowercase();
            monthly.iter().find(|a| a.name.to_lowercase().contains(&label)).copied()
        };

        let current_month = named(month_label(focal)).or(monthly.first().copied());
        let next_month = named(month_label(next_month_start(focal)))
            .or(monthly.get(1).copied())
            .or(monthly.first().copied());

        AgendaGroups {
            current_month: current_month.cloned(),
            next_month: next_month.cloned(),
            custom: agendas
                .iter()
                .filter(|a| a.agenda_type == AgendaType::Custom)
                .cloned()
                .collect(),
        }
    }
}
