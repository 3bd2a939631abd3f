use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::Result;
use crate::core::{
    Agenda, AgendaAction, AgendaChanges, AgendaId, AgendaItem, AgendaQuery, DayItem, ItemChanges,
    ItemId,
};

/// Typed request/response contract with the planner API.
///
/// No caching and no retries: a failed call returns its error and the
/// caller decides what to do with local state.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    // Day items
    async fn fetch_day_items(
        &self,
        days: &[NaiveDate],
    ) -> Result<BTreeMap<NaiveDate, Vec<DayItem>>>;
    async fn create_day_item(&self, day: NaiveDate, text: &str) -> Result<DayItem>;
    async fn update_day_item(&self, id: ItemId, changes: &ItemChanges) -> Result<DayItem>;
    async fn delete_day_item(&self, id: ItemId) -> Result<()>;
    async fn reorder_day_items(&self, day: NaiveDate, ordered: &[ItemId]) -> Result<()>;
    async fn copy_day_item(&self, id: ItemId, day: NaiveDate) -> Result<DayItem>;
    async fn move_day_item(&self, id: ItemId, day: NaiveDate) -> Result<DayItem>;
    /// Marks the source item snoozed and returns the new item on `day`.
    async fn snooze_day_item(&self, id: ItemId, day: NaiveDate) -> Result<DayItem>;

    // Agenda items
    async fn fetch_agenda_items(
        &self,
        agendas: &[AgendaId],
    ) -> Result<BTreeMap<AgendaId, Vec<AgendaItem>>>;
    async fn create_agenda_item(&self, agenda: AgendaId, text: &str) -> Result<AgendaItem>;
    async fn update_agenda_item(
        &self,
        id: ItemId,
        agenda: AgendaId,
        changes: &ItemChanges,
    ) -> Result<AgendaItem>;
    async fn delete_agenda_item(&self, id: ItemId) -> Result<()>;
    async fn reorder_agenda_items(&self, agenda: AgendaId, ordered: &[ItemId]) -> Result<()>;
    async fn copy_agenda_item(&self, id: ItemId, agenda: AgendaId) -> Result<AgendaItem>;
    async fn move_agenda_item(&self, id: ItemId, agenda: AgendaId) -> Result<AgendaItem>;

    // Agendas
    async fn list_agendas(&self, query: &AgendaQuery) -> Result<Vec<Agenda>>;
    async fn create_agenda(&self, name: &str) -> Result<Agenda>;
    async fn update_agenda(&self, id: AgendaId, changes: &AgendaChanges) -> Result<Agenda>;
    async fn delete_agenda(&self, id: AgendaId) -> Result<()>;
    async fn reorder_agendas(&self, ordered: &[AgendaId]) -> Result<()>;
    /// Server rewrites several items; callers refetch the agenda afterwards.
    async fn run_agenda_action(&self, id: AgendaId, action: AgendaAction) -> Result<()>;
}
