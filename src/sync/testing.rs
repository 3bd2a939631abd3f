//! Scripted in-memory server used by the protocol tests.

use chrono::NaiveDate;
use reqwest::StatusCode;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

use super::gateway::Gateway;
use crate::core::{
    Agenda, AgendaAction, AgendaChanges, AgendaId, AgendaItem, AgendaQuery, AgendaType, DayItem,
    ItemChanges, ItemId, ItemState, Patch,
};
use crate::{PlannerError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchDays(Vec<NaiveDate>),
    CreateDay(NaiveDate, String),
    UpdateDay(ItemId, ItemChanges),
    DeleteDay(ItemId),
    ReorderDays(NaiveDate, Vec<ItemId>),
    CopyDay(ItemId, NaiveDate),
    MoveDay(ItemId, NaiveDate),
    SnoozeDay(ItemId, NaiveDate),
    FetchAgendaItems(Vec<AgendaId>),
    CreateAgendaItem(AgendaId, String),
    UpdateAgendaItem(ItemId, AgendaId, ItemChanges),
    DeleteAgendaItem(ItemId),
    ReorderAgendaItems(AgendaId, Vec<ItemId>),
    CopyAgendaItem(ItemId, AgendaId),
    MoveAgendaItem(ItemId, AgendaId),
    ListAgendas(AgendaQuery),
    CreateAgenda(String),
    UpdateAgenda(AgendaId, AgendaChanges),
    DeleteAgenda(AgendaId),
    ReorderAgendas(Vec<AgendaId>),
    RunAgendaAction(AgendaId, AgendaAction),
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchDays(..) => "fetch_day_items",
            Self::CreateDay(..) => "create_day_item",
            Self::UpdateDay(..) => "update_day_item",
            Self::DeleteDay(..) => "delete_day_item",
            Self::ReorderDays(..) => "reorder_day_items",
            Self::CopyDay(..) => "copy_day_item",
            Self::MoveDay(..) => "move_day_item",
            Self::SnoozeDay(..) => "snooze_day_item",
            Self::FetchAgendaItems(..) => "fetch_agenda_items",
            Self::CreateAgendaItem(..) => "create_agenda_item",
            Self::UpdateAgendaItem(..) => "update_agenda_item",
            Self::DeleteAgendaItem(..) => "delete_agenda_item",
            Self::ReorderAgendaItems(..) => "reorder_agenda_items",
            Self::CopyAgendaItem(..) => "copy_agenda_item",
            Self::MoveAgendaItem(..) => "move_agenda_item",
            Self::ListAgendas(..) => "list_agendas",
            Self::CreateAgenda(..) => "create_agenda",
            Self::UpdateAgenda(..) => "update_agenda",
            Self::DeleteAgenda(..) => "delete_agenda",
            Self::ReorderAgendas(..) => "reorder_agendas",
            Self::RunAgendaAction(..) => "run_agenda_action",
        }
    }
}

#[derive(Debug, Default)]
struct Server {
    next_id: u64,
    days: BTreeMap<NaiveDate, Vec<DayItem>>,
    agenda_items: BTreeMap<AgendaId, Vec<AgendaItem>>,
    agendas: Vec<Agenda>,
}

impl Server {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn take_day_item(&mut self, id: ItemId) -> Option<DayItem> {
        for items in self.days.values_mut() {
            if let Some(pos) = items.iter().position(|i| i.id == id) {
                return Some(items.remove(pos));
            }
        }
        None
    }

    fn day_item_mut(&mut self, id: ItemId) -> Option<&mut DayItem> {
        self.days.values_mut().flatten().find(|i| i.id == id)
    }

    fn push_day(&mut self, mut item: DayItem) -> DayItem {
        let list = self.days.entry(item.day).or_default();
        item.index = list.len() as i64;
        list.push(item.clone());
        item
    }

    fn take_agenda_item(&mut self, id: ItemId) -> Option<AgendaItem> {
        for items in self.agenda_items.values_mut() {
            if let Some(pos) = items.iter().position(|i| i.id == id) {
                return Some(items.remove(pos));
            }
        }
        None
    }

    fn agenda_item_mut(&mut self, id: ItemId) -> Option<&mut AgendaItem> {
        self.agenda_items.values_mut().flatten().find(|i| i.id == id)
    }

    fn push_agenda_item(&mut self, mut item: AgendaItem) -> AgendaItem {
        let list = self.agenda_items.entry(item.agenda_id).or_default();
        item.index = list.len() as i64;
        list.push(item.clone());
        item
    }
}

fn not_found() -> PlannerError {
    PlannerError::from_status(StatusCode::NOT_FOUND, "not found".into())
}

fn reorder_by<T: Clone>(items: &mut Vec<T>, ordered: &[ItemId], id: impl Fn(&T) -> ItemId) {
    let mut sorted = Vec::with_capacity(items.len());
    for want in ordered {
        if let Some(item) = items.iter().find(|i| id(i) == *want) {
            sorted.push(item.clone());
        }
    }
    *items = sorted;
}

/// In-memory planner server that records every call.
#[derive(Debug, Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<&'static str>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    server: Mutex<Server>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn server(&self) -> std::sync::MutexGuard<'_, Server> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Scripting

    pub fn seed_day(&self, day: NaiveDate, texts: &[&str]) -> Vec<ItemId> {
        let mut server = self.server();
        texts
            .iter()
            .map(|text| {
                let id = ItemId(server.next_id());
                server.push_day(DayItem {
                    id,
                    text: text.to_string(),
                    state: ItemState::Todo,
                    index: 0,
                    day,
                });
                id
            })
            .collect()
    }

    pub fn seed_agenda(&self, name: &str, agenda_type: AgendaType) -> AgendaId {
        let mut server = self.server();
        let id = AgendaId(server.next_id());
        let index = server.agendas.len() as i64;
        server.agendas.push(Agenda {
            id,
            name: name.to_string(),
            agenda_type,
            index,
            todo_count: 0,
            completed_count: 0,
        });
        server.agenda_items.entry(id).or_default();
        id
    }

    pub fn seed_agenda_items(&self, agenda: AgendaId, texts: &[&str]) -> Vec<ItemId> {
        let mut server = self.server();
        texts
            .iter()
            .map(|text| {
                let id = ItemId(server.next_id());
                server.push_agenda_item(AgendaItem {
                    id,
                    text: text.to_string(),
                    state: ItemState::Todo,
                    index: 0,
                    agenda_id: agenda,
                });
                id
            })
            .collect()
    }

    pub fn set_agenda_item_state(&self, id: ItemId, state: ItemState) {
        if let Some(item) = self.server().agenda_item_mut(id) {
            item.state = state;
        }
    }

    /// Make every call of the named operation fail until [`FakeGateway::recover`].
    pub fn fail(&self, op: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(op);
    }

    /// Hold every call open after it is recorded until [`FakeGateway::release`].
    pub fn hold(&self) {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(gate);
    }

    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().unwrap_or_else(PoisonError::into_inner).take() {
            gate.add_permits(Semaphore::MAX_PERMITS);
        }
    }

    // Inspection

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.name() == op).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn server_day(&self, day: NaiveDate) -> Vec<DayItem> {
        self.server().days.get(&day).cloned().unwrap_or_default()
    }

    pub fn server_agenda_items(&self, agenda: AgendaId) -> Vec<AgendaItem> {
        self.server().agenda_items.get(&agenda).cloned().unwrap_or_default()
    }

    pub fn server_agendas(&self) -> Vec<Agenda> {
        self.server().agendas.clone()
    }

    async fn enter(&self, call: Call) -> Result<()> {
        let name = call.name();
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);

        let gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self.failing.lock().unwrap_or_else(PoisonError::into_inner).contains(name) {
            return Err(PlannerError::from_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{} failed", name),
            ));
        }
        Ok(())
    }
}

impl Gateway for FakeGateway {
    async fn fetch_day_items(
        &self,
        days: &[NaiveDate],
    ) -> Result<BTreeMap<NaiveDate, Vec<DayItem>>> {
        self.enter(Call::FetchDays(days.to_vec())).await?;
        let server = self.server();
        Ok(days
            .iter()
            .map(|d| (*d, server.days.get(d).cloned().unwrap_or_default()))
            .collect())
    }

    async fn create_day_item(&self, day: NaiveDate, text: &str) -> Result<DayItem> {
        self.enter(Call::CreateDay(day, text.to_string())).await?;
        let mut server = self.server();
        let id = ItemId(server.next_id());
        Ok(server.push_day(DayItem {
            id,
            text: text.to_string(),
            state: ItemState::Todo,
            index: 0,
            day,
        }))
    }

    async fn update_day_item(&self, id: ItemId, changes: &ItemChanges) -> Result<DayItem> {
        self.enter(Call::UpdateDay(id, changes.clone())).await?;
        let mut server = self.server();
        let item = server.day_item_mut(id).ok_or_else(not_found)?;
        Patch::<DayItem>::apply(changes, item);
        Ok(item.clone())
    }

    async fn delete_day_item(&self, id: ItemId) -> Result<()> {
        self.enter(Call::DeleteDay(id)).await?;
        self.server().take_day_item(id).map(|_| ()).ok_or_else(not_found)
    }

    async fn reorder_day_items(&self, day: NaiveDate, ordered: &[ItemId]) -> Result<()> {
        self.enter(Call::ReorderDays(day, ordered.to_vec())).await?;
        if let Some(items) = self.server().days.get_mut(&day) {
            reorder_by(items, ordered, |i| i.id);
        }
        Ok(())
    }

    async fn copy_day_item(&self, id: ItemId, day: NaiveDate) -> Result<DayItem> {
        self.enter(Call::CopyDay(id, day)).await?;
        let mut server = self.server();
        let source = server.day_item_mut(id).ok_or_else(not_found)?.clone();
        let new_id = ItemId(server.next_id());
        Ok(server.push_day(DayItem {
            id: new_id,
            state: ItemState::Todo,
            day,
            ..source
        }))
    }

    async fn move_day_item(&self, id: ItemId, day: NaiveDate) -> Result<DayItem> {
        self.enter(Call::MoveDay(id, day)).await?;
        let mut server = self.server();
        let source = server.take_day_item(id).ok_or_else(not_found)?;
        Ok(server.push_day(DayItem { day, ..source }))
    }

    async fn snooze_day_item(&self, id: ItemId, day: NaiveDate) -> Result<DayItem> {
        self.enter(Call::SnoozeDay(id, day)).await?;
        let mut server = self.server();
        let source = server.day_item_mut(id).ok_or_else(not_found)?;
        source.state = ItemState::Snoozed;
        let source = source.clone();
        let new_id = ItemId(server.next_id());
        Ok(server.push_day(DayItem {
            id: new_id,
            state: ItemState::Todo,
            day,
            ..source
        }))
    }

    async fn fetch_agenda_items(
        &self,
        agendas: &[AgendaId],
    ) -> Result<BTreeMap<AgendaId, Vec<AgendaItem>>> {
        self.enter(Call::FetchAgendaItems(agendas.to_vec())).await?;
        let server = self.server();
        Ok(agendas
            .iter()
            .map(|a| (*a, server.agenda_items.get(a).cloned().unwrap_or_default()))
            .collect())
    }

    async fn create_agenda_item(&self, agenda: AgendaId, text: &str) -> Result<AgendaItem> {
        self.enter(Call::CreateAgendaItem(agenda, text.to_string())).await?;
        let mut server = self.server();
        let id = ItemId(server.next_id());
        Ok(server.push_agenda_item(AgendaItem {
            id,
            text: text.to_string(),
            state: ItemState::Todo,
            index: 0,
            agenda_id: agenda,
        }))
    }

    async fn update_agenda_item(
        &self,
        id: ItemId,
        agenda: AgendaId,
        changes: &ItemChanges,
    ) -> Result<AgendaItem> {
        self.enter(Call::UpdateAgendaItem(id, agenda, changes.clone())).await?;
        let mut server = self.server();
        let item = server.agenda_item_mut(id).ok_or_else(not_found)?;
        Patch::<AgendaItem>::apply(changes, item);
        if let Some(text) = &changes.text {
            item.text = text.trim().to_string();
        }
        Ok(item.clone())
    }

    async fn delete_agenda_item(&self, id: ItemId) -> Result<()> {
        self.enter(Call::DeleteAgendaItem(id)).await?;
        self.server().take_agenda_item(id).map(|_| ()).ok_or_else(not_found)
    }

    async fn reorder_agenda_items(&self, agenda: AgendaId, ordered: &[ItemId]) -> Result<()> {
        self.enter(Call::ReorderAgendaItems(agenda, ordered.to_vec())).await?;
        if let Some(items) = self.server().agenda_items.get_mut(&agenda) {
            reorder_by(items, ordered, |i| i.id);
        }
        Ok(())
    }

    async fn copy_agenda_item(&self, id: ItemId, agenda: AgendaId) -> Result<AgendaItem> {
        self.enter(Call::CopyAgendaItem(id, agenda)).await?;
        let mut server = self.server();
        let source = server.agenda_item_mut(id).ok_or_else(not_found)?.clone();
        let new_id = ItemId(server.next_id());
        Ok(server.push_agenda_item(AgendaItem {
            id: new_id,
            agenda_id: agenda,
            ..source
        }))
    }

    async fn move_agenda_item(&self, id: ItemId, agenda: AgendaId) -> Result<AgendaItem> {
        self.enter(Call::MoveAgendaItem(id, agenda)).await?;
        let mut server = self.server();
        let source = server.take_agenda_item(id).ok_or_else(not_found)?;
        Ok(server.push_agenda_item(AgendaItem {
            agenda_id: agenda,
            ..source
        }))
    }

    async fn list_agendas(&self, query: &AgendaQuery) -> Result<Vec<Agenda>> {
        self.enter(Call::ListAgendas(query.clone())).await?;
        let server = self.server();
        Ok(server
            .agendas
            .iter()
            .filter(|a| query.agenda_types.contains(&a.agenda_type))
            .map(|a| {
                let mut agenda = a.clone();
                if query.with_counts {
                    let items = server.agenda_items.get(&a.id).map(Vec::as_slice).unwrap_or(&[]);
                    agenda.todo_count =
                        items.iter().filter(|i| i.state == ItemState::Todo).count() as u32;
                    agenda.completed_count =
                        items.iter().filter(|i| i.state == ItemState::Completed).count() as u32;
                }
                agenda
            })
            .collect())
    }

    async fn create_agenda(&self, name: &str) -> Result<Agenda> {
        self.enter(Call::CreateAgenda(name.to_string())).await?;
        Ok(self.push_agenda(name))
    }

    async fn update_agenda(&self, id: AgendaId, changes: &AgendaChanges) -> Result<Agenda> {
        self.enter(Call::UpdateAgenda(id, changes.clone())).await?;
        let mut server = self.server();
        let agenda = server.agendas.iter_mut().find(|a| a.id == id).ok_or_else(not_found)?;
        changes.apply(agenda);
        Ok(agenda.clone())
    }

    async fn delete_agenda(&self, id: AgendaId) -> Result<()> {
        self.enter(Call::DeleteAgenda(id)).await?;
        let mut server = self.server();
        let before = server.agendas.len();
        server.agendas.retain(|a| a.id != id);
        server.agenda_items.remove(&id);
        if server.agendas.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn reorder_agendas(&self, ordered: &[AgendaId]) -> Result<()> {
        self.enter(Call::ReorderAgendas(ordered.to_vec())).await?;
        let mut server = self.server();
        let mut sorted = Vec::new();
        for id in ordered {
            if let Some(agenda) = server.agendas.iter().find(|a| a.id == *id) {
                sorted.push(agenda.clone());
            }
        }
        let rest: Vec<Agenda> = server
            .agendas
            .iter()
            .filter(|a| !ordered.contains(&a.id))
            .cloned()
            .collect();
        sorted.extend(rest);
        server.agendas = sorted;
        Ok(())
    }

    async fn run_agenda_action(&self, id: AgendaId, action: AgendaAction) -> Result<()> {
        self.enter(Call::RunAgendaAction(id, action)).await?;
        let mut server = self.server();
        let items = server.agenda_items.get_mut(&id).ok_or_else(not_found)?;
        match action {
            AgendaAction::DeleteFinishedItems => {
                items.retain(|i| !matches!(i.state, ItemState::Completed | ItemState::Dropped));
            }
            AgendaAction::SortItemsByState => {
                items.sort_by_key(|i| !i.state.is_open());
            }
        }
        Ok(())
    }
}

impl FakeGateway {
    fn push_agenda(&self, name: &str) -> Agenda {
        let mut server = self.server();
        let id = AgendaId(server.next_id());
        let agenda = Agenda {
            id,
            name: name.to_string(),
            agenda_type: AgendaType::Custom,
            index: server.agendas.len() as i64,
            todo_count: 0,
            completed_count: 0,
        };
        server.agendas.push(agenda.clone());
        server.agenda_items.entry(id).or_default();
        agenda
    }
}
