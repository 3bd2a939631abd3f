use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{checked_changes, checked_text};
use crate::Result;
use crate::core::{
    Agenda, AgendaAction, AgendaId, AgendaItem, AgendaQuery, Collection, DraftItem, Drafts,
    ItemChanges, ItemId, ItemState, Row,
};
use crate::state::{Store, Toasts};
use crate::sync::{Gateway, MutationEngine, Outcome, ReorderCoordinator, ReorderOutcome, Skip};

/// Agenda items for the agendas shown next to the day view, plus the
/// agenda list they belong to.
pub struct AgendaItems<G> {
    gateway: Arc<G>,
    agendas: Store<Vec<Agenda>>,
    engine: MutationEngine<AgendaItem>,
    reorder: ReorderCoordinator<AgendaItem>,
    drafts: Mutex<Drafts<AgendaId>>,
    toasts: Arc<Toasts>,
    epoch: AtomicU64,
}

impl<G: Gateway> AgendaItems<G> {
    pub fn new(gateway: Arc<G>, toasts: Arc<Toasts>) -> Self {
        let store = Arc::new(Store::new(Collection::new()));
        Self {
            gateway,
            agendas: Store::new(Vec::new()),
            engine: MutationEngine::new(Arc::clone(&store), Arc::clone(&toasts)),
            reorder: ReorderCoordinator::new(
                store,
                Arc::clone(&toasts),
                "Failed to save agenda order, restoring…",
            ),
            drafts: Mutex::new(Drafts::new()),
            toasts,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<Store<Collection<AgendaItem>>> {
        self.engine.store()
    }

    pub fn agendas(&self) -> &Store<Vec<Agenda>> {
        &self.agendas
    }

    pub fn items(&self, agenda: AgendaId) -> Vec<AgendaItem> {
        self.store().read(|c| c.items(agenda).to_vec())
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Load monthly and custom agendas around `day`, then their items.
    /// Superseded responses are discarded.
    pub async fn load(&self, day: NaiveDate) -> Result<()> {
        let epoch = self.next_epoch();
        let agendas = self.gateway.list_agendas(&AgendaQuery::planner(day)).await?;
        let ids: Vec<AgendaId> = agendas.iter().map(|a| a.id).collect();
        let fetched = if ids.is_empty() {
            Default::default()
        } else {
            self.gateway.fetch_agenda_items(&ids).await?
        };
        if !self.is_current(epoch) {
            log::debug!("Discarding stale agendas for {}", day);
            return Ok(());
        }
        self.agendas.replace(agendas);
        self.store().update(|c| c.reset(&ids, fetched));
        log::debug!("Loaded {} agendas for {}", ids.len(), day);
        Ok(())
    }

    /// Refetch items of the loaded agendas.
    pub async fn reload(&self) -> Result<()> {
        let ids: Vec<AgendaId> = self.store().read(|c| c.keys().collect());
        if ids.is_empty() {
            return Ok(());
        }
        let epoch = self.next_epoch();
        let fetched = self.gateway.fetch_agenda_items(&ids).await?;
        if !self.is_current(epoch) {
            log::debug!("Discarding stale items for {:?}", ids);
            return Ok(());
        }
        self.store().update(|c| c.reset(&ids, fetched));
        Ok(())
    }

    /// Refetch one agenda, if it is still loaded when the response lands.
    pub async fn reload_agenda(&self, agenda: AgendaId) -> Result<()> {
        let fetched = self.gateway.fetch_agenda_items(&[agenda]).await?;
        self.store().update(|c| {
            if c.is_loaded(agenda) {
                c.merge(&[agenda], fetched);
            }
        });
        Ok(())
    }

    pub async fn create(&self, agenda: AgendaId, text: &str) -> Outcome<AgendaItem> {
        let text = match checked_text(text) {
            Ok(text) => text,
            Err(skip) => return Outcome::Skipped(skip),
        };
        self.engine
            .confirm(
                self.gateway.create_agenda_item(agenda, text),
                "Failed to add item",
                |c, item| c.append(item.clone()),
            )
            .await
    }

    pub async fn update(&self, id: ItemId, changes: ItemChanges) -> Outcome<AgendaItem> {
        let changes = match checked_changes(changes) {
            Ok(changes) => changes,
            Err(skip) => return Outcome::Skipped(skip),
        };
        let Some(agenda) = self.store().read(|c| c.get(id).map(|i| i.agenda_id)) else {
            return Outcome::Skipped(Skip::NotFound);
        };
        self.engine
            .edit(
                id,
                &changes,
                self.gateway.update_agenda_item(id, agenda, &changes),
                "Failed to update item, please try again",
            )
            .await
    }

    pub async fn set_state(&self, id: ItemId, state: ItemState) -> Outcome<AgendaItem> {
        self.update(id, ItemChanges::state(state)).await
    }

    pub async fn toggle(&self, id: ItemId) -> Outcome<AgendaItem> {
        let Some(state) = self.store().read(|c| c.get(id).map(|i| i.state)) else {
            return Outcome::Skipped(Skip::NotFound);
        };
        self.set_state(id, state.toggled()).await
    }

    pub async fn delete(&self, id: ItemId) -> Outcome<()> {
        self.engine
            .confirm_on(id, self.gateway.delete_agenda_item(id), "Failed to delete item", |c, _| {
                c.remove(id);
            })
            .await
    }

    pub async fn copy(&self, id: ItemId, agenda: AgendaId) -> Outcome<AgendaItem> {
        self.engine
            .confirm(self.gateway.copy_agenda_item(id, agenda), "Failed to copy item", |c, copy| {
                if c.is_loaded(copy.agenda_id) {
                    c.append(copy.clone());
                }
            })
            .await
    }

    /// Source removal and target insertion are published together.
    pub async fn move_to(&self, id: ItemId, agenda: AgendaId) -> Outcome<AgendaItem> {
        self.engine
            .confirm_on(
                id,
                self.gateway.move_agenda_item(id, agenda),
                "Failed to move item",
                |c, moved| {
                    c.remove(id);
                    if c.is_loaded(moved.agenda_id) {
                        c.append(moved.clone());
                    }
                },
            )
            .await
    }

    /// Bulk action on the server, then that agenda's items are refetched.
    pub async fn run_action(&self, agenda: AgendaId, action: AgendaAction) -> Outcome<()> {
        if let Err(e) = self.gateway.run_agenda_action(agenda, action).await {
            log::warn!("{} on agenda {} failed: {}", action.label(), agenda, e);
            self.toasts.show_error("Failed to perform action");
            return Outcome::Failed;
        }
        if let Err(e) = self.reload_agenda(agenda).await {
            log::warn!("Refetch of agenda {} after {} failed: {}", agenda, action.label(), e);
            self.toasts.show_error("Failed to perform action");
            return Outcome::Failed;
        }
        Outcome::Done(())
    }

    pub fn drag_start(&self, id: ItemId) -> bool {
        self.reorder.drag_start(id)
    }

    pub fn drag_over(&self, agenda: AgendaId, index: usize) {
        self.reorder.drag_over(agenda, index);
    }

    pub async fn drag_end(&self) -> ReorderOutcome {
        let gateway = &self.gateway;
        self.reorder
            .drag_end(
                |agenda, order| async move { gateway.reorder_agenda_items(agenda, &order).await },
                |_| self.reload(),
            )
            .await
    }

    pub fn draft(&self, agenda: AgendaId) -> DraftItem<AgendaId> {
        self.drafts.lock().unwrap_or_else(PoisonError::into_inner).get(agenda)
    }

    pub fn set_draft(&self, agenda: AgendaId, text: impl Into<String>) {
        self.drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_text(agenda, text);
    }

    pub async fn commit_draft(&self, agenda: AgendaId) -> Outcome<AgendaItem> {
        let draft = self.draft(agenda);
        let outcome = self.create(agenda, &draft.text).await;
        if outcome.is_done() {
            self.drafts.lock().unwrap_or_else(PoisonError::into_inner).clear(agenda);
        }
        outcome
    }

    pub fn with_rows<R>(
        &self,
        agenda: AgendaId,
        f: impl FnOnce(&[Row<'_, AgendaItem, AgendaId>]) -> R,
    ) -> R {
        let drafts = self.drafts.lock().unwrap_or_else(PoisonError::into_inner);
        self.store().read(|c| f(&drafts.rows(agenda, c.items(agenda))))
    }
}
