use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{checked_changes, checked_text};
use crate::Result;
use crate::core::{Collection, DayItem, DraftItem, Drafts, ItemChanges, ItemId, ItemState, Row};
use crate::state::{Store, Toasts};
use crate::sync::{Gateway, MutationEngine, Outcome, ReorderCoordinator, ReorderOutcome, Skip};

/// Day items for the loaded window, keyed by date.
pub struct DayItems<G> {
    gateway: Arc<G>,
    engine: MutationEngine<DayItem>,
    reorder: ReorderCoordinator<DayItem>,
    drafts: Mutex<Drafts<NaiveDate>>,
    epoch: AtomicU64,
}

impl<G: Gateway> DayItems<G> {
    pub fn new(gateway: Arc<G>, toasts: Arc<Toasts>) -> Self {
        let store = Arc::new(Store::new(Collection::new()));
        Self {
            gateway,
            engine: MutationEngine::new(Arc::clone(&store), Arc::clone(&toasts)),
            reorder: ReorderCoordinator::new(store, toasts, "Failed to save order, restoring…"),
            drafts: Mutex::new(Drafts::new()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<Store<Collection<DayItem>>> {
        self.engine.store()
    }

    pub fn items(&self, day: NaiveDate) -> Vec<DayItem> {
        self.store().read(|c| c.items(day).to_vec())
    }

    /// Replace the cache with exactly `days`. A response that lands after a
    /// later fetch was issued is discarded.
    pub async fn fetch(&self, days: &[NaiveDate]) -> Result<()> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let fetched = self.gateway.fetch_day_items(days).await?;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            log::debug!("Discarding stale day items for {:?}", days);
            return Ok(());
        }
        self.store().update(|c| c.reset(days, fetched));
        log::debug!("Loaded day items for {:?}", days);
        Ok(())
    }

    /// Refetch whatever days are currently loaded.
    pub async fn reload(&self) -> Result<()> {
        let days: Vec<NaiveDate> = self.store().read(|c| c.keys().collect());
        if days.is_empty() {
            return Ok(());
        }
        self.fetch(&days).await
    }

    pub async fn create(&self, day: NaiveDate, text: &str) -> Outcome<DayItem> {
        let text = match checked_text(text) {
            Ok(text) => text,
            Err(skip) => return Outcome::Skipped(skip),
        };
        self.engine
            .confirm(self.gateway.create_day_item(day, text), "Failed to add item", |c, item| {
                c.append(item.clone())
            })
            .await
    }

    pub async fn update(&self, id: ItemId, changes: ItemChanges) -> Outcome<DayItem> {
        let changes = match checked_changes(changes) {
            Ok(changes) => changes,
            Err(skip) => return Outcome::Skipped(skip),
        };
        self.engine
            .edit(
                id,
                &changes,
                self.gateway.update_day_item(id, &changes),
                "Failed to update item, please try again",
            )
            .await
    }

    pub async fn set_state(&self, id: ItemId, state: ItemState) -> Outcome<DayItem> {
        self.update(id, ItemChanges::state(state)).await
    }

    /// Checkbox click.
    pub async fn toggle(&self, id: ItemId) -> Outcome<DayItem> {
        let Some(state) = self.store().read(|c| c.get(id).map(|i| i.state)) else {
            return Outcome::Skipped(Skip::NotFound);
        };
        self.set_state(id, state.toggled()).await
    }

    /// Removed locally once the server confirms.
    pub async fn delete(&self, id: ItemId) -> Outcome<()> {
        self.engine
            .confirm_on(id, self.gateway.delete_day_item(id), "Failed to delete item", |c, _| {
                c.remove(id);
            })
            .await
    }

    /// The copy shows up locally only when `day` is loaded.
    pub async fn copy(&self, id: ItemId, day: NaiveDate) -> Outcome<DayItem> {
        self.engine
            .confirm(self.gateway.copy_day_item(id, day), "Failed to copy item", |c, copy| {
                if c.is_loaded(copy.day) {
                    c.append(copy.clone());
                }
            })
            .await
    }

    pub async fn move_to(&self, id: ItemId, day: NaiveDate) -> Outcome<DayItem> {
        self.engine
            .confirm_on(id, self.gateway.move_day_item(id, day), "Failed to move item", |c, moved| {
                c.remove(id);
                if c.is_loaded(moved.day) {
                    c.append(moved.clone());
                }
            })
            .await
    }

    /// Marks the source item snoozed and adds the new item if its day is loaded.
    pub async fn snooze(&self, id: ItemId, day: NaiveDate) -> Outcome<DayItem> {
        self.engine
            .confirm_on(
                id,
                self.gateway.snooze_day_item(id, day),
                "Failed to snooze item",
                |c, snoozed| {
                    c.update_with(id, |item| item.state = ItemState::Snoozed);
                    if c.is_loaded(snoozed.day) {
                        c.append(snoozed.clone());
                    }
                },
            )
            .await
    }

    pub fn drag_start(&self, id: ItemId) -> bool {
        self.reorder.drag_start(id)
    }

    pub fn drag_over(&self, day: NaiveDate, index: usize) {
        self.reorder.drag_over(day, index);
    }

    pub async fn drag_end(&self) -> ReorderOutcome {
        let gateway = &self.gateway;
        self.reorder
            .drag_end(
                |day, order| async move { gateway.reorder_day_items(day, &order).await },
                |_| self.reload(),
            )
            .await
    }

    pub fn draft(&self, day: NaiveDate) -> DraftItem<NaiveDate> {
        self.drafts.lock().unwrap_or_else(PoisonError::into_inner).get(day)
    }

    pub fn set_draft(&self, day: NaiveDate, text: impl Into<String>) {
        self.drafts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_text(day, text);
    }

    /// Blur or Enter on the draft row. The draft is cleared only once the
    /// item exists.
    pub async fn commit_draft(&self, day: NaiveDate) -> Outcome<DayItem> {
        let draft = self.draft(day);
        let outcome = self.create(day, &draft.text).await;
        if outcome.is_done() {
            self.drafts.lock().unwrap_or_else(PoisonError::into_inner).clear(day);
        }
        outcome
    }

    /// Rendered rows for `day`: its items followed by the draft.
    pub fn with_rows<R>(
        &self,
        day: NaiveDate,
        f: impl FnOnce(&[Row<'_, DayItem, NaiveDate>]) -> R,
    ) -> R {
        let drafts = self.drafts.lock().unwrap_or_else(PoisonError::into_inner);
        self.store().read(|c| f(&drafts.rows(day, c.items(day))))
    }
}
