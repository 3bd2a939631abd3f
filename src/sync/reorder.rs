use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::Result;
use crate::core::{Collection, Entity};
use crate::state::{Store, Toasts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// No drag in progress, or the order ended where it started.
    Unchanged,
    Committed,
    /// The commit failed and the scope was refetched.
    Restored,
    /// The commit failed and so did the refetch.
    RestoreFailed,
}

#[derive(Debug, Clone)]
struct Track<I> {
    baseline: Vec<I>,
    pending: Vec<I>,
}

#[derive(Debug, Clone, Copy)]
struct Drag<K, I> {
    key: K,
    id: I,
}

/// Turns a drag gesture into local reorders plus one remote commit.
///
/// Per-container bookkeeping lives here rather than in the store, so
/// recording a pending order never publishes anything.
pub struct ReorderCoordinator<E: Entity> {
    store: Arc<Store<Collection<E>>>,
    toasts: Arc<Toasts>,
    failure: &'static str,
    tracks: Mutex<HashMap<E::Key, Track<E::Id>>>,
    drag: Mutex<Option<Drag<E::Key, E::Id>>>,
}

impl<E: Entity> ReorderCoordinator<E> {
    pub fn new(
        store: Arc<Store<Collection<E>>>,
        toasts: Arc<Toasts>,
        failure: &'static str,
    ) -> Self {
        Self {
            store,
            toasts,
            failure,
            tracks: Mutex::new(HashMap::new()),
            drag: Mutex::new(None),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn baseline(&self, key: E::Key) -> Option<Vec<E::Id>> {
        self.tracks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map(|t| t.baseline.clone())
    }

    pub fn pending(&self, key: E::Key) -> Option<Vec<E::Id>> {
        self.tracks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map(|t| t.pending.clone())
    }

    /// Start dragging `id`. Returns false if it is not in the cache.
    pub fn drag_start(&self, id: E::Id) -> bool {
        let located = self
            .store
            .read(|c| c.locate(id).map(|(key, _)| (key, c.order(key))));
        let Some((key, order)) = located else {
            return false;
        };
        self.tracks.lock().unwrap_or_else(PoisonError::into_inner).insert(
            key,
            Track {
                baseline: order.clone(),
                pending: order,
            },
        );
        *self.drag.lock().unwrap_or_else(PoisonError::into_inner) = Some(Drag { key, id });
        true
    }

    /// The dragged entity hovers over `index` of `key`. Only reorders
    /// within the container the drag started in.
    pub fn drag_over(&self, key: E::Key, index: usize) {
        let Some(drag) = *self.drag.lock().unwrap_or_else(PoisonError::into_inner) else {
            return;
        };
        if drag.key != key {
            return;
        }
        let moved = self.store.update(|c| c.move_within(key, drag.id, index));
        if !moved {
            return;
        }
        let order = self.store.read(|c| c.order(key));
        let mut tracks = self.tracks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(track) = tracks.get_mut(&key) {
            track.pending = order;
        }
    }

    pub fn cancel(&self) {
        self.drag.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Finish the gesture. `commit` sends the full order for the container;
    /// when it fails `restore` refetches the container from the server.
    pub async fn drag_end<C, CF, R, RF>(&self, commit: C, restore: R) -> ReorderOutcome
    where
        C: FnOnce(E::Key, Vec<E::Id>) -> CF,
        CF: Future<Output = Result<()>>,
        R: FnOnce(E::Key) -> RF,
        RF: Future<Output = Result<()>>,
    {
        let Some(drag) = self.drag.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return ReorderOutcome::Unchanged;
        };
        let key = drag.key;
        let pending = {
            let tracks = self.tracks.lock().unwrap_or_else(PoisonError::into_inner);
            match tracks.get(&key) {
                Some(track) if track.pending != track.baseline => track.pending.clone(),
                _ => return ReorderOutcome::Unchanged,
            }
        };

        log::debug!("Committing order of {:?} ({} entries)", key, pending.len());
        match commit(key, pending.clone()).await {
            Ok(()) => {
                let mut tracks = self.tracks.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(track) = tracks.get_mut(&key) {
                    track.baseline = pending;
                }
                ReorderOutcome::Committed
            }
            Err(e) => {
                log::warn!("Reorder of {:?} failed, refetching: {}", key, e);
                self.toasts.show_error(self.failure);
                self.tracks.lock().unwrap_or_else(PoisonError::into_inner).remove(&key);
                match restore(key).await {
                    Ok(()) => ReorderOutcome::Restored,
                    Err(e) => {
                        log::error!("Refetch of {:?} after failed reorder: {}", key, e);
                        ReorderOutcome::RestoreFailed
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlannerError;
    use crate::core::{AgendaId, AgendaItem, ItemId, ItemState};
    use std::collections::BTreeMap;

    const AGENDA: AgendaId = AgendaId(3);

    fn agenda_item(id: u64) -> AgendaItem {
        AgendaItem {
            id: ItemId(id),
            text: format!("item {}", id),
            state: ItemState::Todo,
            index: id as i64,
            agenda_id: AGENDA,
        }
    }

    fn coordinator(n: u64) -> ReorderCoordinator<AgendaItem> {
        let mut collection = Collection::new();
        for id in 1..=n {
            collection.append(agenda_item(id));
        }
        ReorderCoordinator::new(
            Arc::new(Store::new(collection)),
            Arc::new(Toasts::default()),
            "Failed to save agenda order, restoring…",
        )
    }

    async fn no_commit() -> Result<()> {
        unreachable!("unchanged order committed")
    }

    async fn no_refetch(_: AgendaId) -> Result<()> {
        unreachable!("refetched")
    }

    fn ids(raw: &[u64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId).collect()
    }

    #[tokio::test]
    async fn one_commit_per_gesture_with_full_order() {
        let coordinator = coordinator(5);
        let sent = Mutex::new(Vec::new());

        assert!(coordinator.drag_start(ItemId(3)));
        coordinator.drag_over(AGENDA, 1);
        coordinator.drag_over(AGENDA, 0);
        assert_eq!(coordinator.store.read(|c| c.order(AGENDA)), ids(&[3, 1, 2, 4, 5]));

        let outcome = coordinator
            .drag_end(
                |key, order| {
                    sent.lock().unwrap().push((key, order));
                    async { Ok(()) }
                },
                no_refetch,
            )
            .await;

        assert_eq!(outcome, ReorderOutcome::Committed);
        assert_eq!(*sent.lock().unwrap(), vec![(AGENDA, ids(&[3, 1, 2, 4, 5]))]);
        assert_eq!(coordinator.baseline(AGENDA), Some(ids(&[3, 1, 2, 4, 5])));
        assert!(!coordinator.is_dragging());
    }

    #[tokio::test]
    async fn returning_to_start_sends_nothing() {
        let coordinator = coordinator(4);
        coordinator.drag_start(ItemId(2));
        coordinator.drag_over(AGENDA, 3);
        coordinator.drag_over(AGENDA, 1);

        let outcome = coordinator
            .drag_end(
                |_, _| no_commit(),
                no_refetch,
            )
            .await;
        assert_eq!(outcome, ReorderOutcome::Unchanged);
    }

    #[tokio::test]
    async fn failed_commit_refetches_server_order() {
        let coordinator = coordinator(3);
        let store = Arc::clone(&coordinator.store);
        coordinator.drag_start(ItemId(1));
        coordinator.drag_over(AGENDA, 2);

        let outcome = coordinator
            .drag_end(
                |_, _| async { Err(PlannerError::invalid("rejected")) },
                |key| {
                    let store = Arc::clone(&store);
                    async move {
                        let server = vec![agenda_item(2), agenda_item(1), agenda_item(3)];
                        store.update(|c| c.merge(&[key], BTreeMap::from([(key, server)])));
                        Ok(())
                    }
                },
            )
            .await;

        assert_eq!(outcome, ReorderOutcome::Restored);
        assert_eq!(store.read(|c| c.order(AGENDA)), ids(&[2, 1, 3]));
        assert_eq!(
            coordinator.toasts.errors(),
            vec!["Failed to save agenda order, restoring…".to_string()]
        );
        assert_eq!(coordinator.baseline(AGENDA), None);
    }

    #[test]
    fn hovering_another_container_is_ignored() {
        let coordinator = coordinator(3);
        coordinator.drag_start(ItemId(1));
        coordinator.drag_over(AgendaId(99), 0);
        coordinator.drag_over(AGENDA, 0);
        assert_eq!(coordinator.pending(AGENDA), Some(ids(&[1, 2, 3])));
    }
}
