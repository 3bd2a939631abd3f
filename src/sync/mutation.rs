use std::future::Future;
use std::sync::Arc;

use super::flight::{Phase, SingleFlight};
use crate::Result;
use crate::core::{Collection, Entity, Patch};
use crate::state::{Store, Toasts};

/// Why a request never reached the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Another mutation on the same entity is still pending.
    InFlight,
    /// The change would leave required text empty.
    Blank,
    /// Text over the length limit.
    TooLong,
    /// The entity is not in the local cache.
    NotFound,
}

/// How a mutation resolved. Failures were already reported with a toast.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Skipped(Skip),
    Failed,
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Done(value) => Outcome::Done(f(value)),
            Self::Skipped(skip) => Outcome::Skipped(skip),
            Self::Failed => Outcome::Failed,
        }
    }
}

/// Applies local-first edits to one collection and reconciles them with the server.
pub struct MutationEngine<E: Entity> {
    store: Arc<Store<Collection<E>>>,
    flights: SingleFlight<E::Id>,
    toasts: Arc<Toasts>,
}

impl<E: Entity> MutationEngine<E> {
    pub fn new(store: Arc<Store<Collection<E>>>, toasts: Arc<Toasts>) -> Self {
        Self {
            store,
            flights: SingleFlight::new(),
            toasts,
        }
    }

    pub fn store(&self) -> &Arc<Store<Collection<E>>> {
        &self.store
    }

    pub fn phase(&self, id: E::Id) -> Phase {
        self.flights.phase(id)
    }

    /// Optimistic edit.
    ///
    /// The patch is published before `remote` is awaited. On success the
    /// server's copy replaces the optimistic one; on failure the entity is
    /// put back exactly as it was and `failure` is shown. `remote` is not
    /// polled at all when the edit is skipped.
    ///
    /// Rollback restores only this entity, not the whole collection as it
    /// stood before the edit: changes other mutations committed meanwhile
    /// survive. With nothing else in flight the two are the same.
    pub async fn edit<P, F>(&self, id: E::Id, patch: &P, remote: F, failure: &str) -> Outcome<E>
    where
        P: Patch<E>,
        F: Future<Output = Result<E>>,
    {
        if patch.is_blank() {
            log::debug!("Dropping blank edit on {}", id);
            return Outcome::Skipped(Skip::Blank);
        }
        let Some(before) = self.store.read(|c| c.get(id).cloned()) else {
            return Outcome::Skipped(Skip::NotFound);
        };
        let Some(flight) = self.flights.begin(id) else {
            return Outcome::Skipped(Skip::InFlight);
        };

        self.store.update(|c| c.update_with(id, |e| patch.apply(e)));

        match remote.await {
            Ok(server) => {
                self.store.update(|c| c.replace(server.clone()));
                flight.commit();
                Outcome::Done(server)
            }
            Err(e) => {
                log::warn!("Edit on {} failed, rolling back: {}", id, e);
                self.store.update(|c| c.update_with(id, |entity| *entity = before));
                flight.roll_back();
                self.toasts.show_error(failure);
                Outcome::Failed
            }
        }
    }

    /// Server-first change on an existing entity: nothing local moves until
    /// `remote` succeeds, then `apply` folds the response in. Shares the
    /// entity's single-flight slot with [`MutationEngine::edit`].
    pub async fn confirm_on<T, F>(
        &self,
        id: E::Id,
        remote: F,
        failure: &str,
        apply: impl FnOnce(&mut Collection<E>, &T),
    ) -> Outcome<T>
    where
        F: Future<Output = Result<T>>,
    {
        let Some(flight) = self.flights.begin(id) else {
            return Outcome::Skipped(Skip::InFlight);
        };
        let outcome = self.confirm(remote, failure, apply).await;
        if outcome.is_done() {
            flight.commit();
        } else {
            flight.roll_back();
        }
        outcome
    }

    /// Server-first change with no entity to guard (creation, copies).
    pub async fn confirm<T, F>(
        &self,
        remote: F,
        failure: &str,
        apply: impl FnOnce(&mut Collection<E>, &T),
    ) -> Outcome<T>
    where
        F: Future<Output = Result<T>>,
    {
        match remote.await {
            Ok(value) => {
                self.store.update(|c| apply(c, &value));
                Outcome::Done(value)
            }
            Err(e) => {
                log::warn!("{}: {}", failure, e);
                self.toasts.show_error(failure);
                Outcome::Failed
            }
        }
    }
}
