use std::sync::Arc;

use crate::Result;
use crate::core::{
    Agenda, AgendaChanges, AgendaId, AgendaQuery, AgendaType, Collection, accept_name,
};
use crate::state::{Store, Toasts};
use crate::sync::{Gateway, MutationEngine, Outcome, ReorderCoordinator, ReorderOutcome, Skip};

/// Custom and archived agendas as managed on the settings page.
pub struct AgendaSettings<G> {
    gateway: Arc<G>,
    engine: MutationEngine<Agenda>,
    reorder: ReorderCoordinator<Agenda>,
}

impl<G: Gateway> AgendaSettings<G> {
    pub fn new(gateway: Arc<G>, toasts: Arc<Toasts>) -> Self {
        let store = Arc::new(Store::new(Collection::new()));
        Self {
            gateway,
            engine: MutationEngine::new(Arc::clone(&store), Arc::clone(&toasts)),
            reorder: ReorderCoordinator::new(
                store,
                toasts,
                "Failed to save agendas order, restoring…",
            ),
        }
    }

    pub fn store(&self) -> &Arc<Store<Collection<Agenda>>> {
        self.engine.store()
    }

    pub fn is_loaded(&self) -> bool {
        self.store().read(|c| c.is_loaded(()))
    }

    pub fn custom(&self) -> Vec<Agenda> {
        self.of_type(AgendaType::Custom)
    }

    pub fn archived(&self) -> Vec<Agenda> {
        self.of_type(AgendaType::Archived)
    }

    fn of_type(&self, agenda_type: AgendaType) -> Vec<Agenda> {
        self.store().read(|c| {
            c.items(())
                .iter()
                .filter(|a| a.agenda_type == agenda_type)
                .cloned()
                .collect()
        })
    }

    pub async fn fetch(&self) -> Result<()> {
        let agendas = self.gateway.list_agendas(&AgendaQuery::settings()).await?;
        self.store().update(|c| c.reset(&[()], [((), agendas)].into()));
        Ok(())
    }

    pub async fn create(&self, name: &str) -> Outcome<Agenda> {
        let name = match checked_name(name) {
            Ok(name) => name,
            Err(skip) => return Outcome::Skipped(skip),
        };
        self.engine
            .confirm(self.gateway.create_agenda(name), "Failed to create agenda", |c, agenda| {
                c.append(agenda.clone())
            })
            .await
    }

    pub async fn rename(&self, id: AgendaId, name: &str) -> Outcome<Agenda> {
        let name = match checked_name(name) {
            Ok(name) => name,
            Err(skip) => return Outcome::Skipped(skip),
        };
        self.update(id, AgendaChanges::rename(name)).await
    }

    pub async fn archive(&self, id: AgendaId) -> Outcome<Agenda> {
        self.update(id, AgendaChanges::retype(AgendaType::Archived)).await
    }

    pub async fn unarchive(&self, id: AgendaId) -> Outcome<Agenda> {
        self.update(id, AgendaChanges::retype(AgendaType::Custom)).await
    }

    async fn update(&self, id: AgendaId, changes: AgendaChanges) -> Outcome<Agenda> {
        self.engine
            .edit(id, &changes, self.gateway.update_agenda(id, &changes), "Failed to update agenda")
            .await
    }

    pub async fn delete(&self, id: AgendaId) -> Outcome<()> {
        self.engine
            .confirm_on(id, self.gateway.delete_agenda(id), "Failed to delete agenda", |c, _| {
                c.remove(id);
            })
            .await
    }

    pub fn drag_start(&self, id: AgendaId) -> bool {
        self.reorder.drag_start(id)
    }

    pub fn drag_over(&self, index: usize) {
        self.reorder.drag_over((), index);
    }

    pub async fn drag_end(&self) -> ReorderOutcome {
        let gateway = &self.gateway;
        self.reorder
            .drag_end(
                |(), order| async move { gateway.reorder_agendas(&order).await },
                |()| self.fetch(),
            )
            .await
    }
}

fn checked_name(name: &str) -> std::result::Result<&str, Skip> {
    match accept_name(name) {
        Some(name) => Ok(name),
        None if name.trim().is_empty() => Err(Skip::Blank),
        None => Err(Skip::TooLong),
    }
}
