pub mod agendas;
pub mod days;
pub mod settings;

pub use agendas::AgendaItems;
pub use days::DayItems;
pub use settings::AgendaSettings;

use chrono::NaiveDate;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::PlannerConfig;
use crate::core::{AgendaId, ItemChanges, accept_text};
use crate::state::prefs::{CollapsedAgendas, SelectedDate};
use crate::state::{KeyValueStore, RefreshBus, Subscription, Toasts};
use crate::sync::{Gateway, Skip};
use crate::views::{AgendaGroups, AgendaView, DayBuckets, DayView};

fn checked_text(text: &str) -> std::result::Result<&str, Skip> {
    match accept_text(text) {
        Some(text) => Ok(text),
        None if text.trim().is_empty() => Err(Skip::Blank),
        None => Err(Skip::TooLong),
    }
}

/// Trim new text and refuse it locally when it is blank or too long.
fn checked_changes(mut changes: ItemChanges) -> std::result::Result<ItemChanges, Skip> {
    if let Some(text) = &changes.text {
        changes.text = Some(checked_text(text)?.to_string());
    }
    Ok(changes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Days,
    Agendas,
    Settings,
}

/// Root state container: owns every collection and the refresh bus, and
/// decides which fetches a date change needs.
pub struct Planner<G> {
    toasts: Arc<Toasts>,
    bus: RefreshBus,
    listeners: Mutex<Vec<(Scope, Subscription)>>,
    pub days: DayItems<G>,
    pub agendas: AgendaItems<G>,
    pub settings: AgendaSettings<G>,
    day_view: Mutex<DayView>,
    agenda_view: Mutex<AgendaView>,
    selected: SelectedDate,
    collapsed: Mutex<CollapsedAgendas>,
}

impl<G: Gateway> Planner<G> {
    pub fn new(gateway: Arc<G>, storage: Arc<dyn KeyValueStore>, config: &PlannerConfig) -> Self {
        let toasts = Arc::new(Toasts::new(config.toast_duration()));
        let bus = RefreshBus::new();
        let listeners = [Scope::Days, Scope::Agendas, Scope::Settings]
            .into_iter()
            .map(|scope| (scope, bus.subscribe()))
            .collect();
        Self {
            days: DayItems::new(Arc::clone(&gateway), Arc::clone(&toasts)),
            agendas: AgendaItems::new(Arc::clone(&gateway), Arc::clone(&toasts)),
            settings: AgendaSettings::new(gateway, Arc::clone(&toasts)),
            toasts,
            bus,
            listeners: Mutex::new(listeners),
            day_view: Mutex::new(DayView::new()),
            agenda_view: Mutex::new(AgendaView::new()),
            selected: SelectedDate::new(Arc::clone(&storage)),
            collapsed: Mutex::new(CollapsedAgendas::load(storage)),
        }
    }

    pub fn toasts(&self) -> &Arc<Toasts> {
        &self.toasts
    }

    pub fn bus(&self) -> &RefreshBus {
        &self.bus
    }

    pub fn focal_date(&self) -> Option<NaiveDate> {
        self.day_view.lock().unwrap_or_else(PoisonError::into_inner).focal_date()
    }

    /// Restore the remembered date (or `today`) and load it.
    pub async fn open(&self, today: NaiveDate) -> NaiveDate {
        let date = self.selected.load(today);
        self.set_focal_date(date).await;
        date
    }

    /// Move to `date`, fetching the day window when it changed and the
    /// agendas only when the month changed.
    pub async fn set_focal_date(&self, date: NaiveDate) {
        self.selected.save(date);
        let window = self
            .day_view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_focal_date(date);
        let month_changed = self
            .agenda_view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_focal_date(date);

        let days = async {
            if let Some(window) = window {
                self.load_days(&window.days()).await;
            }
        };
        let agendas = async {
            if month_changed {
                self.load_agendas(date).await;
            }
        };
        futures::join!(days, agendas);
    }

    async fn load_days(&self, days: &[NaiveDate]) {
        if let Err(e) = self.days.fetch(days).await {
            log::error!("Failed to load day items: {}", e);
            self.toasts.show_error("Failed to load items");
        }
    }

    async fn load_agendas(&self, date: NaiveDate) {
        if let Err(e) = self.agendas.load(date).await {
            log::error!("Failed to load agendas: {}", e);
            self.toasts.show_error("Failed to load agendas");
        }
    }

    /// Ask every subscriber to refetch its scope.
    pub fn refresh(&self) -> usize {
        self.bus.fire()
    }

    /// Service pending refresh signals. Returns how many scopes refetched.
    pub async fn pump_refresh(&self) -> usize {
        let fired: Vec<Scope> = {
            let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            listeners
                .iter_mut()
                .filter_map(|(scope, subscription)| {
                    let mut signalled = false;
                    while subscription.try_recv() {
                        signalled = true;
                    }
                    signalled.then_some(*scope)
                })
                .collect()
        };
        if fired.is_empty() {
            return 0;
        }

        let focal = self.focal_date();
        let days = async {
            if !fired.contains(&Scope::Days) {
                return false;
            }
            let window = self.day_view.lock().unwrap_or_else(PoisonError::into_inner).window();
            match window {
                Some(window) => {
                    self.load_days(&window.days()).await;
                    true
                }
                None => false,
            }
        };
        let agendas = async {
            match focal {
                Some(date) if fired.contains(&Scope::Agendas) => {
                    self.load_agendas(date).await;
                    true
                }
                _ => false,
            }
        };
        let settings = async {
            if !fired.contains(&Scope::Settings) || !self.settings.is_loaded() {
                return false;
            }
            if let Err(e) = self.settings.fetch().await {
                log::error!("Failed to load agendas: {}", e);
                self.toasts.show_error("Failed to load agendas");
            }
            true
        };

        let (days, agendas, settings) = futures::join!(days, agendas, settings);
        log::debug!("Refresh handled: days={} agendas={} settings={}", days, agendas, settings);
        [days, agendas, settings].into_iter().filter(|done| *done).count()
    }

    pub fn day_buckets(&self) -> DayBuckets {
        let view = self.day_view.lock().unwrap_or_else(PoisonError::into_inner);
        self.days.store().read(|c| view.buckets(c))
    }

    pub fn agenda_groups(&self) -> AgendaGroups {
        let view = self.agenda_view.lock().unwrap_or_else(PoisonError::into_inner);
        self.agendas.agendas().read(|agendas| view.groups(agendas))
    }

    pub fn is_collapsed(&self, agenda: AgendaId) -> bool {
        self.collapsed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_collapsed(agenda)
    }

    pub fn toggle_collapsed(&self, agenda: AgendaId) -> bool {
        self.collapsed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .toggle(agenda)
    }
}
