pub mod agenda;
pub mod calendar;
pub mod collection;
pub mod draft;
pub mod item;

pub use agenda::{
    Agenda, AgendaAction, AgendaChanges, AgendaId, AgendaQuery, AgendaType, accept_name,
};
pub use collection::Collection;
pub use draft::{DraftItem, Drafts, Row};
pub use item::{AgendaItem, DayItem, Entity, ItemChanges, ItemId, ItemState, Patch, accept_text};
