pub mod agenda;
pub mod day;

pub use agenda::{AgendaGroups, AgendaView};
pub use day::{DayBuckets, DayView};
