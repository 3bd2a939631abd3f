use chrono::NaiveDate;

use crate::core::calendar::DayWindow;
use crate::core::{Collection, DayItem};

/// What the day column shows for the focal date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayBuckets {
    pub today: Vec<DayItem>,
    pub tomorrow: Vec<DayItem>,
}

#[derive(Debug, Clone, Default)]
pub struct DayView {
    window: Option<DayWindow>,
}

impl DayView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focal_date(&self) -> Option<NaiveDate> {
        self.window.map(|w| w.today)
    }

    pub fn window(&self) -> Option<DayWindow> {
        self.window
    }

    /// Move the focal date. Returns the window to fetch when it changed.
    pub fn set_focal_date(&mut self, date: NaiveDate) -> Option<DayWindow> {
        let window = DayWindow::starting(date);
        if self.window == Some(window) {
            return None;
        }
        self.window = Some(window);
        Some(window)
    }

    pub fn buckets(&self, items: &Collection<DayItem>) -> DayBuckets {
        match self.window {
            Some(window) => DayBuckets {
                today: items.items(window.today).to_vec(),
                tomorrow: items.items(window.tomorrow).to_vec(),
            },
            None => DayBuckets::default(),
        }
    }
}
