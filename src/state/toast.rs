use std::time::{Duration, Instant};
use uuid::Uuid;

use super::store::Store;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: Uuid,
    pub kind: ToastKind,
    pub text: String,
    pub shown_at: Instant,
    pub duration: Duration,
}

impl Toast {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= self.duration
    }
}

/// Transient user-visible notifications.
#[derive(Debug)]
pub struct Toasts {
    store: Store<Vec<Toast>>,
    default_duration: Duration,
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_DURATION)
    }
}

impl Toasts {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            store: Store::new(Vec::new()),
            default_duration,
        }
    }

    pub fn store(&self) -> &Store<Vec<Toast>> {
        &self.store
    }

    pub fn show(&self, text: impl Into<String>, kind: ToastKind) -> Uuid {
        self.show_for(text, kind, self.default_duration)
    }

    pub fn show_for(&self, text: impl Into<String>, kind: ToastKind, duration: Duration) -> Uuid {
        let toast = Toast {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            shown_at: Instant::now(),
            duration,
        };
        let id = toast.id;
        self.store.update(|toasts| toasts.push(toast));
        id
    }

    pub fn show_error(&self, text: impl Into<String>) -> Uuid {
        let text = text.into();
        log::warn!("{}", text);
        self.show(text, ToastKind::Error)
    }

    pub fn dismiss(&self, id: Uuid) {
        self.store.update(|toasts| toasts.retain(|t| t.id != id));
    }

    /// Drop every toast whose duration has elapsed. Returns how many went.
    pub fn prune_expired(&self, now: Instant) -> usize {
        self.store.update(|toasts| {
            let before = toasts.len();
            toasts.retain(|t| !t.is_expired(now));
            before - toasts.len()
        })
    }

    pub fn active(&self) -> Vec<Toast> {
        self.store.snapshot()
    }

    /// Texts of active error toasts, oldest first.
    pub fn errors(&self) -> Vec<String> {
        self.store.read(|toasts| {
            toasts
                .iter()
                .filter(|t| t.kind == ToastKind::Error)
                .map(|t| t.text.clone())
                .collect()
        })
    }
}
