use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<()>>,
}

/// Process-wide "refetch everything" signal.
///
/// Each subscriber owns a queue, so a subscriber sees one signal per fire
/// even when it is busy refetching while the next one arrives.
#[derive(Debug, Clone, Default)]
pub struct RefreshBus {
    registry: Arc<Mutex<Registry>>,
}

impl RefreshBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, tx);
        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Signal every subscriber. Returns how many were reached.
    pub fn fire(&self) -> usize {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.subscribers.retain(|_, tx| tx.send(()).is_ok());
        let reached = registry.subscribers.len();
        log::info!("Refresh fired to {} subscribers", reached);
        reached
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

/// A registered listener. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<()>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Wait for the next signal. `false` once the bus is gone.
    pub async fn recv(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Take one pending signal without waiting.
    pub fn try_recv(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .subscribers
                .remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_gets_every_fire() {
        let bus = RefreshBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.fire(), 2);
        assert_eq!(bus.fire(), 2);

        assert!(a.try_recv());
        assert!(a.try_recv());
        assert!(!a.try_recv());
        assert!(b.try_recv());
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let bus = RefreshBus::new();
        let a = bus.subscribe();
        let _b = bus.subscribe();
        a.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.fire(), 1);
    }

    #[tokio::test]
    async fn recv_wakes_on_fire() {
        let bus = RefreshBus::new();
        let mut sub = bus.subscribe();
        let firing = bus.clone();
        tokio::spawn(async move {
            firing.fire();
        });
        assert!(sub.recv().await);
    }
}
